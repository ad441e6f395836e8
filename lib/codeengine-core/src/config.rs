//! Service configuration from environment variables
//!
//! Variables are prefixed with the upper-cased service name, e.g. for the
//! service `code_engine`:
//!
//! ```text
//! CODE_ENGINE_URL=https://api.eu-de.codeengine.cloud.ibm.com/api/v1
//! CODE_ENGINE_AUTH_TYPE=iam
//! CODE_ENGINE_APIKEY=...
//! CODE_ENGINE_AUTH_URL=https://iam.cloud.ibm.com
//! CODE_ENGINE_BEARER_TOKEN=...
//! CODE_ENGINE_DISABLE_SSL=false
//! CODE_ENGINE_AUTH_TIMEOUT=30
//! ```
//!
//! `AUTH_TIMEOUT` bounds each IAM token request, in seconds.

use crate::auth::{
    Authenticator, BearerTokenAuthenticator, IamAuthenticator, NoAuthAuthenticator,
    DEFAULT_TOKEN_TIMEOUT,
};
use crate::error::{Error, Result};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Authentication scheme named by `<SERVICE>_AUTH_TYPE`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthType {
    Iam,
    BearerToken,
    NoAuth,
}

impl FromStr for AuthType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "iam" => Ok(AuthType::Iam),
            "bearertoken" => Ok(AuthType::BearerToken),
            "noauth" => Ok(AuthType::NoAuth),
            other => Err(Error::Config(format!("unsupported auth type: {}", other))),
        }
    }
}

#[derive(Clone, Default, PartialEq, Eq)]
pub struct ServiceConfig {
    pub url: Option<String>,
    pub auth_type: Option<AuthType>,
    pub apikey: Option<String>,
    pub auth_url: Option<String>,
    pub bearer_token: Option<String>,
    pub disable_ssl: bool,
    pub auth_timeout: Option<Duration>,
}

impl ServiceConfig {
    /// Read the configuration for `service_name` from the process environment
    pub fn from_env(service_name: &str) -> Result<Self> {
        Self::from_vars(service_name, std::env::vars())
    }

    /// Read the configuration for `service_name` from the given variables
    pub fn from_vars<I, K, V>(service_name: &str, vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let prefix = format!("{}_", service_name.to_ascii_uppercase().replace('-', "_"));
        let mut config = ServiceConfig::default();

        for (key, value) in vars {
            let Some(property) = key.as_ref().strip_prefix(&prefix) else {
                continue;
            };
            let value: String = value.into();
            match property {
                "URL" => config.url = Some(value),
                "AUTH_TYPE" => config.auth_type = Some(value.parse()?),
                "APIKEY" => config.apikey = Some(value),
                "AUTH_URL" => config.auth_url = Some(value),
                "BEARER_TOKEN" => config.bearer_token = Some(value),
                "DISABLE_SSL" => {
                    config.disable_ssl = value.parse().map_err(|_| {
                        Error::Config(format!("{}DISABLE_SSL must be true or false", prefix))
                    })?
                }
                "AUTH_TIMEOUT" => {
                    let secs: u64 = value.parse().map_err(|_| {
                        Error::Config(format!("{}AUTH_TIMEOUT must be a number of seconds", prefix))
                    })?;
                    config.auth_timeout = Some(Duration::from_secs(secs));
                }
                _ => debug!("Ignoring unknown configuration variable {}{}", prefix, property),
            }
        }

        Ok(config)
    }

    /// The configured auth type, or one inferred from the credentials present
    pub fn effective_auth_type(&self) -> Result<AuthType> {
        match (self.auth_type, &self.apikey, &self.bearer_token) {
            (Some(auth_type), _, _) => Ok(auth_type),
            (None, Some(_), _) => Ok(AuthType::Iam),
            (None, None, Some(_)) => Ok(AuthType::BearerToken),
            (None, None, None) => Err(Error::Config(
                "no authentication configured: set an API key or bearer token".to_string(),
            )),
        }
    }

    /// Build the authenticator this configuration describes
    pub fn authenticator(&self) -> Result<Arc<dyn Authenticator>> {
        let authenticator: Arc<dyn Authenticator> = match self.effective_auth_type()? {
            AuthType::Iam => {
                let apikey = self
                    .apikey
                    .clone()
                    .ok_or_else(|| Error::Config("iam authentication needs an API key".to_string()))?;
                let mut iam = IamAuthenticator::new(apikey)
                    .with_http_client(self.http_client()?)
                    .with_timeout(self.auth_timeout.unwrap_or(DEFAULT_TOKEN_TIMEOUT));
                if let Some(url) = &self.auth_url {
                    iam = iam.with_url(url.as_str());
                }
                Arc::new(iam)
            }
            AuthType::BearerToken => {
                let token = self.bearer_token.clone().ok_or_else(|| {
                    Error::Config("bearerToken authentication needs a token".to_string())
                })?;
                Arc::new(BearerTokenAuthenticator::new(token))
            }
            AuthType::NoAuth => Arc::new(NoAuthAuthenticator),
        };

        authenticator.validate()?;
        Ok(authenticator)
    }

    /// HTTP client honouring `disable_ssl`
    pub fn http_client(&self) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .danger_accept_invalid_certs(self.disable_ssl)
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {}", e)))
    }
}

impl std::fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("url", &self.url)
            .field("auth_type", &self.auth_type)
            .field("apikey", &self.apikey.as_ref().map(|_| "<redacted>"))
            .field("auth_url", &self.auth_url)
            .field("bearer_token", &self.bearer_token.as_ref().map(|_| "<redacted>"))
            .field("disable_ssl", &self.disable_ssl)
            .field("auth_timeout", &self.auth_timeout)
            .finish()
    }
}
