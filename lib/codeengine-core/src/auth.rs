//! Authenticators for the Code Engine API
//!
//! [`IamAuthenticator`] exchanges an API key with the IAM identity service.
//! Tokens are never cached: every flow asks for what it needs explicitly, and
//! using the authenticator on a service fetches a fresh access token per call.

use crate::error::{extract_error_message, AuthError};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};

/// Public IAM identity endpoint
pub const DEFAULT_IAM_URL: &str = "https://iam.cloud.ibm.com";

/// Client credentials IAM requires before it hands out refresh tokens
pub const DEFAULT_CLIENT_ID: &str = "bx";
pub const DEFAULT_CLIENT_SECRET: &str = "bx";

/// Client id of the Code Engine service, the receiver of delegated tokens
pub const CODE_ENGINE_RECEIVER: &str = "ce";

/// Lifetime requested for delegated refresh tokens, in seconds
pub const DEFAULT_DELEGATED_TOKEN_EXPIRY: u64 = 3600;

const TOKEN_PATH: &str = "/identity/token";
const APIKEY_GRANT_TYPE: &str = "urn:ibm:params:oauth:grant-type:apikey";

/// Upper bound for a single token request
pub const DEFAULT_TOKEN_TIMEOUT: Duration = Duration::from_secs(30);

/// Applies credentials to outgoing requests
#[async_trait]
pub trait Authenticator: Send + Sync + fmt::Debug {
    /// Short name of the scheme, as used in service configuration
    fn auth_type(&self) -> &'static str;

    /// Check the configuration without performing I/O
    fn validate(&self) -> Result<(), AuthError>;

    /// Add authentication headers to a request
    async fn authenticate(&self, headers: &mut HeaderMap) -> Result<(), AuthError>;
}

/// Token set returned by the IAM token endpoint
#[derive(Clone, Deserialize)]
pub struct IamToken {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub delegated_refresh_token: Option<String>,
    #[serde(default)]
    pub token_type: String,
    /// Lifetime in seconds
    #[serde(default)]
    pub expires_in: i64,
    /// Expiry as a unix timestamp
    #[serde(default)]
    pub expiration: i64,
}

impl IamToken {
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        if self.expiration <= 0 {
            return None;
        }
        Utc.timestamp_opt(self.expiration, 0).single()
    }

    /// Tokens without an expiry are treated as expired
    pub fn is_expired(&self) -> bool {
        self.expires_at().map_or(true, |at| at <= Utc::now())
    }
}

impl fmt::Debug for IamToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IamToken")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field(
                "delegated_refresh_token",
                &self.delegated_refresh_token.as_ref().map(|_| "<redacted>"),
            )
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .field("expiration", &self.expiration)
            .finish()
    }
}

#[derive(Deserialize)]
struct DelegatedTokenResponse {
    #[serde(default)]
    delegated_refresh_token: Option<String>,
}

/// IamAuthenticator exchanges an API key for IAM tokens
#[derive(Clone)]
pub struct IamAuthenticator {
    apikey: String,
    url: String,
    client_id: Option<String>,
    client_secret: Option<String>,
    timeout: Duration,
    http: reqwest::Client,
}

impl IamAuthenticator {
    /// Create an authenticator against the public IAM endpoint
    pub fn new(apikey: impl Into<String>) -> Self {
        Self {
            apikey: apikey.into(),
            url: DEFAULT_IAM_URL.to_string(),
            client_id: None,
            client_secret: None,
            timeout: DEFAULT_TOKEN_TIMEOUT,
            http: reqwest::Client::new(),
        }
    }

    /// Override the identity endpoint
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Send client credentials (basic auth) with token requests
    pub fn with_client_credentials(
        mut self,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        self.client_id = Some(client_id.into());
        self.client_secret = Some(client_secret.into());
        self
    }

    /// Bound each token request; applied per request, whatever the client
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Use a preconfigured HTTP client for token requests
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Exchange the API key for an access token (and a refresh token when
    /// client credentials are configured)
    pub async fn request_token(&self) -> Result<IamToken, AuthError> {
        self.validate()?;

        let form = [
            ("grant_type", APIKEY_GRANT_TYPE),
            ("apikey", self.apikey.as_str()),
            ("response_type", "cloud_iam"),
        ];
        let body = self.exchange(&form).await?;

        let token: IamToken = serde_json::from_slice(&body)
            .map_err(|e| AuthError::MalformedToken(e.to_string()))?;
        if token.access_token.is_empty() {
            return Err(AuthError::MalformedToken("access_token is empty".to_string()));
        }

        debug!("Obtained IAM access token (expires in {}s)", token.expires_in);
        Ok(token)
    }

    /// Exchange the API key for a delegated refresh token scoped to `receiver`
    pub async fn request_delegated_refresh_token(
        &self,
        receiver: &str,
        expiry_secs: u64,
    ) -> Result<String, AuthError> {
        self.validate()?;
        if receiver.is_empty() {
            return Err(AuthError::InvalidConfig("receiver client id is empty".to_string()));
        }

        let expiry = expiry_secs.to_string();
        let form = [
            ("grant_type", APIKEY_GRANT_TYPE),
            ("apikey", self.apikey.as_str()),
            ("response_type", "delegated_refresh_token"),
            ("receiver_client_ids", receiver),
            ("delegated_refresh_token_expiry", expiry.as_str()),
        ];
        let body = self.exchange(&form).await?;

        let response: DelegatedTokenResponse = serde_json::from_slice(&body)
            .map_err(|e| AuthError::MalformedToken(e.to_string()))?;
        match response.delegated_refresh_token {
            Some(token) if !token.is_empty() => {
                debug!("Obtained delegated refresh token for receiver {}", receiver);
                Ok(token)
            }
            _ => Err(AuthError::MalformedToken(
                "delegated_refresh_token missing from response".to_string(),
            )),
        }
    }

    /// POST a form to the token endpoint and return the successful body
    async fn exchange(&self, form: &[(&str, &str)]) -> Result<Vec<u8>, AuthError> {
        let url = format!("{}{}", self.url, TOKEN_PATH);
        debug!("Requesting token from {}", url);

        let mut request = self
            .http
            .post(&url)
            .header(ACCEPT, "application/json")
            .timeout(self.timeout)
            .form(form);
        if let (Some(id), Some(secret)) = (&self.client_id, &self.client_secret) {
            request = request.basic_auth(id, Some(secret));
        }

        let response = request.send().await.map_err(AuthError::from_transport)?;
        let status = response.status();
        let body = response.bytes().await.map_err(AuthError::from_transport)?;

        if !status.is_success() {
            let message = extract_error_message(&body)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown").to_string());
            warn!("Token request failed with HTTP {}: {}", status.as_u16(), message);
            return Err(AuthError::Status {
                status: status.as_u16(),
                message,
            });
        }

        Ok(body.to_vec())
    }
}

impl fmt::Debug for IamAuthenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IamAuthenticator")
            .field("apikey", &"<redacted>")
            .field("url", &self.url)
            .field("client_id", &self.client_id)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[async_trait]
impl Authenticator for IamAuthenticator {
    fn auth_type(&self) -> &'static str {
        "iam"
    }

    fn validate(&self) -> Result<(), AuthError> {
        if self.apikey.is_empty() {
            return Err(AuthError::InvalidConfig("apikey is empty".to_string()));
        }
        if self.url.is_empty() {
            return Err(AuthError::InvalidConfig("IAM URL is empty".to_string()));
        }
        if self.client_id.is_some() != self.client_secret.is_some() {
            return Err(AuthError::InvalidConfig(
                "client id and client secret must be set together".to_string(),
            ));
        }
        Ok(())
    }

    async fn authenticate(&self, headers: &mut HeaderMap) -> Result<(), AuthError> {
        let token = self.request_token().await?;
        insert_bearer(headers, &token.access_token)
    }
}

/// Sends a token obtained elsewhere as a bearer token
#[derive(Clone)]
pub struct BearerTokenAuthenticator {
    token: String,
}

impl BearerTokenAuthenticator {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl fmt::Debug for BearerTokenAuthenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BearerTokenAuthenticator")
            .field("token", &"<redacted>")
            .finish()
    }
}

#[async_trait]
impl Authenticator for BearerTokenAuthenticator {
    fn auth_type(&self) -> &'static str {
        "bearerToken"
    }

    fn validate(&self) -> Result<(), AuthError> {
        if self.token.is_empty() {
            return Err(AuthError::InvalidConfig("bearer token is empty".to_string()));
        }
        Ok(())
    }

    async fn authenticate(&self, headers: &mut HeaderMap) -> Result<(), AuthError> {
        self.validate()?;
        insert_bearer(headers, &self.token)
    }
}

/// Leaves requests unauthenticated
#[derive(Clone, Copy, Debug, Default)]
pub struct NoAuthAuthenticator;

#[async_trait]
impl Authenticator for NoAuthAuthenticator {
    fn auth_type(&self) -> &'static str {
        "noAuth"
    }

    fn validate(&self) -> Result<(), AuthError> {
        Ok(())
    }

    async fn authenticate(&self, _headers: &mut HeaderMap) -> Result<(), AuthError> {
        Ok(())
    }
}

fn insert_bearer(headers: &mut HeaderMap, token: &str) -> Result<(), AuthError> {
    let mut value = HeaderValue::from_str(&format!("Bearer {}", token))
        .map_err(|e| AuthError::MalformedToken(format!("token is not a valid header: {}", e)))?;
    value.set_sensitive(true);
    headers.insert(AUTHORIZATION, value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn token_body() -> serde_json::Value {
        serde_json::json!({
            "access_token": "access-123",
            "refresh_token": "refresh-456",
            "token_type": "Bearer",
            "expires_in": 3600,
            "expiration": 4102444800i64
        })
    }

    #[tokio::test]
    async fn test_request_token_sends_apikey_grant() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/identity/token"))
            .and(header("authorization", "Basic Yng6Yng="))
            .and(body_string_contains("apikey=my-api-key"))
            .and(body_string_contains("response_type=cloud_iam"))
            .respond_with(ResponseTemplate::new(200).set_body_json(token_body()))
            .expect(1)
            .mount(&server)
            .await;

        let iam = IamAuthenticator::new("my-api-key")
            .with_url(server.uri())
            .with_client_credentials(DEFAULT_CLIENT_ID, DEFAULT_CLIENT_SECRET);
        let token = iam.request_token().await.unwrap();

        assert_eq!(token.access_token, "access-123");
        assert_eq!(token.refresh_token.as_deref(), Some("refresh-456"));
        assert!(!token.is_expired());
    }

    #[tokio::test]
    async fn test_request_delegated_refresh_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/identity/token"))
            .and(body_string_contains("response_type=delegated_refresh_token"))
            .and(body_string_contains("receiver_client_ids=ce"))
            .and(body_string_contains("delegated_refresh_token_expiry=3600"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"delegated_refresh_token": "drt-789"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let iam = IamAuthenticator::new("my-api-key").with_url(server.uri());
        let token = iam
            .request_delegated_refresh_token(CODE_ENGINE_RECEIVER, DEFAULT_DELEGATED_TOKEN_EXPIRY)
            .await
            .unwrap();
        assert_eq!(token, "drt-789");
    }

    #[tokio::test]
    async fn test_token_request_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/identity/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "errorCode": "BXNIM0415E",
                "errorMessage": "Provided API key could not be found"
            })))
            .mount(&server)
            .await;

        let iam = IamAuthenticator::new("bad-key").with_url(server.uri());
        match iam.request_token().await {
            Err(AuthError::Status { status, message }) => {
                assert_eq!(status, 400);
                assert_eq!(message, "Provided API key could not be found");
            }
            other => panic!("expected status error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_malformed_token_payload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/identity/token"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let iam = IamAuthenticator::new("key").with_url(server.uri());
        assert!(matches!(
            iam.request_token().await,
            Err(AuthError::MalformedToken(_))
        ));

        let missing = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&missing)
            .await;
        let iam = IamAuthenticator::new("key").with_url(missing.uri());
        assert!(matches!(
            iam.request_delegated_refresh_token("ce", 3600).await,
            Err(AuthError::MalformedToken(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_identity_service() {
        let iam = IamAuthenticator::new("key").with_url("http://127.0.0.1:1");
        assert!(matches!(
            iam.request_token().await,
            Err(AuthError::Transport(_))
        ));
    }

    #[tokio::test]
    async fn test_slow_identity_service_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/identity/token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(token_body())
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let iam = IamAuthenticator::new("key")
            .with_url(server.uri())
            .with_timeout(Duration::from_millis(100));
        assert!(matches!(iam.request_token().await, Err(AuthError::Timeout)));

        // the timeout survives swapping in another client
        let iam = iam.with_http_client(reqwest::Client::new());
        let mut headers = HeaderMap::new();
        assert!(matches!(
            iam.authenticate(&mut headers).await,
            Err(AuthError::Timeout)
        ));
        assert!(headers.get(AUTHORIZATION).is_none());
    }

    #[test]
    fn test_default_token_timeout() {
        assert_eq!(IamAuthenticator::new("key").timeout(), DEFAULT_TOKEN_TIMEOUT);
    }

    #[tokio::test]
    async fn test_authenticate_sets_bearer_header() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/identity/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(token_body()))
            .mount(&server)
            .await;

        let iam = IamAuthenticator::new("key").with_url(server.uri());
        let mut headers = HeaderMap::new();
        iam.authenticate(&mut headers).await.unwrap();
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer access-123");
    }

    #[test]
    fn test_validate_rejects_empty_apikey() {
        assert!(IamAuthenticator::new("").validate().is_err());
        assert!(IamAuthenticator::new("key").validate().is_ok());
        assert!(BearerTokenAuthenticator::new("").validate().is_err());
    }

    #[test]
    fn test_token_without_expiration_is_expired() {
        let token: IamToken = serde_json::from_str(r#"{"access_token": "a"}"#).unwrap();
        assert!(token.expires_at().is_none());
        assert!(token.is_expired());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let iam = IamAuthenticator::new("super-secret");
        assert!(!format!("{:?}", iam).contains("super-secret"));
    }
}
