//! Demo settings read from environment variables

use anyhow::{bail, Result};
use codeengine_client::DEFAULT_DOMAIN;
use codeengine_core::auth::DEFAULT_IAM_URL;

const DEFAULT_REGION: &str = "us-south";

#[derive(Clone, PartialEq, Eq)]
pub struct DemoSettings {
    /// `CE_API_KEY`
    pub api_key: String,
    /// `CE_REGION`
    pub region: String,
    /// `CE_DOMAIN`, replaces the regional host
    pub domain: Option<String>,
    /// `CE_PROJECT_ID`, needed by the kubeconfig flow only
    pub project_id: Option<String>,
    /// `IAM_ENDPOINT`
    pub iam_endpoint: String,
}

impl DemoSettings {
    pub fn from_env() -> Result<Self> {
        Self::from_vars(std::env::vars())
    }

    pub fn from_vars<I, K, V>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut api_key = None;
        let mut region = None;
        let mut domain = None;
        let mut project_id = None;
        let mut iam_endpoint = None;

        for (key, value) in vars {
            let value: String = value.into();
            if value.is_empty() {
                continue;
            }
            match key.as_ref() {
                "CE_API_KEY" => api_key = Some(value),
                "CE_REGION" => region = Some(value),
                "CE_DOMAIN" => domain = Some(value),
                "CE_PROJECT_ID" => project_id = Some(value),
                "IAM_ENDPOINT" => iam_endpoint = Some(value),
                _ => {}
            }
        }

        let Some(api_key) = api_key else {
            bail!("CE_API_KEY must be set");
        };

        Ok(Self {
            api_key,
            region: region.unwrap_or_else(|| DEFAULT_REGION.to_string()),
            domain,
            project_id,
            iam_endpoint: iam_endpoint.unwrap_or_else(|| DEFAULT_IAM_URL.to_string()),
        })
    }

    /// Host serving the Code Engine API
    pub fn api_host(&self) -> String {
        match &self.domain {
            Some(domain) => domain.clone(),
            None => format!("api.{}.{}", self.region, DEFAULT_DOMAIN),
        }
    }

    pub fn kubeconfig_url(&self) -> String {
        format!("https://{}/api/v1", self.api_host())
    }

    pub fn project_url(&self) -> String {
        format!("https://{}/v2", self.api_host())
    }
}
