//! Kubeconfig retrieval

use crate::{DEFAULT_DOMAIN, SERVICE_NAME};
use codeengine_api::{GetKubeconfigOptions, KubeconfigTarget, ListKubeconfigOptions};
use codeengine_core::{
    Authenticator, BaseService, DetailedResponse, Operation, RequestBuilder, Result, ServiceConfig,
};
use reqwest::Method;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_SERVICE_URL: &str = "https://api.us-south.codeengine.cloud.ibm.com/api/v1";

const KUBECONFIG_CONTENT_TYPE: &str = "text/plain";

/// KubeconfigService retrieves the kubeconfig of a Code Engine project
#[derive(Clone, Debug)]
pub struct KubeconfigService {
    base: BaseService,
}

impl KubeconfigService {
    /// Create a service against [`DEFAULT_SERVICE_URL`]
    pub fn new(authenticator: Arc<dyn Authenticator>) -> Self {
        Self {
            base: BaseService::new(DEFAULT_SERVICE_URL, authenticator),
        }
    }

    /// Create a service from explicit configuration
    pub fn from_config(config: &ServiceConfig) -> Result<Self> {
        let url = config.url.as_deref().unwrap_or(DEFAULT_SERVICE_URL);
        let base = BaseService::new(url, config.authenticator()?).with_http_client(config.http_client()?);
        Ok(Self { base })
    }

    /// Create a service from `CODE_ENGINE_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_config(&ServiceConfig::from_env(SERVICE_NAME)?)
    }

    /// Endpoint of the kubeconfig API in `region`
    pub fn service_url_for_region(region: &str) -> String {
        format!("https://api.{}.{}/api/v1", region, DEFAULT_DOMAIN)
    }

    pub fn service_url(&self) -> &str {
        self.base.service_url()
    }

    pub fn set_service_url(&mut self, service_url: impl Into<String>) {
        self.base.set_service_url(service_url);
    }

    pub fn set_default_headers(&mut self, headers: BTreeMap<String, String>) {
        self.base.set_default_headers(headers);
    }

    /// Retrieve the kubeconfig of a project using an IAM refresh token.
    ///
    /// Targets the legacy namespace path.
    #[deprecated(note = "use `get_kubeconfig` with a delegated refresh token")]
    pub async fn list_kubeconfig(
        &self,
        options: &ListKubeconfigOptions,
    ) -> Result<DetailedResponse<String>> {
        let target = options.validate()?;
        let operation = Operation {
            service_name: SERVICE_NAME,
            service_version: "V1",
            operation_id: "ListKubeconfig",
        };

        let builder = self.kubeconfig_request(
            "/namespaces/{id}/config",
            &operation,
            target,
            "Refresh-Token",
            &options.headers,
            options.accept.as_deref(),
        )?;
        self.fetch(builder, options.timeout).await
    }

    /// Retrieve the kubeconfig of a project using a delegated refresh token
    /// issued for Code Engine
    pub async fn get_kubeconfig(
        &self,
        options: &GetKubeconfigOptions,
    ) -> Result<DetailedResponse<String>> {
        let target = options.validate()?;
        let operation = Operation {
            service_name: SERVICE_NAME,
            service_version: "V1",
            operation_id: "GetKubeconfig",
        };

        let builder = self.kubeconfig_request(
            "/project/{id}/config",
            &operation,
            target,
            "X-Delegated-Refresh-Token",
            &options.headers,
            options.accept.as_deref(),
        )?;
        self.fetch(builder, options.timeout).await
    }

    fn kubeconfig_request(
        &self,
        path: &str,
        operation: &Operation,
        target: KubeconfigTarget<'_>,
        token_header: &str,
        headers: &BTreeMap<String, String>,
        accept: Option<&str>,
    ) -> Result<RequestBuilder> {
        let mut builder = self
            .base
            .request(Method::GET, path, &[("id", target.project_id)], operation)?
            .custom_headers(headers)?
            .operation_header(token_header, target.token)?
            .operation_header("Accept", KUBECONFIG_CONTENT_TYPE)?;
        if let Some(accept) = accept {
            builder = builder.accept(accept)?;
        }
        Ok(builder)
    }

    async fn fetch(
        &self,
        builder: RequestBuilder,
        timeout: Option<Duration>,
    ) -> Result<DetailedResponse<String>> {
        let response = self.base.invoke_text(builder, timeout).await?;
        debug!("Received kubeconfig ({} bytes)", response.result.len());
        Ok(response)
    }
}
