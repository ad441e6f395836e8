//! Project management

use crate::pager::ProjectsPager;
use crate::{DEFAULT_DOMAIN, SERVICE_NAME};
use codeengine_api::{
    CreateProjectOptions, DeleteProjectOptions, GetProjectOptions, ListProjectsOptions, Project,
    ProjectList,
};
use codeengine_core::{Authenticator, BaseService, DetailedResponse, Operation, Result, ServiceConfig};
use reqwest::Method;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

pub const DEFAULT_SERVICE_URL: &str = "https://api.au-syd.codeengine.cloud.ibm.com/v2";

const fn operation(operation_id: &'static str) -> Operation {
    Operation {
        service_name: SERVICE_NAME,
        service_version: "V2",
        operation_id,
    }
}

/// ProjectService manages Code Engine projects through the v2 API
#[derive(Clone, Debug)]
pub struct ProjectService {
    base: BaseService,
}

impl ProjectService {
    pub fn new(authenticator: Arc<dyn Authenticator>) -> Self {
        Self {
            base: BaseService::new(DEFAULT_SERVICE_URL, authenticator),
        }
    }

    pub fn from_config(config: &ServiceConfig) -> Result<Self> {
        let url = config.url.as_deref().unwrap_or(DEFAULT_SERVICE_URL);
        let base = BaseService::new(url, config.authenticator()?).with_http_client(config.http_client()?);
        Ok(Self { base })
    }

    pub fn from_env() -> Result<Self> {
        Self::from_config(&ServiceConfig::from_env(SERVICE_NAME)?)
    }

    /// Endpoint of the project API in `region`
    pub fn service_url_for_region(region: &str) -> String {
        format!("https://api.{}.{}/v2", region, DEFAULT_DOMAIN)
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

    /// List one page of projects
    pub async fn list_projects(
        &self,
        options: &ListProjectsOptions,
    ) -> Result<DetailedResponse<ProjectList>> {
        options.validate()?;

        let mut builder = self
            .base
            .request(Method::GET, "/projects", &[], &operation("ListProjects"))?
            .custom_headers(&options.headers)?
            .operation_header("Accept", "application/json")?;
        if let Some(limit) = options.limit {
            builder = builder.add_query("limit", limit);
        }
        if let Some(start) = &options.start {
            builder = builder.add_query("start", start);
        }

        let response = self.base.invoke_json::<ProjectList>(builder, options.timeout).await?;
        debug!("Listed {} projects", response.result.projects.len());
        Ok(response)
    }

    /// Pager over every project, starting from the first page
    pub fn projects_pager(&self, options: ListProjectsOptions) -> Result<ProjectsPager<'_>> {
        ProjectsPager::new(self, options)
    }

    pub async fn create_project(
        &self,
        options: &CreateProjectOptions,
    ) -> Result<DetailedResponse<Project>> {
        let prototype = options.validate()?;

        let builder = self
            .base
            .request(Method::POST, "/projects", &[], &operation("CreateProject"))?
            .custom_headers(&options.headers)?
            .operation_header("Accept", "application/json")?
            .set_json_body(&prototype)?;

        let response = self.base.invoke_json::<Project>(builder, options.timeout).await?;
        info!(
            "Created project {} ({}), status {:?}",
            response.result.name, response.result.id, response.result.status
        );
        Ok(response)
    }

    pub async fn get_project(
        &self,
        options: &GetProjectOptions,
    ) -> Result<DetailedResponse<Project>> {
        let id = options.validate()?;

        let builder = self
            .base
            .request(Method::GET, "/projects/{id}", &[("id", id)], &operation("GetProject"))?
            .custom_headers(&options.headers)?
            .operation_header("Accept", "application/json")?;

        self.base.invoke_json(builder, options.timeout).await
    }

    pub async fn delete_project(
        &self,
        options: &DeleteProjectOptions,
    ) -> Result<DetailedResponse<()>> {
        let id = options.validate()?;

        let builder = self
            .base
            .request(Method::DELETE, "/projects/{id}", &[("id", id)], &operation("DeleteProject"))?
            .custom_headers(&options.headers)?;

        let response = self.base.invoke_empty(builder, options.timeout).await?;
        info!("Deleted project {}", id);
        Ok(response)
    }
}
