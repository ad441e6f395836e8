//! Per-operation option structs
//!
//! Required fields are held as `Option<String>` so that "never set" and
//! "set to an empty string" are both detectable; `validate` rejects either
//! before a request is built. Every struct also carries an ordered map of
//! caller headers and an optional deadline for the call.

use crate::error::{require, Result, ValidationError};
use crate::project::ProjectPrototype;
use std::collections::BTreeMap;
use std::time::Duration;

/// Setters shared by every options struct.
macro_rules! common_setters {
    ($ty:ty) => {
        impl $ty {
            /// Add a caller-supplied header, replacing a previous value for the same name
            pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
                self.headers.insert(name.into(), value.into());
                self
            }

            /// Replace all caller-supplied headers
            pub fn with_headers(mut self, headers: BTreeMap<String, String>) -> Self {
                self.headers = headers;
                self
            }

            /// Bound the whole call (request and body read) by a deadline
            pub fn with_timeout(mut self, timeout: Duration) -> Self {
                self.timeout = Some(timeout);
                self
            }
        }
    };
}

/// Validated inputs of a kubeconfig request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KubeconfigTarget<'a> {
    pub project_id: &'a str,
    pub token: &'a str,
}

/// Options for the legacy kubeconfig call authenticated with a refresh token
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ListKubeconfigOptions {
    /// IAM refresh token sent as the `Refresh-Token` header
    pub refresh_token: Option<String>,
    /// Project identifier (the project's namespace)
    pub project_id: Option<String>,
    /// Overrides the default `text/plain` Accept header
    pub accept: Option<String>,
    pub headers: BTreeMap<String, String>,
    pub timeout: Option<Duration>,
}

impl ListKubeconfigOptions {
    pub fn new(refresh_token: impl Into<String>, project_id: impl Into<String>) -> Self {
        Self {
            refresh_token: Some(refresh_token.into()),
            project_id: Some(project_id.into()),
            ..Default::default()
        }
    }

    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    pub fn with_project_id(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    pub fn with_accept(mut self, accept: impl Into<String>) -> Self {
        self.accept = Some(accept.into());
        self
    }

    pub fn validate(&self) -> Result<KubeconfigTarget<'_>> {
        let token = require("refresh_token", &self.refresh_token)?;
        let project_id = require("project_id", &self.project_id)?;
        Ok(KubeconfigTarget { project_id, token })
    }
}

common_setters!(ListKubeconfigOptions);

/// Options for the kubeconfig call authenticated with a delegated refresh token
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GetKubeconfigOptions {
    /// Delegated refresh token issued for the Code Engine receiver, sent as
    /// the `X-Delegated-Refresh-Token` header
    pub x_delegated_refresh_token: Option<String>,
    pub project_id: Option<String>,
    pub accept: Option<String>,
    pub headers: BTreeMap<String, String>,
    pub timeout: Option<Duration>,
}

impl GetKubeconfigOptions {
    pub fn new(
        x_delegated_refresh_token: impl Into<String>,
        project_id: impl Into<String>,
    ) -> Self {
        Self {
            x_delegated_refresh_token: Some(x_delegated_refresh_token.into()),
            project_id: Some(project_id.into()),
            ..Default::default()
        }
    }

    pub fn with_x_delegated_refresh_token(mut self, token: impl Into<String>) -> Self {
        self.x_delegated_refresh_token = Some(token.into());
        self
    }

    pub fn with_project_id(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    pub fn with_accept(mut self, accept: impl Into<String>) -> Self {
        self.accept = Some(accept.into());
        self
    }

    pub fn validate(&self) -> Result<KubeconfigTarget<'_>> {
        let token = require("x_delegated_refresh_token", &self.x_delegated_refresh_token)?;
        let project_id = require("project_id", &self.project_id)?;
        Ok(KubeconfigTarget { project_id, token })
    }
}

common_setters!(GetKubeconfigOptions);

/// Options for listing projects, one page at a time
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ListProjectsOptions {
    /// Maximum number of projects per page (1..=100)
    pub limit: Option<u32>,
    /// Opaque start token taken from a previous page's `next` link
    pub start: Option<String>,
    pub headers: BTreeMap<String, String>,
    pub timeout: Option<Duration>,
}

impl ListProjectsOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_start(mut self, start: impl Into<String>) -> Self {
        self.start = Some(start.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        match self.limit {
            Some(limit) if !(1..=100).contains(&limit) => Err(ValidationError::InvalidField {
                field: "limit",
                reason: format!("{} is outside 1..=100", limit),
            }),
            _ => Ok(()),
        }
    }
}

common_setters!(ListProjectsOptions);

/// Options for creating a project
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CreateProjectOptions {
    pub name: Option<String>,
    /// Resource group to create the project in; the account default when unset
    pub resource_group_id: Option<String>,
    pub tags: Vec<String>,
    pub headers: BTreeMap<String, String>,
    pub timeout: Option<Duration>,
}

impl CreateProjectOptions {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_resource_group_id(mut self, resource_group_id: impl Into<String>) -> Self {
        self.resource_group_id = Some(resource_group_id.into());
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    /// Validate and produce the request body
    pub fn validate(&self) -> Result<ProjectPrototype> {
        let name = require("name", &self.name)?;
        Ok(ProjectPrototype {
            name: name.to_string(),
            resource_group_id: self.resource_group_id.clone(),
            tags: self.tags.clone(),
        })
    }
}

common_setters!(CreateProjectOptions);

/// Options for fetching a single project
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GetProjectOptions {
    pub id: Option<String>,
    pub headers: BTreeMap<String, String>,
    pub timeout: Option<Duration>,
}

impl GetProjectOptions {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn validate(&self) -> Result<&str> {
        require("id", &self.id)
    }
}

common_setters!(GetProjectOptions);

/// Options for deleting a project
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeleteProjectOptions {
    pub id: Option<String>,
    pub headers: BTreeMap<String, String>,
    pub timeout: Option<Duration>,
}

impl DeleteProjectOptions {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn validate(&self) -> Result<&str> {
        require("id", &self.id)
    }
}

common_setters!(DeleteProjectOptions);
