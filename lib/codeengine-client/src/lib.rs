//! Code Engine service clients
//!
//! - KubeconfigService: retrieves the kubeconfig of a project
//! - ProjectService: lists, creates, fetches and deletes projects
//! - ProjectsPager: walks every page of the project list

pub mod kubeconfig;
pub mod pager;
pub mod project;

pub use kubeconfig::KubeconfigService;
pub use pager::ProjectsPager;
pub use project::ProjectService;

pub use codeengine_core::{DetailedResponse, Error, Result};

/// Service name used for configuration variables and SDK analytics
pub const SERVICE_NAME: &str = "code_engine";

/// Domain hosting the regional Code Engine endpoints
pub const DEFAULT_DOMAIN: &str = "codeengine.cloud.ibm.com";
