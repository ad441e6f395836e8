//! Code Engine API types
//!
//! This library defines the data exchanged with the Code Engine API:
//! - Option structs: per-operation inputs with required field validation
//! - Project: project resources returned by the v2 project API
//! - ProjectList: a page of projects plus pagination links

pub mod error;
pub mod options;
pub mod project;

pub use error::ValidationError;
pub use options::{
    CreateProjectOptions, DeleteProjectOptions, GetKubeconfigOptions, GetProjectOptions, KubeconfigTarget,
    ListKubeconfigOptions, ListProjectsOptions,
};
pub use project::{PaginationLink, Project, ProjectList, ProjectPrototype, ProjectStatus};
