//! Kubernetes access to a Code Engine project
//!
//! Turns the kubeconfig text returned by the kubeconfig service into a
//! `kube::Client` scoped to the project's namespace.

pub mod cluster;
pub mod error;

pub use cluster::{current_namespace, ProjectCluster};
pub use error::{KubeError, Result};
