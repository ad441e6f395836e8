//! Kubernetes client for a project's namespace

use crate::{KubeError, Result};
use k8s_openapi::api::core::v1::ConfigMap;
use kube::api::ListParams;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Api, Client, Config};
use tracing::debug;

/// ProjectCluster wraps a Kubernetes client bound to a project namespace
pub struct ProjectCluster {
    client: Client,
    namespace: String,
}

impl ProjectCluster {
    /// Build a client from kubeconfig text, using the current context
    pub async fn from_kubeconfig(kubeconfig: &str) -> Result<Self> {
        let kubeconfig = Kubeconfig::from_yaml(kubeconfig)?;
        let context_namespace = current_namespace(&kubeconfig)?;

        let config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default()).await?;
        let namespace = context_namespace.unwrap_or_else(|| config.default_namespace.clone());
        debug!("Connecting to {} in namespace {}", config.cluster_url, namespace);

        let client = Client::try_from(config)?;
        Ok(Self { client, namespace })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Get the underlying Kubernetes client
    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// List the config maps of the project namespace
    pub async fn list_config_maps(&self) -> Result<Vec<ConfigMap>> {
        let config_maps: Api<ConfigMap> = Api::namespaced(self.client.clone(), &self.namespace);
        let list = config_maps.list(&ListParams::default()).await?;

        debug!("Found {} config maps in {}", list.items.len(), self.namespace);
        Ok(list.items)
    }
}

/// Namespace of the kubeconfig's current context, if it names one
pub fn current_namespace(kubeconfig: &Kubeconfig) -> Result<Option<String>> {
    let current = kubeconfig
        .current_context
        .as_deref()
        .filter(|name| !name.is_empty())
        .ok_or(KubeError::NoCurrentContext)?;

    Ok(kubeconfig
        .contexts
        .iter()
        .find(|named| named.name == current)
        .and_then(|named| named.context.as_ref())
        .and_then(|context| context.namespace.clone()))
}
