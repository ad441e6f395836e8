//! Fetch the kubeconfig of an existing project and talk to its namespace

use crate::settings::DemoSettings;
use anyhow::{Context, Result};
use codeengine_api::{GetKubeconfigOptions, ListKubeconfigOptions};
use codeengine_client::KubeconfigService;
use codeengine_core::auth::{
    CODE_ENGINE_RECEIVER, DEFAULT_CLIENT_ID, DEFAULT_CLIENT_SECRET, DEFAULT_DELEGATED_TOKEN_EXPIRY,
};
use codeengine_core::IamAuthenticator;
use codeengine_kube::ProjectCluster;
use std::sync::Arc;
use tracing::info;

pub async fn run(settings: &DemoSettings, legacy: bool) -> Result<()> {
    let project_id = settings
        .project_id
        .as_deref()
        .context("CE_PROJECT_ID must be set for the kubeconfig flow")?;

    let iam = IamAuthenticator::new(settings.api_key.as_str()).with_url(settings.iam_endpoint.as_str());
    let mut service = KubeconfigService::new(Arc::new(iam.clone()));
    service.set_service_url(settings.kubeconfig_url());

    let kubeconfig = if legacy {
        fetch_with_refresh_token(&service, &iam, project_id).await?
    } else {
        fetch_with_delegated_token(&service, &iam, project_id).await?
    };

    show_config_maps(&kubeconfig).await
}

/// Current flow: a delegated refresh token issued for Code Engine
pub async fn fetch_with_delegated_token(
    service: &KubeconfigService,
    iam: &IamAuthenticator,
    project_id: &str,
) -> Result<String> {
    let token = iam
        .request_delegated_refresh_token(CODE_ENGINE_RECEIVER, DEFAULT_DELEGATED_TOKEN_EXPIRY)
        .await
        .context("failed to obtain a delegated refresh token")?;

    let options = GetKubeconfigOptions::new(token, project_id);
    let response = service
        .get_kubeconfig(&options)
        .await
        .with_context(|| format!("failed to get kubeconfig of project {}", project_id))?;

    info!("Fetched kubeconfig of project {}", project_id);
    Ok(response.into_result())
}

/// Legacy flow: a plain IAM refresh token
#[allow(deprecated)]
async fn fetch_with_refresh_token(
    service: &KubeconfigService,
    iam: &IamAuthenticator,
    project_id: &str,
) -> Result<String> {
    let token = iam
        .clone()
        .with_client_credentials(DEFAULT_CLIENT_ID, DEFAULT_CLIENT_SECRET)
        .request_token()
        .await
        .context("failed to obtain an IAM token")?;
    let refresh_token = token
        .refresh_token
        .context("IAM did not return a refresh token")?;

    let options = ListKubeconfigOptions::new(refresh_token, project_id);
    let response = service
        .list_kubeconfig(&options)
        .await
        .with_context(|| format!("failed to list kubeconfig of project {}", project_id))?;

    info!("Fetched kubeconfig of project {} (legacy flow)", project_id);
    Ok(response.into_result())
}

pub async fn show_config_maps(kubeconfig: &str) -> Result<()> {
    let cluster = ProjectCluster::from_kubeconfig(kubeconfig)
        .await
        .context("kubeconfig is not usable")?;

    let config_maps = cluster.list_config_maps().await?;
    info!(
        "Namespace {} has {} config maps",
        cluster.namespace(),
        config_maps.len()
    );
    for config_map in &config_maps {
        info!(
            "  - {}",
            config_map.metadata.name.as_deref().unwrap_or("unknown")
        );
    }

    Ok(())
}
