//! Create a throwaway project, use its kubeconfig, then delete it

use crate::kubeconfig_flow::{fetch_with_delegated_token, show_config_maps};
use crate::settings::DemoSettings;
use anyhow::{bail, Context, Result};
use codeengine_api::{
    CreateProjectOptions, DeleteProjectOptions, GetProjectOptions, ListProjectsOptions, Project,
};
use codeengine_client::{KubeconfigService, ProjectService};
use codeengine_core::IamAuthenticator;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use uuid::Uuid;

const POLL_INTERVAL: Duration = Duration::from_secs(10);
const MAX_POLLS: u32 = 60;

pub async fn run(settings: &DemoSettings) -> Result<()> {
    let iam = IamAuthenticator::new(settings.api_key.as_str()).with_url(settings.iam_endpoint.as_str());

    let mut projects = ProjectService::new(Arc::new(iam.clone()));
    projects.set_service_url(settings.project_url());

    let existing = projects
        .projects_pager(ListProjectsOptions::new().with_limit(100))?
        .all()
        .await
        .context("failed to list projects")?;
    info!("Account has {} projects in {}", existing.len(), settings.region);

    let name = format!("ce-demo-{}", Uuid::new_v4());
    let project = projects
        .create_project(&CreateProjectOptions::new(name.as_str()))
        .await
        .with_context(|| format!("failed to create project {}", name))?
        .into_result();

    let outcome = use_project(&projects, &iam, settings, &project.id).await;

    if let Err(e) = projects
        .delete_project(&DeleteProjectOptions::new(project.id.as_str()))
        .await
    {
        error!("Failed to delete project {}: {}", project.id, e);
    }

    outcome
}

async fn use_project(
    projects: &ProjectService,
    iam: &IamAuthenticator,
    settings: &DemoSettings,
    project_id: &str,
) -> Result<()> {
    let project = wait_until_ready(projects, project_id).await?;
    info!("Project {} ({}) is ready", project.name, project.id);

    let mut kubeconfig_service = KubeconfigService::new(Arc::new(iam.clone()));
    kubeconfig_service.set_service_url(settings.kubeconfig_url());

    let kubeconfig = fetch_with_delegated_token(&kubeconfig_service, iam, &project.id).await?;
    show_config_maps(&kubeconfig).await
}

async fn wait_until_ready(projects: &ProjectService, project_id: &str) -> Result<Project> {
    let options = GetProjectOptions::new(project_id);

    for attempt in 1..=MAX_POLLS {
        let project = projects.get_project(&options).await?.into_result();
        if project.is_ready() {
            return Ok(project);
        }
        if project.status.is_terminal() {
            bail!("project {} ended up {:?}", project_id, project.status);
        }

        info!(
            "Project {} is {:?} (check {}/{})",
            project_id, project.status, attempt, MAX_POLLS
        );
        tokio::time::sleep(POLL_INTERVAL).await;
    }

    bail!("project {} was not ready after {} checks", project_id, MAX_POLLS)
}
