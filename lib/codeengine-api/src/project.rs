use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Project - a Code Engine project, the unit that owns applications, jobs
/// and the Kubernetes namespace the kubeconfig points at
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Project {
    /// Project identifier (UUID)
    pub id: String,

    /// Human readable project name
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crn: Option<String>,

    /// URL of this resource
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,

    /// Region the project lives in (e.g. "us-south")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_group_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub status: ProjectStatus,
}

impl Project {
    pub fn is_ready(&self) -> bool {
        self.status == ProjectStatus::Ready
    }
}

/// Lifecycle state of a project
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Creating,
    CreationFailed,
    Deleting,
    DeletionFailed,
    HardDeleting,
    HardDeleted,
    SoftDeleted,
    Ready,
    /// Any state this client does not know about yet
    #[default]
    #[serde(other)]
    Unknown,
}

impl ProjectStatus {
    /// Whether the project will not leave this state without user action
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProjectStatus::Ready
                | ProjectStatus::CreationFailed
                | ProjectStatus::DeletionFailed
                | ProjectStatus::HardDeleted
                | ProjectStatus::SoftDeleted
        )
    }
}

/// Body of a create project request
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectPrototype {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_group_id: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

/// A page of projects
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectList {
    #[serde(default)]
    pub projects: Vec<Project>,

    /// Page size the server applied
    #[serde(default)]
    pub limit: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first: Option<PaginationLink>,

    /// Link to the following page, absent on the last page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<PaginationLink>,
}

impl ProjectList {
    /// Start token of the following page, if any
    pub fn next_start(&self) -> Option<&str> {
        self.next
            .as_ref()
            .and_then(|link| link.start.as_deref())
            .filter(|start| !start.is_empty())
    }
}

/// Pagination link
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationLink {
    pub href: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
}
