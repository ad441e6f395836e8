//! Pagination over the project list

use crate::project::ProjectService;
use codeengine_api::{ListProjectsOptions, Project, ValidationError};
use codeengine_core::{Error, Result};
use futures::stream::{self, Stream, TryStreamExt};
use tracing::debug;

/// ProjectsPager follows the `next.start` token of each page until the
/// service stops returning one
pub struct ProjectsPager<'a> {
    service: &'a ProjectService,
    options: ListProjectsOptions,
    next_start: Option<String>,
    has_next: bool,
}

impl<'a> ProjectsPager<'a> {
    /// The options must not carry a start token; the pager owns it
    pub fn new(service: &'a ProjectService, options: ListProjectsOptions) -> Result<Self> {
        if options.start.is_some() {
            return Err(ValidationError::InvalidField {
                field: "start",
                reason: "the pager manages the start token itself".to_string(),
            }
            .into());
        }
        options.validate()?;

        Ok(Self {
            service,
            options,
            next_start: None,
            has_next: true,
        })
    }

    pub fn has_next(&self) -> bool {
        self.has_next
    }

    /// Fetch the following page, or `None` once every page has been read
    pub async fn next_page(&mut self) -> Result<Option<Vec<Project>>> {
        if !self.has_next {
            return Ok(None);
        }

        let mut options = self.options.clone();
        options.start = self.next_start.clone();

        let list = self.service.list_projects(&options).await?.into_result();
        self.next_start = list.next_start().map(str::to_string);
        self.has_next = self.next_start.is_some();
        debug!(
            "Fetched page of {} projects (more: {})",
            list.projects.len(),
            self.has_next
        );

        Ok(Some(list.projects))
    }

    /// Fetch every remaining page
    pub async fn all(&mut self) -> Result<Vec<Project>> {
        let mut projects = Vec::new();
        while let Some(page) = self.next_page().await? {
            projects.extend(page);
        }
        Ok(projects)
    }

    /// Stream every remaining project, fetching pages lazily
    pub fn into_stream(self) -> impl Stream<Item = Result<Project>> + 'a {
        stream::try_unfold(self, |mut pager| async move {
            Ok::<_, Error>(pager.next_page().await?.map(|page| (page, pager)))
        })
        .map_ok(|page| stream::iter(page.into_iter().map(Ok::<_, Error>)))
        .try_flatten()
    }
}
