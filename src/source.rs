//! Ports through which the analysis reads issues and comments.

use crate::config::RepoId;
use crate::types::{Comment, Issue};
use async_trait::async_trait;
use futures::stream::BoxStream;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    /// Missing or rejected credentials. Always fatal.
    #[error("GitHub authentication failed: {message}")]
    Auth { message: String },

    /// The data source could not be reached or returned an unusable answer.
    #[error("GitHub request failed: {message}")]
    Transport { message: String },
}

impl SourceError {
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// A call that outlived its deadline is reported as a transport failure.
    pub fn timed_out(what: &str, deadline: Duration) -> Self {
        Self::transport(format!("{what} timed out after {}s", deadline.as_secs()))
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth { .. })
    }
}

/// Lists a repository's issues, newest first.
///
/// The stream must be lazy: pages are requested only as the consumer pulls, and dropping
/// the stream stops pagination.
pub trait IssueSource: Send + Sync {
    fn list_issues<'a>(&'a self, repo_id: &'a RepoId) -> BoxStream<'a, Result<Issue, SourceError>>;
}

/// Lists the comments on one issue, oldest first.
#[async_trait]
pub trait CommentSource: Send + Sync {
    async fn list_comments(
        &self,
        repo_id: &RepoId,
        issue_number: u64,
    ) -> Result<Vec<Comment>, SourceError>;
}
