//! Per-repository response-time analysis.
//!
//! `RepoAnalyzer` walks a repository's issues newest first, keeps the community issues
//! created on or after the cutoff, fetches each one's comments and turns them into report
//! rows plus a repository summary.

use crate::config::{AnalysisCutoff, AppConfig, RepoId};
use crate::filter::IssueFilter;
use crate::source::{CommentSource, IssueSource, SourceError};
use crate::types::{Issue, IssueResult, RepoSummary};
use futures::stream::{self, StreamExt, TryStreamExt};
use std::time::Duration as StdDuration;

/// Values that shape a single repository analysis.
#[derive(Clone, Debug)]
pub struct AnalyzerSettings {
    pub cutoff: AnalysisCutoff,
    /// Deadline for each call to a data source.
    pub request_timeout: StdDuration,
    /// Maximum number of comment fetches in flight for one repository.
    pub comment_fetch_concurrency: usize,
}

impl AnalyzerSettings {
    /// Derives the settings from a validated configuration.
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let cutoff = config
            .cutoff()
            .ok_or_else(|| anyhow::anyhow!("invalid cutoff month {}", config.cutoff_month))?;

        Ok(Self {
            cutoff,
            request_timeout: config.request_timeout(),
            comment_fetch_concurrency: config.comment_fetch_concurrency,
        })
    }
}

/// Rows and summary produced for one repository.
#[derive(Clone, Debug)]
pub struct RepoAnalysis {
    pub rows: Vec<IssueResult>,
    pub summary: RepoSummary,
}

/// Analyzes one repository at a time against an issue source and a comment source.
///
/// Issue listing relies on the source returning issues newest first: pagination stops at the
/// first issue created before the cutoff. An issue that arrives out of order after that point
/// is never seen. This trades completeness under a broken ordering guarantee for not walking
/// a repository's whole history.
pub struct RepoAnalyzer<I, C> {
    issues: I,
    comments: C,
    filter: IssueFilter,
    settings: AnalyzerSettings,
}

impl<I: IssueSource, C: CommentSource> RepoAnalyzer<I, C> {
    pub fn new(issues: I, comments: C, filter: IssueFilter, settings: AnalyzerSettings) -> Self {
        Self {
            issues,
            comments,
            filter,
            settings,
        }
    }

    pub async fn analyze(&self, repo_id: &RepoId) -> Result<RepoAnalysis, SourceError> {
        let candidates = self.collect_candidates(repo_id).await?;
        tracing::debug!(repo = %repo_id, candidates = candidates.len(), "Collected community issues");

        // `buffered` yields results in input order, so rows follow the issue traversal order.
        let rows: Vec<IssueResult> = stream::iter(&candidates)
            .map(|issue| self.evaluate_issue(repo_id, issue))
            .buffered(self.settings.comment_fetch_concurrency.max(1))
            .try_collect()
            .await?;

        let summary = RepoSummary::from_rows(repo_id, &rows);
        log_summary(&summary);

        Ok(RepoAnalysis { rows, summary })
    }

    /// Pulls issues until the source runs dry or an issue predates the cutoff.
    async fn collect_candidates(&self, repo_id: &RepoId) -> Result<Vec<Issue>, SourceError> {
        let timeout = self.settings.request_timeout;
        let mut issues = self.issues.list_issues(repo_id);
        let mut candidates = Vec::new();

        loop {
            let next = tokio::time::timeout(timeout, issues.try_next())
                .await
                .map_err(|_| SourceError::timed_out("listing issues", timeout))??;

            let Some(issue) = next else {
                break;
            };

            if !self.settings.cutoff.includes(issue.created_at) {
                tracing::debug!(
                    repo = %repo_id,
                    issue = issue.number,
                    cutoff = %self.settings.cutoff,
                    "Reached issues older than the cutoff, stopping pagination"
                );
                break;
            }

            if !self.filter.is_community_issue(&issue) {
                tracing::debug!(repo = %repo_id, issue = issue.number, author = %issue.author, "Skipping maintainer issue");
                continue;
            }

            candidates.push(issue);
        }

        Ok(candidates)
    }

    async fn evaluate_issue(
        &self,
        repo_id: &RepoId,
        issue: &Issue,
    ) -> Result<IssueResult, SourceError> {
        let timeout = self.settings.request_timeout;
        let comments = tokio::time::timeout(
            timeout,
            self.comments.list_comments(repo_id, issue.number),
        )
        .await
        .map_err(|_| SourceError::timed_out("listing comments", timeout))??;

        Ok(self.filter.evaluate(repo_id, issue, &comments))
    }
}

fn log_summary(summary: &RepoSummary) {
    tracing::info!(
        repo = %summary.repo,
        total = summary.total_issues,
        responded = summary.responded,
        rate = %summary.response_rate_percent,
        "Analyzed repository"
    );

    if summary.meets_target() {
        tracing::info!(repo = %summary.repo, "Response rate meets the 90% target");
    } else {
        tracing::warn!(
            repo = %summary.repo,
            rate = %summary.response_rate_percent,
            "Response rate is below the 90% target"
        );
    }
}
