//! Runs the analysis over every configured repository and hands the results to a sink.

use crate::analyzer::RepoAnalyzer;
use crate::config::RepoId;
use crate::source::{CommentSource, IssueSource, SourceError};
use crate::types::{IssueResult, RepoSummary};

/// Presents the collected rows and summaries (console, files, ...).
pub trait ReportSink {
    fn present(&self, rows: &[IssueResult], summaries: &[RepoSummary]) -> anyhow::Result<()>;
}

/// Everything produced by one run, in configured repository order.
#[derive(Clone, Debug, Default)]
pub struct AggregateReport {
    pub rows: Vec<IssueResult>,
    pub summaries: Vec<RepoSummary>,
    /// Repositories left out because they failed and skipping was enabled.
    pub failed: Vec<RepoId>,
}

impl AggregateReport {
    pub fn present(&self, sink: &dyn ReportSink) -> anyhow::Result<()> {
        sink.present(&self.rows, &self.summaries)
    }
}

pub struct ReportAggregator<I, C> {
    analyzer: RepoAnalyzer<I, C>,
    skip_failed_repos: bool,
}

impl<I: IssueSource, C: CommentSource> ReportAggregator<I, C> {
    pub fn new(analyzer: RepoAnalyzer<I, C>) -> Self {
        Self {
            analyzer,
            skip_failed_repos: false,
        }
    }

    /// Continue with the remaining repositories when one fails with a transport error.
    ///
    /// Authentication failures still abort the run.
    pub fn skip_failed_repos(mut self, skip: bool) -> Self {
        self.skip_failed_repos = skip;
        self
    }

    /// Analyzes the repositories one after another.
    pub async fn run(&self, repos: &[RepoId]) -> Result<AggregateReport, SourceError> {
        let mut report = AggregateReport::default();

        for repo_id in repos {
            tracing::info!(repo = %repo_id, "Analyzing repository");

            match self.analyzer.analyze(repo_id).await {
                Ok(analysis) => {
                    report.rows.extend(analysis.rows);
                    report.summaries.push(analysis.summary);
                }
                Err(e) if self.skip_failed_repos && !e.is_auth() => {
                    tracing::error!(repo = %repo_id, "Skipping repository: {}", e);
                    report.failed.push(repo_id.clone());
                }
                Err(e) => return Err(e),
            }
        }

        tracing::info!(
            repos = report.summaries.len(),
            rows = report.rows.len(),
            failed = report.failed.len(),
            "Finished analysis"
        );

        Ok(report)
    }

    /// Runs the analysis and passes the result to `sink`.
    pub async fn run_and_present(
        &self,
        repos: &[RepoId],
        sink: &dyn ReportSink,
    ) -> anyhow::Result<AggregateReport> {
        let report = self.run(repos).await?;
        report.present(sink)?;
        Ok(report)
    }
}
