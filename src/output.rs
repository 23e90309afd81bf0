//! Console table and CSV files for the final report.

use crate::report::ReportSink;
use crate::types::{IssueResult, RepoSummary};
use anyhow::Context;
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

pub const ISSUE_COLUMNS: [&str; 7] = [
    "repo",
    "issue_number",
    "title",
    "author",
    "created_at",
    "first_response_time_hours",
    "responded_in_48_business_hours",
];

pub const SUMMARY_COLUMNS: [&str; 4] = ["repo", "totalIssues", "responded", "responseRate"];

/// Prints the summary table and writes both CSV files.
pub struct ConsoleCsvSink {
    issues_path: PathBuf,
    summary_path: PathBuf,
}

impl ConsoleCsvSink {
    pub fn new(issues_path: impl Into<PathBuf>, summary_path: impl Into<PathBuf>) -> Self {
        Self {
            issues_path: issues_path.into(),
            summary_path: summary_path.into(),
        }
    }
}

impl ReportSink for ConsoleCsvSink {
    fn present(&self, rows: &[IssueResult], summaries: &[RepoSummary]) -> anyhow::Result<()> {
        print!("{}", render_summary_table(summaries));

        let file = File::create(&self.issues_path)
            .with_context(|| format!("failed to create {}", self.issues_path.display()))?;
        write_csv(file, &ISSUE_COLUMNS, rows)
            .with_context(|| format!("failed to write {}", self.issues_path.display()))?;

        let file = File::create(&self.summary_path)
            .with_context(|| format!("failed to create {}", self.summary_path.display()))?;
        write_csv(file, &SUMMARY_COLUMNS, summaries)
            .with_context(|| format!("failed to write {}", self.summary_path.display()))?;

        tracing::info!(
            issues = %self.issues_path.display(),
            summary = %self.summary_path.display(),
            "Wrote report files"
        );

        Ok(())
    }
}

/// Writes `records` as CSV with an explicit header, so an empty report still has one.
pub fn write_csv<W: Write, T: Serialize>(
    writer: W,
    header: &[&str],
    records: &[T],
) -> anyhow::Result<()> {
    let mut csv = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);

    csv.write_record(header)?;
    for record in records {
        csv.serialize(record)?;
    }
    csv.flush()?;

    Ok(())
}

pub fn render_summary_table(summaries: &[RepoSummary]) -> String {
    let width = summaries
        .iter()
        .map(|s| s.repo.len())
        .max()
        .unwrap_or(0)
        .max("Repository".len());

    let mut out = format!(
        "{:<width$}  {:>6}  {:>9}  {:>7}\n",
        "Repository", "Total", "Responded", "Rate"
    );
    out.push_str(&format!("{}\n", "-".repeat(width + 30)));

    for summary in summaries {
        out.push_str(&format!(
            "{:<width$}  {:>6}  {:>9}  {:>6}%\n",
            summary.repo, summary.total_issues, summary.responded, summary.response_rate_percent
        ));
    }

    out
}
