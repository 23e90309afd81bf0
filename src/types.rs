use crate::config::RepoId;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Login reported for issues and comments whose author account no longer exists.
pub const GHOST_LOGIN: &str = "ghost";

/// Response rate (percent) below which a repository is flagged in the run log.
pub const RESPONSE_RATE_TARGET: f64 = 90.0;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Issue {
    pub number: u64,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub author: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Comment {
    pub author_login: String,
    pub created_at: DateTime<Utc>,
}

/// Whether the first maintainer response landed within two business days.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SlaStatus {
    Yes,
    No,
}

/// One row of the per-issue report.
///
/// `first_response_time_hours` and `responded_within_sla` are either both set or both empty.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct IssueResult {
    pub repo: String,
    pub issue_number: u64,
    pub title: String,
    pub author: String,
    pub created_at: DateTime<Utc>,
    pub first_response_time_hours: Option<f64>,
    #[serde(rename = "responded_in_48_business_hours")]
    pub responded_within_sla: Option<SlaStatus>,
}

impl IssueResult {
    pub fn has_response(&self) -> bool {
        self.responded_within_sla.is_some()
    }
}

/// Per-repository roll-up of the issue rows.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RepoSummary {
    pub repo: String,
    #[serde(rename = "totalIssues")]
    pub total_issues: usize,
    pub responded: usize,
    /// Percentage formatted with two decimals, e.g. "87.50".
    #[serde(rename = "responseRate")]
    pub response_rate_percent: String,
}

impl RepoSummary {
    pub fn from_rows(repo_id: &RepoId, rows: &[IssueResult]) -> Self {
        let total_issues = rows.len();
        let responded = rows.iter().filter(|row| row.has_response()).count();

        Self {
            repo: repo_id.to_string(),
            total_issues,
            responded,
            response_rate_percent: format!("{:.2}", response_rate(responded, total_issues)),
        }
    }

    pub fn meets_target(&self) -> bool {
        response_rate(self.responded, self.total_issues) >= RESPONSE_RATE_TARGET
    }
}

/// An empty repository counts as fully responded.
fn response_rate(responded: usize, total: usize) -> f64 {
    if total == 0 {
        100.0
    } else {
        responded as f64 / total as f64 * 100.0
    }
}
