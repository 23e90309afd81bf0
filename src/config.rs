//! Application configuration and environment variable parsing.
//!
//! This module handles loading configuration settings from the environment (e.g., .env file).
//! It defines the `AppConfig` struct which governs the repositories to analyze, the set of
//! maintainer logins, the analysis cutoff and the output locations.

use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;
use std::time::Duration as StdDuration;

/// A unique identifier for a GitHub repository.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RepoId {
    /// The owner of the repository (e.g., "facebook").
    pub owner: String,
    /// The name of the repository (e.g., "react").
    pub repo: String,
}

impl RepoId {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
        }
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

/// Logins whose issues are not community reports and whose comments count as responses.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MaintainerSet(HashSet<String>);

impl MaintainerSet {
    pub fn contains(&self, login: &str) -> bool {
        self.0.contains(login)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for MaintainerSet {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// The earliest month whose issues are included in the analysis.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AnalysisCutoff {
    pub year: i32,
    /// Zero-based month (January is 0).
    pub month_index: u32,
}

impl AnalysisCutoff {
    /// Builds a cutoff from a calendar month (1-12).
    pub fn from_calendar_month(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then(|| Self {
            year,
            month_index: month - 1,
        })
    }

    /// First instant (UTC) that is inside the analysis window.
    pub fn boundary(&self) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(self.year, self.month_index + 1, 1, 0, 0, 0)
            .single()
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    pub fn includes(&self, created_at: DateTime<Utc>) -> bool {
        created_at >= self.boundary()
    }
}

impl fmt::Display for AnalysisCutoff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month_index + 1)
    }
}

/// Application configuration loaded from environment variables.
#[derive(Clone, Debug, Deserialize)]
pub struct AppConfig {
    /// GitHub Personal Access Token used for every API call.
    pub github_token: String,

    /// Repositories to analyze, in report order.
    /// Expected format: comma-separated string of "owner/repo" pairs.
    /// Example: "facebook/react,rust-lang/rust"
    #[serde(deserialize_with = "deserialize_repositories")]
    pub repositories: Vec<RepoId>,

    /// Comma-separated maintainer logins.
    #[serde(deserialize_with = "deserialize_maintainers")]
    pub maintainers: MaintainerSet,

    /// Year of the analysis cutoff.
    pub cutoff_year: i32,

    /// Calendar month (1-12) of the analysis cutoff.
    pub cutoff_month: u32,

    /// Deadline for a single call to the GitHub API, in seconds.
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,

    /// Maximum number of concurrent comment fetches within one repository.
    #[serde(default = "default_comment_fetch_concurrency")]
    pub comment_fetch_concurrency: usize,

    /// Keep going with the remaining repositories when one of them fails to load.
    #[serde(default)]
    pub skip_failed_repos: bool,

    #[serde(default = "default_issues_csv_path")]
    pub issues_csv_path: String,

    #[serde(default = "default_summary_csv_path")]
    pub summary_csv_path: String,
}

fn default_request_timeout_seconds() -> u64 {
    30
}

fn default_comment_fetch_concurrency() -> usize {
    4
}

fn default_issues_csv_path() -> String {
    "issue_response_times.csv".to_string()
}

fn default_summary_csv_path() -> String {
    "repo_summaries.csv".to_string()
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        envy::from_env()
    }

    /// Checks the values that deserialization alone cannot reject.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.github_token.trim().is_empty() {
            anyhow::bail!("GITHUB_TOKEN must not be empty");
        }
        if self.repositories.is_empty() {
            anyhow::bail!("REPOSITORIES must contain at least one owner/repo pair");
        }
        if self.maintainers.is_empty() {
            anyhow::bail!("MAINTAINERS must contain at least one login");
        }
        if self.cutoff().is_none() {
            anyhow::bail!(
                "CUTOFF_MONTH must be between 1 and 12, got {}",
                self.cutoff_month
            );
        }
        if self.request_timeout_seconds == 0 {
            anyhow::bail!("REQUEST_TIMEOUT_SECONDS must be at least 1");
        }
        Ok(())
    }

    pub fn cutoff(&self) -> Option<AnalysisCutoff> {
        AnalysisCutoff::from_calendar_month(self.cutoff_year, self.cutoff_month)
    }

    pub fn request_timeout(&self) -> StdDuration {
        StdDuration::from_secs(self.request_timeout_seconds)
    }
}

fn deserialize_repositories<'de, D>(deserializer: D) -> Result<Vec<RepoId>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    Ok(parse_repositories(&s))
}

fn parse_repositories(s: &str) -> Vec<RepoId> {
    s.split(',')
        .filter_map(|part| {
            let parts: Vec<&str> = part.trim().split('/').collect();
            match parts.as_slice() {
                [owner, repo] if !owner.trim().is_empty() && !repo.trim().is_empty() => {
                    Some(RepoId::new(owner.trim(), repo.trim()))
                }
                _ => None,
            }
        })
        .collect()
}

fn deserialize_maintainers<'de, D>(deserializer: D) -> Result<MaintainerSet, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    Ok(parse_maintainers(&s))
}

fn parse_maintainers(s: &str) -> MaintainerSet {
    s.split(',')
        .map(str::trim)
        .filter(|login| !login.is_empty())
        .collect()
}
