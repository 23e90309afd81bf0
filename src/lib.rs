//! Maintainer response-time reporting for community-filed GitHub issues.
//!
//! For each configured repository the analysis lists issues created since the cutoff, drops
//! those opened by maintainers, finds the first maintainer comment on the rest and checks it
//! against a two-business-day response target.

pub mod analyzer;
pub mod business_time;
pub mod config;
pub mod filter;
pub mod github;
pub mod output;
pub mod report;
pub mod source;
pub mod types;

pub use analyzer::{AnalyzerSettings, RepoAnalysis, RepoAnalyzer};
pub use config::{AnalysisCutoff, AppConfig, MaintainerSet, RepoId};
pub use filter::IssueFilter;
pub use report::{AggregateReport, ReportAggregator, ReportSink};
pub use source::{CommentSource, IssueSource, SourceError};
pub use types::{Comment, Issue, IssueResult, RepoSummary, SlaStatus};
