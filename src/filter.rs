//! Scoping rules for issues and the choice of the first maintainer response.

use crate::business_time::{business_days_between, SLA_BUSINESS_DAYS};
use crate::config::{MaintainerSet, RepoId};
use crate::types::{Comment, Issue, IssueResult, SlaStatus};

const SECONDS_PER_HOUR: f64 = 3600.0;

#[derive(Clone, Debug)]
pub struct IssueFilter {
    maintainers: MaintainerSet,
}

impl IssueFilter {
    pub fn new(maintainers: MaintainerSet) -> Self {
        Self { maintainers }
    }

    /// Issues opened by maintainers are not community reports.
    pub fn is_community_issue(&self, issue: &Issue) -> bool {
        !self.maintainers.contains(&issue.author)
    }

    /// Returns the first comment written by a maintainer other than the issue author.
    ///
    /// Comments are taken in the order given; they are expected oldest first.
    pub fn first_maintainer_response<'c>(
        &self,
        issue: &Issue,
        comments: &'c [Comment],
    ) -> Option<&'c Comment> {
        comments.iter().find(|comment| {
            comment.author_login != issue.author && self.maintainers.contains(&comment.author_login)
        })
    }

    /// Builds the report row for a community issue from its comments.
    pub fn evaluate(&self, repo_id: &RepoId, issue: &Issue, comments: &[Comment]) -> IssueResult {
        let response = self.first_maintainer_response(issue, comments);

        let (hours, sla) = match response {
            Some(comment) => {
                let elapsed = (comment.created_at - issue.created_at).num_seconds().max(0);
                let hours = round_hundredths(elapsed as f64 / SECONDS_PER_HOUR);
                (Some(hours), Some(classify_sla(issue, comment)))
            }
            None => (None, None),
        };

        IssueResult {
            repo: repo_id.to_string(),
            issue_number: issue.number,
            title: issue.title.clone(),
            author: issue.author.clone(),
            created_at: issue.created_at,
            first_response_time_hours: hours,
            responded_within_sla: sla,
        }
    }
}

fn classify_sla(issue: &Issue, response: &Comment) -> SlaStatus {
    if business_days_between(issue.created_at, response.created_at) <= SLA_BUSINESS_DAYS {
        SlaStatus::Yes
    } else {
        SlaStatus::No
    }
}

fn round_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
