//! GitHub-backed issue and comment sources.
//!
//! Both sources go through the GraphQL API so that issues can be walked newest first with
//! cursor pagination, and so that deleted accounts surface as a missing author rather than
//! an error.

use crate::config::RepoId;
use crate::source::{CommentSource, IssueSource, SourceError};
use crate::types::{Comment, Issue, GHOST_LOGIN};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use octocrab::Octocrab;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration as StdDuration;

const PAGE_SIZE: u32 = 100;

const VIEWER_QUERY: &str = "query { viewer { login } }";

const ISSUES_QUERY: &str = r#"
query($owner: String!, $name: String!, $first: Int!, $cursor: String) {
  repository(owner: $owner, name: $name) {
    issues(first: $first, after: $cursor, orderBy: {field: CREATED_AT, direction: DESC}) {
      nodes { number title createdAt author { login } }
      pageInfo { hasNextPage endCursor }
    }
  }
}"#;

const COMMENTS_QUERY: &str = r#"
query($owner: String!, $name: String!, $number: Int!, $first: Int!, $cursor: String) {
  repository(owner: $owner, name: $name) {
    issue(number: $number) {
      comments(first: $first, after: $cursor) {
        nodes { createdAt author { login } }
        pageInfo { hasNextPage endCursor }
      }
    }
  }
}"#;

#[derive(Clone)]
pub struct GitHubClient {
    octocrab: Octocrab,
}

impl GitHubClient {
    pub fn new(token: String) -> anyhow::Result<Self> {
        Ok(Self {
            octocrab: Octocrab::builder().personal_token(token).build()?,
        })
    }

    /// Resolves the login behind the configured token.
    ///
    /// Run once before any analysis so that a bad token stops the process early.
    pub async fn verify_credentials(&self, deadline: StdDuration) -> Result<String, SourceError> {
        let data: ViewerData = tokio::time::timeout(deadline, self.query(VIEWER_QUERY, json!({})))
            .await
            .map_err(|_| SourceError::timed_out("verifying credentials", deadline))??;
        Ok(data.viewer.login)
    }

    async fn query<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<T, SourceError> {
        let response: GraphQlResponse<T> = self
            .octocrab
            .graphql(&json!({ "query": query, "variables": variables }))
            .await
            .map_err(classify_error)?;

        response.into_data()
    }

    async fn fetch_issue_page(
        &self,
        repo_id: &RepoId,
        cursor: Option<String>,
    ) -> Result<Page<Issue>, SourceError> {
        let data: RepositoryData<IssuesNode> = self
            .query(
                ISSUES_QUERY,
                json!({
                    "owner": repo_id.owner,
                    "name": repo_id.repo,
                    "first": PAGE_SIZE,
                    "cursor": cursor,
                }),
            )
            .await?;

        let repository = data
            .repository
            .ok_or_else(|| SourceError::transport(format!("repository {repo_id} not found")))?;

        Ok(repository.issues.into_page(IssueNode::into_issue))
    }

    async fn fetch_comment_page(
        &self,
        repo_id: &RepoId,
        issue_number: u64,
        cursor: Option<String>,
    ) -> Result<Page<Comment>, SourceError> {
        let data: RepositoryData<IssueCommentsNode> = self
            .query(
                COMMENTS_QUERY,
                json!({
                    "owner": repo_id.owner,
                    "name": repo_id.repo,
                    "number": issue_number,
                    "first": PAGE_SIZE,
                    "cursor": cursor,
                }),
            )
            .await?;

        let issue = data
            .repository
            .and_then(|repository| repository.issue)
            .ok_or_else(|| {
                SourceError::transport(format!("issue {repo_id}#{issue_number} not found"))
            })?;

        Ok(issue.comments.into_page(CommentNode::into_comment))
    }
}

impl IssueSource for GitHubClient {
    fn list_issues<'a>(&'a self, repo_id: &'a RepoId) -> BoxStream<'a, Result<Issue, SourceError>> {
        stream::try_unfold(Cursor::Start, move |cursor| async move {
            let after = match cursor {
                Cursor::Exhausted => return Ok(None),
                Cursor::Start => None,
                Cursor::After(after) => Some(after),
            };

            let page = self.fetch_issue_page(repo_id, after).await?;
            tracing::debug!(repo = %repo_id, count = page.items.len(), "Fetched issue page");

            Ok::<_, SourceError>(Some((page.items, page.next)))
        })
        .map_ok(|issues| stream::iter(issues.into_iter().map(Ok::<_, SourceError>)))
        .try_flatten()
        .boxed()
    }
}

#[async_trait]
impl CommentSource for GitHubClient {
    async fn list_comments(
        &self,
        repo_id: &RepoId,
        issue_number: u64,
    ) -> Result<Vec<Comment>, SourceError> {
        let mut comments = Vec::new();
        let mut cursor = None;

        loop {
            let page = self.fetch_comment_page(repo_id, issue_number, cursor).await?;
            comments.extend(page.items);

            match page.next {
                Cursor::After(after) => cursor = Some(after),
                Cursor::Start | Cursor::Exhausted => break,
            }
        }

        Ok(comments)
    }
}

/// Maps octocrab failures onto the two error kinds the analysis distinguishes.
///
/// A 401 is an auth failure whatever its wording. GitHub's own message is kept in the
/// diagnostic since octocrab's `Display` for API errors carries none of it.
fn classify_error(error: octocrab::Error) -> SourceError {
    match &error {
        octocrab::Error::GitHub { source, .. } => {
            let diagnostic = format!("{} ({})", source.message, source.status_code);
            if source.status_code.as_u16() == 401 || mentions_bad_credentials(&source.message) {
                SourceError::auth(diagnostic)
            } else {
                SourceError::transport(diagnostic)
            }
        }
        _ => SourceError::transport(error.to_string()),
    }
}

fn mentions_bad_credentials(message: &str) -> bool {
    let message = message.to_lowercase();
    message.contains("bad credentials") || message.contains("requires authentication")
}

enum Cursor {
    Start,
    After(String),
    Exhausted,
}

struct Page<T> {
    items: Vec<T>,
    next: Cursor,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

impl<T> GraphQlResponse<T> {
    fn into_data(self) -> Result<T, SourceError> {
        if !self.errors.is_empty() {
            let messages: Vec<&str> = self.errors.iter().map(|e| e.message.as_str()).collect();
            return Err(SourceError::transport(messages.join("; ")));
        }

        self.data
            .ok_or_else(|| SourceError::transport("GraphQL response carried no data"))
    }
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ViewerData {
    viewer: Actor,
}

#[derive(Debug, Deserialize)]
struct Actor {
    login: String,
}

fn login_or_ghost(author: Option<Actor>) -> String {
    author
        .map(|actor| actor.login)
        .unwrap_or_else(|| GHOST_LOGIN.to_string())
}

#[derive(Debug, Deserialize)]
struct RepositoryData<T> {
    repository: Option<T>,
}

#[derive(Debug, Deserialize)]
struct IssuesNode {
    issues: Connection<IssueNode>,
}

#[derive(Debug, Deserialize)]
struct IssueCommentsNode {
    issue: Option<CommentsNode>,
}

#[derive(Debug, Deserialize)]
struct CommentsNode {
    comments: Connection<CommentNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Connection<T> {
    nodes: Vec<T>,
    page_info: PageInfo,
}

impl<T> Connection<T> {
    fn into_page<U>(self, convert: impl Fn(T) -> U) -> Page<U> {
        let next = match self.page_info {
            PageInfo {
                has_next_page: true,
                end_cursor: Some(cursor),
            } => Cursor::After(cursor),
            _ => Cursor::Exhausted,
        };

        Page {
            items: self.nodes.into_iter().map(convert).collect(),
            next,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    has_next_page: bool,
    end_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IssueNode {
    number: u64,
    title: String,
    created_at: DateTime<Utc>,
    author: Option<Actor>,
}

impl IssueNode {
    fn into_issue(self) -> Issue {
        Issue {
            number: self.number,
            title: self.title,
            created_at: self.created_at,
            author: login_or_ghost(self.author),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentNode {
    created_at: DateTime<Utc>,
    author: Option<Actor>,
}

impl CommentNode {
    fn into_comment(self) -> Comment {
        Comment {
            author_login: login_or_ghost(self.author),
            created_at: self.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    /// Starts a local HTTP server that answers every request with the same response.
    async fn serve_canned(status_line: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                tokio::spawn(async move {
                    read_request(&mut socket).await;
                    let response = format!(
                        "HTTP/1.1 {status_line}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                        body.len()
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        format!("http://{addr}")
    }

    /// Starts a local server that accepts connections and never answers.
    async fn serve_silence() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let mut open = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                open.push(socket);
            }
        });

        format!("http://{addr}")
    }

    async fn read_request(socket: &mut TcpStream) {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];

        loop {
            let n = match socket.read(&mut chunk).await {
                Ok(0) | Err(_) => return,
                Ok(n) => n,
            };
            buf.extend_from_slice(&chunk[..n]);

            if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                let headers = String::from_utf8_lossy(&buf[..end]).to_lowercase();
                let length = headers
                    .lines()
                    .find_map(|line| line.strip_prefix("content-length:"))
                    .and_then(|value| value.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= end + 4 + length {
                    return;
                }
            }
        }
    }

    fn client_for(base_uri: &str) -> GitHubClient {
        GitHubClient {
            octocrab: Octocrab::builder()
                .base_uri(base_uri)
                .unwrap()
                .personal_token("ghp_test".to_string())
                .build()
                .unwrap(),
        }
    }

    const DEADLINE: StdDuration = StdDuration::from_secs(10);

    #[tokio::test]
    async fn test_verify_credentials_returns_viewer_login() {
        let base = serve_canned("200 OK", r#"{"data":{"viewer":{"login":"octocat"}}}"#).await;
        let login = client_for(&base).verify_credentials(DEADLINE).await.unwrap();
        assert_eq!(login, "octocat");
    }

    #[tokio::test]
    async fn test_unauthorized_is_auth_error_whatever_the_wording() {
        let base = serve_canned(
            "401 Unauthorized",
            r#"{"message":"This endpoint requires you to be authenticated."}"#,
        )
        .await;

        let err = client_for(&base).verify_credentials(DEADLINE).await.unwrap_err();

        assert!(err.is_auth());
        assert!(err.to_string().contains("requires you to be authenticated"));
    }

    #[tokio::test]
    async fn test_rate_limit_keeps_github_message() {
        let base = serve_canned(
            "403 Forbidden",
            r#"{"message":"API rate limit exceeded for user ID 1."}"#,
        )
        .await;

        let err = client_for(&base).verify_credentials(DEADLINE).await.unwrap_err();

        assert!(!err.is_auth());
        let diagnostic = err.to_string();
        assert!(diagnostic.contains("rate limit"), "{diagnostic}");
        assert!(diagnostic.contains("403"), "{diagnostic}");
    }

    #[tokio::test]
    async fn test_silent_server_times_out_as_transport_error() {
        let base = serve_silence().await;

        let err = client_for(&base)
            .verify_credentials(StdDuration::from_millis(100))
            .await
            .unwrap_err();

        assert!(matches!(err, SourceError::Transport { .. }));
        assert!(err.to_string().contains("timed out"));
    }

    #[test]
    fn test_issue_page_parses_ghost_author_and_cursor() {
        let body = json!({
            "data": {
                "repository": {
                    "issues": {
                        "nodes": [
                            {
                                "number": 12,
                                "title": "Build fails on Windows",
                                "createdAt": "2024-02-05T10:30:00Z",
                                "author": { "login": "carol" }
                            },
                            {
                                "number": 11,
                                "title": "Typo in README",
                                "createdAt": "2024-02-01T08:00:00Z",
                                "author": null
                            }
                        ],
                        "pageInfo": { "hasNextPage": true, "endCursor": "Y3Vyc29yOjEx" }
                    }
                }
            }
        });

        let response: GraphQlResponse<RepositoryData<IssuesNode>> =
            serde_json::from_value(body).unwrap();
        let page = response
            .into_data()
            .unwrap()
            .repository
            .unwrap()
            .issues
            .into_page(IssueNode::into_issue);

        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].author, "carol");
        assert_eq!(
            page.items[0].created_at,
            Utc.with_ymd_and_hms(2024, 2, 5, 10, 30, 0).unwrap()
        );
        assert_eq!(page.items[1].author, GHOST_LOGIN);
        assert!(matches!(page.next, Cursor::After(ref c) if c == "Y3Vyc29yOjEx"));
    }

    #[test]
    fn test_last_comment_page_is_exhausted() {
        let body = json!({
            "data": {
                "repository": {
                    "issue": {
                        "comments": {
                            "nodes": [
                                { "createdAt": "2024-02-05T12:00:00Z", "author": { "login": "alice" } }
                            ],
                            "pageInfo": { "hasNextPage": false, "endCursor": "abc" }
                        }
                    }
                }
            }
        });

        let response: GraphQlResponse<RepositoryData<IssueCommentsNode>> =
            serde_json::from_value(body).unwrap();
        let page = response
            .into_data()
            .unwrap()
            .repository
            .and_then(|r| r.issue)
            .unwrap()
            .comments
            .into_page(CommentNode::into_comment);

        assert_eq!(page.items[0].author_login, "alice");
        assert!(matches!(page.next, Cursor::Exhausted));
    }

    #[test]
    fn test_graphql_errors_become_transport_errors() {
        let body = json!({
            "data": { "repository": null },
            "errors": [
                { "message": "Could not resolve to a Repository with the name 'owner/missing'." }
            ]
        });

        let response: GraphQlResponse<RepositoryData<IssuesNode>> =
            serde_json::from_value(body).unwrap();
        let err = response.into_data().unwrap_err();

        assert!(!err.is_auth());
        assert!(err.to_string().contains("Could not resolve"));
    }
}
