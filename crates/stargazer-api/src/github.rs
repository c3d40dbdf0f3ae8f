// GitHub search API client
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

const GITHUB_API_BASE: &str = "https://api.github.com";
const SEARCH_PATH: &str = "/search/repositories";
const DEFAULT_TIMEOUT_SECS: u64 = 15;

#[derive(Error, Debug)]
pub enum GitHubError {
    #[error("API request failed: {0}")]
    RequestFailed(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Request timed out")]
    Timeout,

    #[error("Network error: {0}")]
    NetworkError(#[source] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    ParseError(#[from] serde_json::Error),
}

impl From<reqwest::Error> for GitHubError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GitHubError::Timeout
        } else {
            GitHubError::NetworkError(err)
        }
    }
}

pub type Result<T> = std::result::Result<T, GitHubError>;

/// One repository as returned by `/search/repositories`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubRepo {
    pub id: u64,
    pub name: String,
    pub description: Option<String>,
    pub language: Option<String>,
    pub stargazers_count: u32,
    pub forks_count: u32,
    pub html_url: String,
    pub created_at: DateTime<Utc>,
    pub owner: GitHubOwner,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubOwner {
    pub login: String,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    pub total_count: u32,
    #[serde(default)]
    pub incomplete_results: bool,
    pub items: Vec<GitHubRepo>,
}

/// Query string for a repository search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchParams {
    /// Free-text search qualifier, e.g. `created:>2024-01-01`
    pub query: String,
    pub page: u32,
    pub per_page: u32,
    pub sort: String,
    pub order: String,
}

impl SearchParams {
    /// Stars descending, which is how the trending feed is ranked
    pub fn by_stars(query: impl Into<String>, page: u32, per_page: u32) -> Self {
        Self {
            query: query.into(),
            page,
            per_page,
            sort: "stars".to_string(),
            order: "desc".to_string(),
        }
    }

    pub fn as_query(&self) -> Vec<(&'static str, String)> {
        vec![
            ("q", self.query.clone()),
            ("page", self.page.to_string()),
            ("per_page", self.per_page.to_string()),
            ("sort", self.sort.clone()),
            ("order", self.order.clone()),
        ]
    }
}

pub struct GitHubClient {
    client: reqwest::Client,
    token: Option<String>,
    base_url: String,
}

impl GitHubClient {
    pub fn new(token: Option<String>) -> Self {
        Self::with_base_url(
            token,
            GITHUB_API_BASE.to_string(),
            Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        )
    }

    /// For GitHub Enterprise or a local test server
    pub fn with_base_url(token: Option<String>, base_url: String, timeout: Duration) -> Self {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static("Stargazer/0.1.0"),
        );
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/vnd.github+json"),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            token,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Run one page of a repository search
    pub async fn search_repositories(&self, params: &SearchParams) -> Result<SearchResponse> {
        let url = format!("{}{}", self.base_url, SEARCH_PATH);
        debug!(
            "GET {} q={} page={} per_page={}",
            url, params.query, params.page, params.per_page
        );

        let mut request = self.client.get(&url).query(&params.as_query());
        if let Some(ref token) = self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();

        if is_rate_limited(&response) {
            warn!("GitHub rate limit hit ({})", status);
            return Err(GitHubError::RateLimitExceeded);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GitHubError::RequestFailed(format!(
                "Status {}: {}",
                status, body
            )));
        }

        // Read the body first so a malformed payload is reported as a parse error
        let body = response.text().await?;
        let parsed: SearchResponse = serde_json::from_str(&body)?;

        if parsed.incomplete_results {
            debug!("GitHub reported incomplete results for q={}", params.query);
        }

        Ok(parsed)
    }
}

fn is_rate_limited(response: &reqwest::Response) -> bool {
    let status = response.status();
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return true;
    }

    status == reqwest::StatusCode::FORBIDDEN
        && response
            .headers()
            .get("x-ratelimit-remaining")
            .and_then(|v| v.to_str().ok())
            == Some("0")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_params_query_pairs() {
        let params = SearchParams::by_stars("created:>2024-05-01", 2, 10);
        let pairs = params.as_query();

        assert_eq!(pairs[0], ("q", "created:>2024-05-01".to_string()));
        assert_eq!(pairs[1], ("page", "2".to_string()));
        assert_eq!(pairs[2], ("per_page", "10".to_string()));
        assert_eq!(pairs[3], ("sort", "stars".to_string()));
        assert_eq!(pairs[4], ("order", "desc".to_string()));
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let client = GitHubClient::with_base_url(
            None,
            "http://localhost:9999/".to_string(),
            Duration::from_secs(1),
        );
        assert_eq!(client.base_url(), "http://localhost:9999");
    }

    #[test]
    fn test_search_response_parses_github_payload() {
        let json = r#"{
            "total_count": 2,
            "incomplete_results": false,
            "items": [{
                "id": 42,
                "name": "ferris",
                "description": null,
                "language": "Rust",
                "stargazers_count": 120,
                "forks_count": 3,
                "html_url": "https://github.com/crab/ferris",
                "created_at": "2024-05-01T10:00:00Z",
                "owner": { "login": "crab", "avatar_url": "https://avatars.example/crab" }
            }]
        }"#;

        let parsed: SearchResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.total_count, 2);
        assert_eq!(parsed.items.len(), 1);
        assert_eq!(parsed.items[0].owner.login, "crab");
        assert!(parsed.items[0].description.is_none());
    }
}
