// Remote feed - bridges the GitHub search client with the DataSource contract
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use stargazer_api::{GitHubClient, GitHubRepo, SearchParams};
use tracing::debug;

use crate::{
    models::{Owner, Page, RepositoryRecord, TimeWindow},
    source::DataSource,
    Result,
};

/// Fixed page size for the trending feed
pub const PAGE_SIZE: u32 = 10;

/// GitHub search never serves more than the first 1000 results
pub const SEARCH_RESULT_CAP: u32 = 1000;

/// Repositories created inside a time window, most starred first
pub struct RemoteSource {
    client: GitHubClient,
}

impl RemoteSource {
    pub fn new(token: Option<String>) -> Self {
        Self {
            client: GitHubClient::new(token),
        }
    }

    pub fn with_client(client: GitHubClient) -> Self {
        Self { client }
    }
}

/// Build the search request for one page of a window
pub fn search_params(window: TimeWindow, page_no: u32, now: DateTime<Utc>) -> SearchParams {
    SearchParams::by_stars(window.created_qualifier(now), page_no, PAGE_SIZE)
}

#[async_trait]
impl DataSource for RemoteSource {
    async fn fetch(&self, window: Option<TimeWindow>, page_no: Option<u32>) -> Result<Page> {
        let params = search_params(window.unwrap_or_default(), page_no.unwrap_or(0), Utc::now());
        let response = self.client.search_repositories(&params).await?;

        debug!(
            "Remote page {} returned {} of {} repositories",
            params.page,
            response.items.len(),
            response.total_count
        );

        Ok(Page {
            total_count: response.total_count.min(SEARCH_RESULT_CAP),
            items: response.items.into_iter().map(github_to_record).collect(),
        })
    }
}

/// Convert GitHub API repo to our record
fn github_to_record(gh: GitHubRepo) -> RepositoryRecord {
    RepositoryRecord {
        id: gh.id,
        name: gh.name,
        description: gh.description,
        language: gh.language,
        star_count: gh.stargazers_count,
        fork_count: gh.forks_count,
        url_path: gh.html_url,
        created_at: gh.created_at,
        owner: Owner {
            name: gh.owner.login,
            avatar_url: gh.owner.avatar_url,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_search_params_for_window() {
        let now = Utc.with_ymd_and_hms(2024, 5, 8, 9, 30, 0).unwrap();
        let params = search_params(TimeWindow::LastWeek, 3, now);

        assert_eq!(params.query, "created:>2024-05-01");
        assert_eq!(params.page, 3);
        assert_eq!(params.per_page, PAGE_SIZE);
        assert_eq!(params.sort, "stars");
        assert_eq!(params.order, "desc");
    }

    #[test]
    fn test_github_to_record_maps_owner() {
        let gh: GitHubRepo = serde_json::from_value(serde_json::json!({
            "id": 5,
            "name": "zed",
            "description": "editor",
            "language": "Rust",
            "stargazers_count": 10,
            "forks_count": 2,
            "html_url": "https://github.com/zed-industries/zed",
            "created_at": "2024-05-01T00:00:00Z",
            "owner": { "login": "zed-industries", "avatar_url": null }
        }))
        .unwrap();

        let record = github_to_record(gh);
        assert_eq!(record.id, 5);
        assert_eq!(record.full_name(), "zed-industries/zed");
        assert_eq!(record.star_count, 10);
        assert!(record.owner.avatar_url.is_none());
    }
}
