// API client for the GitHub search endpoint plus host reachability polling
pub mod github;
pub mod reachability;

// Re-export common types
pub use github::{GitHubClient, GitHubError, GitHubOwner, GitHubRepo, SearchParams, SearchResponse};
pub use reachability::{Reachability, ReachabilityMonitor};
