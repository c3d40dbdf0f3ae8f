use chrono::{DateTime, Months, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// One remote repository
///
/// Serialized with GitHub's field names so the persisted favorites list reads
/// like a slice of a search response. Two records are equal when their ids are.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryRecord {
    pub id: u64,
    pub name: String,
    pub description: Option<String>,
    pub language: Option<String>,
    #[serde(rename = "stargazers_count")]
    pub star_count: u32,
    #[serde(rename = "forks_count")]
    pub fork_count: u32,
    #[serde(rename = "html_url")]
    pub url_path: String,
    pub created_at: DateTime<Utc>,
    pub owner: Owner,
}

impl PartialEq for RepositoryRecord {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for RepositoryRecord {}

impl Hash for RepositoryRecord {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl RepositoryRecord {
    /// `owner/name`, the way GitHub shows it
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner.name, self.name)
    }

    pub fn matches_filter(&self, needle_lowercase: &str) -> bool {
        self.name.to_lowercase().contains(needle_lowercase)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    #[serde(rename = "login")]
    pub name: String,
    #[serde(rename = "avatar_url")]
    pub avatar_url: Option<String>,
}

/// One fetch worth of records
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    pub total_count: u32,
    pub items: Vec<RepositoryRecord>,
}

impl Page {
    /// A page that holds the complete set, as the favorites store returns it
    pub fn complete(items: Vec<RepositoryRecord>) -> Self {
        Self {
            total_count: items.len() as u32,
            items,
        }
    }
}

/// Recency bound for the remote query
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeWindow {
    #[default]
    #[serde(rename = "day")]
    LastDay,
    #[serde(rename = "week")]
    LastWeek,
    #[serde(rename = "month")]
    LastMonth,
}

impl TimeWindow {
    pub fn all() -> [TimeWindow; 3] {
        [TimeWindow::LastDay, TimeWindow::LastWeek, TimeWindow::LastMonth]
    }

    pub fn title(&self) -> &'static str {
        match self {
            TimeWindow::LastDay => "Last Day",
            TimeWindow::LastWeek => "Last Week",
            TimeWindow::LastMonth => "Last Month",
        }
    }

    /// Lower bound on creation time, relative to `now`
    pub fn since(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            TimeWindow::LastDay => now - TimeDelta::days(1),
            TimeWindow::LastWeek => now - TimeDelta::days(7),
            // Calendar month; falls back to 30 days if the date can't be represented
            TimeWindow::LastMonth => now
                .checked_sub_months(Months::new(1))
                .unwrap_or_else(|| now - TimeDelta::days(30)),
        }
    }

    /// Search qualifier such as `created:>2024-05-01`
    pub fn created_qualifier(&self, now: DateTime<Utc>) -> String {
        format!("created:>{}", self.since(now).format("%Y-%m-%d"))
    }

    /// The window after this one, wrapping around
    pub fn next(&self) -> TimeWindow {
        match self {
            TimeWindow::LastDay => TimeWindow::LastWeek,
            TimeWindow::LastWeek => TimeWindow::LastMonth,
            TimeWindow::LastMonth => TimeWindow::LastDay,
        }
    }
}

impl FromStr for TimeWindow {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "day" | "last-day" | "daily" => Ok(TimeWindow::LastDay),
            "week" | "last-week" | "weekly" => Ok(TimeWindow::LastWeek),
            "month" | "last-month" | "monthly" => Ok(TimeWindow::LastMonth),
            other => Err(format!("unknown time window '{}', expected day, week or month", other)),
        }
    }
}

impl std::fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.title())
    }
}

/// Which set feeds the list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Mode {
    #[default]
    Browsing,
    Favoriting,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RequestStatus {
    #[default]
    Loading,
    Success,
    Failed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Connectivity {
    #[default]
    Online,
    Offline,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(id: u64, name: &str) -> RepositoryRecord {
        RepositoryRecord {
            id,
            name: name.to_string(),
            description: None,
            language: None,
            star_count: 0,
            fork_count: 0,
            url_path: format!("https://github.com/octo/{}", name),
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap(),
            owner: Owner {
                name: "octo".to_string(),
                avatar_url: None,
            },
        }
    }

    #[test]
    fn test_equality_is_by_id_only() {
        let a = record(7, "alpha");
        let mut b = record(7, "renamed");
        b.star_count = 99;
        assert_eq!(a, b);
        assert_ne!(a, record(8, "alpha"));
    }

    #[test]
    fn test_time_window_qualifiers() {
        let now = Utc.with_ymd_and_hms(2024, 3, 31, 12, 0, 0).unwrap();

        assert_eq!(TimeWindow::LastDay.created_qualifier(now), "created:>2024-03-30");
        assert_eq!(TimeWindow::LastWeek.created_qualifier(now), "created:>2024-03-24");
        // Feb has no 31st, chrono clamps to the last day of the month
        assert_eq!(TimeWindow::LastMonth.created_qualifier(now), "created:>2024-02-29");
    }

    #[test]
    fn test_time_window_parse() {
        assert_eq!("week".parse::<TimeWindow>().unwrap(), TimeWindow::LastWeek);
        assert_eq!("Monthly".parse::<TimeWindow>().unwrap(), TimeWindow::LastMonth);
        assert!("year".parse::<TimeWindow>().is_err());
    }

    #[test]
    fn test_record_serializes_with_github_names() {
        let json = serde_json::to_value(record(1, "alpha")).unwrap();
        assert_eq!(json["stargazers_count"], 0);
        assert_eq!(json["html_url"], "https://github.com/octo/alpha");
        assert_eq!(json["owner"]["login"], "octo");
    }

    #[test]
    fn test_filter_is_case_insensitive() {
        let r = record(1, "RipGrep");
        assert!(r.matches_filter("grep"));
        assert!(!r.matches_filter("fd"));
    }
}
