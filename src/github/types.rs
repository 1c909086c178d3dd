//! Wire types for the GitHub REST and GraphQL responses we read.

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// An issue or pull request as returned by `/orgs/{org}/issues` and
/// `/search/issues`.
#[derive(Debug, Clone, Deserialize)]
pub struct IssueItem {
    pub html_url: String,
    pub title: String,
    pub state: String,
    pub updated_at: DateTime<Utc>,
    /// Present only when the item is a pull request.
    #[serde(default)]
    pub pull_request: Option<serde_json::Value>,
}

impl IssueItem {
    pub fn is_pull_request(&self) -> bool {
        self.pull_request.is_some()
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub total_count: usize,
    #[serde(default)]
    pub items: Vec<IssueItem>,
}

#[derive(Debug, Deserialize)]
pub struct User {
    pub login: String,
}

#[derive(Debug, Deserialize)]
pub struct Review {
    pub user: Option<User>,
}

#[derive(Debug, Deserialize)]
pub struct GraphQlResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
pub struct GraphQlError {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct ProjectData {
    pub organization: Option<Organization>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    pub project_v2: Option<Project>,
}

#[derive(Debug, Deserialize)]
pub struct Project {
    pub items: ItemConnection,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemConnection {
    pub page_info: PageInfo,
    #[serde(default)]
    pub nodes: Vec<Option<ProjectItem>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub has_next_page: bool,
    pub end_cursor: Option<String>,
}

/// A board item. `status` is the single-select `Status` field; `content`
/// carries a url only for issues.
#[derive(Debug, Deserialize)]
pub struct ProjectItem {
    pub status: Option<StatusValue>,
    pub content: Option<ItemContent>,
}

#[derive(Debug, Deserialize)]
pub struct StatusValue {
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ItemContent {
    pub url: Option<String>,
}
