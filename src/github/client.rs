//! GitHub-backed [`RemoteGateway`].
//!
//! REST for issues, pull request search, closing and reviews; GraphQL for
//! the project board `Status` of each assigned issue.

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::RequestBuilder;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tokio::sync::OnceCell;

use crate::config::{GitHubConfig, RemoteSource};
use crate::error::GatewayError;
use crate::github::types::{
    GraphQlResponse, IssueItem, ProjectData, ProjectItem, Review, SearchResponse, User,
};
use crate::sync::gateway::{FactKind, FactState, RemoteFact, RemoteGateway};
use crate::sync::tracked::TrackedRef;

const PER_PAGE: usize = 100;
const MAX_PAGES: usize = 20;
const USER_AGENT: &str = "taskline";
const API_VERSION: &str = "2022-11-28";

const PROJECT_STATUS_QUERY: &str = r#"
query($org: String!, $number: Int!, $cursor: String) {
  organization(login: $org) {
    projectV2(number: $number) {
      items(first: 100, after: $cursor) {
        pageInfo { hasNextPage endCursor }
        nodes {
          status: fieldValueByName(name: "Status") {
            ... on ProjectV2ItemFieldSingleSelectValue { name }
          }
          content { ... on Issue { url } }
        }
      }
    }
  }
}
"#;

/// GitHub REST + GraphQL client acting as the sync gateway.
pub struct GitHubGateway {
    client: reqwest::Client,
    api_url: String,
    token: SecretString,
    login: OnceCell<String>,
}

impl GitHubGateway {
    pub fn new(config: &GitHubConfig, token: SecretString) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| GatewayError::RequestFailed {
                operation: "build http client".into(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            token,
            login: OnceCell::new(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.api_url)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .bearer_auth(self.token.expose_secret())
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION)
    }

    /// Send and check the status, returning the raw response.
    async fn send(
        &self,
        operation: &str,
        request: RequestBuilder,
    ) -> Result<reqwest::Response, GatewayError> {
        let resp = self
            .authorized(request)
            .send()
            .await
            .map_err(|e| GatewayError::RequestFailed {
                operation: operation.to_string(),
                reason: e.to_string(),
            })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(GatewayError::Http {
                operation: operation.to_string(),
                status,
                body,
            });
        }
        Ok(resp)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        operation: &str,
        request: RequestBuilder,
    ) -> Result<T, GatewayError> {
        self.send(operation, request)
            .await?
            .json::<T>()
            .await
            .map_err(|e| GatewayError::InvalidResponse {
                operation: operation.to_string(),
                reason: e.to_string(),
            })
    }

    /// Login of the token's user, fetched once.
    async fn login(&self) -> Result<&str, GatewayError> {
        let login = self
            .login
            .get_or_try_init(|| async {
                let user: User = self
                    .send_json("get current user", self.client.get(self.url("/user")))
                    .await?;
                Ok::<_, GatewayError>(user.login)
            })
            .await?;
        Ok(login.as_str())
    }

    /// Open and closed issues in the organization assigned to the user.
    async fn assigned_issues(&self, organization: &str) -> Result<Vec<IssueItem>, GatewayError> {
        let mut issues = Vec::new();
        for state in ["open", "closed"] {
            let operation = format!("list {state} assigned issues in {organization}");
            let mut complete = false;
            for page in 1..=MAX_PAGES {
                let per_page = PER_PAGE.to_string();
                let page = page.to_string();
                let request = self
                    .client
                    .get(self.url(&format!("/orgs/{organization}/issues")))
                    .query(&[
                        ("filter", "assigned"),
                        ("state", state),
                        ("per_page", per_page.as_str()),
                        ("page", page.as_str()),
                    ]);
                let batch: Vec<IssueItem> = self.send_json(&operation, request).await?;
                let last = batch.len() < PER_PAGE;
                issues.extend(batch.into_iter().filter(|i| !i.is_pull_request()));
                if last {
                    complete = true;
                    break;
                }
            }
            if !complete {
                tracing::warn!(
                    organization,
                    state,
                    max_pages = MAX_PAGES,
                    "Assigned issue listing truncated at page limit"
                );
            }
        }
        tracing::debug!(organization, count = issues.len(), "Fetched assigned issues");
        Ok(issues)
    }

    /// Board status of every issue on the project, keyed by issue URL.
    async fn project_statuses(
        &self,
        source: &RemoteSource,
    ) -> Result<HashMap<String, String>, GatewayError> {
        let operation = format!(
            "query project {} in {}",
            source.project_number, source.organization
        );
        let mut statuses = HashMap::new();
        let mut cursor: Option<String> = None;

        for page in 1..=MAX_PAGES {
            let body = serde_json::json!({
                "query": PROJECT_STATUS_QUERY,
                "variables": {
                    "org": source.organization,
                    "number": source.project_number,
                    "cursor": cursor,
                }
            });
            let request = self.client.post(self.url("/graphql")).json(&body);
            let resp: GraphQlResponse<ProjectData> = self.send_json(&operation, request).await?;

            if let Some(error) = resp.errors.first() {
                return Err(GatewayError::InvalidResponse {
                    operation,
                    reason: error.message.clone(),
                });
            }
            let items = resp
                .data
                .and_then(|d| d.organization)
                .and_then(|o| o.project_v2)
                .map(|p| p.items)
                .ok_or_else(|| GatewayError::InvalidResponse {
                    operation: operation.clone(),
                    reason: "project not found".into(),
                })?;

            statuses.extend(status_entries(items.nodes.into_iter().flatten()));

            if !items.page_info.has_next_page {
                break;
            }
            if page == MAX_PAGES {
                tracing::warn!(
                    organization = %source.organization,
                    project = source.project_number,
                    max_pages = MAX_PAGES,
                    "Project board listing truncated at page limit"
                );
            }
            cursor = items.page_info.end_cursor;
        }
        Ok(statuses)
    }

    async fn search(
        &self,
        operation: &str,
        query: String,
        kind: FactKind,
    ) -> Result<Vec<RemoteFact>, GatewayError> {
        let per_page = PER_PAGE.to_string();
        let request = self.client.get(self.url("/search/issues")).query(&[
            ("q", query.as_str()),
            ("sort", "updated"),
            ("per_page", per_page.as_str()),
        ]);
        let resp: SearchResponse = self.send_json(operation, request).await?;
        if search_truncated(&resp) {
            tracing::warn!(
                query = %query,
                total = resp.total_count,
                returned = resp.items.len(),
                "Search results truncated to the first page"
            );
        }
        Ok(resp
            .items
            .into_iter()
            .filter(IssueItem::is_pull_request)
            .map(|item| fact_from_item(item, kind, None))
            .collect())
    }
}

/// Whether the search matched more items than one page returned.
fn search_truncated(resp: &SearchResponse) -> bool {
    resp.total_count > resp.items.len()
}

/// (issue url, status name) pairs for board items that are issues with a status.
fn status_entries(items: impl Iterator<Item = ProjectItem>) -> impl Iterator<Item = (String, String)> {
    items.filter_map(|item| {
        let url = item.content?.url?;
        let status = item.status?.name?;
        Some((url, status))
    })
}

fn fact_state(state: &str) -> FactState {
    if state.eq_ignore_ascii_case("closed") {
        FactState::Closed
    } else {
        FactState::Open
    }
}

fn fact_from_item(item: IssueItem, kind: FactKind, status: Option<String>) -> RemoteFact {
    RemoteFact {
        state: fact_state(&item.state),
        url: item.html_url,
        title: item.title,
        updated_at: item.updated_at,
        status,
        kind,
    }
}

/// Keep assigned issues whose board status passes the source's filters.
fn issues_with_status(
    issues: Vec<IssueItem>,
    statuses: &HashMap<String, String>,
    source: &RemoteSource,
) -> Vec<RemoteFact> {
    issues
        .into_iter()
        .filter_map(|issue| {
            let status = statuses.get(&issue.html_url)?;
            source
                .matches_status(status)
                .then(|| fact_from_item(issue, FactKind::Issue, Some(status.clone())))
        })
        .collect()
}

fn authored_query(organization: &str) -> String {
    format!("is:pr author:@me org:{organization}")
}

fn review_query(organization: &str) -> String {
    format!("is:pr is:open review-requested:@me org:{organization}")
}

#[async_trait]
impl RemoteGateway for GitHubGateway {
    async fn fetch_issues(&self, source: &RemoteSource) -> Result<Vec<RemoteFact>, GatewayError> {
        let assigned = self.assigned_issues(&source.organization).await?;
        if assigned.is_empty() {
            return Ok(Vec::new());
        }
        let statuses = self.project_statuses(source).await?;
        let facts = issues_with_status(assigned, &statuses, source);
        tracing::info!(
            source = %source.name,
            count = facts.len(),
            "Assigned issues matching status filters"
        );
        Ok(facts)
    }

    async fn fetch_authored_prs(
        &self,
        source: &RemoteSource,
    ) -> Result<Vec<RemoteFact>, GatewayError> {
        self.search(
            "search authored pull requests",
            authored_query(&source.organization),
            FactKind::PullRequest,
        )
        .await
    }

    async fn fetch_review_requests(
        &self,
        source: &RemoteSource,
    ) -> Result<Vec<RemoteFact>, GatewayError> {
        self.search(
            "search review requests",
            review_query(&source.organization),
            FactKind::ReviewRequest,
        )
        .await
    }

    async fn close_issue(&self, issue: &TrackedRef) -> Result<(), GatewayError> {
        let TrackedRef::Issue { repo, number } = issue else {
            return Err(GatewayError::Untracked(issue.to_string()));
        };
        let request = self
            .client
            .patch(self.url(&format!("/repos/{repo}/issues/{number}")))
            .json(&serde_json::json!({ "state": "closed" }));
        self.send(&format!("close issue {issue}"), request).await?;
        Ok(())
    }

    async fn is_still_requested_reviewer(&self, pr: &TrackedRef) -> Result<bool, GatewayError> {
        let TrackedRef::PullRequest { repo, number } = pr else {
            return Err(GatewayError::Untracked(pr.to_string()));
        };
        let login = self.login().await?;
        let request = self
            .client
            .get(self.url(&format!("/repos/{repo}/pulls/{number}/reviews")))
            .query(&[("per_page", PER_PAGE.to_string())]);
        let reviews: Vec<Review> = self
            .send_json(&format!("list reviews on {pr}"), request)
            .await?;
        Ok(!reviews
            .iter()
            .filter_map(|r| r.user.as_ref())
            .any(|u| u.login.eq_ignore_ascii_case(login)))
    }
}
