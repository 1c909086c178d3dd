//! Remote gateway seam.
//!
//! The reconciler only sees normalized [`RemoteFact`]s; authentication and
//! transport belong to the implementation (see `crate::github`).

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::config::RemoteSource;
use crate::error::GatewayError;
use crate::sync::tracked::TrackedRef;

/// Open/closed state of a remote item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FactState {
    Open,
    Closed,
}

/// Which fact group an item came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FactKind {
    Issue,
    PullRequest,
    ReviewRequest,
}

/// A normalized snapshot of one remote issue or pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFact {
    pub url: String,
    pub title: String,
    pub state: FactState,
    pub updated_at: DateTime<Utc>,
    /// Project board status, e.g. "In Progress".
    pub status: Option<String>,
    pub kind: FactKind,
}

impl RemoteFact {
    pub fn tracked(&self) -> TrackedRef {
        TrackedRef::from_url(&self.url)
    }

    pub fn is_closed(&self) -> bool {
        self.state == FactState::Closed
    }

    /// Pull requests and review requests are never edited locally.
    pub fn is_read_only(&self) -> bool {
        matches!(self.kind, FactKind::PullRequest | FactKind::ReviewRequest)
    }

    /// Whether the board status marks this item as actively worked on.
    pub fn is_in_progress(&self) -> bool {
        self.status
            .as_deref()
            .is_some_and(|s| s.eq_ignore_ascii_case("In Progress"))
    }
}

/// Access to a remote issue/PR tracker for one configured source.
#[async_trait]
pub trait RemoteGateway: Send + Sync {
    /// Issues assigned to the user whose board status matches the source's filters.
    async fn fetch_issues(&self, source: &RemoteSource) -> Result<Vec<RemoteFact>, GatewayError>;

    /// Pull requests authored by the user.
    async fn fetch_authored_prs(&self, source: &RemoteSource)
    -> Result<Vec<RemoteFact>, GatewayError>;

    /// Pull requests where the user was asked for a review.
    async fn fetch_review_requests(
        &self,
        source: &RemoteSource,
    ) -> Result<Vec<RemoteFact>, GatewayError>;

    /// Close the remote issue.
    async fn close_issue(&self, issue: &TrackedRef) -> Result<(), GatewayError>;

    /// False once the user has submitted a review on the pull request.
    async fn is_still_requested_reviewer(&self, pr: &TrackedRef) -> Result<bool, GatewayError>;
}
