//! Integration tests for the sync reconciler.
//!
//! A stub gateway serves canned facts and records every close request; the
//! store and cursor file live in a temp directory.

use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use taskline::config::RemoteSource;
use taskline::error::{GatewayError, SyncError};
use taskline::sync::{
    CursorStore, FactKind, FactState, Reconciler, RemoteFact, RemoteGateway, TrackedRef,
};
use taskline::todos::TodoStore;

/// Stub gateway (no network).
#[derive(Default)]
struct StubGateway {
    issues: Vec<RemoteFact>,
    prs: Vec<RemoteFact>,
    reviews: Vec<RemoteFact>,
    /// Review request URLs the user has already reviewed.
    reviewed: HashSet<String>,
    /// Issue refs whose close request fails.
    failing_closes: HashSet<String>,
    /// Source names whose issue fetch fails.
    failing_sources: HashSet<String>,
    /// Close requests with the time the remote applied them.
    closed: Mutex<Vec<(TrackedRef, DateTime<Utc>)>>,
}

impl StubGateway {
    fn closed(&self) -> Vec<String> {
        self.closed
            .lock()
            .unwrap()
            .iter()
            .map(|(t, _)| t.to_string())
            .collect()
    }
}

#[async_trait]
impl RemoteGateway for StubGateway {
    async fn fetch_issues(&self, source: &RemoteSource) -> Result<Vec<RemoteFact>, GatewayError> {
        if self.failing_sources.contains(&source.name) {
            return Err(GatewayError::RequestFailed {
                operation: "list issues".into(),
                reason: "connection refused".into(),
            });
        }
        // closes bump the issue's updated_at, as GitHub does
        let closed = self.closed.lock().unwrap();
        Ok(self
            .issues
            .iter()
            .cloned()
            .map(|mut fact| {
                if let Some((_, when)) = closed.iter().find(|(t, _)| t.url() == Some(fact.url.clone())) {
                    fact.state = FactState::Closed;
                    fact.updated_at = *when;
                }
                fact
            })
            .collect())
    }

    async fn fetch_authored_prs(
        &self,
        _source: &RemoteSource,
    ) -> Result<Vec<RemoteFact>, GatewayError> {
        Ok(self.prs.clone())
    }

    async fn fetch_review_requests(
        &self,
        _source: &RemoteSource,
    ) -> Result<Vec<RemoteFact>, GatewayError> {
        Ok(self.reviews.clone())
    }

    async fn close_issue(&self, issue: &TrackedRef) -> Result<(), GatewayError> {
        if self.failing_closes.contains(&issue.to_string()) {
            return Err(GatewayError::Http {
                operation: format!("close issue {issue}"),
                status: 502,
                body: "bad gateway".into(),
            });
        }
        self.closed.lock().unwrap().push((issue.clone(), Utc::now()));
        Ok(())
    }

    async fn is_still_requested_reviewer(&self, pr: &TrackedRef) -> Result<bool, GatewayError> {
        let url = pr.url().unwrap_or_default();
        Ok(!self.reviewed.contains(&url))
    }
}

fn at(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 15, hour, 0, 0).unwrap()
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()
}

fn source(name: &str) -> RemoteSource {
    RemoteSource {
        name: name.into(),
        organization: "acme".into(),
        project_number: 7,
        status_filters: vec!["In Progress".into(), "Planned".into()],
    }
}

fn issue(number: u64, title: &str, status: &str, state: FactState, updated: u32) -> RemoteFact {
    RemoteFact {
        url: format!("https://github.com/acme/app/issues/{number}"),
        title: title.into(),
        state,
        updated_at: at(updated),
        status: Some(status.into()),
        kind: FactKind::Issue,
    }
}

fn pull(number: u64, title: &str, kind: FactKind) -> RemoteFact {
    RemoteFact {
        url: format!("https://github.com/acme/app/pull/{number}"),
        title: title.into(),
        state: FactState::Open,
        updated_at: at(6),
        status: None,
        kind,
    }
}

struct Fixture {
    _tmp: tempfile::TempDir,
    store: TodoStore,
    cursors: CursorStore,
}

impl Fixture {
    fn new(active: &str, done: &str) -> Self {
        let tmp = tempfile::tempdir().unwrap();
        let store = TodoStore::new(tmp.path().join("todo"));
        std::fs::create_dir_all(store.dir()).unwrap();
        write(&store.active_path(), active);
        write(&store.done_path(), done);
        let cursors = CursorStore::in_dir(tmp.path());
        Self {
            _tmp: tmp,
            store,
            cursors,
        }
    }

    fn reconciler(&self, gateway: Arc<StubGateway>) -> Reconciler {
        Reconciler::new(gateway, self.store.clone(), self.cursors.clone())
    }

    fn active(&self) -> String {
        std::fs::read_to_string(self.store.active_path()).unwrap()
    }

    fn done(&self) -> String {
        std::fs::read_to_string(self.store.done_path()).unwrap()
    }
}

fn write(path: &Path, content: &str) {
    if !content.is_empty() {
        std::fs::write(path, content).unwrap();
    }
}

#[tokio::test]
async fn first_run_never_pushes_and_remote_wins() {
    let fx = Fixture::new(
        "(A) Fix login +github repo:acme/app issue:1\n",
        "x 2025-06-10 Old work +github repo:acme/app issue:2\n",
    );
    let gateway = Arc::new(StubGateway {
        issues: vec![
            issue(1, "Fix login flow", "Planned", FactState::Open, 8),
            issue(2, "Old work", "Planned", FactState::Open, 8),
        ],
        ..StubGateway::default()
    });

    let started = Utc::now();
    let report = fx.reconciler(gateway.clone()).sync(&source("work"), today()).await.unwrap();

    assert!(report.first_run);
    assert_eq!(report.pushed, 0);
    assert!(gateway.closed().is_empty());
    // remote reopened #2 and cleared the local priority on #1
    assert_eq!(
        fx.active(),
        "Fix login flow +github repo:acme/app issue:1 url:https://github.com/acme/app/issues/1\n\
         Old work +github repo:acme/app issue:2 url:https://github.com/acme/app/issues/2\n"
    );
    assert_eq!(fx.done(), "");
    // cursor taken after the store was written
    let cursor = fx.cursors.get("work").await.unwrap().unwrap();
    assert!(cursor >= started);
    assert_eq!(report.cursor, cursor);
}

#[tokio::test]
async fn quiet_remote_pushes_completions_and_keeps_local_priority() {
    let fx = Fixture::new(
        "(A) Fix login +github repo:acme/app issue:2\nBuy milk @store\n",
        "x 2025-06-15 Ship it +github repo:acme/app issue:1\n",
    );
    fx.cursors.set("work", at(10)).await.unwrap();
    let gateway = Arc::new(StubGateway {
        issues: vec![
            issue(1, "Ship it", "In Progress", FactState::Open, 8),
            issue(2, "Fix login", "Planned", FactState::Open, 8),
        ],
        ..StubGateway::default()
    });

    let report = fx.reconciler(gateway.clone()).sync(&source("work"), today()).await.unwrap();

    assert!(!report.has_remote_updates);
    assert_eq!(report.pushed, 1);
    assert_eq!(gateway.closed(), vec!["acme/app#1"]);
    assert_eq!(
        fx.active(),
        "(A) Fix login +github repo:acme/app issue:2\nBuy milk @store\n"
    );
    assert_eq!(
        fx.done(),
        "x 2025-06-15 Ship it +github repo:acme/app issue:1 synced:true\n"
    );
}

#[tokio::test]
async fn remote_updates_override_local_and_skip_push() {
    let fx = Fixture::new(
        "(A) Fix login +github repo:acme/app issue:2\n",
        "x 2025-06-14 Ship it +github repo:acme/app issue:1\n",
    );
    fx.cursors.set("work", at(7)).await.unwrap();
    let gateway = Arc::new(StubGateway {
        issues: vec![issue(2, "Fix login", "Planned", FactState::Open, 8)],
        ..StubGateway::default()
    });

    let report = fx.reconciler(gateway.clone()).sync(&source("work"), today()).await.unwrap();

    assert!(report.has_remote_updates);
    assert!(gateway.closed().is_empty());
    assert_eq!(
        fx.active(),
        "Fix login +github repo:acme/app issue:2 url:https://github.com/acme/app/issues/2\n"
    );
    // unmatched tracked record passes through untouched
    assert_eq!(fx.done(), "x 2025-06-14 Ship it +github repo:acme/app issue:1\n");
}

#[tokio::test]
async fn failed_close_is_retried_next_run() {
    let fx = Fixture::new("", "x 2025-06-15 Ship it +github repo:acme/app issue:1\n");
    fx.cursors.set("work", at(10)).await.unwrap();

    let flaky = Arc::new(StubGateway {
        failing_closes: ["acme/app#1".to_string()].into_iter().collect(),
        ..StubGateway::default()
    });
    let report = fx.reconciler(flaky).sync(&source("work"), today()).await.unwrap();
    assert_eq!(report.push_failures, 1);
    assert_eq!(fx.done(), "x 2025-06-15 Ship it +github repo:acme/app issue:1\n");

    let healthy = Arc::new(StubGateway::default());
    let report = fx.reconciler(healthy.clone()).sync(&source("work"), today()).await.unwrap();
    assert_eq!(report.pushed, 1);
    assert_eq!(healthy.closed(), vec!["acme/app#1"]);
    assert!(fx.done().contains("synced:true"));
}

#[tokio::test]
async fn pull_requests_never_closed_remotely() {
    let fx = Fixture::new("", "x 2025-06-15 Add cache +github repo:acme/app pr:5\n");
    fx.cursors.set("work", at(10)).await.unwrap();
    let gateway = Arc::new(StubGateway::default());

    let report = fx.reconciler(gateway.clone()).sync(&source("work"), today()).await.unwrap();
    assert_eq!(report.pushed, 0);
    assert!(gateway.closed().is_empty());
}

#[tokio::test]
async fn pull_requests_and_reviews_imported() {
    let fx = Fixture::new("", "");
    fx.cursors.set("work", at(10)).await.unwrap();
    let gateway = Arc::new(StubGateway {
        prs: vec![pull(7, "Add cache", FactKind::PullRequest)],
        reviews: vec![
            pull(9, "Refactor auth", FactKind::ReviewRequest),
            pull(11, "Bump deps", FactKind::ReviewRequest),
        ],
        reviewed: ["https://github.com/acme/app/pull/11".to_string()]
            .into_iter()
            .collect(),
        ..StubGateway::default()
    });

    let report = fx.reconciler(gateway).sync(&source("work"), today()).await.unwrap();
    assert_eq!(report.created, 2);
    assert_eq!(
        fx.active(),
        "Add cache +github repo:acme/app pr:7 url:https://github.com/acme/app/pull/7\n\
         Review: Refactor auth +github repo:acme/app pr:9 url:https://github.com/acme/app/pull/9\n"
    );

    // a second identical run updates instead of duplicating
    let again = Arc::new(StubGateway {
        prs: vec![pull(7, "Add cache", FactKind::PullRequest)],
        reviews: vec![pull(9, "Refactor auth", FactKind::ReviewRequest)],
        ..StubGateway::default()
    });
    let report = fx.reconciler(again).sync(&source("work"), today()).await.unwrap();
    assert_eq!(report.created, 0);
    assert_eq!(report.updated, 2);
    assert_eq!(fx.active().lines().count(), 2);
}

#[tokio::test]
async fn fetch_failure_leaves_store_and_cursor() {
    let fx = Fixture::new("x 2025-06-15 Ship it repo:acme/app issue:1\n", "");
    let gateway = Arc::new(StubGateway {
        failing_sources: ["work".to_string()].into_iter().collect(),
        ..StubGateway::default()
    });

    let err = fx.reconciler(gateway).sync(&source("work"), today()).await.unwrap_err();
    assert!(matches!(err, SyncError::Fetch { group: "issues", .. }));
    assert!(fx.cursors.get("work").await.unwrap().is_none());
    assert_eq!(fx.active(), "x 2025-06-15 Ship it repo:acme/app issue:1\n");
}

#[tokio::test]
async fn sync_all_stops_at_first_failure() {
    let fx = Fixture::new("Buy milk\n", "");
    let gateway = Arc::new(StubGateway {
        failing_sources: ["broken".to_string()].into_iter().collect(),
        ..StubGateway::default()
    });
    let sources = vec![source("work"), source("broken"), source("oss")];

    let err = fx
        .reconciler(gateway)
        .sync_all(&sources, today())
        .await
        .unwrap_err();

    assert!(matches!(&err, SyncError::Source { name, .. } if name == "broken"));
    assert!(fx.cursors.get("work").await.unwrap().is_some());
    assert!(fx.cursors.get("oss").await.unwrap().is_none());
}

#[tokio::test]
async fn own_pushed_close_is_not_a_remote_update() {
    let fx = Fixture::new(
        "Fix login +github repo:acme/app issue:2\n",
        "x 2025-06-15 Ship it +github repo:acme/app issue:1\n",
    );
    fx.cursors.set("work", at(10)).await.unwrap();
    let gateway = Arc::new(StubGateway {
        issues: vec![
            issue(1, "Ship it", "In Progress", FactState::Open, 8),
            issue(2, "Fix login", "Planned", FactState::Open, 8),
        ],
        ..StubGateway::default()
    });

    let first = fx.reconciler(gateway.clone()).sync(&source("work"), today()).await.unwrap();
    assert_eq!(first.pushed, 1);

    // user raises the priority of #2 between runs
    std::fs::write(
        fx.store.active_path(),
        "(A) Fix login +github repo:acme/app issue:2\n",
    )
    .unwrap();

    let second = fx.reconciler(gateway.clone()).sync(&source("work"), today()).await.unwrap();
    assert!(!second.has_remote_updates);
    assert_eq!(second.pushed, 0);
    assert_eq!(fx.active(), "(A) Fix login +github repo:acme/app issue:2\n");
    assert_eq!(gateway.closed(), vec!["acme/app#1"]);
}

#[tokio::test]
async fn submitted_review_completes_local_task() {
    let fx = Fixture::new(
        "Review: Refactor auth +github repo:acme/app pr:9\n",
        "",
    );
    fx.cursors.set("work", at(10)).await.unwrap();
    let gateway = Arc::new(StubGateway {
        reviews: vec![pull(9, "Refactor auth", FactKind::ReviewRequest)],
        reviewed: ["https://github.com/acme/app/pull/9".to_string()]
            .into_iter()
            .collect(),
        ..StubGateway::default()
    });

    let report = fx.reconciler(gateway).sync(&source("work"), today()).await.unwrap();
    assert_eq!(report.created, 0);
    assert_eq!(fx.active(), "");
    assert_eq!(
        fx.done(),
        "x 2025-06-15 Review: Refactor auth +github repo:acme/app pr:9 \
         url:https://github.com/acme/app/pull/9 synced:true\n"
    );
}
