//! Two-way reconciliation between the local store and a remote tracker.
//!
//! One run per source walks these phases in order:
//!
//! ```text
//! DetermineCursor → CheckRemoteDelta → PushLocal | SkipPush
//!     → FetchFacts → Merge → Persist → AdvanceCursor
//! ```
//!
//! Arbitration is by cursor: on a first run, or if any assigned issue
//! changed remotely since the last successful run, the remote wins every
//! field it owns. Otherwise
//! local completions are pushed first and local priority/state survive the
//! merge. Pull requests and review requests always take the remote side.
//! The cursor only advances after the merged store is written.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};

use crate::config::RemoteSource;
use crate::error::SyncError;
use crate::sync::cursor::CursorStore;
use crate::sync::gateway::{FactKind, FactState, RemoteFact, RemoteGateway};
use crate::sync::tracked::{TrackedRef, repo_from_url};
use crate::todos::model::{TaskRecord, keys};
use crate::todos::store::TodoStore;

/// Project tag carried by every record imported from the tracker.
pub const GITHUB_PROJECT: &str = "github";

const REVIEW_PREFIX: &str = "Review: ";

/// Phases of one reconciliation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    DetermineCursor,
    CheckRemoteDelta,
    PushLocal,
    SkipPush,
    FetchFacts,
    Merge,
    Persist,
    AdvanceCursor,
}

impl fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::DetermineCursor => "determine_cursor",
            Self::CheckRemoteDelta => "check_remote_delta",
            Self::PushLocal => "push_local",
            Self::SkipPush => "skip_push",
            Self::FetchFacts => "fetch_facts",
            Self::Merge => "merge",
            Self::Persist => "persist",
            Self::AdvanceCursor => "advance_cursor",
        };
        f.write_str(name)
    }
}

/// Summary of one completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub source: String,
    pub first_run: bool,
    pub has_remote_updates: bool,
    /// Remote issues closed because of local completions.
    pub pushed: usize,
    pub push_failures: usize,
    pub created: usize,
    pub updated: usize,
    pub cursor: DateTime<Utc>,
}

/// Result of merging facts into records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    pub records: Vec<TaskRecord>,
    pub created: usize,
    pub updated: usize,
}

/// Whether any fact changed after `cursor`. Always false on a first run.
pub fn has_remote_updates(facts: &[RemoteFact], cursor: Option<DateTime<Utc>>) -> bool {
    cursor.is_some_and(|cursor| facts.iter().any(|f| f.updated_at > cursor))
}

/// Description shown locally for a fact.
pub fn display_title(fact: &RemoteFact) -> String {
    match fact.kind {
        FactKind::ReviewRequest => format!("{REVIEW_PREFIX}{}", fact.title.trim()),
        FactKind::Issue | FactKind::PullRequest => fact.title.trim().to_string(),
    }
}

fn derived_priority(fact: &RemoteFact) -> Option<String> {
    fact.is_in_progress().then(|| "A".to_string())
}

fn backfill_repo(record: &mut TaskRecord, fact: &RemoteFact) {
    if record.labels.contains(keys::REPO) {
        return;
    }
    if let Some(repo) = repo_from_url(&fact.url) {
        record.labels.insert(keys::REPO, repo);
    }
}

/// Remote wins: title, state, priority, project tag and url.
fn apply_remote(record: &mut TaskRecord, fact: &RemoteFact, today: NaiveDate) {
    record.description = display_title(fact);

    if fact.is_closed() && !record.done {
        record.complete(today);
        // already closed remotely, nothing to push
        record.labels.insert(keys::SYNCED, "true");
    } else if !fact.is_closed() && record.done {
        record.reopen();
        record.labels.remove(keys::SYNCED);
    }

    record.priority = derived_priority(fact);
    if !record.has_project(GITHUB_PROJECT) {
        record.projects.push(GITHUB_PROJECT.to_string());
    }
    record.labels.insert(keys::URL, fact.url.clone());
    backfill_repo(record, fact);
}

/// Local wins: only the title and a missing repo are refreshed.
fn apply_local_wins(record: &mut TaskRecord, fact: &RemoteFact) {
    record.description = display_title(fact);
    backfill_repo(record, fact);
}

/// Build a new local record for an unmatched fact.
pub fn record_from_fact(fact: &RemoteFact, today: NaiveDate) -> TaskRecord {
    let mut record = TaskRecord::new(display_title(fact));
    record.priority = derived_priority(fact);
    if fact.is_closed() {
        record.complete(today);
        record.labels.insert(keys::SYNCED, "true");
    }
    record.projects.push(GITHUB_PROJECT.to_string());

    let tracked = fact.tracked();
    match (tracked.repo(), tracked.number_key(), tracked.number()) {
        (Some(repo), Some(key), Some(number)) => {
            record.labels.insert(keys::REPO, repo);
            record.labels.insert(key, number.to_string());
        }
        _ => {
            tracing::warn!(url = %fact.url, "Remote fact URL has no issue/pr shape");
            backfill_repo(&mut record, fact);
        }
    }
    record.labels.insert(keys::URL, fact.url.clone());
    record
}

/// Merge facts into the existing records.
///
/// Records are matched by the canonical URL rebuilt from their labels.
/// Existing records keep their order, unmatched ones included; new records
/// are appended in fact order.
///
/// Tracked records with no fact in this run are passed through untouched,
/// even when the issue was unassigned or its board status left the filters.
/// They are never dropped from the store; the user removes them by hand.
///
/// A closed review request only completes an existing `Review:` record; it
/// never creates one.
pub fn merge(
    records: Vec<TaskRecord>,
    facts: &[RemoteFact],
    remote_authoritative: bool,
    today: NaiveDate,
) -> MergeOutcome {
    let mut lookup: HashMap<String, usize> = records
        .iter()
        .enumerate()
        .filter_map(|(i, r)| TrackedRef::from_record(r).url().map(|url| (url, i)))
        .collect();

    let mut outcome = MergeOutcome {
        records,
        ..MergeOutcome::default()
    };

    for fact in facts {
        let existing = lookup.get(&fact.url).copied();
        match existing {
            Some(idx) => {
                let record = &mut outcome.records[idx];
                if remote_authoritative || fact.is_read_only() {
                    apply_remote(record, fact, today);
                } else {
                    apply_local_wins(record, fact);
                }
                outcome.updated += 1;
                tracing::debug!(url = %fact.url, "Updated tracked todo");
            }
            None if fact.kind == FactKind::ReviewRequest && fact.is_closed() => {
                tracing::debug!(url = %fact.url, "Skipped finished review");
            }
            None => {
                let record = record_from_fact(fact, today);
                if let Some(url) = TrackedRef::from_record(&record).url() {
                    lookup.insert(url, outcome.records.len());
                }
                tracing::debug!(url = %fact.url, "Created todo from remote");
                outcome.records.push(record);
                outcome.created += 1;
            }
        }
    }

    outcome
}

/// Drives reconciliation for configured sources.
pub struct Reconciler {
    gateway: Arc<dyn RemoteGateway>,
    store: TodoStore,
    cursors: CursorStore,
}

impl Reconciler {
    pub fn new(gateway: Arc<dyn RemoteGateway>, store: TodoStore, cursors: CursorStore) -> Self {
        Self {
            gateway,
            store,
            cursors,
        }
    }

    fn enter(&self, source: &RemoteSource, phase: SyncPhase) {
        tracing::debug!(source = %source.name, phase = %phase, "Sync phase");
    }

    /// Run one full cycle for `source`. `today` stamps completion dates.
    ///
    /// The new cursor is read from the clock once the merged store has been
    /// written, so issue closes made by this run's push are not seen as
    /// remote updates next time.
    pub async fn sync(
        &self,
        source: &RemoteSource,
        today: NaiveDate,
    ) -> Result<SyncReport, SyncError> {
        self.enter(source, SyncPhase::DetermineCursor);
        let cursor = self.cursors.get(&source.name).await?;
        let first_run = cursor.is_none();

        // the issue group is fetched once and reused for the merge
        self.enter(source, SyncPhase::CheckRemoteDelta);
        let issues = self
            .gateway
            .fetch_issues(source)
            .await
            .map_err(|error| SyncError::Fetch {
                source_name: source.name.clone(),
                group: "issues",
                error,
            })?;
        let remote_updates = has_remote_updates(&issues, cursor);
        let remote_authoritative = first_run || remote_updates;

        let mut records = self.store.load().await.map_err(SyncError::Load)?;

        let (pushed, push_failures) = if !remote_authoritative {
            self.enter(source, SyncPhase::PushLocal);
            self.push_local(&mut records).await
        } else {
            self.enter(source, SyncPhase::SkipPush);
            tracing::info!(
                source = %source.name,
                first_run,
                "Remote is authoritative for this run"
            );
            (0, 0)
        };

        self.enter(source, SyncPhase::FetchFacts);
        let mut facts = issues;
        facts.extend(self.fetch_authored(source).await?);
        facts.extend(self.fetch_reviews(source).await?);

        self.enter(source, SyncPhase::Merge);
        let outcome = merge(records, &facts, remote_authoritative, today);

        self.enter(source, SyncPhase::Persist);
        self.store
            .save(&outcome.records)
            .await
            .map_err(SyncError::Persist)?;

        self.enter(source, SyncPhase::AdvanceCursor);
        let cursor = Utc::now();
        self.cursors.set(&source.name, cursor).await?;

        tracing::info!(
            source = %source.name,
            remote_updates,
            pushed,
            created = outcome.created,
            updated = outcome.updated,
            "Sync complete"
        );

        Ok(SyncReport {
            source: source.name.clone(),
            first_run,
            has_remote_updates: remote_updates,
            pushed,
            push_failures,
            created: outcome.created,
            updated: outcome.updated,
            cursor,
        })
    }

    /// Sync every source in order, stopping at the first failure.
    pub async fn sync_all(
        &self,
        sources: &[RemoteSource],
        today: NaiveDate,
    ) -> Result<Vec<SyncReport>, SyncError> {
        let mut reports = Vec::with_capacity(sources.len());
        for source in sources {
            tracing::info!(
                source = %source.name,
                organization = %source.organization,
                project = source.project_number,
                "Syncing source"
            );
            let report = self
                .sync(source, today)
                .await
                .map_err(|e| SyncError::Source {
                    name: source.name.clone(),
                    error: Box::new(e),
                })?;
            reports.push(report);
        }
        Ok(reports)
    }

    /// Close remote issues for locally completed records. Returns
    /// (closed, failed). Failed records stay unsynced for the next run.
    async fn push_local(&self, records: &mut [TaskRecord]) -> (usize, usize) {
        let mut pushed = 0;
        let mut failed = 0;

        for record in records.iter_mut().filter(|r| r.done && !r.is_synced()) {
            let tracked = TrackedRef::from_record(record);
            if !tracked.is_issue() {
                continue;
            }
            match self.gateway.close_issue(&tracked).await {
                Ok(()) => {
                    record.labels.insert(keys::SYNCED, "true");
                    pushed += 1;
                    tracing::info!(issue = %tracked, "Closed remote issue");
                }
                Err(e) => {
                    failed += 1;
                    tracing::warn!(
                        issue = %tracked,
                        description = %record.description,
                        error = %e,
                        "Failed to close remote issue"
                    );
                }
            }
        }

        (pushed, failed)
    }

    async fn fetch_authored(&self, source: &RemoteSource) -> Result<Vec<RemoteFact>, SyncError> {
        self.gateway
            .fetch_authored_prs(source)
            .await
            .map_err(|error| SyncError::Fetch {
                source_name: source.name.clone(),
                group: "authored pull requests",
                error,
            })
    }

    /// Review requests, with those the user already reviewed marked closed so
    /// the matching local task completes. A failed lookup skips that request
    /// for this run.
    ///
    /// Only open pull requests are searched: a review task whose pull request
    /// was merged or closed before the user reviewed it is closed by hand.
    async fn fetch_reviews(&self, source: &RemoteSource) -> Result<Vec<RemoteFact>, SyncError> {
        let requests = self
            .gateway
            .fetch_review_requests(source)
            .await
            .map_err(|error| SyncError::Fetch {
                source_name: source.name.clone(),
                group: "review requests",
                error,
            })?;

        let mut pending = Vec::with_capacity(requests.len());
        for fact in requests {
            match self.gateway.is_still_requested_reviewer(&fact.tracked()).await {
                Ok(true) => pending.push(fact),
                Ok(false) => {
                    tracing::debug!(url = %fact.url, "Review already submitted");
                    pending.push(RemoteFact {
                        state: FactState::Closed,
                        ..fact
                    });
                }
                Err(e) => {
                    tracing::warn!(url = %fact.url, error = %e, "Review lookup failed");
                }
            }
        }
        Ok(pending)
    }
}
