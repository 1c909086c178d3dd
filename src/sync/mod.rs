//! Sync reconciler: merges remote tracker facts into the local store.

pub mod cursor;
pub mod gateway;
pub mod reconciler;
pub mod tracked;

pub use cursor::CursorStore;
pub use gateway::{FactKind, FactState, RemoteFact, RemoteGateway};
pub use reconciler::{MergeOutcome, Reconciler, SyncPhase, SyncReport, merge};
pub use tracked::TrackedRef;
