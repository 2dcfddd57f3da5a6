//! Boundary to the vendor realtime-database SDK.
//!
//! Everything network-facing lives behind [`DatabaseSdk`]: persistence,
//! writes, query-shaped listener registration, one-shot reads, and deferred
//! on-disconnect writes. The bridge never sees the wire protocol, only
//! snapshots, completion callbacks, and listener tokens.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::bridge::SdkError;
use crate::database::query::CompiledQuery;
use crate::marshal::NativeValue;

/// Read-only view of the stored value tree at a path, as delivered by the
/// data-store SDK.
#[derive(Clone, Debug)]
pub struct Snapshot {
    pub key: Option<String>,
    pub value: NativeValue,
}

impl Snapshot {
    pub fn new(key: Option<String>, value: NativeValue) -> Self {
        Self { key, value }
    }

    pub fn exists(&self) -> bool {
        !self.value.is_empty()
    }
}

/// Identifies one native listener registration for later detachment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerToken(pub u64);

/// Invoked for every snapshot a live listener delivers.
pub type SnapshotCallback = Arc<dyn Fn(Snapshot) + Send + Sync>;

/// Invoked when the SDK cancels a live listener (permission change, teardown).
pub type CancelCallback = Arc<dyn Fn(SdkError) + Send + Sync>;

/// Completion for a mutating call; `None` on success.
pub type WriteCompletion = Box<dyn FnOnce(Option<SdkError>) + Send>;

/// Completion for a one-shot read.
pub type OnceCallback = Box<dyn FnOnce(Result<Snapshot, SdkError>) + Send>;

pub trait DatabaseSdk: Send + Sync {
    fn set_persistence_enabled(&self, enabled: bool);

    fn keep_synced(&self, path: &str, enabled: bool);

    fn set(&self, path: &str, value: NativeValue, complete: WriteCompletion);

    /// Applies the children as a partial update under `path`.
    fn update(
        &self,
        path: &str,
        children: IndexMap<String, NativeValue>,
        complete: WriteCompletion,
    );

    fn remove(&self, path: &str, complete: WriteCompletion);

    /// Allocates an auto-keyed child under `path` and returns the full URL
    /// of the new reference. Allocation is local; nothing is written.
    fn push(&self, path: &str) -> String;

    /// Registers a value listener shaped by `query`. The listener fires with
    /// the current snapshot on registration and on every subsequent change
    /// until detached.
    fn attach_value_listener(
        &self,
        path: &str,
        query: &CompiledQuery,
        on_snapshot: SnapshotCallback,
        on_cancel: CancelCallback,
    ) -> ListenerToken;

    /// Registers a child listener shaped by `query`, firing once per
    /// affected child (added, changed, removed).
    fn attach_child_listener(
        &self,
        path: &str,
        query: &CompiledQuery,
        on_event: SnapshotCallback,
        on_cancel: CancelCallback,
    ) -> ListenerToken;

    fn detach(&self, path: &str, token: ListenerToken);

    /// Reads the current snapshot once; the callback fires exactly once and
    /// the registration cannot be cancelled.
    fn read_once(&self, path: &str, query: &CompiledQuery, complete: OnceCallback);

    /// Schedules a server-side write for when this client disconnects.
    fn on_disconnect_set(&self, path: &str, value: NativeValue, complete: WriteCompletion);

    /// Schedules a server-side removal for when this client disconnects.
    fn on_disconnect_remove(&self, path: &str, complete: WriteCompletion);

    /// Cancels all deferred writes registered at `path`.
    fn on_disconnect_cancel(&self, path: &str, complete: WriteCompletion);
}
