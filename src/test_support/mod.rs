//! Shared fakes for the crate's unit tests.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use indexmap::IndexMap;
use serde_json::Value;

use crate::bridge::{EventSink, ModuleCallback};
use crate::database::sdk::{
    CancelCallback, DatabaseSdk, ListenerToken, OnceCallback, Snapshot, SnapshotCallback,
    WriteCompletion,
};
use crate::database::CompiledQuery;
use crate::marshal::NativeValue;

/// Captures emitted `(tag, payload)` pairs for assertions.
pub struct RecordingEventSink {
    emitted: Mutex<Vec<(String, Value)>>,
}

impl RecordingEventSink {
    pub fn new() -> Self {
        Self {
            emitted: Mutex::new(Vec::new()),
        }
    }

    /// Drains and returns everything emitted so far.
    pub fn take(&self) -> Vec<(String, Value)> {
        std::mem::take(&mut self.emitted.lock().unwrap())
    }
}

impl Default for RecordingEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for RecordingEventSink {
    fn emit(&self, tag: &str, payload: Value) {
        self.emitted.lock().unwrap().push((tag.to_string(), payload));
    }
}

/// Captures the single result a [`ModuleCallback`] delivers.
#[derive(Clone)]
pub struct CallbackCapture {
    slot: Arc<Mutex<Option<Result<Value, Value>>>>,
}

impl CallbackCapture {
    pub fn new() -> Self {
        Self {
            slot: Arc::new(Mutex::new(None)),
        }
    }

    pub fn callback(&self) -> ModuleCallback {
        let slot = self.slot.clone();
        Box::new(move |result| {
            *slot.lock().unwrap() = Some(result);
        })
    }

    pub fn result(&self) -> Option<Result<Value, Value>> {
        self.slot.lock().unwrap().clone()
    }
}

impl Default for CallbackCapture {
    fn default() -> Self {
        Self::new()
    }
}

/// [`DatabaseSdk`] that only counts listener attach/detach traffic.
pub struct CountingSdk {
    next_token: AtomicU64,
    attached: AtomicUsize,
    detached: AtomicUsize,
}

impl CountingSdk {
    pub fn new() -> Self {
        Self {
            next_token: AtomicU64::new(1),
            attached: AtomicUsize::new(0),
            detached: AtomicUsize::new(0),
        }
    }

    pub fn attached(&self) -> usize {
        self.attached.load(Ordering::SeqCst)
    }

    pub fn detached(&self) -> usize {
        self.detached.load(Ordering::SeqCst)
    }

    fn attach(&self) -> ListenerToken {
        self.attached.fetch_add(1, Ordering::SeqCst);
        ListenerToken(self.next_token.fetch_add(1, Ordering::SeqCst))
    }
}

impl Default for CountingSdk {
    fn default() -> Self {
        Self::new()
    }
}

impl DatabaseSdk for CountingSdk {
    fn set_persistence_enabled(&self, _enabled: bool) {}

    fn keep_synced(&self, _path: &str, _enabled: bool) {}

    fn set(&self, _path: &str, _value: NativeValue, complete: WriteCompletion) {
        complete(None);
    }

    fn update(
        &self,
        _path: &str,
        _children: IndexMap<String, NativeValue>,
        complete: WriteCompletion,
    ) {
        complete(None);
    }

    fn remove(&self, _path: &str, complete: WriteCompletion) {
        complete(None);
    }

    fn push(&self, path: &str) -> String {
        format!("https://counting.local/{path}/generated")
    }

    fn attach_value_listener(
        &self,
        _path: &str,
        _query: &CompiledQuery,
        _on_snapshot: SnapshotCallback,
        _on_cancel: CancelCallback,
    ) -> ListenerToken {
        self.attach()
    }

    fn attach_child_listener(
        &self,
        _path: &str,
        _query: &CompiledQuery,
        _on_event: SnapshotCallback,
        _on_cancel: CancelCallback,
    ) -> ListenerToken {
        self.attach()
    }

    fn detach(&self, _path: &str, _token: ListenerToken) {
        self.detached.fetch_add(1, Ordering::SeqCst);
    }

    fn read_once(&self, _path: &str, _query: &CompiledQuery, complete: OnceCallback) {
        complete(Ok(Snapshot::new(None, NativeValue::null())));
    }

    fn on_disconnect_set(&self, _path: &str, _value: NativeValue, complete: WriteCompletion) {
        complete(None);
    }

    fn on_disconnect_remove(&self, _path: &str, complete: WriteCompletion) {
        complete(None);
    }

    fn on_disconnect_cancel(&self, _path: &str, complete: WriteCompletion) {
        complete(None);
    }
}
