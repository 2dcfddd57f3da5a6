//! Registry mapping each logical path to its live listener handle.
//!
//! A path owns at most one child listener and one value listener at a time.
//! Replacing either kind always detaches the previously tracked native
//! registration first, and a handle leaving the registry is cleaned up
//! before its slot is reused. One-shot listeners are fire-and-forget and
//! never tracked.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::bridge::{
    EventEnvelope, EventSink, ModuleCallback, SdkError, DATABASE_ERROR, DATABASE_EVENT,
};
use crate::database::error::{DatabaseError, DatabaseResult};
use crate::database::modifier::{parse_modifiers, UnknownModifierPolicy};
use crate::database::query::CompiledQuery;
use crate::database::sdk::{
    CancelCallback, DatabaseSdk, ListenerToken, Snapshot, SnapshotCallback,
};
use crate::marshal;

/// Live listener record for one logical path.
pub struct RefHandle {
    path: String,
    sdk: Arc<dyn DatabaseSdk>,
    events: Arc<dyn EventSink>,
    policy: UnknownModifierPolicy,
    child_listener: Option<ListenerToken>,
    value_listener: Option<ListenerToken>,
}

impl RefHandle {
    pub(crate) fn new(
        path: impl Into<String>,
        sdk: Arc<dyn DatabaseSdk>,
        events: Arc<dyn EventSink>,
        policy: UnknownModifierPolicy,
    ) -> Self {
        Self {
            path: path.into(),
            sdk,
            events,
            policy,
            child_listener: None,
            value_listener: None,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Registers a child listener shaped by `modifiers`; every child event
    /// is forwarded to the host under `name`.
    pub fn attach_child_listener(
        &mut self,
        name: &str,
        modifiers: &[String],
    ) -> DatabaseResult<()> {
        let query = self.compile(modifiers)?;
        log::debug!("attaching child listener {name} at {} ({query})", self.path);
        self.detach_child_listener();
        let token = self.sdk.attach_child_listener(
            &self.path,
            &query,
            forward_snapshot(&self.events, name),
            forward_cancel(&self.events, name),
        );
        self.child_listener = Some(token);
        Ok(())
    }

    /// Registers a value listener shaped by `modifiers`. Value snapshots
    /// always forward under the `value` event name.
    pub fn attach_value_listener(&mut self, modifiers: &[String]) -> DatabaseResult<()> {
        let query = self.compile(modifiers)?;
        log::debug!("attaching value listener at {} ({query})", self.path);
        self.detach_value_listener();
        let token = self.sdk.attach_value_listener(
            &self.path,
            &query,
            forward_snapshot(&self.events, "value"),
            forward_cancel(&self.events, "value"),
        );
        self.value_listener = Some(token);
        Ok(())
    }

    /// Performs a one-shot read shaped by `modifiers`, resolving `callback`
    /// directly with the transcoded snapshot or the wire-shaped error.
    /// Nothing routes through the event transport and nothing is tracked.
    pub fn attach_once_listener(&self, modifiers: &[String], callback: ModuleCallback) {
        let query = match self.compile(modifiers) {
            Ok(query) => query,
            Err(error) => {
                callback(Err(error.to_payload()));
                return;
            }
        };
        self.sdk.read_once(
            &self.path,
            &query,
            Box::new(move |result| match result {
                Ok(snapshot) => callback(Ok(marshal::snapshot_to_host(&snapshot.value))),
                Err(error) => callback(Err(DatabaseError::from_sdk(error).to_payload())),
            }),
        );
    }

    pub fn detach_child_listener(&mut self) {
        if let Some(token) = self.child_listener.take() {
            self.sdk.detach(&self.path, token);
        }
    }

    pub fn detach_value_listener(&mut self) {
        if let Some(token) = self.value_listener.take() {
            self.sdk.detach(&self.path, token);
        }
    }

    /// Detaches both listener kinds.
    pub fn cleanup(&mut self) {
        self.detach_child_listener();
        self.detach_value_listener();
    }

    fn compile(&self, modifiers: &[String]) -> DatabaseResult<CompiledQuery> {
        let parsed = parse_modifiers(modifiers, self.policy)?;
        Ok(CompiledQuery::compile(&parsed))
    }
}

impl Drop for RefHandle {
    fn drop(&mut self) {
        self.cleanup();
    }
}

fn forward_snapshot(events: &Arc<dyn EventSink>, name: &str) -> SnapshotCallback {
    let events = events.clone();
    let name = name.to_string();
    Arc::new(move |snapshot: Snapshot| {
        let body = marshal::snapshot_to_host(&snapshot.value);
        let envelope = EventEnvelope::new(name.clone(), body);
        events.emit(DATABASE_EVENT, envelope.to_value());
    })
}

fn forward_cancel(events: &Arc<dyn EventSink>, name: &str) -> CancelCallback {
    let events = events.clone();
    let name = name.to_string();
    Arc::new(move |error: SdkError| {
        log::warn!("listener {name} cancelled: {error}");
        let body = DatabaseError::from_sdk(error).to_payload();
        let envelope = EventEnvelope::new(name.clone(), body);
        events.emit(DATABASE_ERROR, envelope.to_value());
    })
}

/// Path-keyed store of [`RefHandle`]s with single-writer discipline.
///
/// All mutation happens synchronously inside registration or removal calls;
/// listener callbacks never touch the registry.
pub struct ListenerRegistry {
    handles: Mutex<HashMap<String, RefHandle>>,
}

impl Default for ListenerRegistry {
    fn default() -> Self {
        Self {
            handles: Mutex::new(HashMap::new()),
        }
    }
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `f` with the handle for `path`, creating and storing a
    /// listener-less handle first if the path is unregistered.
    pub fn with_handle<R>(
        &self,
        path: &str,
        create: impl FnOnce() -> RefHandle,
        f: impl FnOnce(&mut RefHandle) -> R,
    ) -> R {
        let mut handles = self.handles.lock().unwrap();
        let handle = handles.entry(path.to_string()).or_insert_with(create);
        f(handle)
    }

    /// Stores `handle` at `path`, cleaning up any resident handle's
    /// listeners first. No path ever has two simultaneously attached
    /// listeners of the same kind.
    pub fn save(&self, path: &str, handle: RefHandle) {
        let mut handles = self.handles.lock().unwrap();
        if let Some(mut existing) = handles.remove(path) {
            existing.cleanup();
        }
        handles.insert(path.to_string(), handle);
    }

    /// Cleans up and deletes the entry for `path`; a no-op when absent.
    pub fn remove(&self, path: &str) {
        let mut handles = self.handles.lock().unwrap();
        if let Some(mut existing) = handles.remove(path) {
            existing.cleanup();
        }
    }

    pub fn contains(&self, path: &str) -> bool {
        self.handles.lock().unwrap().contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.handles.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.lock().unwrap().is_empty()
    }
}
