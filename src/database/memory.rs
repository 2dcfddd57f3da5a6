//! In-memory [`DatabaseSdk`] implementation.
//!
//! Backs local development and the crate's own tests with a mutex-guarded
//! native tree: writes diff the affected subtree and replay the change to
//! registered listeners the way the hosted SDK would. Range bounds are left
//! to the hosted backend; the local store honours ordering and limits only.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use indexmap::IndexMap;

use crate::bridge::SdkError;
use crate::database::push_id::next_push_id;
use crate::database::query::{CompiledQuery, QueryFilter, QueryOrder};
use crate::database::sdk::{
    CancelCallback, DatabaseSdk, ListenerToken, OnceCallback, Snapshot, SnapshotCallback,
    WriteCompletion,
};
use crate::marshal::NativeValue;

const MEMORY_ORIGIN: &str = "https://memory-database.local";

pub struct MemoryDatabaseSdk {
    state: Mutex<MemoryState>,
}

struct MemoryState {
    root: NativeValue,
    listeners: HashMap<u64, MemoryListener>,
    next_token: u64,
    persistence_enabled: bool,
    kept_synced: Vec<String>,
    deferred: Vec<DeferredWrite>,
}

struct MemoryListener {
    path: Vec<String>,
    kind: MemoryListenerKind,
}

enum MemoryListenerKind {
    Value {
        query: CompiledQuery,
        on_snapshot: SnapshotCallback,
        on_cancel: CancelCallback,
    },
    Child {
        on_event: SnapshotCallback,
        on_cancel: CancelCallback,
    },
}

enum DeferredWrite {
    Set { path: String, value: NativeValue },
    Remove { path: String },
}

impl DeferredWrite {
    fn path(&self) -> &str {
        match self {
            DeferredWrite::Set { path, .. } => path,
            DeferredWrite::Remove { path } => path,
        }
    }
}

impl Default for MemoryDatabaseSdk {
    fn default() -> Self {
        Self {
            state: Mutex::new(MemoryState {
                root: NativeValue::empty_branch(),
                listeners: HashMap::new(),
                next_token: 1,
                persistence_enabled: false,
                kept_synced: Vec::new(),
                deferred: Vec::new(),
            }),
        }
    }
}

impl MemoryDatabaseSdk {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn persistence_enabled(&self) -> bool {
        self.state.lock().unwrap().persistence_enabled
    }

    pub fn is_kept_synced(&self, path: &str) -> bool {
        let joined = split_path(path).join("/");
        self.state.lock().unwrap().kept_synced.contains(&joined)
    }

    pub fn listener_count(&self) -> usize {
        self.state.lock().unwrap().listeners.len()
    }

    pub fn deferred_write_count(&self) -> usize {
        self.state.lock().unwrap().deferred.len()
    }

    /// Current value stored at `path`.
    pub fn value_at(&self, path: &str) -> NativeValue {
        let state = self.state.lock().unwrap();
        value_at(&state.root, &split_path(path))
    }

    /// Applies all deferred on-disconnect writes, as the server would when
    /// this client's connection drops.
    pub fn simulate_disconnect(&self) {
        let mut fired = Vec::new();
        {
            let mut state = self.state.lock().unwrap();
            let deferred = std::mem::take(&mut state.deferred);
            for write in deferred {
                let old_root = state.root.clone();
                let segments = match &write {
                    DeferredWrite::Set { path, value } => {
                        let segments = split_path(path);
                        set_at_path(&mut state.root, &segments, value.clone());
                        segments
                    }
                    DeferredWrite::Remove { path } => {
                        let segments = split_path(path);
                        delete_at_path(&mut state.root, &segments);
                        segments
                    }
                };
                fired.extend(state.dispatch_for_change(&segments, &old_root));
            }
        }
        deliver(fired);
    }

    /// Cancels every listener registered at exactly `path`, delivering the
    /// error to each. Models a server-side permission revocation.
    pub fn cancel_listeners(&self, path: &str, error: SdkError) {
        let segments = split_path(path);
        let cancelled: Vec<CancelCallback> = {
            let mut state = self.state.lock().unwrap();
            let tokens: Vec<u64> = state
                .listeners
                .iter()
                .filter(|(_, listener)| listener.path == segments)
                .map(|(token, _)| *token)
                .collect();
            tokens
                .into_iter()
                .filter_map(|token| state.listeners.remove(&token))
                .map(|listener| match listener.kind {
                    MemoryListenerKind::Value { on_cancel, .. } => on_cancel,
                    MemoryListenerKind::Child { on_cancel, .. } => on_cancel,
                })
                .collect()
        };
        for on_cancel in cancelled {
            on_cancel(error.clone());
        }
    }

    fn write(&self, path: &str, apply: impl FnOnce(&mut MemoryState, &[String])) {
        let fired = {
            let mut state = self.state.lock().unwrap();
            let segments = split_path(path);
            let old_root = state.root.clone();
            apply(&mut state, &segments);
            state.dispatch_for_change(&segments, &old_root)
        };
        deliver(fired);
    }
}

impl MemoryState {
    fn dispatch_for_change(
        &self,
        changed: &[String],
        old_root: &NativeValue,
    ) -> Vec<(SnapshotCallback, Snapshot)> {
        let mut pending = Vec::new();
        for listener in self.listeners.values() {
            if !paths_related(&listener.path, changed) {
                continue;
            }
            match &listener.kind {
                MemoryListenerKind::Value {
                    query, on_snapshot, ..
                } => {
                    let value = apply_query(value_at(&self.root, &listener.path), query);
                    pending.push((
                        on_snapshot.clone(),
                        Snapshot::new(last_key(&listener.path), value),
                    ));
                }
                MemoryListenerKind::Child { on_event, .. } => {
                    let old_children = children_at(old_root, &listener.path);
                    let new_children = children_at(&self.root, &listener.path);
                    for (key, child) in &new_children {
                        let fire = match old_children.get(key) {
                            None => true,
                            Some(old_child) => old_child != child,
                        };
                        if fire {
                            pending.push((
                                on_event.clone(),
                                Snapshot::new(Some(key.clone()), child.clone()),
                            ));
                        }
                    }
                    for (key, child) in &old_children {
                        if !new_children.contains_key(key) {
                            pending.push((
                                on_event.clone(),
                                Snapshot::new(Some(key.clone()), child.clone()),
                            ));
                        }
                    }
                }
            }
        }
        pending
    }

    fn register(&mut self, listener: MemoryListener) -> ListenerToken {
        let token = self.next_token;
        self.next_token += 1;
        self.listeners.insert(token, listener);
        ListenerToken(token)
    }
}

impl DatabaseSdk for MemoryDatabaseSdk {
    fn set_persistence_enabled(&self, enabled: bool) {
        self.state.lock().unwrap().persistence_enabled = enabled;
    }

    fn keep_synced(&self, path: &str, enabled: bool) {
        let joined = split_path(path).join("/");
        let mut state = self.state.lock().unwrap();
        state.kept_synced.retain(|entry| entry != &joined);
        if enabled {
            state.kept_synced.push(joined);
        }
    }

    fn set(&self, path: &str, value: NativeValue, complete: WriteCompletion) {
        self.write(path, |state, segments| {
            set_at_path(&mut state.root, segments, value);
        });
        complete(None);
    }

    fn update(
        &self,
        path: &str,
        children: IndexMap<String, NativeValue>,
        complete: WriteCompletion,
    ) {
        self.write(path, |state, segments| {
            for (key, value) in children {
                let mut target = segments.to_vec();
                target.extend(split_path(&key));
                set_at_path(&mut state.root, &target, value);
            }
        });
        complete(None);
    }

    fn remove(&self, path: &str, complete: WriteCompletion) {
        self.write(path, |state, segments| {
            delete_at_path(&mut state.root, segments);
        });
        complete(None);
    }

    fn push(&self, path: &str) -> String {
        let key = next_push_id(now_millis());
        let mut segments = split_path(path);
        segments.push(key);
        format!("{MEMORY_ORIGIN}/{}", segments.join("/"))
    }

    fn attach_value_listener(
        &self,
        path: &str,
        query: &CompiledQuery,
        on_snapshot: SnapshotCallback,
        on_cancel: CancelCallback,
    ) -> ListenerToken {
        let (token, initial) = {
            let mut state = self.state.lock().unwrap();
            let segments = split_path(path);
            let value = apply_query(value_at(&state.root, &segments), query);
            let initial = Snapshot::new(last_key(&segments), value);
            let token = state.register(MemoryListener {
                path: segments,
                kind: MemoryListenerKind::Value {
                    query: query.clone(),
                    on_snapshot: on_snapshot.clone(),
                    on_cancel,
                },
            });
            (token, initial)
        };
        on_snapshot(initial);
        token
    }

    fn attach_child_listener(
        &self,
        path: &str,
        query: &CompiledQuery,
        on_event: SnapshotCallback,
        on_cancel: CancelCallback,
    ) -> ListenerToken {
        let (token, existing) = {
            let mut state = self.state.lock().unwrap();
            let segments = split_path(path);
            let children = match apply_query(value_at(&state.root, &segments), query) {
                NativeValue::Branch(children) => children,
                NativeValue::Leaf(_) => IndexMap::new(),
            };
            let token = state.register(MemoryListener {
                path: segments,
                kind: MemoryListenerKind::Child {
                    on_event: on_event.clone(),
                    on_cancel,
                },
            });
            (token, children)
        };
        for (key, child) in existing {
            on_event(Snapshot::new(Some(key), child));
        }
        token
    }

    fn detach(&self, _path: &str, token: ListenerToken) {
        self.state.lock().unwrap().listeners.remove(&token.0);
    }

    fn read_once(&self, path: &str, query: &CompiledQuery, complete: OnceCallback) {
        let snapshot = {
            let state = self.state.lock().unwrap();
            let segments = split_path(path);
            let value = apply_query(value_at(&state.root, &segments), query);
            Snapshot::new(last_key(&segments), value)
        };
        complete(Ok(snapshot));
    }

    fn on_disconnect_set(&self, path: &str, value: NativeValue, complete: WriteCompletion) {
        self.state.lock().unwrap().deferred.push(DeferredWrite::Set {
            path: path.to_string(),
            value,
        });
        complete(None);
    }

    fn on_disconnect_remove(&self, path: &str, complete: WriteCompletion) {
        self.state
            .lock()
            .unwrap()
            .deferred
            .push(DeferredWrite::Remove {
                path: path.to_string(),
            });
        complete(None);
    }

    fn on_disconnect_cancel(&self, path: &str, complete: WriteCompletion) {
        let joined = split_path(path).join("/");
        self.state
            .lock()
            .unwrap()
            .deferred
            .retain(|write| split_path(write.path()).join("/") != joined);
        complete(None);
    }
}

fn deliver(fired: Vec<(SnapshotCallback, Snapshot)>) {
    for (callback, snapshot) in fired {
        callback(snapshot);
    }
}

fn split_path(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect()
}

fn last_key(path: &[String]) -> Option<String> {
    path.last().cloned()
}

fn value_at(root: &NativeValue, path: &[String]) -> NativeValue {
    get_at_path(root, path)
        .cloned()
        .unwrap_or_else(NativeValue::null)
}

fn get_at_path<'a>(root: &'a NativeValue, path: &[String]) -> Option<&'a NativeValue> {
    let mut current = root;
    for segment in path {
        current = current.child(segment)?;
    }
    Some(current)
}

fn set_at_path(root: &mut NativeValue, path: &[String], value: NativeValue) {
    let Some((last, parents)) = path.split_last() else {
        *root = value;
        return;
    };
    let mut current = root;
    for segment in parents {
        current = ensure_branch(current)
            .entry(segment.clone())
            .or_insert_with(NativeValue::empty_branch);
    }
    ensure_branch(current).insert(last.clone(), value);
}

fn delete_at_path(root: &mut NativeValue, path: &[String]) {
    let Some((last, parents)) = path.split_last() else {
        *root = NativeValue::empty_branch();
        return;
    };
    let mut current = root;
    for segment in parents {
        match current {
            NativeValue::Branch(children) => match children.get_mut(segment) {
                Some(next) => current = next,
                None => return,
            },
            NativeValue::Leaf(_) => return,
        }
    }
    if let NativeValue::Branch(children) = current {
        children.shift_remove(last);
    }
}

fn ensure_branch(node: &mut NativeValue) -> &mut IndexMap<String, NativeValue> {
    if matches!(node, NativeValue::Leaf(_)) {
        *node = NativeValue::empty_branch();
    }
    match node {
        NativeValue::Branch(children) => children,
        NativeValue::Leaf(_) => unreachable!("branch was just installed"),
    }
}

fn children_at(root: &NativeValue, path: &[String]) -> IndexMap<String, NativeValue> {
    match get_at_path(root, path) {
        Some(NativeValue::Branch(children)) => children.clone(),
        _ => IndexMap::new(),
    }
}

fn paths_related(a: &[String], b: &[String]) -> bool {
    is_prefix(a, b) || is_prefix(b, a)
}

fn is_prefix(prefix: &[String], path: &[String]) -> bool {
    prefix.len() <= path.len()
        && prefix
            .iter()
            .zip(path.iter())
            .all(|(left, right)| left == right)
}

fn apply_query(value: NativeValue, query: &CompiledQuery) -> NativeValue {
    if query.is_default() {
        return value;
    }
    let NativeValue::Branch(mut children) = value else {
        return value;
    };
    if matches!(query.order(), QueryOrder::Key) {
        children.sort_keys();
    }
    for filter in query.filters() {
        match filter {
            QueryFilter::LimitToFirst(limit) => {
                children.truncate(*limit as usize);
            }
            QueryFilter::LimitToLast(limit) => {
                let limit = *limit as usize;
                if children.len() > limit {
                    let skip = children.len() - limit;
                    children = children.into_iter().skip(skip).collect();
                }
            }
            QueryFilter::StartAt { .. }
            | QueryFilter::EndAt { .. }
            | QueryFilter::EqualTo { .. } => {}
        }
    }
    NativeValue::Branch(children)
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_millis() as u64)
        .unwrap_or(0)
}
