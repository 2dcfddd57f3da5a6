//! Host-facing realtime-database surface.
//!
//! Every method takes a trailing completion callback in the host bridge's
//! `(error, result)` convention. Live listeners acknowledge registration
//! immediately and deliver data through the event transport; one-shot reads
//! and all mutating calls resolve through the callback alone.

use std::sync::Arc;

use serde_json::{json, Value};
use url::Url;

use crate::bridge::{EventSink, ModuleCallback};
use crate::database::error::{invalid_path, DatabaseError};
use crate::database::modifier::UnknownModifierPolicy;
use crate::database::registry::{ListenerRegistry, RefHandle};
use crate::database::sdk::{DatabaseSdk, WriteCompletion};
use crate::marshal;

pub struct DatabaseModule {
    sdk: Arc<dyn DatabaseSdk>,
    events: Arc<dyn EventSink>,
    registry: ListenerRegistry,
    modifier_policy: UnknownModifierPolicy,
}

impl DatabaseModule {
    pub fn new(sdk: Arc<dyn DatabaseSdk>, events: Arc<dyn EventSink>) -> Self {
        Self {
            sdk,
            events,
            registry: ListenerRegistry::new(),
            modifier_policy: UnknownModifierPolicy::default(),
        }
    }

    /// Overrides how unrecognized query modifiers are handled.
    pub fn with_modifier_policy(mut self, policy: UnknownModifierPolicy) -> Self {
        self.modifier_policy = policy;
        self
    }

    pub fn enable_persistence(&self, enabled: bool, callback: ModuleCallback) {
        self.sdk.set_persistence_enabled(enabled);
        callback(Ok(json!({"status": "success"})));
    }

    pub fn keep_synced(&self, path: &str, enabled: bool, callback: ModuleCallback) {
        self.sdk.keep_synced(path, enabled);
        callback(Ok(json!({"status": "success", "path": path})));
    }

    pub fn set(&self, path: &str, value: &Value, callback: ModuleCallback) {
        self.sdk
            .set(path, marshal::to_native(value), completion("set", callback));
    }

    pub fn update(&self, path: &str, value: &Value, callback: ModuleCallback) {
        self.sdk.update(
            path,
            marshal::to_native_children(value),
            completion("update", callback),
        );
    }

    pub fn remove(&self, path: &str, callback: ModuleCallback) {
        self.sdk.remove(path, completion("remove", callback));
    }

    /// Allocates an auto-keyed child of `path` and, when `value` is
    /// non-empty, writes it there. The result carries the generated child
    /// path, always a strict descendant of `path`.
    pub fn push(&self, path: &str, value: &Value, callback: ModuleCallback) {
        let reference_url = self.sdk.push(path);
        let new_path = match Url::parse(&reference_url) {
            Ok(url) => url.path().to_string(),
            Err(err) => {
                let error =
                    invalid_path(format!("Push returned an invalid reference URL: {err}"));
                callback(Err(error.to_payload()));
                return;
            }
        };

        let native = marshal::to_native(value);
        if native.is_empty() {
            log::debug!("push at {path} carried no value, allocated {new_path}");
            callback(Ok(json!({"status": "success", "ref": new_path})));
            return;
        }

        let result_path = new_path.clone();
        self.sdk.set(
            &new_path,
            native,
            Box::new(move |error| match error {
                Some(error) => callback(Err(DatabaseError::from_sdk(error).to_payload())),
                None => callback(Ok(json!({"status": "success", "ref": result_path}))),
            }),
        );
    }

    /// Registers a live listener for `event_name` at `path` and acknowledges
    /// immediately; data arrives through the event transport.
    pub fn on(&self, path: &str, modifiers: &[String], event_name: &str, callback: ModuleCallback) {
        log::debug!("registering {event_name} listener at {path}");
        let attached = self.registry.with_handle(
            path,
            || self.new_handle(path),
            |handle| {
                if event_name == "value" {
                    handle.attach_value_listener(modifiers)
                } else {
                    handle.attach_child_listener(event_name, modifiers)
                }
            },
        );
        match attached {
            Ok(()) => callback(Ok(json!({"result": "success", "handle": path}))),
            Err(error) => callback(Err(error.to_payload())),
        }
    }

    /// Reads the current snapshot once, resolving the callback directly.
    pub fn on_once(&self, path: &str, modifiers: &[String], callback: ModuleCallback) {
        self.registry.with_handle(
            path,
            || self.new_handle(path),
            |handle| handle.attach_once_listener(modifiers, callback),
        );
    }

    /// Detaches the listener of the given kind and drops the registry entry.
    /// Calling `off` for an unregistered path is a successful no-op.
    pub fn off(&self, path: &str, event_name: &str, callback: ModuleCallback) {
        log::debug!("removing {event_name} listener at {path}");
        self.registry.remove(path);
        callback(Ok(json!({"result": "success", "handle": path})));
    }

    pub fn on_disconnect_set_object(&self, path: &str, value: &Value, callback: ModuleCallback) {
        self.sdk.on_disconnect_set(
            path,
            marshal::to_native(value),
            completion("onDisconnectSetObject", callback),
        );
    }

    pub fn on_disconnect_set_string(&self, path: &str, value: &str, callback: ModuleCallback) {
        self.sdk.on_disconnect_set(
            path,
            marshal::to_native(&Value::String(value.to_string())),
            completion("onDisconnectSetString", callback),
        );
    }

    pub fn on_disconnect_remove(&self, path: &str, callback: ModuleCallback) {
        self.sdk
            .on_disconnect_remove(path, completion("onDisconnectRemove", callback));
    }

    pub fn on_disconnect_cancel(&self, path: &str, callback: ModuleCallback) {
        self.sdk
            .on_disconnect_cancel(path, completion("onDisconnectCancel", callback));
    }

    /// Whether a handle is currently registered for `path`.
    pub fn has_listeners(&self, path: &str) -> bool {
        self.registry.contains(path)
    }

    fn new_handle(&self, path: &str) -> RefHandle {
        RefHandle::new(
            path,
            self.sdk.clone(),
            self.events.clone(),
            self.modifier_policy,
        )
    }
}

/// Standard mutating-call completion: SDK failures forward verbatim,
/// success acknowledges with the method name.
fn completion(method: &'static str, callback: ModuleCallback) -> WriteCompletion {
    Box::new(move |error| match error {
        Some(error) => callback(Err(DatabaseError::from_sdk(error).to_payload())),
        None => callback(Ok(json!({"status": "success", "method": method}))),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::{SdkError, DATABASE_ERROR, DATABASE_EVENT};
    use crate::database::memory::MemoryDatabaseSdk;
    use crate::marshal::{NativeValue, Scalar};
    use crate::test_support::{CallbackCapture, RecordingEventSink};
    use serde_json::json;

    fn noop() -> ModuleCallback {
        Box::new(|_| {})
    }

    fn module() -> (DatabaseModule, Arc<MemoryDatabaseSdk>, Arc<RecordingEventSink>) {
        let sdk = Arc::new(MemoryDatabaseSdk::new());
        let events = Arc::new(RecordingEventSink::new());
        let module = DatabaseModule::new(sdk.clone(), events.clone());
        (module, sdk, events)
    }

    #[test]
    fn set_acknowledges_with_method_name() {
        let (module, sdk, _) = module();
        let capture = CallbackCapture::new();
        module.set("items/a", &json!({"n": 1}), capture.callback());
        assert_eq!(
            capture.result(),
            Some(Ok(json!({"status": "success", "method": "set"})))
        );
        assert_eq!(
            sdk.value_at("items/a/n"),
            NativeValue::Leaf(Scalar::Int(1))
        );
    }

    #[test]
    fn update_merges_children() {
        let (module, sdk, _) = module();
        module.set("profile", &json!({"name": "ada", "age": 35}), noop());
        module.update("profile", &json!({"age": 36}), noop());
        assert_eq!(
            sdk.value_at("profile/age"),
            NativeValue::Leaf(Scalar::Int(36))
        );
        assert_eq!(
            sdk.value_at("profile/name"),
            NativeValue::Leaf(Scalar::Str("ada".into()))
        );
    }

    #[test]
    fn on_acknowledges_and_forwards_value_events() {
        let (module, _, events) = module();
        let capture = CallbackCapture::new();
        module.on("counters", &[], "value", capture.callback());
        assert_eq!(
            capture.result(),
            Some(Ok(json!({"result": "success", "handle": "counters"})))
        );

        module.set("counters/main", &json!(5), noop());

        let emitted = events.take();
        // Initial snapshot envelope plus the change.
        assert_eq!(emitted.len(), 2);
        assert!(emitted.iter().all(|(tag, _)| tag == DATABASE_EVENT));
        assert_eq!(
            emitted[1].1,
            json!({"eventName": "value", "body": {"main": 5}})
        );
    }

    #[test]
    fn on_with_invalid_modifier_fails_the_call() {
        let (module, _, _) = module();
        let capture = CallbackCapture::new();
        module.on(
            "scores",
            &["limitToFirst:NaN".to_string()],
            "value",
            capture.callback(),
        );
        let error = capture.result().unwrap().unwrap_err();
        assert_eq!(error["errorDetails"], json!("database/invalid-modifier"));
    }

    #[test]
    fn off_detaches_and_repeat_off_is_noop() {
        let (module, sdk, events) = module();
        module.on("rooms", &[], "value", noop());
        assert!(module.has_listeners("rooms"));

        let capture = CallbackCapture::new();
        module.off("rooms", "value", capture.callback());
        assert!(capture.result().unwrap().is_ok());
        assert!(!module.has_listeners("rooms"));
        assert_eq!(sdk.listener_count(), 0);

        events.take();
        module.set("rooms/a", &json!(1), noop());
        assert!(events.take().is_empty());

        let repeat = CallbackCapture::new();
        module.off("rooms", "value", repeat.callback());
        assert!(repeat.result().unwrap().is_ok());
    }

    #[test]
    fn on_once_resolves_directly_without_events() {
        let (module, _, events) = module();
        module.set("greeting", &json!({"text": "hi"}), noop());
        events.take();

        let capture = CallbackCapture::new();
        module.on_once("greeting", &[], capture.callback());
        assert_eq!(capture.result(), Some(Ok(json!({"text": "hi"}))));
        assert!(events.take().is_empty());
    }

    #[test]
    fn push_result_is_strict_descendant_and_unique() {
        let (module, _, _) = module();
        let first = CallbackCapture::new();
        module.push("messages", &json!({"a": 1}), first.callback());
        let second = CallbackCapture::new();
        module.push("messages", &json!({"a": 2}), second.callback());

        let first_ref = first.result().unwrap().unwrap()["ref"]
            .as_str()
            .unwrap()
            .to_string();
        let second_ref = second.result().unwrap().unwrap()["ref"]
            .as_str()
            .unwrap()
            .to_string();
        assert!(first_ref.starts_with("/messages/"));
        assert!(first_ref.len() > "/messages/".len());
        assert_ne!(first_ref, second_ref);
    }

    #[test]
    fn push_without_value_allocates_but_does_not_write() {
        let (module, sdk, _) = module();
        let capture = CallbackCapture::new();
        module.push("messages", &json!({}), capture.callback());
        let result = capture.result().unwrap().unwrap();
        assert_eq!(result["status"], json!("success"));
        assert_eq!(sdk.value_at("messages"), NativeValue::null());
    }

    #[test]
    fn listener_cancellation_forwards_database_error() {
        let (module, sdk, events) = module();
        module.on("secret", &[], "value", noop());
        events.take();

        sdk.cancel_listeners("secret", SdkError::new(3, "Permission denied", "rules"));

        let emitted = events.take();
        assert_eq!(emitted.len(), 1);
        assert_eq!(emitted[0].0, DATABASE_ERROR);
        assert_eq!(
            emitted[0].1,
            json!({
                "eventName": "value",
                "body": {
                    "errorCode": 3,
                    "errorDetails": "rules",
                    "description": "Permission denied",
                },
            })
        );
    }

    #[test]
    fn persistence_and_keep_synced_pass_through() {
        let (module, sdk, _) = module();
        module.enable_persistence(true, noop());
        assert!(sdk.persistence_enabled());

        let capture = CallbackCapture::new();
        module.keep_synced("inbox", true, capture.callback());
        assert!(sdk.is_kept_synced("inbox"));
        assert_eq!(
            capture.result(),
            Some(Ok(json!({"status": "success", "path": "inbox"})))
        );
    }

    #[test]
    fn on_disconnect_hooks_defer_and_cancel() {
        let (module, sdk, _) = module();
        module.on_disconnect_set_string("status/me", "offline", noop());
        module.on_disconnect_remove("session/me", noop());
        assert_eq!(sdk.deferred_write_count(), 2);

        module.on_disconnect_cancel("session/me", noop());
        assert_eq!(sdk.deferred_write_count(), 1);

        sdk.simulate_disconnect();
        assert_eq!(
            sdk.value_at("status/me"),
            NativeValue::Leaf(Scalar::Str("offline".into()))
        );
    }
}
