use std::sync::{Arc, Mutex};

use firebase_bridge::bridge::{
    EventSink, ModuleCallback, SdkError, DATABASE_ERROR, DATABASE_EVENT,
};
use firebase_bridge::database::{DatabaseModule, MemoryDatabaseSdk};
use serde_json::{json, Value};

struct RecordingSink {
    emitted: Mutex<Vec<(String, Value)>>,
}

impl RecordingSink {
    fn new() -> Self {
        Self {
            emitted: Mutex::new(Vec::new()),
        }
    }

    fn take(&self) -> Vec<(String, Value)> {
        std::mem::take(&mut self.emitted.lock().unwrap())
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, tag: &str, payload: Value) {
        self.emitted.lock().unwrap().push((tag.to_string(), payload));
    }
}

fn capture() -> (ModuleCallback, Arc<Mutex<Option<Result<Value, Value>>>>) {
    let slot: Arc<Mutex<Option<Result<Value, Value>>>> = Arc::new(Mutex::new(None));
    let sink = slot.clone();
    let callback: ModuleCallback = Box::new(move |result| {
        *sink.lock().unwrap() = Some(result);
    });
    (callback, slot)
}

fn noop() -> ModuleCallback {
    Box::new(|_| {})
}

fn bridge() -> (DatabaseModule, Arc<MemoryDatabaseSdk>, Arc<RecordingSink>) {
    let sdk = Arc::new(MemoryDatabaseSdk::new());
    let sink = Arc::new(RecordingSink::new());
    let module = DatabaseModule::new(sdk.clone(), sink.clone());
    (module, sdk, sink)
}

#[test]
fn live_listener_lifecycle_end_to_end() {
    let (module, _, sink) = bridge();

    let (ack, ack_slot) = capture();
    module.on("chat/messages", &[], "value", ack);
    assert_eq!(
        ack_slot.lock().unwrap().clone(),
        Some(Ok(json!({"result": "success", "handle": "chat/messages"})))
    );
    sink.take();

    module.set("chat/messages/m1", &json!({"text": "hello"}), noop());
    let emitted = sink.take();
    assert_eq!(emitted.len(), 1);
    assert_eq!(emitted[0].0, DATABASE_EVENT);
    assert_eq!(
        emitted[0].1,
        json!({
            "eventName": "value",
            "body": {"m1": {"text": "hello"}},
        })
    );

    let (off_ack, off_slot) = capture();
    module.off("chat/messages", "value", off_ack);
    assert!(off_slot.lock().unwrap().clone().unwrap().is_ok());

    module.set("chat/messages/m2", &json!({"text": "silent"}), noop());
    assert!(sink.take().is_empty());

    // A second off for the same path is still a successful no-op.
    let (repeat_ack, repeat_slot) = capture();
    module.off("chat/messages", "value", repeat_ack);
    assert!(repeat_slot.lock().unwrap().clone().unwrap().is_ok());
}

#[test]
fn child_listener_forwards_each_child_under_registered_name() {
    let (module, _, sink) = bridge();
    module.set("rooms/lobby", &json!({"topic": "general"}), noop());
    sink.take();

    module.on("rooms", &[], "child_added", noop());
    // Existing child replays on attach.
    let initial = sink.take();
    assert_eq!(initial.len(), 1);
    assert_eq!(initial[0].1["eventName"], json!("child_added"));

    module.set("rooms/random", &json!({"topic": "anything"}), noop());
    let emitted = sink.take();
    assert_eq!(emitted[0].1["eventName"], json!("child_added"));
    assert_eq!(emitted[0].1["body"], json!({"topic": "anything"}));
}

#[test]
fn modifiers_shape_one_shot_reads() {
    let (module, _, sink) = bridge();
    module.set(
        "scores",
        &json!({"a": 10, "b": 20, "c": 30, "d": 40}),
        noop(),
    );
    sink.take();

    let (callback, slot) = capture();
    module.on_once("scores", &["limitToLast:2".to_string()], callback);
    assert_eq!(
        slot.lock().unwrap().clone(),
        Some(Ok(json!({"c": 30, "d": 40})))
    );
    // One-shot reads never touch the event transport.
    assert!(sink.take().is_empty());
}

#[test]
fn invalid_limit_modifier_fails_at_call_level() {
    let (module, _, _) = bridge();
    let (callback, slot) = capture();
    module.on(
        "scores",
        &["limitToFirst:soon".to_string()],
        "value",
        callback,
    );
    let error = slot.lock().unwrap().clone().unwrap().unwrap_err();
    assert_eq!(error["errorCode"], json!(-1));
    assert_eq!(error["errorDetails"], json!("database/invalid-modifier"));
}

#[test]
fn unknown_modifiers_are_dropped_not_fatal() {
    let (module, _, _) = bridge();
    let (callback, slot) = capture();
    module.on(
        "scores",
        &["shuffle:7".to_string(), "orderByKey".to_string()],
        "value",
        callback,
    );
    assert!(slot.lock().unwrap().clone().unwrap().is_ok());
}

#[test]
fn push_writes_value_under_generated_descendant() {
    let (module, sdk, _) = bridge();

    let (callback, slot) = capture();
    module.push("queue", &json!({"job": "resize"}), callback);
    let result = slot.lock().unwrap().clone().unwrap().unwrap();
    let generated = result["ref"].as_str().unwrap().to_string();
    assert!(generated.starts_with("/queue/"));

    let stored = sdk.value_at(&generated);
    assert!(stored.has_children());

    let (second_callback, second_slot) = capture();
    module.push("queue", &json!({"job": "upload"}), second_callback);
    let second = second_slot.lock().unwrap().clone().unwrap().unwrap();
    assert_ne!(second["ref"], result["ref"]);
}

#[test]
fn cancelled_listener_surfaces_database_error_envelope() {
    let (module, sdk, sink) = bridge();
    module.on("private/inbox", &[], "value", noop());
    sink.take();

    sdk.cancel_listeners(
        "private/inbox",
        SdkError::new(3, "Permission denied", "read access revoked"),
    );

    let emitted = sink.take();
    assert_eq!(emitted.len(), 1);
    assert_eq!(emitted[0].0, DATABASE_ERROR);
    assert_eq!(
        emitted[0].1["body"],
        json!({
            "errorCode": 3,
            "errorDetails": "read access revoked",
            "description": "Permission denied",
        })
    );
}

#[test]
fn disconnect_hooks_apply_deferred_writes() {
    let (module, sdk, sink) = bridge();
    module.on("presence/me", &[], "value", noop());
    sink.take();

    module.on_disconnect_set_string("presence/me", "offline", noop());
    sdk.simulate_disconnect();

    let emitted = sink.take();
    assert_eq!(emitted.len(), 1);
    assert_eq!(emitted[0].1["body"], json!("offline"));
}
