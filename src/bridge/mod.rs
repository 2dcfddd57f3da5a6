//! Host-runtime boundary shared by the database and storage facades.
//!
//! The host talks to this crate through two channels: per-call completion
//! callbacks (the `(error, result)` convention of the host bridge) and a
//! fire-and-forget event sink for listener traffic. Both sides of the
//! boundary exchange `serde_json::Value` trees, which is the host's dynamic
//! value model.

use std::fmt::{Display, Formatter};

use serde_json::{json, Value};

/// Completion callback for a single host call.
///
/// `Ok(payload)` carries the success object, `Err(payload)` the wire-shaped
/// error object. Exactly one of the two is ever delivered, exactly once.
pub type ModuleCallback = Box<dyn FnOnce(Result<Value, Value>) + Send + 'static>;

/// Transport tag for live data-change envelopes.
pub const DATABASE_EVENT: &str = "database_event";
/// Transport tag for listener cancellation envelopes.
pub const DATABASE_ERROR: &str = "database_error";
/// Transport tag for upload progress notifications.
pub const UPLOAD_PROGRESS: &str = "upload_progress";
/// Transport tag for upload pause notifications.
pub const UPLOAD_PAUSED: &str = "upload_paused";

/// Event-delivery transport owned by the host runtime.
///
/// Implementations must not block: emission happens on the native SDK's
/// callback context.
pub trait EventSink: Send + Sync {
    fn emit(&self, tag: &str, payload: Value);
}

/// Uniform envelope for listener traffic: `{eventName, body}`.
///
/// `body` is either a transcoded snapshot tree or a database error object.
#[derive(Clone, Debug)]
pub struct EventEnvelope {
    pub event_name: String,
    pub body: Value,
}

impl EventEnvelope {
    pub fn new(event_name: impl Into<String>, body: Value) -> Self {
        Self {
            event_name: event_name.into(),
            body,
        }
    }

    pub fn to_value(&self) -> Value {
        json!({
            "eventName": self.event_name,
            "body": self.body,
        })
    }
}

/// [`EventSink`] backed by an `async_channel` queue.
///
/// Hosts that run an async delivery loop can hand the receiver to it and
/// drain `(tag, payload)` pairs at their own pace. Emission never blocks;
/// if the host stopped draining, envelopes are dropped with a warning.
pub struct ChannelEventSink {
    sender: async_channel::Sender<(String, Value)>,
}

impl ChannelEventSink {
    pub fn unbounded() -> (Self, async_channel::Receiver<(String, Value)>) {
        let (sender, receiver) = async_channel::unbounded();
        (Self { sender }, receiver)
    }
}

impl EventSink for ChannelEventSink {
    fn emit(&self, tag: &str, payload: Value) {
        if let Err(err) = self.sender.try_send((tag.to_string(), payload)) {
            log::warn!("dropping {tag} event, host receiver unavailable: {err}");
        }
    }
}

/// Failure reported by the underlying vendor SDK.
///
/// One shape for both facades; each facade translates it to its historical
/// wire payload at the host boundary.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SdkError {
    pub code: i32,
    pub message: String,
    pub details: String,
}

impl SdkError {
    pub fn new(code: i32, message: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: details.into(),
        }
    }
}

impl Display for SdkError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.details.is_empty() {
            write!(f, "{} (code {})", self.message, self.code)
        } else {
            write!(f, "{} (code {}): {}", self.message, self.code, self.details)
        }
    }
}

impl std::error::Error for SdkError {}
