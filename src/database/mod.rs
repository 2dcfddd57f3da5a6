//! # Realtime-database bridge module
//!
//! Exposes the native realtime-database SDK to the host runtime: decodes
//! the string-encoded query-modifier language, keeps a path-keyed registry
//! of live listener handles, and forwards SDK callbacks as host events.
//!
//! The vendor SDK sits behind the [`DatabaseSdk`] trait; persistence,
//! networking, retries, and consistency are entirely its business. This
//! module owns three things:
//!
//! - the modifier compiler ([`modifier`] + [`query`]): an ordered sequence
//!   of `op[:arg1[:arg2]]` instruction strings becomes one composed query,
//! - the listener registry ([`registry`]): each logical path maps to at
//!   most one live handle, and every native registration is detached
//!   exactly once before replacement or removal,
//! - payload shaping: snapshots transcode through [`crate::marshal`] and
//!   failures flatten into the `{errorCode, errorDetails, description}`
//!   wire object.
//!
//! ## Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//! use firebase_bridge::bridge::ChannelEventSink;
//! use firebase_bridge::database::{DatabaseModule, MemoryDatabaseSdk};
//! use serde_json::json;
//!
//! let (sink, events) = ChannelEventSink::unbounded();
//! let module = DatabaseModule::new(
//!     Arc::new(MemoryDatabaseSdk::new()),
//!     Arc::new(sink),
//! );
//!
//! module.on(
//!     "messages",
//!     &["orderByChild:timestamp".into(), "limitToLast:10".into()],
//!     "value",
//!     Box::new(|ack| println!("listener ack: {ack:?}")),
//! );
//! module.set("messages/first", &json!({"text": "hi"}), Box::new(|_| {}));
//!
//! // The host drains `events` (tag, payload) pairs at its own pace.
//! ```

pub mod error;
mod memory;
mod modifier;
mod module;
mod push_id;
mod query;
mod registry;
pub mod sdk;

#[doc(inline)]
pub use error::{DatabaseError, DatabaseErrorCode, DatabaseResult};

#[doc(inline)]
pub use memory::MemoryDatabaseSdk;

#[doc(inline)]
pub use modifier::{parse_modifiers, Modifier, UnknownModifierPolicy};

#[doc(inline)]
pub use module::DatabaseModule;

#[doc(inline)]
pub use query::{CompiledQuery, QueryFilter, QueryOrder};

#[doc(inline)]
pub use registry::{ListenerRegistry, RefHandle};

#[doc(inline)]
pub use sdk::{DatabaseSdk, ListenerToken, Snapshot};
