//! # firebase-bridge
//!
//! Bridging layer that exposes a native realtime-database and file-storage
//! SDK to a host application runtime. The host speaks dynamic values
//! (`serde_json::Value`) and per-call completion callbacks; the vendor SDKs
//! sit behind traits ([`database::DatabaseSdk`], [`storage::StorageSdk`])
//! and deliver typed snapshots and task notifications, which this crate
//! transcodes and forwards.
//!
//! The interesting machinery lives in three places:
//!
//! - [`database::parse_modifiers`] and [`database::CompiledQuery`]: the
//!   compact `op[:arg1[:arg2]]` query-modifier language, parsed once into a
//!   sum type and folded into a single composed query,
//! - [`database::ListenerRegistry`]: one live handle per logical path, with
//!   every native listener registration detached exactly once,
//! - [`marshal`]: lenient bidirectional conversion between host value trees
//!   and the SDK's tagged native values.
//!
//! Everything else is one-to-one method forwarding with uniform payload
//! shaping. Persistence, networking, retries, and consistency belong to
//! the vendor SDK; event delivery to the host belongs to the embedding
//! runtime via [`bridge::EventSink`].

pub mod bridge;
pub mod database;
pub mod marshal;
pub mod storage;

#[cfg(test)]
pub mod test_support;
