//! Walletlink Infrastructure - Adapters and implementations
//!
//! This crate provides concrete implementations of the ports
//! defined in the application layer.

pub mod adapters;
pub mod persistence;
pub mod serialization;

pub use adapters::{
    ManualClock, ReqwestTransport, ScriptedTransport, SystemClock, TracingNotifier, USER_AGENT,
};
pub use persistence::{FileSettingsStore, MemorySettingsStore};
pub use serialization::{SerializationError, from_json_bytes, to_json_stable, to_json_stable_bytes};
