//! Deterministic JSON serialization for the settings file.
//!
//! Keeps the file diff-friendly by sorting keys (via `BTreeMap`), using
//! 2-space indentation and ending with a newline.

mod json;

pub use json::{SerializationError, from_json_bytes, to_json_stable, to_json_stable_bytes};
