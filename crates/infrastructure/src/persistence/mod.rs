//! Settings persistence.

mod memory_store;
mod settings_store;

pub use memory_store::MemorySettingsStore;
pub use settings_store::FileSettingsStore;
