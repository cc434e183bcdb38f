//! In-process implementation of the host's per-instance durable store.

pub mod memory;

pub use memory::{MemoryBackend, MemoryStore};
