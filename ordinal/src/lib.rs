// Ordinal Actor Runtime
//
// This crate implements the runtime side of the Ordinal API: the per-type
// Router that orders, admits and correlates messages, the activation wrapper
// that owns actor memory, and an in-process host to run them on.

pub mod activation;
pub mod config;
pub mod instances;
pub mod logging;
pub mod registry;
pub mod router;
pub mod storage;
pub mod system;

pub use activation::ActorActivation;
pub use config::{ResetPolicy, RouterConfig};
pub use instances::LocalInstances;
pub use registry::{HandlerRegistry, HandlerRegistryBuilder};
pub use router::{Router, RouterDirectory};
pub use storage::{MemoryBackend, MemoryStore};
pub use system::ActorRuntime;

pub use ordinal_api_derive::*;

#[doc(hidden)]
pub use tracing as __tracing;
