//! Logging setup and memory instrumentation shared by the cutplane crates.

pub mod logging;
pub mod memory;

pub use logging::{LoggingError, init_logging};
pub use memory::{MemoryError, MemoryTracker, MemorySnapshot};
