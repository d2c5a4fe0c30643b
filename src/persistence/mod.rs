//! Best-effort durable mirror for the application cache.
//!
//! The in-memory tier is always authoritative; a failed write or a corrupt
//! record never affects cache correctness.

pub mod store;
pub mod types;

pub use store::{RECORD_PREFIX, RecordStore};
pub use types::{LoadReport, PersistedRecord, PersistenceConfig, PersistenceError, Result};
