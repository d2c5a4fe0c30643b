pub mod app_cache;
pub mod clock;
pub mod error;
pub mod events;
pub mod types;

pub use app_cache::AppCache;
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{CacheError, Result};
pub use events::{CacheEvent, ControlMessage, EventBus};
pub use types::{CacheEntry, L1Config, L1Stats, OperationKind};
