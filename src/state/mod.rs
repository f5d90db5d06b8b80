pub mod row_cache;
pub mod session_registry;

pub use row_cache::{create_shared_row_cache, SharedRowCache};
pub use session_registry::{create_shared_session_registry, SessionSummary, SharedSessionRegistry};
