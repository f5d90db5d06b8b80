pub mod access_manager;
pub mod stats_manager;

pub use access_manager::{create_shared_access_manager, AccessManager, SharedAccessManager};
pub use stats_manager::{create_shared_stats_manager, SharedStatsManager, StatsManager};
