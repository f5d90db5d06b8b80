use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

/// What the rest of the bot may know about a live table view
#[derive(Debug, Clone)]
pub struct SessionSummary {
    pub owner_id: u64,
    pub channel_id: u64,
    pub page: usize,
    pub max_page: usize,
    pub started_at: DateTime<Utc>,
}

/// Live pagination sessions keyed by the message they are bound to.
///
/// The session state itself is owned by its controller task; this only mirrors it.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: DashMap<u64, SessionSummary>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, message_id: u64, summary: SessionSummary) {
        debug!(
            "Table view {} opened by {} in channel {} (page {}/{})",
            message_id, summary.owner_id, summary.channel_id, summary.page, summary.max_page
        );
        self.sessions.insert(message_id, summary);
    }

    pub fn set_page(&self, message_id: u64, page: usize) {
        if let Some(mut entry) = self.sessions.get_mut(&message_id) {
            entry.page = page;
        }
    }

    pub fn remove(&self, message_id: u64) -> Option<SessionSummary> {
        self.sessions.remove(&message_id).map(|(_, summary)| summary)
    }

    pub fn active_count(&self) -> usize {
        self.sessions.len()
    }
}

/// Shared session registry type
pub type SharedSessionRegistry = Arc<SessionRegistry>;

pub fn create_shared_session_registry() -> SharedSessionRegistry {
    Arc::new(SessionRegistry::new())
}
