use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{BotError, Result};
use crate::models::{CallerIdentity, Row, RowPatch, RowSetSnapshot};
use crate::state::SharedRowCache;
use crate::supabase::{Scope, StatsBackend};

/// Data access for the stats table.
///
/// Non-admin reads go through the shared row cache. Admin reads always hit the
/// store and never populate the cache: the elevated credential sees rows that
/// row-level policies hide from editors. Every successful write invalidates it.
pub struct StatsManager {
    backend: Arc<dyn StatsBackend>,
    cache: SharedRowCache,
}

impl StatsManager {
    pub fn new(backend: Arc<dyn StatsBackend>, cache: SharedRowCache) -> Self {
        Self { backend, cache }
    }

    pub async fn fetch_all(&self, caller: &CallerIdentity) -> Result<RowSetSnapshot> {
        let scope = Scope::for_caller(caller);

        if caller.is_admin() {
            let rows = self.backend.select_all(scope).await.map_err(log_read_failure)?;
            return Ok(rows.into());
        }

        if let Some(rows) = self.cache.get() {
            debug!("Row cache hit ({} rows)", rows.len());
            return Ok(rows);
        }

        let ticket = self.cache.begin_refresh();
        let rows: RowSetSnapshot = self
            .backend
            .select_all(scope)
            .await
            .map_err(log_read_failure)?
            .into();
        self.cache.complete_refresh(ticket, rows.clone());
        Ok(rows)
    }

    /// Add a row. Names are unique ignoring case.
    pub async fn insert(&self, caller: &CallerIdentity, row: Row) -> Result<Row> {
        let row = Row {
            name: row.name.trim().to_string(),
            ..row
        };
        row.validate()?;

        let scope = Scope::for_caller(caller);
        let existing = self.backend.select_all(scope).await?;
        if let Some(duplicate) = existing.iter().find(|r| r.matches_name(&row.name)) {
            return Err(BotError::WriteRejected {
                message: format!("An entry named `{}` already exists.", duplicate.name),
            });
        }

        let inserted = self.backend.insert(scope, &row).await?;
        self.cache.invalidate();
        info!("Row '{}' added by {}", inserted.name, caller.user_id);
        Ok(inserted)
    }

    /// Merge the supplied fields into the row matching `name` (ignoring case).
    ///
    /// An empty patch changes nothing and returns `None` without touching the store.
    pub async fn update(
        &self,
        caller: &CallerIdentity,
        name: &str,
        patch: RowPatch,
    ) -> Result<Option<Row>> {
        if patch.is_empty() {
            return Ok(None);
        }
        patch.validate()?;

        let scope = Scope::for_caller(caller);
        let stored_name = self.resolve_name(scope, name).await?;
        let updated = self.backend.update(scope, &stored_name, &patch).await?;
        self.cache.invalidate();
        info!(
            "Row '{}' updated by {}: {}",
            updated.name,
            caller.user_id,
            patch.describe()
        );
        Ok(Some(updated))
    }

    pub async fn delete(&self, caller: &CallerIdentity, name: &str) -> Result<Row> {
        let scope = Scope::for_caller(caller);
        let stored_name = self.resolve_name(scope, name).await?;
        let deleted = self.backend.delete(scope, &stored_name).await?;
        self.cache.invalidate();
        info!("Row '{}' deleted by {}", deleted.name, caller.user_id);
        Ok(deleted)
    }

    /// Exact stored name for a case-insensitive key, read fresh from the store
    async fn resolve_name(&self, scope: Scope, name: &str) -> Result<String> {
        let rows = self.backend.select_all(scope).await?;
        rows.into_iter()
            .find(|r| r.matches_name(name))
            .map(|r| r.name)
            .ok_or_else(|| BotError::NotFound {
                entity: "entry",
                key: name.trim().to_string(),
            })
    }
}

fn log_read_failure(err: BotError) -> BotError {
    warn!("Failed to read stats table: {}", err);
    err
}

/// Shared stats manager type
pub type SharedStatsManager = Arc<StatsManager>;

pub fn create_shared_stats_manager(
    backend: Arc<dyn StatsBackend>,
    cache: SharedRowCache,
) -> SharedStatsManager {
    Arc::new(StatsManager::new(backend, cache))
}
