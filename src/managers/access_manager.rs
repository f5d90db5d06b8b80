use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::error::{BotError, Result};
use crate::models::{AccessLevel, CallerIdentity, EditorGrant};
use crate::supabase::EditorBackend;

/// Classification runs before the interaction is acknowledged, which Discord
/// requires within 3 seconds.
pub const EDITOR_LOOKUP_TIMEOUT: Duration = Duration::from_secs(2);

/// Resolves who a caller is and manages the editor allow-list
pub struct AccessManager {
    admin_ids: HashSet<u64>,
    editors: Arc<dyn EditorBackend>,
    lookup_timeout: Duration,
}

impl AccessManager {
    pub fn new(admin_ids: HashSet<u64>, editors: Arc<dyn EditorBackend>) -> Self {
        Self {
            admin_ids,
            editors,
            lookup_timeout: EDITOR_LOOKUP_TIMEOUT,
        }
    }

    pub fn with_lookup_timeout(mut self, timeout: Duration) -> Self {
        self.lookup_timeout = timeout;
        self
    }

    pub fn is_admin(&self, user_id: u64) -> bool {
        self.admin_ids.contains(&user_id)
    }

    /// Admins are recognized without I/O. A failed or slow editor lookup denies access.
    pub async fn classify(&self, user_id: u64) -> CallerIdentity {
        let access = if self.is_admin(user_id) {
            AccessLevel::Admin
        } else {
            match tokio::time::timeout(self.lookup_timeout, self.editors.find_editor(user_id)).await
            {
                Ok(Ok(Some(_))) => AccessLevel::Editor,
                Ok(Ok(None)) => AccessLevel::Plain,
                Ok(Err(e)) => {
                    warn!("Editor lookup for {} failed, treating as plain user: {}", user_id, e);
                    AccessLevel::Plain
                }
                Err(_) => {
                    warn!(
                        "Editor lookup for {} took longer than {}ms, treating as plain user",
                        user_id,
                        self.lookup_timeout.as_millis()
                    );
                    AccessLevel::Plain
                }
            }
        };

        CallerIdentity { user_id, access }
    }

    pub async fn grant_editor(&self, user_id: u64, display_name: &str) -> Result<EditorGrant> {
        if self.editors.find_editor(user_id).await?.is_some() {
            return Err(BotError::WriteRejected {
                message: format!("<@{}> is already an editor.", user_id),
            });
        }

        let grant = EditorGrant {
            discord_id: user_id,
            discord_name: display_name.to_string(),
            added_at: Utc::now(),
        };
        let stored = self.editors.insert_editor(&grant).await?;
        info!("Editor rights granted to {} ({})", display_name, user_id);
        Ok(stored)
    }

    pub async fn revoke_editor(&self, user_id: u64) -> Result<EditorGrant> {
        let removed = self.editors.delete_editor(user_id).await?;
        info!(
            "Editor rights revoked from {} ({})",
            removed.discord_name, user_id
        );
        Ok(removed)
    }

    /// All grants, newest first
    pub async fn list_editors(&self) -> Result<Vec<EditorGrant>> {
        let mut grants = self.editors.list_editors().await?;
        grants.sort_by(|a, b| b.added_at.cmp(&a.added_at));
        Ok(grants)
    }
}

/// Shared access manager type
pub type SharedAccessManager = Arc<AccessManager>;

pub fn create_shared_access_manager(
    admin_ids: HashSet<u64>,
    editors: Arc<dyn EditorBackend>,
) -> SharedAccessManager {
    Arc::new(AccessManager::new(admin_ids, editors))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryEditorBackend;
    use chrono::{Duration, TimeZone};

    const ADMIN: u64 = 762749123770056746;
    const EDITOR: u64 = 500;
    const PLAIN: u64 = 600;

    fn setup() -> (Arc<MemoryEditorBackend>, AccessManager) {
        let editors = Arc::new(MemoryEditorBackend::new());
        editors.seed(EditorGrant {
            discord_id: EDITOR,
            discord_name: "ed".to_string(),
            added_at: Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap(),
        });
        let manager = AccessManager::new(HashSet::from([ADMIN]), editors.clone());
        (editors, manager)
    }

    #[tokio::test]
    async fn test_classify() {
        let (editors, manager) = setup();

        assert_eq!(manager.classify(ADMIN).await.access, AccessLevel::Admin);
        // Admin check needs no lookup
        assert_eq!(editors.lookup_calls(), 0);

        assert_eq!(manager.classify(EDITOR).await.access, AccessLevel::Editor);
        assert_eq!(manager.classify(PLAIN).await.access, AccessLevel::Plain);
    }

    #[tokio::test]
    async fn test_lookup_failure_fails_closed() {
        let (editors, manager) = setup();
        editors.set_unavailable(true);

        assert_eq!(manager.classify(EDITOR).await.access, AccessLevel::Plain);
        assert_eq!(manager.classify(ADMIN).await.access, AccessLevel::Admin);
    }

    #[tokio::test]
    async fn test_slow_lookup_fails_closed_within_budget() {
        let (editors, manager) = setup();
        let manager = manager.with_lookup_timeout(std::time::Duration::from_millis(50));
        editors.set_lookup_delay(std::time::Duration::from_secs(10));

        let started = std::time::Instant::now();
        assert_eq!(manager.classify(EDITOR).await.access, AccessLevel::Plain);
        assert!(started.elapsed() < std::time::Duration::from_secs(2));

        assert!(EDITOR_LOOKUP_TIMEOUT < std::time::Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_grant_and_revoke() {
        let (_, manager) = setup();

        manager.grant_editor(PLAIN, "newbie").await.unwrap();
        assert_eq!(manager.classify(PLAIN).await.access, AccessLevel::Editor);

        assert!(matches!(
            manager.grant_editor(PLAIN, "newbie").await,
            Err(BotError::WriteRejected { .. })
        ));

        let removed = manager.revoke_editor(PLAIN).await.unwrap();
        assert_eq!(removed.discord_name, "newbie");
        assert!(matches!(
            manager.revoke_editor(PLAIN).await,
            Err(BotError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let (editors, manager) = setup();
        let base = Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap();
        for (id, days) in [(1u64, 3), (2, -2), (3, 7)] {
            editors.seed(EditorGrant {
                discord_id: id,
                discord_name: format!("user{}", id),
                added_at: base + Duration::days(days),
            });
        }

        let ids: Vec<u64> = manager
            .list_editors()
            .await
            .unwrap()
            .iter()
            .map(|g| g.discord_id)
            .collect();
        assert_eq!(ids, vec![3, 1, EDITOR, 2]);
    }
}
