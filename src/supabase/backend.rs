use async_trait::async_trait;

use crate::error::Result;
use crate::models::{CallerIdentity, EditorGrant, Row, RowPatch};

/// Credential a remote call is made with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Service credential, bypasses row-level policies
    Elevated,
    /// Restricted credential, scoped to the calling user
    Restricted { user_id: u64 },
}

impl Scope {
    pub fn for_caller(caller: &CallerIdentity) -> Self {
        if caller.is_admin() {
            Scope::Elevated
        } else {
            Scope::Restricted {
                user_id: caller.user_id,
            }
        }
    }
}

/// The four operations on the stats table.
///
/// Keys passed to `update` and `delete` are exact stored names; an absent key
/// is reported as `NotFound`.
#[async_trait]
pub trait StatsBackend: Send + Sync {
    async fn select_all(&self, scope: Scope) -> Result<Vec<Row>>;

    async fn insert(&self, scope: Scope, row: &Row) -> Result<Row>;

    async fn update(&self, scope: Scope, name: &str, patch: &RowPatch) -> Result<Row>;

    async fn delete(&self, scope: Scope, name: &str) -> Result<Row>;
}

/// Storage for editor grants. Always accessed with the elevated credential.
#[async_trait]
pub trait EditorBackend: Send + Sync {
    async fn find_editor(&self, user_id: u64) -> Result<Option<EditorGrant>>;

    async fn list_editors(&self) -> Result<Vec<EditorGrant>>;

    async fn insert_editor(&self, grant: &EditorGrant) -> Result<EditorGrant>;

    async fn delete_editor(&self, user_id: u64) -> Result<EditorGrant>;
}
