//! In-memory doubles for the backend and responder seams

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use crate::commands::protocol::{Reply, Responder};
use crate::error::{BotError, Result};
use crate::models::{EditorGrant, Row, RowPatch};
use crate::supabase::{EditorBackend, Scope, StatsBackend};

fn outage() -> BotError {
    BotError::remote("simulated outage")
}

#[derive(Default)]
pub struct MemoryStatsBackend {
    rows: Mutex<Vec<Row>>,
    last_scope: Mutex<Option<Scope>>,
    unavailable: AtomicBool,
    selects: AtomicUsize,
    writes: AtomicUsize,
}

impl MemoryStatsBackend {
    pub fn with_rows(rows: Vec<Row>) -> Self {
        Self {
            rows: Mutex::new(rows),
            ..Default::default()
        }
    }

    pub fn rows(&self) -> Vec<Row> {
        self.rows.lock().clone()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn select_calls(&self) -> usize {
        self.selects.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.select_calls() + self.writes.load(Ordering::SeqCst)
    }

    pub fn last_scope(&self) -> Option<Scope> {
        *self.last_scope.lock()
    }

    fn enter(&self, scope: Scope, counter: &AtomicUsize) -> Result<()> {
        counter.fetch_add(1, Ordering::SeqCst);
        *self.last_scope.lock() = Some(scope);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(outage());
        }
        Ok(())
    }
}

#[async_trait]
impl StatsBackend for MemoryStatsBackend {
    async fn select_all(&self, scope: Scope) -> Result<Vec<Row>> {
        self.enter(scope, &self.selects)?;
        Ok(self.rows())
    }

    async fn insert(&self, scope: Scope, row: &Row) -> Result<Row> {
        self.enter(scope, &self.writes)?;
        let mut rows = self.rows.lock();
        if rows.iter().any(|r| r.name == row.name) {
            return Err(BotError::WriteRejected {
                message: "duplicate key".to_string(),
            });
        }
        rows.push(row.clone());
        Ok(row.clone())
    }

    async fn update(&self, scope: Scope, name: &str, patch: &RowPatch) -> Result<Row> {
        self.enter(scope, &self.writes)?;
        let mut rows = self.rows.lock();
        let row = rows
            .iter_mut()
            .find(|r| r.name == name)
            .ok_or_else(|| BotError::NotFound {
                entity: "entry",
                key: name.to_string(),
            })?;
        if patch.sing.is_some() {
            row.sing = patch.sing;
        }
        if patch.dance.is_some() {
            row.dance = patch.dance;
        }
        if patch.rally.is_some() {
            row.rally = patch.rally;
        }
        Ok(row.clone())
    }

    async fn delete(&self, scope: Scope, name: &str) -> Result<Row> {
        self.enter(scope, &self.writes)?;
        let mut rows = self.rows.lock();
        let index = rows
            .iter()
            .position(|r| r.name == name)
            .ok_or_else(|| BotError::NotFound {
                entity: "entry",
                key: name.to_string(),
            })?;
        Ok(rows.remove(index))
    }
}

#[derive(Default)]
pub struct MemoryEditorBackend {
    grants: Mutex<Vec<EditorGrant>>,
    unavailable: AtomicBool,
    lookups: AtomicUsize,
    lookup_delay: Mutex<Option<Duration>>,
}

impl MemoryEditorBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, grant: EditorGrant) {
        self.grants.lock().push(grant);
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Make every editor lookup hang for `delay` before answering
    pub fn set_lookup_delay(&self, delay: Duration) {
        *self.lookup_delay.lock() = Some(delay);
    }

    pub fn lookup_calls(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(outage());
        }
        Ok(())
    }
}

#[async_trait]
impl EditorBackend for MemoryEditorBackend {
    async fn find_editor(&self, user_id: u64) -> Result<Option<EditorGrant>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        let delay = *self.lookup_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.check()?;
        Ok(self
            .grants
            .lock()
            .iter()
            .find(|g| g.discord_id == user_id)
            .cloned())
    }

    async fn list_editors(&self) -> Result<Vec<EditorGrant>> {
        self.check()?;
        Ok(self.grants.lock().clone())
    }

    async fn insert_editor(&self, grant: &EditorGrant) -> Result<EditorGrant> {
        self.check()?;
        self.grants.lock().push(grant.clone());
        Ok(grant.clone())
    }

    async fn delete_editor(&self, user_id: u64) -> Result<EditorGrant> {
        self.check()?;
        let mut grants = self.grants.lock();
        let index = grants
            .iter()
            .position(|g| g.discord_id == user_id)
            .ok_or_else(|| BotError::NotFound {
                entity: "editor grant",
                key: user_id.to_string(),
            })?;
        Ok(grants.remove(index))
    }
}

/// What a [`RecordingResponder`] was asked to send
#[derive(Debug, Clone, PartialEq)]
pub enum Sent {
    Immediate(String),
    Deferred,
    FollowUp(String),
    /// A table view: its page, page count and rendered content
    Table {
        page: usize,
        max_page: usize,
        content: String,
    },
}

pub struct RecordingResponder {
    user_id: u64,
    deferred: AtomicBool,
    sent: Mutex<Vec<Sent>>,
}

impl RecordingResponder {
    pub fn new(user_id: u64) -> Self {
        Self {
            user_id,
            deferred: AtomicBool::new(false),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().clone()
    }

    /// The single terminal message, whichever path produced it
    pub fn last_text(&self) -> Option<String> {
        self.sent().into_iter().rev().find_map(|s| match s {
            Sent::Immediate(text) | Sent::FollowUp(text) => Some(text),
            Sent::Table { content, .. } => Some(content),
            Sent::Deferred => None,
        })
    }
}

#[async_trait]
impl Responder for RecordingResponder {
    fn command_name(&self) -> &str {
        "test"
    }

    fn user_id(&self) -> u64 {
        self.user_id
    }

    async fn reply_immediately(&self, content: &str) -> Result<()> {
        self.sent.lock().push(Sent::Immediate(content.to_string()));
        Ok(())
    }

    async fn defer(&self) -> Result<()> {
        if self.deferred.swap(true, Ordering::SeqCst) {
            return Err(BotError::InteractionAlreadyAcknowledged);
        }
        self.sent.lock().push(Sent::Deferred);
        Ok(())
    }

    async fn follow_up(&self, reply: Reply) -> Result<()> {
        let sent = match reply {
            Reply::Text(text) => Sent::FollowUp(text),
            Reply::Table(session) => {
                let view = session.render();
                Sent::Table {
                    page: view.page,
                    max_page: view.max_page,
                    content: view.content,
                }
            }
        };
        self.sent.lock().push(sent);
        Ok(())
    }
}
