//! Request/response handshake shared by every gated command.
//!
//! `run_command` is the only place where a typed failure becomes user-visible
//! text, and it sends exactly one terminal response per invocation.

use async_trait::async_trait;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, error, info, warn};

use crate::error::{BotError, Result};
use crate::managers::AccessManager;
use crate::models::{CallerIdentity, Privilege};
use crate::pagination::{self, PaginationSession};
use crate::Context;

/// Outcome of a command's work
#[derive(Debug)]
pub enum Reply {
    Text(String),
    /// Interactive table view; the controller takes over after it is sent
    Table(PaginationSession),
}

/// The interaction a command answers
#[async_trait]
pub trait Responder: Send + Sync {
    fn command_name(&self) -> &str;

    fn user_id(&self) -> u64;

    /// Respond without deferring; used for privilege denials
    async fn reply_immediately(&self, content: &str) -> Result<()>;

    /// Acknowledge the interaction. A second call fails with `InteractionAlreadyAcknowledged`.
    async fn defer(&self) -> Result<()>;

    async fn follow_up(&self, reply: Reply) -> Result<()>;
}

/// Classify the caller, gate on `required`, defer, run `work`, then send one follow-up.
pub async fn run_command<R, F, Fut>(
    responder: &R,
    access: &AccessManager,
    required: Privilege,
    work: F,
) where
    R: Responder + ?Sized,
    F: FnOnce(CallerIdentity) -> Fut,
    Fut: Future<Output = Result<Reply>>,
{
    let command = responder.command_name().to_string();
    let caller = access.classify(responder.user_id()).await;

    if !caller.satisfies(required) {
        info!(
            "Denied /{} to {} ({:?}, needs {})",
            command,
            caller.user_id,
            caller.access,
            required.as_str()
        );
        let denial = BotError::Unauthorized {
            required: required.as_str(),
        };
        if let Err(e) = responder.reply_immediately(&denial.user_message(false)).await {
            warn!("Failed to send denial for /{}: {}", command, e);
        }
        return;
    }

    match responder.defer().await {
        Ok(()) | Err(BotError::InteractionAlreadyAcknowledged) => {}
        Err(e) => warn!("Failed to defer /{}: {}", command, e),
    }

    let reply = match work(caller).await {
        Ok(reply) => reply,
        Err(e) => {
            log_failure(&command, &caller, &e);
            Reply::Text(e.user_message(caller.is_admin()))
        }
    };

    if let Err(e) = responder.follow_up(reply).await {
        if e.is_expected() {
            debug!("Follow-up for /{} already sent", command);
        } else {
            error!("Failed to send follow-up for /{}: {}", command, e);
        }
    }
}

fn log_failure(command: &str, caller: &CallerIdentity, err: &BotError) {
    match err {
        BotError::InteractionAlreadyAcknowledged => {
            debug!("/{}: interaction already acknowledged", command)
        }
        BotError::Unauthorized { .. }
        | BotError::Validation { .. }
        | BotError::NotFound { .. }
        | BotError::PageOutOfRange { .. }
        | BotError::WriteRejected { .. } => {
            info!("/{} by {} refused: {}", command, caller.user_id, err)
        }
        _ => error!("/{} by {} failed: {}", command, caller.user_id, err),
    }
}

/// [`Responder`] over a poise slash-command context
pub struct PoiseResponder<'a> {
    ctx: Context<'a>,
    ephemeral: bool,
    deferred: AtomicBool,
}

impl<'a> PoiseResponder<'a> {
    pub fn new(ctx: Context<'a>) -> Self {
        Self {
            ctx,
            ephemeral: false,
            deferred: AtomicBool::new(false),
        }
    }

    /// Only the invoking user sees the responses
    pub fn ephemeral(ctx: Context<'a>) -> Self {
        Self {
            ephemeral: true,
            ..Self::new(ctx)
        }
    }
}

#[async_trait]
impl Responder for PoiseResponder<'_> {
    fn command_name(&self) -> &str {
        &self.ctx.command().qualified_name
    }

    fn user_id(&self) -> u64 {
        self.ctx.author().id.get()
    }

    async fn reply_immediately(&self, content: &str) -> Result<()> {
        self.ctx
            .send(
                poise::CreateReply::default()
                    .content(content)
                    .ephemeral(true),
            )
            .await?;
        Ok(())
    }

    async fn defer(&self) -> Result<()> {
        if self.deferred.swap(true, Ordering::SeqCst) {
            return Err(BotError::InteractionAlreadyAcknowledged);
        }
        if self.ephemeral {
            self.ctx.defer_ephemeral().await?;
        } else {
            self.ctx.defer().await?;
        }
        Ok(())
    }

    async fn follow_up(&self, reply: Reply) -> Result<()> {
        match reply {
            Reply::Text(content) => {
                self.ctx
                    .send(
                        poise::CreateReply::default()
                            .content(content)
                            .ephemeral(self.ephemeral),
                    )
                    .await?;
            }
            Reply::Table(session) => {
                let view = session.render();
                let handle = self
                    .ctx
                    .send(
                        poise::CreateReply::default()
                            .content(view.content.clone())
                            .components(pagination::build_components(&view))
                            .ephemeral(self.ephemeral),
                    )
                    .await?;
                let message = handle.message().await?.into_owned();

                let data = self.ctx.data();
                pagination::attach(
                    self.ctx.serenity_context().clone(),
                    message,
                    session,
                    data.sessions.clone(),
                    self.user_id(),
                    data.config.session_idle,
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EditorGrant;
    use crate::testing::{MemoryEditorBackend, RecordingResponder, Sent};
    use chrono::Utc;
    use std::collections::HashSet;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    const ADMIN: u64 = 1;
    const EDITOR: u64 = 2;
    const PLAIN: u64 = 3;

    fn access() -> (Arc<MemoryEditorBackend>, AccessManager) {
        let editors = Arc::new(MemoryEditorBackend::new());
        editors.seed(EditorGrant {
            discord_id: EDITOR,
            discord_name: "ed".to_string(),
            added_at: Utc::now(),
        });
        (editors.clone(), AccessManager::new(HashSet::from([ADMIN]), editors))
    }

    #[tokio::test]
    async fn test_denial_is_immediate_and_skips_work() {
        let (_, access) = access();
        let responder = RecordingResponder::new(PLAIN);
        let ran = AtomicUsize::new(0);

        run_command(&responder, &access, Privilege::Editor, |_| async {
            ran.fetch_add(1, Ordering::SeqCst);
            Ok(Reply::Text("done".to_string()))
        })
        .await;

        assert_eq!(ran.load(Ordering::SeqCst), 0);
        assert_eq!(
            responder.sent(),
            vec![Sent::Immediate("❌ You're not authorized.".to_string())]
        );
    }

    #[tokio::test]
    async fn test_success_defers_then_follows_up_once() {
        let (_, access) = access();
        let responder = RecordingResponder::new(EDITOR);

        run_command(&responder, &access, Privilege::Editor, |caller| async move {
            Ok(Reply::Text(format!("hello {}", caller.user_id)))
        })
        .await;

        assert_eq!(
            responder.sent(),
            vec![Sent::Deferred, Sent::FollowUp("hello 2".to_string())]
        );
    }

    #[tokio::test]
    async fn test_already_acknowledged_defer_is_swallowed() {
        let (_, access) = access();
        let responder = RecordingResponder::new(ADMIN);
        responder.defer().await.unwrap();

        run_command(&responder, &access, Privilege::Admin, |_| async {
            Ok(Reply::Text("ok".to_string()))
        })
        .await;

        assert_eq!(
            responder.sent(),
            vec![Sent::Deferred, Sent::FollowUp("ok".to_string())]
        );
    }

    #[tokio::test]
    async fn test_failure_becomes_one_follow_up() {
        let (_, access) = access();
        let responder = RecordingResponder::new(EDITOR);

        run_command(&responder, &access, Privilege::Editor, |_| async {
            Err(BotError::remote("connection reset by 10.1.2.3"))
        })
        .await;

        let sent = responder.sent();
        assert_eq!(sent.len(), 2);
        match &sent[1] {
            Sent::FollowUp(text) => {
                assert!(text.contains("try again later"));
                assert!(!text.contains("10.1.2.3"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_admin_sees_remote_detail() {
        let (_, access) = access();
        let responder = RecordingResponder::new(ADMIN);

        run_command(&responder, &access, Privilege::Editor, |_| async {
            Err(BotError::remote("HTTP 503 from store"))
        })
        .await;

        assert!(matches!(&responder.sent()[1], Sent::FollowUp(t) if t.contains("HTTP 503")));
    }

    #[tokio::test]
    async fn test_broken_editor_store_denies() {
        let (editors, access) = access();
        editors.set_unavailable(true);
        let responder = RecordingResponder::new(EDITOR);

        run_command(&responder, &access, Privilege::Editor, |_| async {
            Ok(Reply::Text("should not run".to_string()))
        })
        .await;

        assert_eq!(
            responder.sent(),
            vec![Sent::Immediate("❌ You're not authorized.".to_string())]
        );
    }
}
