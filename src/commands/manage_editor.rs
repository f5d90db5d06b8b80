use poise::serenity_prelude as serenity;

use super::protocol::{run_command, PoiseResponder, Reply, Responder};
use crate::error::BotError;
use crate::managers::AccessManager;
use crate::models::Privilege;
use crate::table::render_editors;
use crate::{Context, Error};

/// Target of an editor grant or revocation
#[derive(Debug, Clone)]
pub struct Member {
    pub id: u64,
    pub name: String,
}

impl Member {
    fn mention(&self) -> String {
        format!("<@{}>", self.id)
    }
}

impl From<&serenity::User> for Member {
    fn from(user: &serenity::User) -> Self {
        Self {
            id: user.id.get(),
            name: user.name.clone(),
        }
    }
}

/// List all current editors (admin only)
#[poise::command(slash_command)]
pub async fn view_editors(ctx: Context<'_>) -> Result<(), Error> {
    let responder = PoiseResponder::ephemeral(ctx);
    list(&responder, &ctx.data().access).await;
    Ok(())
}

/// Grant someone editor rights (admin only)
#[poise::command(slash_command)]
pub async fn add_editor(
    ctx: Context<'_>,
    #[description = "Member to grant editor rights"] member: serenity::User,
) -> Result<(), Error> {
    let responder = PoiseResponder::ephemeral(ctx);
    grant(&responder, &ctx.data().access, Member::from(&member)).await;
    Ok(())
}

/// Revoke editor rights (admin only)
#[poise::command(slash_command)]
pub async fn remove_editor(
    ctx: Context<'_>,
    #[description = "Member to revoke editor rights from"] member: serenity::User,
) -> Result<(), Error> {
    let responder = PoiseResponder::ephemeral(ctx);
    revoke(&responder, &ctx.data().access, Member::from(&member)).await;
    Ok(())
}

pub async fn list<R: Responder + ?Sized>(responder: &R, access: &AccessManager) {
    run_command(responder, access, Privilege::Admin, |_| async move {
        let grants = access.list_editors().await?;
        if grants.is_empty() {
            return Ok(Reply::Text("ℹ️ No editors found.".to_string()));
        }
        Ok(Reply::Text(render_editors(&grants)))
    })
    .await
}

pub async fn grant<R: Responder + ?Sized>(responder: &R, access: &AccessManager, member: Member) {
    run_command(responder, access, Privilege::Admin, |_| async move {
        access.grant_editor(member.id, &member.name).await?;
        Ok(Reply::Text(format!("✅ {} is now an editor.", member.mention())))
    })
    .await
}

pub async fn revoke<R: Responder + ?Sized>(responder: &R, access: &AccessManager, member: Member) {
    run_command(responder, access, Privilege::Admin, |_| async move {
        match access.revoke_editor(member.id).await {
            Ok(_) => Ok(Reply::Text(format!(
                "✅ {} is no longer an editor.",
                member.mention()
            ))),
            Err(BotError::NotFound { entity, .. }) => Err(BotError::NotFound {
                entity,
                key: member.name.clone(),
            }),
            Err(e) => Err(e),
        }
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EditorGrant;
    use crate::testing::{MemoryEditorBackend, RecordingResponder, Sent};
    use chrono::{TimeZone, Utc};
    use std::collections::HashSet;
    use std::sync::Arc;

    const ADMIN: u64 = 1;
    const EDITOR: u64 = 2;

    fn setup() -> (Arc<MemoryEditorBackend>, AccessManager) {
        let editors = Arc::new(MemoryEditorBackend::new());
        editors.seed(EditorGrant {
            discord_id: EDITOR,
            discord_name: "ed".to_string(),
            added_at: Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap(),
        });
        (editors.clone(), AccessManager::new(HashSet::from([ADMIN]), editors))
    }

    fn member(id: u64, name: &str) -> Member {
        Member {
            id,
            name: name.to_string(),
        }
    }

    #[tokio::test]
    async fn test_editors_cannot_manage_editors() {
        let (_, access) = setup();
        let responder = RecordingResponder::new(EDITOR);

        grant(&responder, &access, member(9, "nine")).await;

        assert_eq!(
            responder.sent(),
            vec![Sent::Immediate("❌ You're not authorized.".to_string())]
        );
    }

    #[tokio::test]
    async fn test_grant_list_revoke() {
        let (_, access) = setup();

        let responder = RecordingResponder::new(ADMIN);
        grant(&responder, &access, member(9, "nine")).await;
        assert_eq!(responder.last_text().unwrap(), "✅ <@9> is now an editor.");

        let responder = RecordingResponder::new(ADMIN);
        list(&responder, &access).await;
        let table = responder.last_text().unwrap();
        let nine = table.find("| nine ").unwrap();
        let ed = table.find("| ed ").unwrap();
        assert!(nine < ed, "newest grant first:\n{}", table);

        let responder = RecordingResponder::new(ADMIN);
        revoke(&responder, &access, member(9, "nine")).await;
        assert_eq!(
            responder.last_text().unwrap(),
            "✅ <@9> is no longer an editor."
        );

        let responder = RecordingResponder::new(ADMIN);
        revoke(&responder, &access, member(9, "nine")).await;
        assert_eq!(
            responder.last_text().unwrap(),
            "❌ No editor grant found for `nine`."
        );
    }

    #[tokio::test]
    async fn test_empty_editor_list() {
        let (_, access) = setup();
        access.revoke_editor(EDITOR).await.unwrap();

        let responder = RecordingResponder::new(ADMIN);
        list(&responder, &access).await;
        assert_eq!(responder.last_text().unwrap(), "ℹ️ No editors found.");
    }

    #[tokio::test]
    async fn test_duplicate_grant() {
        let (_, access) = setup();
        let responder = RecordingResponder::new(ADMIN);

        grant(&responder, &access, member(EDITOR, "ed")).await;
        assert_eq!(
            responder.last_text().unwrap(),
            "❌ <@2> is already an editor."
        );
    }
}
