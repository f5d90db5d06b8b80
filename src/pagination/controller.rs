//! Binds a [`PaginationSession`] to a Discord message and drives it from button clicks.

use chrono::Utc;
use poise::serenity_prelude as serenity;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::session::{NavEvent, PageView, PaginationSession};
use crate::error::is_unknown_interaction;
use crate::state::{SessionSummary, SharedSessionRegistry};

pub const PREV_BUTTON_ID: &str = "table_prev";
pub const NEXT_BUTTON_ID: &str = "table_next";

pub fn decode_event(custom_id: &str) -> Option<NavEvent> {
    match custom_id {
        PREV_BUTTON_ID => Some(NavEvent::Prev),
        NEXT_BUTTON_ID => Some(NavEvent::Next),
        _ => None,
    }
}

/// Prev/Next row with enablement recomputed from the view
pub fn build_components(view: &PageView) -> Vec<serenity::CreateActionRow> {
    vec![serenity::CreateActionRow::Buttons(vec![
        serenity::CreateButton::new(PREV_BUTTON_ID)
            .label("◀ Prev")
            .style(serenity::ButtonStyle::Primary)
            .disabled(view.prev_disabled),
        serenity::CreateButton::new(NEXT_BUTTON_ID)
            .label("Next ▶")
            .style(serenity::ButtonStyle::Primary)
            .disabled(view.next_disabled),
    ])]
}

/// Register the session for `message` and hand it to a background controller task
pub fn attach(
    ctx: serenity::Context,
    message: serenity::Message,
    session: PaginationSession,
    registry: SharedSessionRegistry,
    owner_id: u64,
    idle: Duration,
) {
    registry.register(
        message.id.get(),
        SessionSummary {
            owner_id,
            channel_id: message.channel_id.get(),
            page: session.page(),
            max_page: session.max_page(),
            started_at: Utc::now(),
        },
    );

    tokio::spawn(run(ctx, message, session, registry, idle));
}

/// Collector loop for one table message.
///
/// Clicks are handled one at a time: each updates the session and edits the
/// message before the next click is read. Ends when the session expires.
pub async fn run(
    ctx: serenity::Context,
    message: serenity::Message,
    mut session: PaginationSession,
    registry: SharedSessionRegistry,
    idle: Duration,
) {
    let message_id = message.id.get();

    loop {
        let now = Instant::now();
        if session.is_expired(now, idle) {
            break;
        }
        let wait = session.remaining(now, idle);

        let Some(interaction) = message
            .await_component_interaction(ctx.shard.clone())
            .timeout(wait)
            .await
        else {
            break;
        };

        let Some(event) = decode_event(&interaction.data.custom_id) else {
            continue;
        };

        let view = session.handle(event, Instant::now());
        registry.set_page(message_id, view.page);
        debug!(
            "Table view {} moved to page {}/{} by {}",
            message_id, view.page, view.max_page, interaction.user.name
        );

        update_from_click(&ctx, &message, &interaction, &view).await;
    }

    let view = session.expire();
    edit_message(&ctx, &message, &view).await;
    let opened_for = registry
        .remove(message_id)
        .map(|summary| (Utc::now() - summary.started_at).num_seconds())
        .unwrap_or_default();
    info!(
        "Table view {} expired on page {} after {}s ({} still active)",
        message_id,
        view.page,
        opened_for,
        registry.active_count()
    );
}

/// Answer the click by updating the message in place, falling back to an edit by id
async fn update_from_click(
    ctx: &serenity::Context,
    message: &serenity::Message,
    interaction: &serenity::ComponentInteraction,
    view: &PageView,
) {
    let response = serenity::CreateInteractionResponse::UpdateMessage(
        serenity::CreateInteractionResponseMessage::new()
            .content(view.content.clone())
            .components(build_components(view)),
    );

    match interaction.create_response(ctx, response).await {
        Ok(()) => {}
        Err(e) => {
            if is_unknown_interaction(&e) {
                debug!("Click interaction on {} expired, editing by id", message.id);
            } else {
                warn!("Failed to update table view {}: {}", message.id, e);
            }
            edit_message(ctx, message, view).await;
        }
    }
}

async fn edit_message(ctx: &serenity::Context, message: &serenity::Message, view: &PageView) {
    let edit = serenity::EditMessage::new()
        .content(view.content.clone())
        .components(build_components(view));

    if let Err(e) = message.channel_id.edit_message(ctx, message.id, edit).await {
        warn!("Dropping update for table view {}: {}", message.id, e);
    }
}
