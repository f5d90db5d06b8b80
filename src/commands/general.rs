use poise::serenity_prelude as serenity;
use tracing::info;

use super::protocol::{run_command, PoiseResponder, Reply, Responder};
use crate::logging::LogBuffer;
use crate::managers::AccessManager;
use crate::models::Privilege;
use crate::table::MESSAGE_LIMIT;
use crate::{Context, Error};

pub const DEFAULT_LOG_LINES: usize = 15;
pub const MAX_LOG_LINES: usize = 50;

/// Check the bot's latency
#[poise::command(slash_command)]
pub async fn ping(ctx: Context<'_>) -> Result<(), Error> {
    let latency = ctx.ping().await;
    info!("Ping from {}: {}ms", ctx.author().name, latency.as_millis());
    ctx.say(format!("Pong! 🏓 {}ms", latency.as_millis()))
        .await?;
    Ok(())
}

/// Show help information
#[poise::command(slash_command)]
pub async fn help(ctx: Context<'_>) -> Result<(), Error> {
    let embed = serenity::CreateEmbed::new()
        .title("Stats Bot Commands")
        .description("Available commands:")
        .field(
            "/show_table",
            "Show the stats table, optionally sorted, with page buttons (Editor)",
            false,
        )
        .field(
            "/update_table",
            "Change sing, dance or rally for an entry (Editor)",
            false,
        )
        .field("/add_row", "Add a new entry (Admin)", false)
        .field("/delete_row", "Delete an entry (Admin)", false)
        .field("/add_editor", "Grant editor rights to a member (Admin)", false)
        .field("/remove_editor", "Revoke editor rights (Admin)", false)
        .field("/view_editors", "List current editors (Admin)", false)
        .field("/bot_logs", "Show recent bot log lines (Admin)", false)
        .field("/ping", "Check the bot's latency", false)
        .color(0x3498db);

    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}

/// Show recent bot log lines (admin only)
#[poise::command(slash_command)]
pub async fn bot_logs(
    ctx: Context<'_>,
    #[description = "Number of lines (default 15, max 50)"] count: Option<usize>,
) -> Result<(), Error> {
    let data = ctx.data();
    let responder = PoiseResponder::ephemeral(ctx);
    logs(&responder, &data.access, &data.log_buffer, count).await;
    Ok(())
}

pub async fn logs<R: Responder + ?Sized>(
    responder: &R,
    access: &AccessManager,
    buffer: &LogBuffer,
    count: Option<usize>,
) {
    let count = count.unwrap_or(DEFAULT_LOG_LINES).clamp(1, MAX_LOG_LINES);

    run_command(responder, access, Privilege::Admin, |_| async move {
        let fence = "```\n\n```".chars().count();
        let lines = buffer.render_recent(count, MESSAGE_LIMIT - fence);
        if lines.is_empty() {
            return Ok(Reply::Text("ℹ️ No log lines captured yet.".to_string()));
        }
        Ok(Reply::Text(format!("```\n{}\n```", lines.join("\n"))))
    })
    .await
}
