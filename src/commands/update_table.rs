use super::protocol::{run_command, PoiseResponder, Reply, Responder};
use crate::error::BotError;
use crate::managers::{AccessManager, StatsManager};
use crate::models::{Privilege, RowPatch};
use crate::{Context, Error};

/// Update a stats row (editor)
#[poise::command(slash_command)]
pub async fn update_table(
    ctx: Context<'_>,
    #[description = "Entry name"] name: String,
    #[description = "New sing value"] sing: Option<i64>,
    #[description = "New dance value"] dance: Option<i64>,
    #[description = "New rally value"] rally: Option<f64>,
) -> Result<(), Error> {
    let data = ctx.data();
    let patch = RowPatch { sing, dance, rally };

    let responder = PoiseResponder::new(ctx);
    execute(&responder, &data.access, &data.stats, name, patch).await;
    Ok(())
}

fn nothing_to_update() -> BotError {
    BotError::validation("Nothing to update: supply at least one of `sing`, `dance` or `rally`.")
}

pub async fn execute<R: Responder + ?Sized>(
    responder: &R,
    access: &AccessManager,
    stats: &StatsManager,
    name: String,
    patch: RowPatch,
) {
    run_command(responder, access, Privilege::Editor, |caller| async move {
        if patch.is_empty() {
            return Err(nothing_to_update());
        }

        let feedback = patch.describe();
        match stats.update(&caller, &name, patch).await? {
            Some(row) => Ok(Reply::Text(format!(
                "✅ Updated `{}` with {}",
                row.name, feedback
            ))),
            None => Err(nothing_to_update()),
        }
    })
    .await
}
