use super::protocol::{run_command, PoiseResponder, Reply, Responder};
use crate::managers::{AccessManager, StatsManager};
use crate::models::{Privilege, Row};
use crate::{Context, Error};

/// Add a new row (admin)
#[poise::command(slash_command)]
pub async fn add_row(
    ctx: Context<'_>,
    #[description = "Entry name"] name: String,
    #[description = "Sing value"] sing: i64,
    #[description = "Dance value"] dance: i64,
    #[description = "Rally value"] rally: f64,
) -> Result<(), Error> {
    let data = ctx.data();
    let responder = PoiseResponder::new(ctx);
    add(
        &responder,
        &data.access,
        &data.stats,
        Row::new(name, sing, dance, rally),
    )
    .await;
    Ok(())
}

/// Delete a row (admin)
#[poise::command(slash_command)]
pub async fn delete_row(
    ctx: Context<'_>,
    #[description = "Entry name"] name: String,
) -> Result<(), Error> {
    let data = ctx.data();
    let responder = PoiseResponder::new(ctx);
    delete(&responder, &data.access, &data.stats, name).await;
    Ok(())
}

pub async fn add<R: Responder + ?Sized>(
    responder: &R,
    access: &AccessManager,
    stats: &StatsManager,
    row: Row,
) {
    run_command(responder, access, Privilege::Admin, |caller| async move {
        let inserted = stats.insert(&caller, row).await?;
        Ok(Reply::Text(format!("✅ Row for `{}` added.", inserted.name)))
    })
    .await
}

pub async fn delete<R: Responder + ?Sized>(
    responder: &R,
    access: &AccessManager,
    stats: &StatsManager,
    name: String,
) {
    run_command(responder, access, Privilege::Admin, |caller| async move {
        let deleted = stats.delete(&caller, &name).await?;
        Ok(Reply::Text(format!("🗑️ Row for `{}` deleted.", deleted.name)))
    })
    .await
}
