use tracing::debug;

use super::protocol::{run_command, PoiseResponder, Reply, Responder};
use crate::managers::{AccessManager, StatsManager};
use crate::models::{Privilege, SortColumn};
use crate::pagination::PaginationSession;
use crate::{Context, Error};

/// Arguments of a table read
#[derive(Debug, Clone, Copy)]
pub struct TableRequest {
    pub sort_by: Option<SortColumn>,
    pub descending: bool,
    pub page: i64,
}

/// Show the stats table with sorting and pagination (editor)
#[poise::command(slash_command)]
pub async fn show_table(
    ctx: Context<'_>,
    #[description = "Column to sort by"] sort_by: Option<SortColumn>,
    #[description = "Descending order? (default True)"] sort_desc: Option<bool>,
    #[description = "Page number (default 1)"] page: Option<i64>,
) -> Result<(), Error> {
    let data = ctx.data();
    let request = TableRequest {
        sort_by,
        descending: sort_desc.unwrap_or(true),
        page: page.unwrap_or(1),
    };

    let responder = PoiseResponder::new(ctx);
    execute(
        &responder,
        &data.access,
        &data.stats,
        request,
        data.config.page_size,
    )
    .await;
    Ok(())
}

pub async fn execute<R: Responder + ?Sized>(
    responder: &R,
    access: &AccessManager,
    stats: &StatsManager,
    request: TableRequest,
    page_size: usize,
) {
    run_command(responder, access, Privilege::Editor, |caller| async move {
        let rows = stats.fetch_all(&caller).await?;
        debug!(
            "Opening table view: {} rows, sort {:?} desc={}, page {}",
            rows.len(),
            request.sort_by.map(|c| c.as_str()),
            request.descending,
            request.page
        );

        let session = PaginationSession::new(
            rows,
            request.sort_by,
            request.descending,
            request.page,
            page_size,
        )?;
        Ok(Reply::Table(session))
    })
    .await
}
