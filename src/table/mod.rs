//! Table formatting and the sort/page engine shared by every read command.

pub mod paging;
pub mod render;

pub use paging::{page_count, paginate, sort_rows};
pub use render::{
    render_clipped_page, render_compact_page, render_editors, render_page, MESSAGE_LIMIT,
};
