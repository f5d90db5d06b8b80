pub mod general;
pub mod manage_editor;
pub mod manage_row;
pub mod protocol;
pub mod show_table;
pub mod update_table;

pub use general::{bot_logs, help, ping};
pub use manage_editor::{add_editor, remove_editor, view_editors};
pub use manage_row::{add_row, delete_row};
pub use show_table::show_table;
pub use update_table::update_table;
