pub mod settings;

pub use settings::{BotConfig, Secret, SupabaseSettings};
