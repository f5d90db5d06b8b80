use thiserror::Error;

#[derive(Error, Debug)]
pub enum BotError {
    // Caller errors
    #[error("Caller lacks the {required} privilege")]
    Unauthorized { required: &'static str },

    #[error("Invalid input: {message}")]
    Validation { message: String },

    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    #[error("Page {page} is out of range (1-{max_page})")]
    PageOutOfRange { page: i64, max_page: usize },

    // Backing store errors
    #[error("Backing store unavailable: {message}")]
    RemoteUnavailable { message: String },

    #[error("Write rejected: {message}")]
    WriteRejected { message: String },

    // Platform errors
    #[error("Interaction already acknowledged")]
    InteractionAlreadyAcknowledged,

    #[error("Discord API error: {message}")]
    Discord { message: String },

    // Startup errors
    #[error("Missing required configuration: {var}")]
    ConfigMissing { var: &'static str },

    #[error("Invalid configuration for {var}: {message}")]
    ConfigInvalid { var: &'static str, message: String },
}

impl BotError {
    pub fn validation(message: impl Into<String>) -> Self {
        BotError::Validation {
            message: message.into(),
        }
    }

    pub fn remote(message: impl Into<String>) -> Self {
        BotError::RemoteUnavailable {
            message: message.into(),
        }
    }

    /// Errors that occur under normal platform races and must not be logged as failures.
    pub fn is_expected(&self) -> bool {
        matches!(self, BotError::InteractionAlreadyAcknowledged)
    }

    /// Text shown to the invoking user. Store internals are only echoed to admins.
    pub fn user_message(&self, is_admin: bool) -> String {
        match self {
            BotError::Unauthorized { .. } => "❌ You're not authorized.".to_string(),
            BotError::Validation { message } => format!("❌ {}", message),
            BotError::NotFound { entity, key } => format!("❌ No {} found for `{}`.", entity, key),
            BotError::PageOutOfRange { .. } => "❌ Page out of range".to_string(),
            BotError::WriteRejected { message } => format!("❌ {}", message),
            BotError::RemoteUnavailable { message } if is_admin => format!(
                "❌ The stats store is unavailable. Please try again later.\n-# {}",
                message
            ),
            BotError::RemoteUnavailable { .. }
            | BotError::Discord { .. }
            | BotError::InteractionAlreadyAcknowledged
            | BotError::ConfigMissing { .. }
            | BotError::ConfigInvalid { .. } => {
                "❌ Something went wrong. Please try again later.".to_string()
            }
        }
    }
}

impl From<serenity::Error> for BotError {
    fn from(err: serenity::Error) -> Self {
        if is_already_acknowledged(&err) {
            return BotError::InteractionAlreadyAcknowledged;
        }
        BotError::Discord {
            message: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for BotError {
    fn from(err: reqwest::Error) -> Self {
        // Strip the URL: it carries the store endpoint and filter values.
        BotError::RemoteUnavailable {
            message: err.without_url().to_string(),
        }
    }
}

impl From<serde_json::Error> for BotError {
    fn from(err: serde_json::Error) -> Self {
        BotError::RemoteUnavailable {
            message: format!("malformed response: {}", err),
        }
    }
}

pub type Result<T> = std::result::Result<T, BotError>;

/// Discord JSON error code for "Interaction has already been acknowledged".
const ALREADY_ACKNOWLEDGED: isize = 40060;

/// Discord JSON error code for "Unknown interaction" (token expired or never valid).
const UNKNOWN_INTERACTION: isize = 10062;

pub fn discord_error_code(err: &serenity::Error) -> Option<isize> {
    match err {
        serenity::Error::Http(serenity::http::HttpError::UnsuccessfulRequest(response)) => {
            Some(response.error.code)
        }
        _ => None,
    }
}

pub fn is_already_acknowledged(err: &serenity::Error) -> bool {
    discord_error_code(err) == Some(ALREADY_ACKNOWLEDGED)
}

pub fn is_unknown_interaction(err: &serenity::Error) -> bool {
    discord_error_code(err) == Some(UNKNOWN_INTERACTION)
}
