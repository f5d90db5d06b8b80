// src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::Arc;

use crate::error::{BotError, Result};

/// Longest row name accepted by add/update.
pub const MAX_NAME_LEN: usize = 64;

/// One record of the stats table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    #[serde(default, deserialize_with = "deserialize_nullable_text")]
    pub name: String,
    #[serde(default)]
    pub sing: Option<i64>,
    #[serde(default)]
    pub dance: Option<i64>,
    #[serde(default)]
    pub rally: Option<f64>,
}

impl Row {
    pub fn new(name: impl Into<String>, sing: i64, dance: i64, rally: f64) -> Self {
        Self {
            name: name.into(),
            sing: Some(sing),
            dance: Some(dance),
            rally: Some(rally),
        }
    }

    /// Case-insensitive key comparison
    pub fn matches_name(&self, name: &str) -> bool {
        self.name.to_lowercase() == name.trim().to_lowercase()
    }

    pub fn validate(&self) -> Result<()> {
        validate_name(&self.name)?;
        RowPatch {
            sing: self.sing,
            dance: self.dance,
            rally: self.rally,
        }
        .validate()
    }
}

/// Fields supplied to an update; `None` leaves the stored value untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RowPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sing: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dance: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rally: Option<f64>,
}

impl RowPatch {
    pub fn is_empty(&self) -> bool {
        self.sing.is_none() && self.dance.is_none() && self.rally.is_none()
    }

    pub fn validate(&self) -> Result<()> {
        if self.sing.is_some_and(|v| v < 0) {
            return Err(BotError::validation("`sing` must not be negative."));
        }
        if self.dance.is_some_and(|v| v < 0) {
            return Err(BotError::validation("`dance` must not be negative."));
        }
        if let Some(rally) = self.rally {
            if !rally.is_finite() || rally < 0.0 {
                return Err(BotError::validation(
                    "`rally` must be a non-negative number.",
                ));
            }
        }
        Ok(())
    }

    /// Human readable `field=value` list, in column order
    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        if let Some(sing) = self.sing {
            parts.push(format!("sing={}", sing));
        }
        if let Some(dance) = self.dance {
            parts.push(format!("dance={}", dance));
        }
        if let Some(rally) = self.rally {
            parts.push(format!("rally={}", rally));
        }
        parts.join(" ")
    }
}

pub fn validate_name(name: &str) -> Result<()> {
    let name = name.trim();
    if name.is_empty() {
        return Err(BotError::validation("A name is required."));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(BotError::validation(format!(
            "Names are limited to {} characters.",
            MAX_NAME_LEN
        )));
    }
    Ok(())
}

/// Immutable row-set captured at one point in time. Refreshing produces a new snapshot.
pub type RowSetSnapshot = Arc<[Row]>;

/// Columns a table view can be sorted by
#[derive(Debug, Clone, Copy, PartialEq, Eq, poise::ChoiceParameter)]
pub enum SortColumn {
    #[name = "name"]
    Name,
    #[name = "sing"]
    Sing,
    #[name = "dance"]
    Dance,
    #[name = "rally"]
    Rally,
}

impl SortColumn {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortColumn::Name => "name",
            SortColumn::Sing => "sing",
            SortColumn::Dance => "dance",
            SortColumn::Rally => "rally",
        }
    }
}

/// Null text columns arrive as JSON `null`; treat them as empty
fn deserialize_nullable_text<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// A grant allowing a non-admin user to read and update rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditorGrant {
    #[serde(deserialize_with = "deserialize_snowflake")]
    pub discord_id: u64,
    pub discord_name: String,
    pub added_at: DateTime<Utc>,
}

/// PostgREST returns bigint columns as numbers, text columns as strings; accept both.
fn deserialize_snowflake<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Snowflake {
        Number(u64),
        Text(String),
    }

    match Snowflake::deserialize(deserializer)? {
        Snowflake::Number(id) => Ok(id),
        Snowflake::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// Privilege classification of the invoking user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessLevel {
    Admin,
    Editor,
    Plain,
}

/// Privilege a command requires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Privilege {
    Public,
    Editor,
    Admin,
}

impl Privilege {
    pub fn as_str(&self) -> &'static str {
        match self {
            Privilege::Public => "public",
            Privilege::Editor => "editor",
            Privilege::Admin => "admin",
        }
    }
}

/// Identity of the caller, resolved once per interaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallerIdentity {
    pub user_id: u64,
    pub access: AccessLevel,
}

impl CallerIdentity {
    pub fn is_admin(&self) -> bool {
        self.access == AccessLevel::Admin
    }

    /// Admin implies every editor privilege
    pub fn satisfies(&self, required: Privilege) -> bool {
        match required {
            Privilege::Public => true,
            Privilege::Editor => matches!(self.access, AccessLevel::Admin | AccessLevel::Editor),
            Privilege::Admin => self.access == AccessLevel::Admin,
        }
    }
}
