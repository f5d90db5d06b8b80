//! Process configuration, read once from the environment at startup.
//!
//! Every required variable is checked before the gateway client is built; a
//! missing or malformed value aborts startup with the variable's name.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing_subscriber::filter::LevelFilter;

use crate::error::{BotError, Result};

/// A credential that must never reach logs or `Debug` output
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// Backing store endpoint and credentials
#[derive(Debug, Clone)]
pub struct SupabaseSettings {
    pub url: String,
    /// Restricted credential used for editor reads and updates
    pub anon_key: Secret,
    /// Elevated credential used for admin operations and editor lookups
    pub service_key: Secret,
    pub stats_table: String,
    pub editors_table: String,
    /// Upper bound for a single remote call
    pub timeout: Duration,
}

/// Bot configuration
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub discord_token: Secret,
    pub supabase: SupabaseSettings,
    pub admin_ids: HashSet<u64>,
    pub cache_ttl: Duration,
    pub page_size: usize,
    pub session_idle: Duration,
    pub port: u16,
    pub log_level: LevelFilter,
}

impl BotConfig {
    /// Create config from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let discord_token = optional(&lookup, "DISCORD_TOKEN")
            .or_else(|| optional(&lookup, "DIS_TOKEN"))
            .ok_or(BotError::ConfigMissing {
                var: "DISCORD_TOKEN",
            })?;

        let url = required(&lookup, "SUPABASE_URL")?;
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(BotError::ConfigInvalid {
                var: "SUPABASE_URL",
                message: "must be an http(s) URL".to_string(),
            });
        }

        let supabase = SupabaseSettings {
            url: url.trim_end_matches('/').to_string(),
            anon_key: Secret::new(required(&lookup, "SUPABASE_KEY")?),
            service_key: Secret::new(required(&lookup, "SUPABASE_SERVICE_KEY")?),
            stats_table: optional(&lookup, "STATS_TABLE").unwrap_or_else(|| "stats".to_string()),
            editors_table: optional(&lookup, "EDITORS_TABLE")
                .unwrap_or_else(|| "stats_editors_rights".to_string()),
            timeout: Duration::from_secs(parse_or(&lookup, "REMOTE_TIMEOUT_SECS", 5u64)?),
        };

        let admin_ids = parse_admin_ids(&required(&lookup, "ADMIN_IDS")?)?;

        let page_size: usize = parse_or(&lookup, "PAGE_SIZE", 20)?;
        if page_size == 0 || page_size > 25 {
            return Err(BotError::ConfigInvalid {
                var: "PAGE_SIZE",
                message: "must be between 1 and 25".to_string(),
            });
        }

        Ok(Self {
            discord_token: Secret::new(discord_token),
            supabase,
            admin_ids,
            cache_ttl: Duration::from_secs(parse_or(&lookup, "CACHE_TTL_SECS", 30u64)?),
            page_size,
            session_idle: Duration::from_secs(parse_or(&lookup, "SESSION_IDLE_SECS", 120u64)?),
            port: parse_or(&lookup, "PORT", 5000u16)?,
            log_level: parse_or(&lookup, "LOG_LEVEL", LevelFilter::INFO)?,
        })
    }
}

fn optional<F>(lookup: &F, var: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(var)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required<F>(lookup: &F, var: &'static str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    optional(lookup, var).ok_or(BotError::ConfigMissing { var })
}

fn parse_or<F, T>(lookup: &F, var: &'static str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: fmt::Display,
{
    match optional(lookup, var) {
        Some(raw) => raw.parse().map_err(|e: T::Err| BotError::ConfigInvalid {
            var,
            message: e.to_string(),
        }),
        None => Ok(default),
    }
}

/// Parse a comma or whitespace separated list of Discord user ids
pub fn parse_admin_ids(raw: &str) -> Result<HashSet<u64>> {
    let ids = raw
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<u64>().map_err(|_| BotError::ConfigInvalid {
                var: "ADMIN_IDS",
                message: format!("'{}' is not a Discord user id", part),
            })
        })
        .collect::<Result<HashSet<u64>>>()?;

    if ids.is_empty() {
        return Err(BotError::ConfigInvalid {
            var: "ADMIN_IDS",
            message: "at least one admin id is required".to_string(),
        });
    }
    Ok(ids)
}
