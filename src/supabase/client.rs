//! Supabase (PostgREST) implementation of the backend traits

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use super::backend::{EditorBackend, Scope, StatsBackend};
use crate::config::{Secret, SupabaseSettings};
use crate::error::{BotError, Result};
use crate::models::{EditorGrant, Row, RowPatch};

/// Lets row-level policies see which Discord user a restricted request is for
const CALLER_HEADER: &str = "x-discord-user-id";

const EDITOR_COLUMNS: &str = "discord_id,discord_name,added_at";

/// Reads are retried this many times after a transport failure; writes never are
const READ_RETRIES: u32 = 1;
const READ_RETRY_DELAY: Duration = Duration::from_millis(250);

/// PostgREST error body
#[derive(Debug, Deserialize)]
struct PostgrestError {
    message: Option<String>,
    code: Option<String>,
}

pub struct SupabaseClient {
    http: reqwest::Client,
    rest_url: String,
    anon_key: Secret,
    service_key: Secret,
    stats_table: String,
    editors_table: String,
}

impl SupabaseClient {
    pub fn new(settings: &SupabaseSettings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()?;

        Ok(Self {
            http,
            rest_url: format!("{}/rest/v1", settings.url.trim_end_matches('/')),
            anon_key: settings.anon_key.clone(),
            service_key: settings.service_key.clone(),
            stats_table: settings.stats_table.clone(),
            editors_table: settings.editors_table.clone(),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{}", self.rest_url, table)
    }

    fn stats_key_url(&self, name: &str) -> String {
        format!(
            "{}?name=eq.{}",
            self.table_url(&self.stats_table),
            urlencoding::encode(name)
        )
    }

    fn editor_key_url(&self, user_id: u64) -> String {
        format!(
            "{}?select={}&discord_id=eq.{}",
            self.table_url(&self.editors_table),
            EDITOR_COLUMNS,
            user_id
        )
    }

    fn request(&self, method: Method, url: &str, scope: Scope) -> RequestBuilder {
        let key = match scope {
            Scope::Elevated => &self.service_key,
            Scope::Restricted { .. } => &self.anon_key,
        };

        let mut request = self
            .http
            .request(method, url)
            .header("apikey", key.expose())
            .bearer_auth(key.expose());

        if let Scope::Restricted { user_id } = scope {
            request = request.header(CALLER_HEADER, user_id.to_string());
        }
        request
    }

    /// Write request that returns the affected rows
    fn write_request(&self, method: Method, url: &str, scope: Scope) -> RequestBuilder {
        self.request(method, url, scope)
            .header("Prefer", "return=representation")
    }

    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder, is_write: bool) -> Result<T> {
        let response = request.send().await?;
        decode(response, is_write).await
    }

    async fn read<T: DeserializeOwned>(&self, url: &str, scope: Scope) -> Result<T> {
        self.read_with_retries(url, scope, READ_RETRIES).await
    }

    /// GET that repeats only when the request never got an answer
    async fn read_with_retries<T: DeserializeOwned>(
        &self,
        url: &str,
        scope: Scope,
        retries: u32,
    ) -> Result<T> {
        let mut attempt = 0;
        loop {
            match self.request(Method::GET, url, scope).send().await {
                Ok(response) => return decode(response, false).await,
                Err(e) if attempt < retries && is_transport_failure(&e) => {
                    attempt += 1;
                    let kind = if e.is_timeout() { "timeout" } else { "connection failed" };
                    warn!("Store read failed ({}), retrying (attempt {})", kind, attempt + 1);
                    tokio::time::sleep(READ_RETRY_DELAY).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

fn is_transport_failure(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect()
}

async fn decode<T: DeserializeOwned>(response: Response, is_write: bool) -> Result<T> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json::<T>().await?);
    }

    let body = response.text().await.unwrap_or_default();
    Err(status_error(status, &body, is_write))
}

/// Map a non-success status to the error taxonomy
fn status_error(status: StatusCode, body: &str, is_write: bool) -> BotError {
    let parsed = serde_json::from_str::<PostgrestError>(body).ok();
    let detail = parsed
        .as_ref()
        .and_then(|e| e.message.clone())
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("error").to_string());
    let code = parsed.and_then(|e| e.code).unwrap_or_default();

    match status {
        StatusCode::CONFLICT => BotError::WriteRejected {
            message: "An entry with that key already exists.".to_string(),
        },
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => BotError::RemoteUnavailable {
            message: format!("store refused credentials ({}): {}", status.as_u16(), detail),
        },
        s if is_write && s.is_client_error() => {
            debug!("Store rejected write: {} ({})", detail, code);
            BotError::WriteRejected {
                message: "The store rejected these values.".to_string(),
            }
        }
        _ => BotError::RemoteUnavailable {
            message: format!("HTTP {} from store: {}", status.as_u16(), detail),
        },
    }
}

/// First affected row, or `NotFound` when the filter matched nothing
fn first_or_not_found<T>(rows: Vec<T>, entity: &'static str, key: String) -> Result<T> {
    rows.into_iter()
        .next()
        .ok_or(BotError::NotFound { entity, key })
}

#[async_trait]
impl StatsBackend for SupabaseClient {
    async fn select_all(&self, scope: Scope) -> Result<Vec<Row>> {
        debug!("Selecting all rows from {}", self.stats_table);
        let url = format!("{}?select=*", self.table_url(&self.stats_table));
        self.read(&url, scope).await
    }

    async fn insert(&self, scope: Scope, row: &Row) -> Result<Row> {
        debug!("Inserting row '{}' into {}", row.name, self.stats_table);
        let request = self
            .write_request(Method::POST, &self.table_url(&self.stats_table), scope)
            .json(row);
        let rows: Vec<Row> = self.execute(request, true).await?;
        rows.into_iter().next().ok_or_else(|| BotError::WriteRejected {
            message: "The store did not insert the row.".to_string(),
        })
    }

    async fn update(&self, scope: Scope, name: &str, patch: &RowPatch) -> Result<Row> {
        debug!("Updating row '{}' in {}", name, self.stats_table);
        let request = self
            .write_request(Method::PATCH, &self.stats_key_url(name), scope)
            .json(patch);
        let rows: Vec<Row> = self.execute(request, true).await?;
        first_or_not_found(rows, "entry", name.to_string())
    }

    async fn delete(&self, scope: Scope, name: &str) -> Result<Row> {
        debug!("Deleting row '{}' from {}", name, self.stats_table);
        let request = self.write_request(Method::DELETE, &self.stats_key_url(name), scope);
        let rows: Vec<Row> = self.execute(request, true).await?;
        first_or_not_found(rows, "entry", name.to_string())
    }
}

#[async_trait]
impl EditorBackend for SupabaseClient {
    /// Runs before the interaction is acknowledged, so it gets a single attempt
    async fn find_editor(&self, user_id: u64) -> Result<Option<EditorGrant>> {
        let grants: Vec<EditorGrant> = self
            .read_with_retries(&self.editor_key_url(user_id), Scope::Elevated, 0)
            .await?;
        Ok(grants.into_iter().next())
    }

    async fn list_editors(&self) -> Result<Vec<EditorGrant>> {
        let url = format!(
            "{}?select={}&order=added_at.desc",
            self.table_url(&self.editors_table),
            EDITOR_COLUMNS
        );
        self.read(&url, Scope::Elevated).await
    }

    async fn insert_editor(&self, grant: &EditorGrant) -> Result<EditorGrant> {
        debug!("Granting editor rights to {}", grant.discord_id);
        let request = self
            .write_request(Method::POST, &self.table_url(&self.editors_table), Scope::Elevated)
            .json(grant);
        let grants: Vec<EditorGrant> = self.execute(request, true).await?;
        grants.into_iter().next().ok_or_else(|| BotError::WriteRejected {
            message: "The store did not record the grant.".to_string(),
        })
    }

    async fn delete_editor(&self, user_id: u64) -> Result<EditorGrant> {
        debug!("Revoking editor rights from {}", user_id);
        let request =
            self.write_request(Method::DELETE, &self.editor_key_url(user_id), Scope::Elevated);
        let grants: Vec<EditorGrant> = self.execute(request, true).await?;
        first_or_not_found(grants, "editor grant", user_id.to_string())
    }
}
