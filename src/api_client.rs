//! HTTP client for the TOP manager API.
//!
//! Provides a thin wrapper around `reqwest::blocking::Client` for the two
//! read endpoints the client needs. All methods return `anyhow::Result` and
//! translate HTTP errors into user-friendly messages.

use anyhow::{Context, Result};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::domain::{Sitzung, Top, sort_tops};

// ---------------------------------------------------------------------------
// Endpoint paths
// ---------------------------------------------------------------------------

const SITZUNGEN_PATH: &str = "/api/topmanager/sitzungen/";

fn tops_path(sitzung_id: Uuid) -> String {
    format!("/api/topmanager/sitzung/{sitzung_id}/tops/")
}

/// Standard API response envelope (`{"data": ...}`).
#[derive(Debug, Deserialize)]
struct ApiResponseEnvelope<T> {
    data: T,
}

// ---------------------------------------------------------------------------
// SitzungSource
// ---------------------------------------------------------------------------

/// Read access to Sitzungen and their TOPs.
///
/// The terminal UI only depends on this trait, so it can be driven by an
/// in-memory source in tests.
pub trait SitzungSource {
    fn sitzungen(&self) -> Result<Vec<Sitzung>>;
    fn tops(&self, sitzung_id: Uuid) -> Result<Vec<Top>>;
}

// ---------------------------------------------------------------------------
// ApiClient
// ---------------------------------------------------------------------------

pub struct ApiClient {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl ApiClient {
    /// Create a new API client.
    ///
    /// `base_url` is trimmed and stripped of trailing slashes so endpoint
    /// paths can be appended verbatim.
    pub fn new(base_url: &str) -> Self {
        let normalized = base_url.trim().trim_end_matches('/').to_string();
        Self {
            client: reqwest::blocking::Client::new(),
            base_url: normalized,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch all Sitzungen in server order.
    pub fn list_sitzungen(&self) -> Result<Vec<Sitzung>> {
        let body = self.get(SITZUNGEN_PATH)?;
        parse_response_payload(&body, "failed to parse Sitzungen response")
    }

    /// Fetch the TOPs of one Sitzung, ordered by weight.
    pub fn list_tops(&self, sitzung_id: Uuid) -> Result<Vec<Top>> {
        let body = self.get(&tops_path(sitzung_id))?;
        let mut tops: Vec<Top> = parse_response_payload(&body, "failed to parse TOPs response")?;
        sort_tops(&mut tops);
        Ok(tops)
    }

    /// Build a full URL by joining the base URL with an endpoint path.
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn get(&self, path: &str) -> Result<String> {
        let url = self.url(path);
        let resp = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .with_context(|| format!("failed to connect to API at {url}"))?;
        map_http_error(resp)
    }
}

impl SitzungSource for ApiClient {
    fn sitzungen(&self) -> Result<Vec<Sitzung>> {
        self.list_sitzungen()
    }

    fn tops(&self, sitzung_id: Uuid) -> Result<Vec<Top>> {
        self.list_tops(sitzung_id)
    }
}

// ---------------------------------------------------------------------------
// HTTP error mapping
// ---------------------------------------------------------------------------

/// Read a response body, or map non-success status codes to readable errors.
fn map_http_error(resp: reqwest::blocking::Response) -> Result<String> {
    let status = resp.status();
    let body = resp.text().unwrap_or_default();
    if status.is_success() {
        return Ok(body);
    }

    match status.as_u16() {
        400 => anyhow::bail!("Bad request: {}", extract_error_message(&body)),
        404 => anyhow::bail!("Not found: {}", extract_error_message(&body)),
        500..=599 => anyhow::bail!("Server error: {}", extract_error_message(&body)),
        _ => anyhow::bail!("Unexpected response (HTTP {status}): {}", body.trim()),
    }
}

/// Accept either `{"data": ...}` or the bare payload.
fn parse_response_payload<T>(body: &str, context: &'static str) -> Result<T>
where
    T: DeserializeOwned,
{
    if let Ok(enveloped) = serde_json::from_str::<ApiResponseEnvelope<T>>(body) {
        return Ok(enveloped.data);
    }

    serde_json::from_str::<T>(body).context(context)
}

/// Try to extract a `message` or `error` field from a JSON error body.
/// Falls back to the raw body (truncated) if parsing fails.
fn extract_error_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body)
        && let Some(msg) = value.get("message").or(value.get("error"))
        && let Some(s) = msg.as_str()
    {
        return s.to_string();
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "no details provided".to_string();
    }

    if trimmed.chars().count() > 200 {
        let head: String = trimmed.chars().take(200).collect();
        format!("{head}...")
    } else {
        trimmed.to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
