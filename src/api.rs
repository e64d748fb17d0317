use anyhow::{anyhow, bail, Context, Result};
use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::USER_AGENT;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::env;
use url::Url;

pub const API_ROOT: &str = "https://api.cloudflare.com/client/v4";
const DEFAULT_USER_AGENT: &str = "edgeflare/0.1";

/// Thin client over the Cloudflare v4 API.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    api_token: String,
    user_agent: String,
}

/// A binding entry in the script upload metadata part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScriptBinding {
    PlainText { name: String, text: String },
    SecretText { name: String, text: String },
}

impl ApiClient {
    pub fn new(api_token: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .build()
            .context("Failed to build Cloudflare API client")?;
        let user_agent = env::var("EDGEFLARE_USER_AGENT")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());
        Ok(Self {
            http,
            api_token: api_token.into(),
            user_agent,
        })
    }

    /// Upload a worker script with its bindings.
    pub fn put_script(
        &self,
        account_id: &str,
        script_name: &str,
        script: String,
        bindings: &[ScriptBinding],
    ) -> Result<()> {
        let url = api_url(&["accounts", account_id, "workers", "scripts", script_name])?;

        let metadata = serde_json::to_string(&ScriptMetadata {
            body_part: "script",
            bindings,
        })
        .context("Failed to serialize script metadata")?;

        let form = Form::new()
            .part(
                "metadata",
                Part::text(metadata)
                    .mime_str("application/json")
                    .context("Failed to build metadata part")?,
            )
            .part(
                "script",
                Part::text(script)
                    .mime_str("application/javascript")
                    .context("Failed to build script part")?,
            );

        let response = self
            .request(self.http.put(url.as_str()))
            .multipart(form)
            .send()
            .with_context(|| format!("Failed to upload script '{script_name}'"))?;

        decode_envelope::<serde_json::Value>(response, url.as_str())?;
        Ok(())
    }

    /// Read the raw value for a key. `None` when the key is absent.
    pub fn get_kv_value(
        &self,
        account_id: &str,
        namespace_id: &str,
        key: &str,
    ) -> Result<Option<Vec<u8>>> {
        let url = api_url(&[
            "accounts",
            account_id,
            "storage",
            "kv",
            "namespaces",
            namespace_id,
            "values",
            key,
        ])?;

        let response = self
            .request(self.http.get(url.as_str()))
            .send()
            .with_context(|| format!("Failed to read key '{key}'"))?;

        match response.status() {
            status if status.is_success() => {
                let bytes = response
                    .bytes()
                    .with_context(|| format!("Failed while reading value for key '{key}'"))?;
                Ok(Some(bytes.to_vec()))
            }
            StatusCode::NOT_FOUND => Ok(None),
            status => bail!(
                "Cloudflare API returned {status} for GET {}: {}",
                url,
                error_detail(response)
            ),
        }
    }

    /// Read the metadata for a key. `None` when the key has none or is
    /// absent.
    pub fn get_kv_metadata(
        &self,
        account_id: &str,
        namespace_id: &str,
        key: &str,
    ) -> Result<Option<serde_json::Value>> {
        let url = api_url(&[
            "accounts",
            account_id,
            "storage",
            "kv",
            "namespaces",
            namespace_id,
            "metadata",
            key,
        ])?;

        let response = self
            .request(self.http.get(url.as_str()))
            .send()
            .with_context(|| format!("Failed to read metadata for key '{key}'"))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let envelope = decode_envelope::<serde_json::Value>(response, url.as_str())?;
        Ok(envelope)
    }

    fn request(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header(USER_AGENT, &self.user_agent)
            .bearer_auth(&self.api_token)
    }
}

#[derive(Debug, Serialize)]
struct ScriptMetadata<'a> {
    body_part: &'a str,
    bindings: &'a [ScriptBinding],
}

/// Standard `{success, errors, result}` response envelope.
#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    success: bool,
    #[serde(default)]
    errors: Vec<ApiMessage>,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    code: i64,
    message: String,
}

/// Build an API URL from path segments, percent-encoding each segment.
fn api_url(segments: &[&str]) -> Result<Url> {
    let mut url = Url::parse(API_ROOT).context("Bad API root URL")?;
    url.path_segments_mut()
        .map_err(|()| anyhow!("API root URL cannot be a base"))?
        .extend(segments);
    Ok(url)
}

fn decode_envelope<T: DeserializeOwned>(response: Response, url: &str) -> Result<Option<T>> {
    let status = response.status();
    if !status.is_success() {
        bail!(
            "Cloudflare API returned {status} for {url}: {}",
            error_detail(response)
        );
    }

    let envelope: ApiEnvelope<T> = response
        .json()
        .with_context(|| format!("Failed to decode Cloudflare API response from {url}"))?;

    if !envelope.success {
        bail!(
            "Cloudflare API call to {url} failed: {}",
            format_messages(&envelope.errors)
        );
    }

    Ok(envelope.result)
}

fn error_detail(response: Response) -> String {
    match response.json::<ApiEnvelope<serde_json::Value>>() {
        Ok(envelope) if !envelope.errors.is_empty() => format_messages(&envelope.errors),
        _ => "<unavailable>".to_string(),
    }
}

fn format_messages(messages: &[ApiMessage]) -> String {
    if messages.is_empty() {
        return "no error detail".to_string();
    }
    messages
        .iter()
        .map(|m| format!("{} (code {})", m.message, m.code))
        .collect::<Vec<_>>()
        .join("; ")
}
