// src/core/net.rs
//
// Remote Entity Client: one authenticated GET per call, no retries here.
// Retry policy belongs to the caller (see `cache::FetchPolicy`).

use std::fmt;

use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use serde_json::Value;

use crate::config::consts::USER_AGENT;
use crate::config::options::SourceOptions;
use crate::error::{Error, Result};

pub type Record = serde_json::Map<String, Value>;

/// Parsed response of one fetch.
#[derive(Clone, Debug, PartialEq)]
pub enum Payload {
    Records(Vec<Record>),
    Record(Record),
    NoContent,
}

impl Payload {
    /// Classify a decoded JSON body. `context` names the request for errors.
    pub fn from_json(value: Value, context: &str) -> Result<Payload> {
        match value {
            Value::Null => Ok(Payload::NoContent),
            Value::Object(map) => Ok(Payload::Record(map)),
            Value::Array(items) => {
                let mut records = Vec::with_capacity(items.len());
                for (i, item) in items.into_iter().enumerate() {
                    match item {
                        Value::Object(map) => records.push(map),
                        other => {
                            return Err(Error::UnexpectedPayload {
                                context: s!(context),
                                detail: format!("list item {i} is {}", kind(&other)),
                            });
                        }
                    }
                }
                Ok(Payload::Records(records))
            }
            other => Err(Error::UnexpectedPayload {
                context: s!(context),
                detail: format!("expected object or list, got {}", kind(&other)),
            }),
        }
    }

    /// Follow a dotted key path into a single-record payload.
    /// A null at the end of the path means "no rows"; a missing key is an error.
    pub fn unwrap_location(self, location: &str, context: &str) -> Result<Payload> {
        let record = match self {
            Payload::NoContent => return Ok(Payload::NoContent),
            Payload::Record(r) => r,
            Payload::Records(_) => {
                return Err(Error::UnexpectedPayload {
                    context: s!(context),
                    detail: format!("cannot unwrap '{location}' from a list"),
                });
            }
        };

        let mut current = Value::Object(record);
        for key in location.split('.') {
            current = match current {
                Value::Object(mut map) => map.remove(key).ok_or_else(|| Error::UnexpectedPayload {
                    context: s!(context),
                    detail: format!("missing key '{key}' in data location '{location}'"),
                })?,
                other => {
                    return Err(Error::UnexpectedPayload {
                        context: s!(context),
                        detail: format!("'{key}' of '{location}' is inside {}", kind(&other)),
                    });
                }
            };
        }
        Payload::from_json(current, context)
    }
}

fn kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

/* ---------------- URL templates ---------------- */

pub const SCOPE_ID: &str = "scope_id";
pub const ENTITY_ID: &str = "entity_id";

/// A URL path with `{scope_id}` and optionally `{entity_id}` placeholders.
/// No other placeholder names are accepted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UrlTemplate {
    raw: String,
    uses_entity_id: bool,
}

impl UrlTemplate {
    pub fn parse(raw: &str) -> Result<Self> {
        let mut uses_entity_id = false;
        let mut rest = raw;
        while let Some(open) = rest.find('{') {
            let after = &rest[open + 1..];
            let close = after
                .find('}')
                .ok_or_else(|| Error::InvalidCatalog(format!("unterminated placeholder in '{raw}'")))?;
            match &after[..close] {
                SCOPE_ID => {}
                ENTITY_ID => uses_entity_id = true,
                other => {
                    return Err(Error::InvalidCatalog(format!(
                        "unknown placeholder '{{{other}}}' in '{raw}'"
                    )));
                }
            }
            rest = &after[close + 1..];
        }
        if rest.contains('}') {
            return Err(Error::InvalidCatalog(format!("stray '}}' in '{raw}'")));
        }
        Ok(Self { raw: s!(raw), uses_entity_id })
    }

    pub fn uses_entity_id(&self) -> bool {
        self.uses_entity_id
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn render(&self, scope_id: &str, entity_id: Option<&str>) -> String {
        let url = self.raw.replace("{scope_id}", scope_id);
        match entity_id {
            Some(id) => url.replace("{entity_id}", id),
            None => url,
        }
    }
}

impl fmt::Display for UrlTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/* ---------------- Client ---------------- */

pub trait RemoteClient: Send + Sync {
    fn fetch(&self, template: &UrlTemplate, scope_id: &str, entity_id: Option<&str>) -> Result<Payload>;
}

/// Bearer-token JSON client over reqwest's blocking API.
pub struct HttpClient {
    http: Client,
    base_url: String,
    token: String,
}

impl HttpClient {
    pub fn new(source: &SourceOptions) -> Result<Self> {
        let token = source.token.clone().filter(|t| !t.trim().is_empty()).ok_or(Error::MissingToken)?;
        let http = Client::builder()
            .timeout(source.timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|source_err| Error::Transport { url: source.base_url.clone(), source: source_err })?;
        Ok(Self {
            http,
            base_url: source.base_url.trim_end_matches('/').to_string(),
            token,
        })
    }
}

impl RemoteClient for HttpClient {
    fn fetch(&self, template: &UrlTemplate, scope_id: &str, entity_id: Option<&str>) -> Result<Payload> {
        let url = join!(&self.base_url, &template.render(scope_id, entity_id));
        tracing::debug!(%url, "GET");

        let transport = |source: reqwest::Error| Error::Transport { url: url.clone(), source };
        let resp = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .header(CONTENT_TYPE, "application/json; charset=utf-8")
            .send()
            .map_err(transport)?;

        let status = resp.status();
        if status == StatusCode::NO_CONTENT {
            return Ok(Payload::NoContent);
        }
        if !status.is_success() {
            return Err(Error::RemoteRequestFailed { status: status.as_u16(), url: url.clone() });
        }

        let body = resp.text().map_err(transport)?;
        if body.trim().is_empty() {
            return Ok(Payload::NoContent);
        }
        let value: Value = serde_json::from_str(&body)
            .map_err(|source| Error::Decode { url: url.clone(), source })?;
        Payload::from_json(value, &url)
    }
}
