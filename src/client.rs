use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::error::{ChatError, ChatResult};

#[derive(Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
}

/// What the server said, classified by which field its JSON body carried
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatReply {
    /// Truthy `response`, as display text
    Response(String),
    /// Truthy `error`, as display text
    Error(String),
    /// JSON with neither field truthy
    Unrecognized,
}

impl ChatReply {
    /// Classify a parsed body the way the browser widget reads `data.response`
    /// and `data.error`: a field counts only when its value is truthy.
    /// `response` wins over `error`. Status codes are not consulted.
    ///
    /// Returns `None` for a `null` body, which has no fields to read at all.
    pub fn from_body(body: &Value) -> Option<Self> {
        if body.is_null() {
            return None;
        }

        if let Some(response) = body.get("response").filter(|v| is_truthy(v)) {
            return Some(ChatReply::Response(display_text(response)));
        }
        if let Some(error) = body.get("error").filter(|v| is_truthy(v)) {
            return Some(ChatReply::Error(display_text(error)));
        }
        Some(ChatReply::Unrecognized)
    }
}

/// `false`, `0`, `""` and `null` are falsy; objects and arrays never are
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Text a JSON value turns into when placed in a text node
fn display_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => match (n.as_i64(), n.as_u64(), n.as_f64()) {
            (Some(i), _, _) => i.to_string(),
            (_, Some(u), _) => u.to_string(),
            (_, _, Some(f)) if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e21 => {
                format!("{:.0}", f)
            }
            _ => n.to_string(),
        },
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(display_text).collect::<Vec<_>>().join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

/// HTTP client for the agent server's `/chat` endpoint
#[derive(Clone)]
pub struct ChatClient {
    client: Client,
    base_url: String,
}

impl ChatClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn endpoint(&self) -> String {
        format!("{}/chat", self.base_url)
    }

    /// POST one message and classify the reply. Transport failures, bodies
    /// that are not JSON and a `null` body come back as `Err`.
    pub async fn send(&self, message: &str) -> ChatResult<ChatReply> {
        let url = self.endpoint();

        let response = self
            .client
            .post(&url)
            .json(&ChatRequest { message })
            .send()
            .await
            .map_err(|source| ChatError::Transport {
                url: url.clone(),
                source,
            })?;

        debug!(status = %response.status(), %url, "chat server answered");

        let body: Value = response
            .json()
            .await
            .map_err(|source| ChatError::Decode {
                url: url.clone(),
                source,
            })?;

        ChatReply::from_body(&body).ok_or(ChatError::NullBody { url })
    }
}
