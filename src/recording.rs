use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::ControllerError;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
        }
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Head => reqwest::Method::HEAD,
            HttpMethod::Options => reqwest::Method::OPTIONS,
        }
    }
}

impl FromStr for HttpMethod {
    type Err = ControllerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "get" => Ok(HttpMethod::Get),
            "post" => Ok(HttpMethod::Post),
            "put" => Ok(HttpMethod::Put),
            "delete" => Ok(HttpMethod::Delete),
            "patch" => Ok(HttpMethod::Patch),
            "head" => Ok(HttpMethod::Head),
            "options" => Ok(HttpMethod::Options),
            _ => Err(ControllerError::Validation(format!(
                "{} is a unknown http method",
                s
            ))),
        }
    }
}

impl Display for HttpMethod {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single HTTP call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimpleRecording {
    pub name: String,
    pub url: String,
    /// Missing in hand-edited files; replayed as GET.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_method: Option<HttpMethod>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub query_params: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    pub created_at: DateTime<Utc>,
}

/// An ordered list of remote procedure calls against one endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceRecording {
    pub name: String,
    pub target_url: String,
    pub steps: Vec<Step>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    #[serde(default)]
    pub endpoint_identifier: String,
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

impl Step {
    pub fn new(endpoint_identifier: impl Into<String>, arguments: Map<String, Value>) -> Step {
        Step {
            endpoint_identifier: endpoint_identifier.into(),
            arguments,
        }
    }

    pub fn has_endpoint(&self) -> bool {
        !self.endpoint_identifier.trim().is_empty()
    }
}

/// Both shapes share one file layout; a `steps` list marks a sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Recording {
    Sequence(SequenceRecording),
    Simple(SimpleRecording),
}

impl Recording {
    pub fn name(&self) -> &str {
        match self {
            Recording::Simple(simple) => &simple.name,
            Recording::Sequence(sequence) => &sequence.name,
        }
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        match self {
            Recording::Simple(simple) => simple.created_at,
            Recording::Sequence(sequence) => sequence.created_at,
        }
    }

    /// The URL a request or a remote session is opened against.
    pub fn target(&self) -> &str {
        match self {
            Recording::Simple(simple) => &simple.url,
            Recording::Sequence(sequence) => &sequence.target_url,
        }
    }
}

impl From<SimpleRecording> for Recording {
    fn from(simple: SimpleRecording) -> Self {
        Recording::Simple(simple)
    }
}

impl From<SequenceRecording> for Recording {
    fn from(sequence: SequenceRecording) -> Self {
        Recording::Sequence(sequence)
    }
}

/// Turns a textual argument value into a JSON scalar.
///
/// Rules are tried in order: null, boolean, integer, float, string. Strings
/// lose one pair of surrounding quotes.
pub fn coerce_value(raw: &str) -> Value {
    let text = raw.trim();
    let lowered = text.to_lowercase();
    if lowered == "none" || lowered == "null" {
        return Value::Null;
    }
    if lowered == "true" || lowered == "false" {
        return Value::Bool(lowered == "true");
    }
    if is_integer(text) {
        if let Ok(number) = text.parse::<i64>() {
            return Value::from(number);
        }
    }
    if is_decimal(text) {
        if let Ok(number) = text.parse::<f64>() {
            if let Some(number) = serde_json::Number::from_f64(number) {
                return Value::Number(number);
            }
        }
    }
    Value::String(strip_quotes(text).to_string())
}

fn digits(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}

fn is_integer(s: &str) -> bool {
    digits(s.strip_prefix('-').unwrap_or(s))
}

fn is_decimal(s: &str) -> bool {
    match s.strip_prefix('-').unwrap_or(s).split_once('.') {
        Some((whole, fraction)) => digits(whole) && digits(fraction),
        None => false,
    }
}

pub fn strip_quotes(s: &str) -> &str {
    for quote in ['"', '\''] {
        if s.len() >= 2 && s.starts_with(quote) && s.ends_with(quote) {
            return &s[1..s.len() - 1];
        }
    }
    s
}
