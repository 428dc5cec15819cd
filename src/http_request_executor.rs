use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use log::debug;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use crate::execute::ExecutionOutcome;
use crate::recording::{HttpMethod, SimpleRecording};

/// Longest response excerpt copied into a transcript.
pub const MAX_EXCERPT_CHARS: usize = 1000;

pub struct ExecutionContext {
    pub client: reqwest::blocking::Client,
}

impl ExecutionContext {
    pub fn new(timeout: Duration) -> Result<ExecutionContext> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .context("while building the http client")?;
        Ok(ExecutionContext { client })
    }
}

impl SimpleRecording {
    pub fn method(&self) -> HttpMethod {
        self.http_method.unwrap_or(HttpMethod::Get)
    }

    pub fn uri(&self) -> Result<reqwest::Url> {
        self.url
            .trim()
            .parse::<reqwest::Url>()
            .map_err(|e| anyhow!("{:?} @ '{}'", e, self.url))
    }

    pub fn header_map(&self) -> Result<HeaderMap> {
        let mut map = HeaderMap::new();
        for (key, value) in &self.headers {
            let name = HeaderName::try_from(key.as_str())
                .with_context(|| format!("invalid header name '{}'", key))?;
            let value = HeaderValue::try_from(value.as_str())
                .with_context(|| format!("invalid value for header '{}'", key))?;
            map.append(name, value);
        }
        Ok(map)
    }
}

pub fn truncate(text: &str) -> String {
    text.chars().take(MAX_EXCERPT_CHARS).collect()
}

/// Pretty JSON when the body parses, otherwise a bounded text excerpt.
pub fn render_body(text: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(text) {
        Ok(json) => serde_json::to_string_pretty(&json).unwrap_or_else(|_| truncate(text)),
        Err(_) => truncate(text),
    }
}

pub fn execute_http_request(recording: &SimpleRecording, context: &ExecutionContext) -> ExecutionOutcome {
    let mut log = format!("Exécution de l'enregistrement '{}':\n", recording.name);
    match send(recording, context, &mut log) {
        Ok(success) => ExecutionOutcome::new(success, log),
        Err(e) => {
            log.push_str(&format!("ERREUR: {:#}\n", e));
            ExecutionOutcome::failure(log)
        }
    }
}

fn send(recording: &SimpleRecording, context: &ExecutionContext, log: &mut String) -> Result<bool> {
    let method = recording.method();
    let uri = recording.uri()?;
    let mut req = context
        .client
        .request(method.into(), uri.clone())
        .headers(recording.header_map()?);
    if !recording.query_params.is_empty() {
        req = req.query(&recording.query_params);
    }
    if let Some(body) = &recording.body {
        req = req.json(body);
    }

    debug!("{} {}", method, uri);
    let res = req.send()?;
    let status = res.status();
    let text = res.text()?;

    log.push_str(&format!("Requête envoyée à {} {}\n", method, uri));
    log.push_str(&format!("Statut: {}\n", status.as_u16()));
    if (200..=299).contains(&status.as_u16()) {
        if !text.is_empty() {
            log.push_str(&format!("Réponse: {}\n", render_body(&text)));
        }
        Ok(true)
    } else {
        log.push_str(&format!("Erreur HTTP {}: {}\n", status, truncate(&text)));
        Ok(false)
    }
}
