use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use log::debug;
use reqwest::Url;
use serde_json::{Map, Value};

use crate::http_request_executor::truncate;

/// An open session against a remote-procedure endpoint.
pub trait RemoteSession {
    /// Invokes `endpoint` with named arguments and returns its result.
    fn call(&self, endpoint: &str, arguments: &Map<String, Value>) -> Result<Value>;
}

pub trait RemoteConnector {
    fn connect(&self, target_url: &str) -> Result<Box<dyn RemoteSession>>;
}

/// Calls endpoints by posting the arguments as a JSON object to
/// `<target_url>/<endpoint>`.
pub struct HttpConnector {
    timeout: Duration,
}

impl HttpConnector {
    pub fn new(timeout: Duration) -> HttpConnector {
        HttpConnector { timeout }
    }
}

impl RemoteConnector for HttpConnector {
    fn connect(&self, target_url: &str) -> Result<Box<dyn RemoteSession>> {
        let mut base = target_url
            .trim()
            .parse::<Url>()
            .map_err(|e| anyhow!("{:?} @ '{}'", e, target_url))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .context("while building the http client")?;
        debug!("Opened session on {}", base);
        Ok(Box::new(HttpSession { client, base }))
    }
}

struct HttpSession {
    client: reqwest::blocking::Client,
    base: Url,
}

impl RemoteSession for HttpSession {
    fn call(&self, endpoint: &str, arguments: &Map<String, Value>) -> Result<Value> {
        let url = endpoint_url(&self.base, endpoint)?;
        debug!("POST {}", url);
        let res = self.client.post(url).json(arguments).send()?;
        let status = res.status();
        let text = res.text()?;
        if !status.is_success() {
            bail!("{}: {}", status, truncate(&text));
        }
        Ok(serde_json::from_str(&text).unwrap_or(Value::String(text)))
    }
}

/// Appends `endpoint` to the session base path, one segment at a time.
///
/// Endpoints come from pasted transcripts, so absolute URLs and `.`/`..`
/// segments are refused: a call never leaves `target_url`.
pub fn endpoint_url(base: &Url, endpoint: &str) -> Result<Url> {
    let endpoint = endpoint.trim();
    if Url::parse(endpoint).is_ok() || endpoint.contains("://") || endpoint.starts_with("//") {
        bail!("endpoint '{}' must be a path, not a URL", endpoint);
    }
    let segments: Vec<&str> = endpoint
        .split('/')
        .filter(|segment| !segment.is_empty())
        .collect();
    if segments.is_empty() {
        bail!("endpoint '{}' is empty", endpoint);
    }
    if let Some(segment) = segments
        .iter()
        .find(|segment| **segment == "." || **segment == ".." || segment.contains(['?', '#', '\\']))
    {
        bail!("endpoint '{}' contains the segment '{}'", endpoint, segment);
    }

    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| anyhow!("'{}' cannot be a base url", base))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}
