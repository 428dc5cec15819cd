//! Best-effort scraping of pasted client-call transcripts into steps.
//!
//! This is not a parser for any particular language. Arguments whose values
//! contain parentheses, or commas outside of quotes, are not extracted
//! reliably.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Map;

use crate::errors::{ControllerError, Result};
use crate::recording::{coerce_value, strip_quotes, Step};

const ENDPOINT_KEYS: [&str; 2] = ["api_name", "endpoint_identifier"];

fn invocation_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"[A-Za-z_][\w.]*\s*\(([^()]*)\)").expect("invocation pattern is valid")
    })
}

fn argument_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"([A-Za-z_]\w*)\s*=\s*("(?:[^"\\]|\\.)*"|'(?:[^'\\]|\\.)*'|[^,\s)]+)"#)
            .expect("argument pattern is valid")
    })
}

/// Extracts one step per invocation that names its endpoint, in transcript
/// order. Invocations without an `api_name`/`endpoint_identifier` argument
/// are ignored.
pub fn scrape_steps(transcript: &str) -> Vec<Step> {
    invocation_pattern()
        .captures_iter(transcript)
        .filter_map(|invocation| parse_invocation(&invocation[1]))
        .collect()
}

fn parse_invocation(argument_list: &str) -> Option<Step> {
    let mut endpoint: Option<String> = None;
    let mut arguments = Map::new();

    for pair in argument_pattern().captures_iter(argument_list) {
        let key = &pair[1];
        let raw = &pair[2];
        if ENDPOINT_KEYS.contains(&key) {
            let identifier = strip_quotes(raw.trim()).trim();
            if !identifier.is_empty() {
                endpoint = Some(identifier.to_string());
            }
        } else {
            arguments.insert(key.to_string(), coerce_value(raw));
        }
    }

    endpoint.map(|endpoint| Step::new(endpoint, arguments))
}

/// Like [`scrape_steps`], but an empty transcript or one without any usable
/// invocation is an error the caller has to show.
pub fn parse_transcript(transcript: &str) -> Result<Vec<Step>> {
    if transcript.trim().is_empty() {
        return Err(ControllerError::EmptyTranscript);
    }
    let steps = scrape_steps(transcript);
    if steps.is_empty() {
        return Err(ControllerError::NoValidSteps);
    }
    Ok(steps)
}
