use std::collections::BTreeMap;

use anyhow::Result;
use chrono::Utc;
use log::warn;
use serde_json::Value;

use crate::config::Settings;
use crate::debug_report::Debugger;
use crate::errors::ControllerError;
use crate::execute::{ExecutionOutcome, Executor};
use crate::recording::{HttpMethod, Recording, SequenceRecording, SimpleRecording};
use crate::recording_store::RecordingStore;
use crate::transcript_parser::parse_transcript;

/// Raw form input for a simple recording. JSON fields are left as text and
/// an empty field means absent.
#[derive(Debug, Clone, Default)]
pub struct SaveRequest {
    pub name: String,
    pub url: String,
    pub method: String,
    pub headers: String,
    pub query_params: String,
    pub body: String,
}

/// The entry points a front end drives. Every failure comes back as a
/// message; nothing here returns an error once constructed.
pub struct Controller {
    store: RecordingStore,
    executor: Executor,
    debugger: Debugger,
}

impl Controller {
    pub fn new(settings: &Settings) -> Result<Controller> {
        Ok(Controller {
            store: RecordingStore::open(&settings.recordings_dir)?,
            executor: Executor::new(settings)?,
            debugger: Debugger::new(settings)?,
        })
    }

    pub fn store(&self) -> &RecordingStore {
        &self.store
    }

    pub fn list_names(&self) -> Vec<String> {
        self.store.names()
    }

    pub fn refresh(&mut self) -> String {
        match self.store.reload() {
            Ok(()) => format!("✅ {} enregistrement(s) chargé(s)", self.store.names().len()),
            Err(e) => failure(&e),
        }
    }

    pub fn save(&mut self, request: &SaveRequest) -> String {
        match build_simple(request).and_then(|recording| self.store.save(recording.into())) {
            Ok(()) => "✅ Enregistrement sauvegardé avec succès!".to_string(),
            Err(e) => failure(&e),
        }
    }

    pub fn import_transcript(&mut self, name: &str, target_url: &str, text: &str) -> String {
        let result = validate_required(name, target_url)
            .and_then(|_| parse_transcript(text))
            .and_then(|steps| {
                let count = steps.len();
                self.store
                    .save(Recording::Sequence(SequenceRecording {
                        name: name.trim().to_string(),
                        target_url: target_url.trim().to_string(),
                        steps,
                        created_at: Utc::now(),
                    }))
                    .map(|_| count)
            });
        match result {
            Ok(count) => format!("✅ Séquence sauvegardée avec {} étape(s)", count),
            Err(e) => failure(&e),
        }
    }

    pub fn execute(&self, name: &str) -> ExecutionOutcome {
        self.executor.execute(&self.store, name)
    }

    pub fn debug(&self, name: &str) -> String {
        self.debugger.report(&self.store, name).to_string()
    }
}

fn failure(e: &ControllerError) -> String {
    warn!("{}", e);
    format!("❌ Erreur: {}", e)
}

fn validate_required(name: &str, url: &str) -> Result<(), ControllerError> {
    if name.trim().is_empty() {
        return Err(ControllerError::Validation(
            "the recording name is empty".to_string(),
        ));
    }
    if url.trim().is_empty() {
        return Err(ControllerError::Validation("the URL is empty".to_string()));
    }
    Ok(())
}

fn build_simple(request: &SaveRequest) -> Result<SimpleRecording, ControllerError> {
    validate_required(&request.name, &request.url)?;
    let http_method = if request.method.trim().is_empty() {
        None
    } else {
        Some(request.method.parse::<HttpMethod>()?)
    };
    Ok(SimpleRecording {
        name: request.name.trim().to_string(),
        url: request.url.trim().to_string(),
        http_method,
        headers: parse_string_map("headers", &request.headers)?,
        query_params: parse_string_map("query_params", &request.query_params)?,
        body: parse_json("body", &request.body)?,
        created_at: Utc::now(),
    })
}

fn parse_json(field: &'static str, text: &str) -> Result<Option<Value>, ControllerError> {
    if text.trim().is_empty() {
        return Ok(None);
    }
    serde_json::from_str(text)
        .map(Some)
        .map_err(|source| ControllerError::InvalidJson { field, source })
}

/// A JSON object whose scalar values are kept as text.
fn parse_string_map(field: &'static str, text: &str) -> Result<BTreeMap<String, String>, ControllerError> {
    let Some(value) = parse_json(field, text)? else {
        return Ok(BTreeMap::new());
    };
    let Value::Object(object) = value else {
        return Err(ControllerError::Validation(format!("{} must be a JSON object", field)));
    };
    object
        .into_iter()
        .map(|(key, value)| match value {
            Value::String(text) => Ok((key, text)),
            Value::Null => Ok((key, String::new())),
            Value::Bool(_) | Value::Number(_) => Ok((key, value.to_string())),
            Value::Array(_) | Value::Object(_) => Err(ControllerError::Validation(format!(
                "{}.{} must be a string, number or boolean",
                field, key
            ))),
        })
        .collect()
}
