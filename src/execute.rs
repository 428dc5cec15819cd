use anyhow::Result;
use log::{debug, info};

use crate::config::Settings;
use crate::http_request_executor::{execute_http_request, truncate, ExecutionContext};
use crate::recording::{Recording, SequenceRecording};
use crate::recording_store::RecordingStore;
use crate::rpc_client::{HttpConnector, RemoteConnector};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionOutcome {
    pub success: bool,
    pub transcript: String,
}

impl ExecutionOutcome {
    pub fn new(success: bool, transcript: String) -> ExecutionOutcome {
        ExecutionOutcome { success, transcript }
    }

    pub fn failure(transcript: String) -> ExecutionOutcome {
        ExecutionOutcome::new(false, transcript)
    }
}

/// Replays recordings. Each call is a single attempt; nothing is retried.
pub struct Executor {
    context: ExecutionContext,
    connector: Box<dyn RemoteConnector>,
}

impl Executor {
    pub fn new(settings: &Settings) -> Result<Executor> {
        Ok(Executor {
            context: ExecutionContext::new(settings.execute_timeout)?,
            connector: Box::new(HttpConnector::new(settings.execute_timeout)),
        })
    }

    pub fn with_connector(settings: &Settings, connector: Box<dyn RemoteConnector>) -> Result<Executor> {
        Ok(Executor {
            context: ExecutionContext::new(settings.execute_timeout)?,
            connector,
        })
    }

    pub fn execute(&self, store: &RecordingStore, name: &str) -> ExecutionOutcome {
        let Some(recording) = store.get(name) else {
            return ExecutionOutcome::failure(format!("Enregistrement '{}' introuvable", name));
        };
        info!("Executing recording '{}'", name);
        let outcome = match recording {
            Recording::Simple(simple) => execute_http_request(simple, &self.context),
            Recording::Sequence(sequence) => self.execute_sequence(sequence),
        };
        debug!("Recording '{}' finished, success: {}", name, outcome.success);
        outcome
    }

    /// Runs every step in order, whatever happened to the previous ones.
    pub fn execute_sequence(&self, sequence: &SequenceRecording) -> ExecutionOutcome {
        let mut log = format!("Exécution de la séquence '{}':\n", sequence.name);
        let session = match self.connector.connect(&sequence.target_url) {
            Ok(session) => session,
            Err(e) => {
                log.push_str(&format!("ERREUR: connexion à {} impossible: {:#}\n", sequence.target_url, e));
                return ExecutionOutcome::failure(log);
            }
        };
        log.push_str(&format!("Connecté à {}\n", sequence.target_url));

        let mut success = true;
        for (index, step) in sequence.steps.iter().enumerate() {
            let number = index + 1;
            if !step.has_endpoint() {
                log.push_str(&format!("Étape {}: ignorée (aucun endpoint)\n", number));
                continue;
            }
            match session.call(&step.endpoint_identifier, &step.arguments) {
                Ok(result) => {
                    log.push_str(&format!(
                        "Étape {}: Succès {} -> {}\n",
                        number,
                        step.endpoint_identifier,
                        truncate(&result.to_string())
                    ));
                }
                Err(e) => {
                    success = false;
                    log.push_str(&format!("Étape {}: Échec {}: {:#}\n", number, step.endpoint_identifier, e));
                }
            }
        }
        ExecutionOutcome::new(success, log)
    }
}
