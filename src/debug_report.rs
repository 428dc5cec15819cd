//! Diagnostics for a recording: configuration checks, a reachability probe,
//! and canned remediation hints.

use std::error::Error as StdError;
use std::fmt::{Display, Formatter};
use std::io::ErrorKind;

use anyhow::{Context, Result};
use log::debug;

use crate::config::Settings;
use crate::recording::Recording;
use crate::recording_store::RecordingStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Finding {
    NotFound,
    MissingUrl,
    MissingMethod,
    InvalidUrl(String),
    NoSteps,
    StepWithoutEndpoint(usize),
    ConnectionRefused,
    TimedOut,
    ProbeError(String),
}

impl Finding {
    /// Static hints shown for this kind of finding.
    pub fn suggestions(&self) -> &'static [&'static str] {
        match self {
            Finding::NotFound => &["Actualisez la liste des enregistrements ou enregistrez l'API d'abord."],
            Finding::MissingUrl => &["Renseignez l'URL de l'API."],
            Finding::MissingMethod => &["Choisissez une méthode HTTP (GET, POST, PUT, DELETE, PATCH, HEAD, OPTIONS)."],
            Finding::InvalidUrl(_) => &["Vérifiez le format de l'URL, schéma http:// ou https:// compris."],
            Finding::NoSteps | Finding::StepWithoutEndpoint(_) => {
                &["Réimportez la transcription en indiquant api_name pour chaque appel."]
            }
            Finding::ConnectionRefused => &[
                "Vérifiez que le service cible est démarré.",
                "Vérifiez que l'URL et le port sont corrects.",
            ],
            Finding::TimedOut => &[
                "Le service ne répond pas à temps: vérifiez le réseau et les pare-feu.",
                "Vérifiez que l'hôte est joignable depuis cette machine.",
            ],
            Finding::ProbeError(_) => &["Vérifiez le nom d'hôte ainsi que la configuration TLS et proxy."],
        }
    }
}

impl Display for Finding {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Finding::NotFound => write!(f, "Enregistrement introuvable"),
            Finding::MissingUrl => write!(f, "URL manquante"),
            Finding::MissingMethod => write!(f, "Méthode HTTP manquante"),
            Finding::InvalidUrl(reason) => write!(f, "URL invalide: {}", reason),
            Finding::NoSteps => write!(f, "Aucune étape dans la séquence"),
            Finding::StepWithoutEndpoint(number) => write!(f, "Étape {} sans endpoint", number),
            Finding::ConnectionRefused => write!(f, "Connexion refusée"),
            Finding::TimedOut => write!(f, "Délai d'attente dépassé"),
            Finding::ProbeError(reason) => write!(f, "Erreur de connexion: {}", reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Reachable(u16),
    ConnectionRefused,
    TimedOut,
    Other(String),
    /// No usable URL to probe.
    Skipped,
}

impl ProbeOutcome {
    fn finding(&self) -> Option<Finding> {
        match self {
            ProbeOutcome::ConnectionRefused => Some(Finding::ConnectionRefused),
            ProbeOutcome::TimedOut => Some(Finding::TimedOut),
            ProbeOutcome::Other(reason) => Some(Finding::ProbeError(reason.clone())),
            ProbeOutcome::Reachable(_) | ProbeOutcome::Skipped => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DebugReport {
    pub name: String,
    pub target: Option<String>,
    pub findings: Vec<Finding>,
    pub probe: ProbeOutcome,
    /// Endpoint identifiers of a sequence, in order.
    pub steps: Vec<String>,
}

impl DebugReport {
    fn not_found(name: &str) -> DebugReport {
        DebugReport {
            name: name.to_string(),
            target: None,
            findings: vec![Finding::NotFound],
            probe: ProbeOutcome::Skipped,
            steps: Vec::new(),
        }
    }

    pub fn has(&self, finding: &Finding) -> bool {
        self.findings.contains(finding)
    }

    /// Hints for every finding, without repeats.
    pub fn suggestions(&self) -> Vec<&'static str> {
        let mut suggestions: Vec<&'static str> = Vec::new();
        for suggestion in self.findings.iter().flat_map(|finding| finding.suggestions()) {
            if !suggestions.contains(suggestion) {
                suggestions.push(suggestion);
            }
        }
        suggestions
    }
}

impl Display for DebugReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Rapport de debug pour '{}'", self.name)?;
        if let Some(target) = &self.target {
            writeln!(f, "Cible: {}", target)?;
        }

        match &self.probe {
            ProbeOutcome::Reachable(status) => writeln!(f, "Accessibilité: joignable (statut {})", status)?,
            ProbeOutcome::Skipped => writeln!(f, "Accessibilité: non testée")?,
            other => {
                if let Some(finding) = other.finding() {
                    writeln!(f, "Accessibilité: {}", finding)?;
                }
            }
        }

        if !self.steps.is_empty() {
            writeln!(f, "Étapes:")?;
            for (index, step) in self.steps.iter().enumerate() {
                let label = if step.is_empty() { "(aucun endpoint)" } else { step };
                writeln!(f, "  {}. {}", index + 1, label)?;
            }
        }

        if self.findings.is_empty() {
            writeln!(f, "Aucun problème détecté.")?;
        } else {
            writeln!(f, "Problèmes détectés:")?;
            for finding in &self.findings {
                writeln!(f, "  - {}", finding)?;
            }
            writeln!(f, "Suggestions:")?;
            for suggestion in self.suggestions() {
                writeln!(f, "  - {}", suggestion)?;
            }
        }
        Ok(())
    }
}

pub struct Debugger {
    client: reqwest::blocking::Client,
}

impl Debugger {
    pub fn new(settings: &Settings) -> Result<Debugger> {
        let client = reqwest::blocking::Client::builder()
            .timeout(settings.probe_timeout)
            .build()
            .context("while building the probe client")?;
        Ok(Debugger { client })
    }

    pub fn report(&self, store: &RecordingStore, name: &str) -> DebugReport {
        match store.get(name) {
            Some(recording) => self.inspect(recording),
            None => DebugReport::not_found(name),
        }
    }

    pub fn inspect(&self, recording: &Recording) -> DebugReport {
        let mut findings = Vec::new();
        let mut steps = Vec::new();
        let target = recording.target().trim();

        if target.is_empty() {
            findings.push(Finding::MissingUrl);
        }
        match recording {
            Recording::Simple(simple) => {
                if simple.http_method.is_none() {
                    findings.push(Finding::MissingMethod);
                }
            }
            Recording::Sequence(sequence) => {
                if sequence.steps.is_empty() {
                    findings.push(Finding::NoSteps);
                }
                for (index, step) in sequence.steps.iter().enumerate() {
                    if !step.has_endpoint() {
                        findings.push(Finding::StepWithoutEndpoint(index + 1));
                    }
                    steps.push(step.endpoint_identifier.trim().to_string());
                }
            }
        }

        let probe = if target.is_empty() {
            ProbeOutcome::Skipped
        } else {
            match target.parse::<reqwest::Url>() {
                Ok(url) => self.probe(url),
                Err(e) => {
                    findings.push(Finding::InvalidUrl(e.to_string()));
                    ProbeOutcome::Skipped
                }
            }
        };
        findings.extend(probe.finding());

        DebugReport {
            name: recording.name().to_string(),
            target: (!target.is_empty()).then(|| target.to_string()),
            findings,
            probe,
            steps,
        }
    }

    /// One HEAD request; any status at all means the target is reachable.
    pub fn probe(&self, url: reqwest::Url) -> ProbeOutcome {
        debug!("Probing {}", url);
        match self.client.head(url).send() {
            Ok(res) => ProbeOutcome::Reachable(res.status().as_u16()),
            Err(e) => classify(&e),
        }
    }
}

fn classify(err: &reqwest::Error) -> ProbeOutcome {
    if is_connection_refused(err) {
        ProbeOutcome::ConnectionRefused
    } else if err.is_timeout() {
        ProbeOutcome::TimedOut
    } else {
        ProbeOutcome::Other(err.to_string())
    }
}

fn is_connection_refused(err: &(dyn StdError + 'static)) -> bool {
    let mut current: Option<&(dyn StdError + 'static)> = Some(err);
    while let Some(e) = current {
        if let Some(io) = e.downcast_ref::<std::io::Error>() {
            if io.kind() == ErrorKind::ConnectionRefused {
                return true;
            }
        }
        if e.to_string().to_lowercase().contains("connection refused") {
            return true;
        }
        current = e.source();
    }
    false
}
