use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_RECORDINGS_DIR: &str = "./recordings";
pub const EXECUTE_TIMEOUT: Duration = Duration::from_secs(30);
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct Settings {
    pub recordings_dir: PathBuf,
    /// Upper bound for a replayed request or remote call.
    pub execute_timeout: Duration,
    /// Upper bound for the reachability probe of the debug report.
    pub probe_timeout: Duration,
}

impl Settings {
    pub fn new(recordings_dir: impl Into<PathBuf>) -> Settings {
        Settings {
            recordings_dir: recordings_dir.into(),
            ..Settings::default()
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            recordings_dir: PathBuf::from(DEFAULT_RECORDINGS_DIR),
            execute_timeout: EXECUTE_TIMEOUT,
            probe_timeout: PROBE_TIMEOUT,
        }
    }
}
