//! Live network settings, optionally backed by a `Network.json` file.

use std::path::PathBuf;
use std::time::SystemTime;

use tracing::{info, warn};

use teleop_settings::NetworkSettings;

/// Current settings plus the file they are refreshed from.
///
/// A file that fails to read or parse keeps the last good settings.
pub struct NetworkSource {
    settings: NetworkSettings,
    path: Option<PathBuf>,
    modified: Option<SystemTime>,
}

impl NetworkSource {
    pub fn new(settings: NetworkSettings, path: Option<PathBuf>) -> Self {
        let mut source = Self {
            settings,
            path,
            modified: None,
        };
        source.refresh();
        source
    }

    pub fn settings(&self) -> &NetworkSettings {
        &self.settings
    }

    /// Re-reads the file when its modification time moved. Returns whether
    /// the settings changed.
    pub fn refresh(&mut self) -> bool {
        let Some(path) = &self.path else {
            return false;
        };

        let modified = match std::fs::metadata(path).and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(e) => {
                if self.modified.is_some() {
                    warn!(path = %path.display(), error = %e, "network file unavailable");
                    self.modified = None;
                }
                return false;
            }
        };
        if self.modified == Some(modified) {
            return false;
        }
        self.modified = Some(modified);

        match NetworkSettings::load(path) {
            Ok(settings) if settings != self.settings => {
                info!(host = %settings.ip_address, "network settings changed");
                self.settings = settings;
                true
            }
            Ok(_) => false,
            Err(e) => {
                warn!(error = %e, "keeping previous network settings");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn without_file_settings_are_static() {
        let settings = NetworkSettings {
            ip_address: "10.0.0.4".into(),
            ..NetworkSettings::default()
        };
        let mut source = NetworkSource::new(settings.clone(), None);
        assert!(!source.refresh());
        assert_eq!(source.settings(), &settings);
    }

    #[test]
    fn file_overrides_inline_settings() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("Network.json");
        std::fs::write(&path, r#"{"IPAddress": "192.168.5.5", "PausePortNum": "8100"}"#).unwrap();

        let source = NetworkSource::new(NetworkSettings::default(), Some(path));
        assert_eq!(source.settings().ip_address, "192.168.5.5");
        assert_eq!(source.settings().pause_port, "8100");
    }

    #[test]
    fn broken_file_keeps_last_good_settings() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("Network.json");
        std::fs::write(&path, r#"{"IPAddress": "192.168.5.5"}"#).unwrap();
        let mut source = NetworkSource::new(NetworkSettings::default(), Some(path.clone()));

        std::fs::write(&path, "{broken").unwrap();
        // Force a re-read regardless of timestamp granularity.
        source.modified = None;
        assert!(!source.refresh());
        assert_eq!(source.settings().ip_address, "192.168.5.5");
    }

    #[test]
    fn missing_file_falls_back_to_inline() {
        let tmp = tempfile::tempdir().unwrap();
        let settings = NetworkSettings {
            ip_address: "10.1.1.1".into(),
            ..NetworkSettings::default()
        };
        let source = NetworkSource::new(settings, Some(tmp.path().join("absent.json")));
        assert_eq!(source.settings().ip_address, "10.1.1.1");
    }
}
