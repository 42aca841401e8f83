// SPDX-License-Identifier: GPL-3.0-only

use crate::app::session::SessionTiming;
use crate::backends::camera::ScanConfig;
use crate::constants::timing;
use crate::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Directory name under the user config dir
pub const APP_DIR: &str = "qr-scanner";

/// File name of the configuration
pub const CONFIG_FILE: &str = "config.json";

/// User configuration. Every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Parameters handed to the decode engine
    pub scan: ScanConfig,
    /// Pause between cameras when switching
    pub switch_restart_delay_ms: u64,
    /// How long "Copied!" stays visible
    pub copy_confirmation_ms: u64,
    /// How long the success banner stays visible
    pub success_indicator_ms: u64,
    /// Ring the terminal bell on a new scan
    pub beep: bool,
    /// Share command, e.g. `["notify-send", "{title}", "{text} {url}"]`
    pub share_command: Option<Vec<String>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scan: ScanConfig::default(),
            switch_restart_delay_ms: timing::SWITCH_RESTART_DELAY_MS,
            copy_confirmation_ms: timing::COPY_CONFIRMATION_MS,
            success_indicator_ms: timing::SUCCESS_INDICATOR_MS,
            beep: true,
            share_command: None,
        }
    }
}

impl Config {
    /// Default location: `<config dir>/qr-scanner/config.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
    }

    /// Load from `path`, or from the default location when it exists.
    ///
    /// An explicit path must exist; a missing default file yields defaults.
    pub fn load(path: Option<&Path>) -> AppResult<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match Self::default_path() {
                Some(path) if path.exists() => path,
                _ => {
                    debug!("No config file, using defaults");
                    return Ok(Self::default());
                }
            },
        };

        let contents = std::fs::read_to_string(&path)
            .map_err(|e| AppError::Config(format!("{}: {}", path.display(), e)))?;
        let config = Self::from_json(&contents)
            .map_err(|e| AppError::Config(format!("{}: {}", path.display(), e)))?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Parse and sanitise a JSON document
    pub fn from_json(json: &str) -> AppResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        Ok(config.validated())
    }

    /// Clamp out-of-range values
    pub fn validated(mut self) -> Self {
        self.scan = self.scan.sanitized();
        if self
            .share_command
            .as_ref()
            .is_some_and(|argv| argv.is_empty() || argv[0].trim().is_empty())
        {
            self.share_command = None;
        }
        self
    }

    pub fn session_timing(&self) -> SessionTiming {
        SessionTiming {
            restart_delay: Duration::from_millis(self.switch_restart_delay_ms),
            indicator_duration: Duration::from_millis(self.success_indicator_ms),
        }
    }

    pub fn copy_window(&self) -> Duration {
        Duration::from_millis(self.copy_confirmation_ms)
    }
}
