// SPDX-License-Identifier: GPL-3.0-only

//! Startup configuration
//!
//! Read once from JSON and never written back. Command line flags override
//! whatever the file sets.

use crate::constants::{DEFAULT_DEVICE_PATH, ResolutionPreset, capture};
use crate::errors::{AppError, AppResult};
use crate::filter::FilterKind;
use crate::media::Size;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};

/// Application directory under the user config dir
const CONFIG_DIR: &str = "vcam-filter";
const CONFIG_FILE: &str = "config.json";

/// Width and height, written as `"WxH"`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for Resolution {
    type Err = String;

    /// Accepts `WxH` or a preset name (`480p`, `720p`, `1080p`)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(preset) = ResolutionPreset::from_name(s) {
            let (width, height) = preset.dimensions();
            return Ok(Self { width, height });
        }
        let (w, h) = s
            .trim()
            .split_once(['x', 'X'])
            .ok_or_else(|| format!("Invalid resolution '{}', expected WxH", s))?;
        let width = w
            .trim()
            .parse::<u32>()
            .map_err(|e| format!("Invalid width in '{}': {}", s, e))?;
        let height = h
            .trim()
            .parse::<u32>()
            .map_err(|e| format!("Invalid height in '{}': {}", s, e))?;
        if width == 0 || height == 0 {
            return Err(format!("Resolution '{}' has a zero dimension", s));
        }
        Ok(Self { width, height })
    }
}

impl TryFrom<String> for Resolution {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Resolution> for String {
    fn from(value: Resolution) -> Self {
        value.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// v4l2loopback output node
    pub device_path: String,
    /// Fixed output size; `None` follows the source
    pub forced_resolution: Option<Resolution>,
    /// Write to the virtual camera at all
    pub output_enabled: bool,
    /// Capture node used when no `--input` is given
    pub capture_device: Option<String>,
    /// Requested capture size
    pub capture_resolution: Resolution,
    pub default_filter: FilterKind,
    /// Blend strength in `[0, 1]`
    pub default_strength: f32,
}

impl Default for Config {
    fn default() -> Self {
        let (width, height) = capture::DEFAULT_RESOLUTION;
        Self {
            device_path: DEFAULT_DEVICE_PATH.to_string(),
            forced_resolution: None,
            output_enabled: true,
            capture_device: None,
            capture_resolution: Resolution::new(width, height),
            default_filter: FilterKind::None,
            default_strength: 1.0,
        }
    }
}

impl Config {
    /// `$XDG_CONFIG_HOME/vcam-filter/config.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    /// Parse a config file; a missing file yields the defaults
    pub fn load_from(path: &Path) -> AppResult<Self> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No config file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(AppError::Config(format!(
                    "Cannot read {}: {}",
                    path.display(),
                    e
                )));
            }
        };

        let config: Config = serde_json::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Invalid config {}: {}", path.display(), e))
        })?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Load `explicit` if given, otherwise the per-user file
    pub fn load(explicit: Option<&Path>) -> AppResult<Self> {
        match explicit {
            Some(path) => Self::load_from(path),
            None => match Self::default_path() {
                Some(path) => Self::load_from(&path),
                None => Ok(Self::default()),
            },
        }
    }
}
