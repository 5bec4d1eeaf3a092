//! Audio preference persistence.
//!
//! Preferences live in a small JSON file next to the binary's working
//! directory. Only presentation settings are persisted; simulation state
//! never is.

use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Persisted audio cue preferences.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub(crate) struct AudioPreferences {
    /// Master volume in `[0, 1]` applied to every cue.
    pub(crate) master_volume: f32,
    /// Suppresses every cue when set.
    pub(crate) muted: bool,
}

impl Default for AudioPreferences {
    fn default() -> Self {
        Self {
            master_volume: 1.0,
            muted: false,
        }
    }
}

impl AudioPreferences {
    /// Loads preferences from `path`, falling back to defaults when the
    /// file does not exist yet.
    pub(crate) fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading audio preferences from {}", path.display()))?;
        let mut preferences: Self = serde_json::from_str(&raw)
            .with_context(|| format!("parsing audio preferences in {}", path.display()))?;
        preferences.master_volume = preferences.master_volume.clamp(0.0, 1.0);
        Ok(preferences)
    }

    /// Writes preferences to `path`.
    pub(crate) fn save(&self, path: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self).context("serializing audio preferences")?;
        fs::write(path, json)
            .with_context(|| format!("writing audio preferences to {}", path.display()))
    }

    /// Whether a cue at the current settings is audible at all.
    pub(crate) fn audible(&self) -> bool {
        !self.muted && self.master_volume > 0.0
    }
}
