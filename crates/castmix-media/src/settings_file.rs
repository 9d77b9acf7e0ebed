//! Mix settings persistence with versioning and migration.
//!
//! Files are JSON with a schema version field. Version 0 files are bare
//! `MixSettings` objects with no wrapper.

use std::path::Path;

use castmix_core::{MixError, MixSettings, Result};
use serde::{Deserialize, Serialize};

/// Current schema version.
pub const CURRENT_VERSION: u32 = 1;

/// Versioned settings file wrapper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingsFile {
    /// Schema version for migration.
    pub version: u32,
    /// The mix settings.
    pub settings: MixSettings,
    /// Application version that wrote this file.
    #[serde(default)]
    pub app_version: String,
}

impl SettingsFile {
    pub fn new(settings: MixSettings) -> Self {
        Self {
            version: CURRENT_VERSION,
            settings,
            app_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Serialize to pretty-printed JSON bytes.
    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(self)
            .map_err(|e| MixError::Serialization(format!("failed to serialize settings: {}", e)))
    }

    /// Deserialize from JSON bytes, applying migrations if needed.
    ///
    /// The settings are validated after loading.
    pub fn from_json(data: &[u8]) -> Result<Self> {
        let raw: serde_json::Value = serde_json::from_slice(data)
            .map_err(|e| MixError::Serialization(format!("invalid JSON: {}", e)))?;
        if !raw.is_object() {
            return Err(MixError::Serialization(
                "settings file must be a JSON object".into(),
            ));
        }

        let version = match raw.get("version") {
            None => 0,
            Some(v) => v
                .as_u64()
                .and_then(|n| u32::try_from(n).ok())
                .ok_or_else(|| MixError::Serialization(format!("invalid version field: {}", v)))?,
        };
        if version > CURRENT_VERSION {
            return Err(MixError::Serialization(format!(
                "settings file version {} is newer than supported version {}",
                version, CURRENT_VERSION
            )));
        }

        let migrated = migrate(raw, version)?;
        let file: Self = serde_json::from_value(migrated)
            .map_err(|e| MixError::Serialization(format!("failed to parse settings: {}", e)))?;
        file.settings.validate()?;
        Ok(file)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::from_json(&data)
    }
}

/// Apply sequential migrations from `from_version` to `CURRENT_VERSION`.
fn migrate(mut data: serde_json::Value, from_version: u32) -> Result<serde_json::Value> {
    let mut version = from_version;

    while version < CURRENT_VERSION {
        match version {
            0 => {
                // v0 -> v1: the whole document is the settings object.
                data = serde_json::json!({
                    "version": 1,
                    "settings": data,
                    "app_version": "0.0.0",
                });
                version = 1;
            }
            _ => {
                return Err(MixError::Serialization(format!(
                    "no migration path from version {}",
                    version
                )));
            }
        }
    }

    Ok(data)
}
