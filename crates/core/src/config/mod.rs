use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Result, RigError};

pub const DEFAULT_MAX_NOTES: usize = 32;
pub const DEFAULT_MAX_RHYTHMS: usize = 10;
pub const DEFAULT_MECHANISM_CAPACITY: usize = 3;
pub const DEFAULT_FLASH_WINDOW_MS: u32 = 100;

/// Top-level configuration structure for the application.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub engine: EngineConfig,
    pub catalog: CatalogConfig,
    pub rig: RigConfig,
}

impl AppConfig {
    /// Reads a JSON configuration file. Missing fields fall back to their
    /// defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Parses and validates a JSON configuration held in memory.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks capacities and the rig layout.
    pub fn validate(&self) -> Result<()> {
        if self.engine.mechanism_capacity == 0 {
            return Err(RigError::InvalidConfig(
                "engine.mechanism_capacity must be at least 1".to_string(),
            ));
        }
        if self.catalog.max_rhythms == 0 || self.catalog.max_notes == 0 {
            return Err(RigError::InvalidConfig(
                "catalog capacities must be at least 1".to_string(),
            ));
        }
        if let Some(freq) = self.rig.bells.iter().find(|f| !(**f > 0.0)) {
            return Err(RigError::InvalidConfig(format!(
                "bell frequency {freq} must be positive"
            )));
        }
        if self.rig.bells.is_empty() && self.rig.peckers == 0 {
            return Err(RigError::InvalidConfig(
                "rig needs at least one bell or pecker".to_string(),
            ));
        }
        if self.rig.tick_interval_ms == 0 {
            return Err(RigError::InvalidConfig(
                "rig.tick_interval_ms must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// 8-bit colour sent to light groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    /// Muted purple flashed whenever a note fires.
    pub const FEEDBACK: Rgb = Rgb::new(200, 100, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl Default for Rgb {
    fn default() -> Self {
        Self::FEEDBACK
    }
}

/// Configuration of the playback scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub feedback_color: Rgb,
    /// How long the feedback colour stays up after a note fires.
    pub flash_window_ms: u32,
    /// Maximum linked bells, peckers and light groups (each).
    pub mechanism_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            feedback_color: Rgb::FEEDBACK,
            flash_window_ms: DEFAULT_FLASH_WINDOW_MS,
            mechanism_capacity: DEFAULT_MECHANISM_CAPACITY,
        }
    }
}

/// Capacities of rhythms and of the rhythm catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub max_rhythms: usize,
    pub max_notes: usize,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            max_rhythms: DEFAULT_MAX_RHYTHMS,
            max_notes: DEFAULT_MAX_NOTES,
        }
    }
}

/// Layout of the simulated rig driven by the command line application.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RigConfig {
    /// Resonant frequency of every bell, in Hz.
    pub bells: Vec<f64>,
    pub peckers: usize,
    pub pecker_cooldown_ms: u32,
    pub light_groups: usize,
    pub tick_interval_ms: u64,
}

impl Default for RigConfig {
    fn default() -> Self {
        Self {
            bells: vec![220.0, 440.0, 880.0],
            peckers: 1,
            pecker_cooldown_ms: 40,
            light_groups: 2,
            tick_interval_ms: 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config = AppConfig::from_json_str(
            r#"{ "engine": { "feedback_color": { "r": 1, "g": 2, "b": 3 } } }"#,
        )
        .unwrap();

        assert_eq!(config.engine.feedback_color, Rgb::new(1, 2, 3));
        assert_eq!(config.engine.flash_window_ms, DEFAULT_FLASH_WINDOW_MS);
        assert_eq!(config.catalog.max_notes, DEFAULT_MAX_NOTES);
        assert_eq!(config.rig.bells.len(), 3);
    }

    #[test]
    fn rejects_zero_capacity() {
        let err = AppConfig::from_json_str(r#"{ "catalog": { "max_rhythms": 0 } }"#).unwrap_err();
        assert!(matches!(err, RigError::InvalidConfig(_)));
    }

    #[test]
    fn rejects_non_positive_bell() {
        let err = AppConfig::from_json_str(r#"{ "rig": { "bells": [440.0, -1.0] } }"#).unwrap_err();
        assert!(format!("{err}").contains("-1"));
    }

    #[test]
    fn rejects_rig_without_bells_or_peckers() {
        let err = AppConfig::from_json_str(r#"{ "rig": { "bells": [], "peckers": 0 } }"#)
            .unwrap_err();
        assert!(matches!(err, RigError::InvalidConfig(_)));

        let pecker_only = AppConfig::from_json_str(r#"{ "rig": { "bells": [], "peckers": 2 } }"#);
        assert!(pecker_only.is_ok());
    }

    #[test]
    fn malformed_json_is_reported() {
        let err = AppConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, RigError::Json(_)));
    }
}
