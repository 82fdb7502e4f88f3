//! Pipeline Configuration
//!
//! Everything the host supplies up front: recognizer tuning, correction
//! offsets, observer queue settings and one trained model per gesture.
//! Loaded from JSON; invalid models or settings are rejected at load time.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_FRAME_HISTORY, DEFAULT_MIN_LENGTH, DEFAULT_THRESHOLD, DEFAULT_WINDOW_CAPACITY,
};
use crate::logic::error::ConfigError;
use crate::logic::gestures::features::{DirectionQuantizer, FeatureExtractor};
use crate::logic::hmm::{HiddenMarkovModel, Scale};
use crate::logic::pipeline::QueueConfig;
use crate::logic::skeleton::Joint;

// ============================================================================
// RECOGNIZER CONFIG
// ============================================================================

/// What happens to a subject's window after a recognition fires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResetPolicy {
    /// Clear the window (back to Idle) so overlapping windows do not re-fire
    #[default]
    Reset,
    /// Keep sliding
    KeepSliding,
}

/// Quantity compared against the acceptance threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcceptanceScore {
    /// P(window | model)
    #[default]
    Sequence,
    /// P(window | model)^(1/T), independent of window length
    PerSymbol,
}

/// Recognizer tuning for one gesture
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognizerConfig {
    /// Sliding window capacity (symbols)
    pub window_capacity: usize,
    /// Minimum window length before classification
    pub min_length: usize,
    /// Acceptance threshold θ, 0 < θ <= 1
    pub threshold: f64,
    pub scale: Scale,
    pub score: AcceptanceScore,
    pub reset: ResetPolicy,
    /// Recent frames kept for the feature extractor (direction needs 2)
    pub frame_history: usize,
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            window_capacity: DEFAULT_WINDOW_CAPACITY,
            min_length: DEFAULT_MIN_LENGTH,
            threshold: DEFAULT_THRESHOLD,
            scale: Scale::Log,
            score: AcceptanceScore::Sequence,
            reset: ResetPolicy::Reset,
            frame_history: DEFAULT_FRAME_HISTORY,
        }
    }
}

impl RecognizerConfig {
    /// Short window, per-symbol score; fires quickly on brief gestures
    pub fn responsive() -> Self {
        Self {
            window_capacity: 12,
            min_length: 4,
            score: AcceptanceScore::PerSymbol,
            ..Default::default()
        }
    }

    /// Long window, high per-symbol threshold
    pub fn strict() -> Self {
        Self {
            window_capacity: 48,
            min_length: 16,
            threshold: 0.8,
            score: AcceptanceScore::PerSymbol,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_length == 0 {
            return Err(ConfigError::Invalid("min_length must be at least 1".to_string()));
        }
        if self.window_capacity < self.min_length {
            return Err(ConfigError::Invalid(format!(
                "window_capacity ({}) is smaller than min_length ({})",
                self.window_capacity, self.min_length
            )));
        }
        if !(self.threshold > 0.0 && self.threshold <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "threshold must be in (0, 1], got {}",
                self.threshold
            )));
        }
        if self.frame_history == 0 {
            return Err(ConfigError::Invalid("frame_history must be at least 1".to_string()));
        }
        Ok(())
    }
}

// ============================================================================
// PIPELINE CONFIG
// ============================================================================

/// Constant per-joint sensor bias, in meters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrectionConfig {
    pub offsets: BTreeMap<Joint, [f64; 3]>,
}

/// One recognizable gesture
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GestureDefinition {
    pub name: String,
    #[serde(default)]
    pub recognizer: RecognizerConfig,
    pub extractor: DirectionQuantizer,
    pub model: HiddenMarkovModel,
}

/// Full pipeline configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub correction: CorrectionConfig,
    #[serde(default)]
    pub observer_queue: QueueConfig,
    #[serde(default)]
    pub gestures: Vec<GestureDefinition>,
}

impl PipelineConfig {
    /// Load and validate a JSON config file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        let config = Self::from_json(&content)?;
        log::info!(
            "Loaded pipeline config from {:?} ({} gestures)",
            path.as_ref(),
            config.gestures.len()
        );
        Ok(config)
    }

    /// Parse and validate a JSON string
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let config: PipelineConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.observer_queue.capacity == 0 {
            return Err(ConfigError::Invalid(
                "observer_queue.capacity must be at least 1".to_string(),
            ));
        }

        let mut names = HashSet::new();
        for gesture in &self.gestures {
            if gesture.name.trim().is_empty() {
                return Err(ConfigError::Invalid("gesture name is empty".to_string()));
            }
            if !names.insert(gesture.name.as_str()) {
                return Err(ConfigError::Invalid(format!("duplicate gesture '{}'", gesture.name)));
            }
            let context = |e: ConfigError| match e {
                ConfigError::Invalid(msg) => {
                    ConfigError::Invalid(format!("gesture '{}': {}", gesture.name, msg))
                }
                other => other,
            };
            gesture.recognizer.validate().map_err(context)?;
            gesture.extractor.validate().map_err(context)?;
            gesture
                .model
                .validate()
                .map_err(|e| ConfigError::Invalid(format!("gesture '{}': {}", gesture.name, e)))?;

            let alphabet = gesture.extractor.symbols();
            if alphabet > gesture.model.symbols() {
                return Err(ConfigError::Invalid(format!(
                    "gesture '{}': extractor emits {} symbols but the model only knows {}",
                    gesture.name,
                    alphabet,
                    gesture.model.symbols()
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const CONFIG: &str = r#"{
        "correction": { "offsets": { "torso": [0.0, -0.02, 0.0] } },
        "observer_queue": { "capacity": 16, "policy": "drop_newest" },
        "gestures": [
            {
                "name": "swipe_right",
                "recognizer": { "window_capacity": 10, "min_length": 3, "threshold": 0.3 },
                "extractor": { "joint": "right_hand", "sectors": 4, "dead_zone": 0.01 },
                "model": {
                    "initial": [1.0, 0.0],
                    "transitions": [[0.5, 0.5], [0.0, 1.0]],
                    "emissions": [
                        [0.1, 0.6, 0.1, 0.1, 0.1],
                        [0.1, 0.6, 0.1, 0.1, 0.1]
                    ]
                }
            }
        ]
    }"#;

    #[test]
    fn test_default_config() {
        let config = RecognizerConfig::default();
        assert_eq!(config.threshold, 0.5);
        assert_eq!(config.reset, ResetPolicy::Reset);
        assert_eq!(config.scale, Scale::Log);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_presets_are_valid() {
        assert!(RecognizerConfig::responsive().validate().is_ok());
        assert!(RecognizerConfig::strict().validate().is_ok());
        assert_eq!(RecognizerConfig::strict().threshold, 0.8);
    }

    #[test]
    fn test_invalid_recognizer_config() {
        let bad_threshold = RecognizerConfig { threshold: 0.0, ..Default::default() };
        assert!(bad_threshold.validate().is_err());

        let above_one = RecognizerConfig { threshold: 1.5, ..Default::default() };
        assert!(above_one.validate().is_err());

        let small_window = RecognizerConfig {
            window_capacity: 2,
            min_length: 5,
            ..Default::default()
        };
        assert!(small_window.validate().is_err());
    }

    #[test]
    fn test_parse_full_config() {
        let config = PipelineConfig::from_json(CONFIG).unwrap();
        assert_eq!(config.gestures.len(), 1);
        assert_eq!(config.observer_queue.capacity, 16);
        assert_eq!(config.correction.offsets[&Joint::Torso], [0.0, -0.02, 0.0]);

        let gesture = &config.gestures[0];
        assert_eq!(gesture.recognizer.window_capacity, 10);
        // unspecified fields fall back to defaults
        assert_eq!(gesture.recognizer.scale, Scale::Log);
        assert_eq!(gesture.extractor.symbols(), 5);
        assert_eq!(gesture.model.states(), 2);
    }

    #[test]
    fn test_invalid_model_fails_at_load() {
        let bad = CONFIG.replace("[[0.5, 0.5], [0.0, 1.0]]", "[[0.7, 0.5], [0.0, 1.0]]");
        match PipelineConfig::from_json(&bad) {
            Err(ConfigError::Json(e)) => assert!(e.to_string().contains("transition row 0")),
            other => panic!("Expected a parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_alphabet_mismatch_rejected() {
        let bad = CONFIG.replace("\"sectors\": 4", "\"sectors\": 8");
        assert!(matches!(PipelineConfig::from_json(&bad), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let mut config = PipelineConfig::from_json(CONFIG).unwrap();
        config.gestures.push(config.gestures[0].clone());
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(CONFIG.as_bytes()).unwrap();

        let config = PipelineConfig::load(file.path()).unwrap();
        assert_eq!(config.gestures[0].name, "swipe_right");

        assert!(matches!(
            PipelineConfig::load(file.path().with_extension("missing")),
            Err(ConfigError::Io(_))
        ));
    }
}
