//! Gesture - a trained model plus the settings used to score windows with it

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::features::FeatureExtractor;
use crate::logic::config::{AcceptanceScore, GestureDefinition, RecognizerConfig};
use crate::logic::error::{ConfigError, HmmError};
use crate::logic::hmm::{decode, evaluate, HiddenMarkovModel, Scale};
use crate::logic::probability::safe_ln;
use crate::logic::skeleton::SubjectId;

// ============================================================================
// RECOGNITION RESULT
// ============================================================================

/// A window accepted by a gesture model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognitionResult {
    pub id: Uuid,
    pub gesture: String,
    pub subject: SubjectId,
    /// Timestamp of the frame that completed the window
    pub timestamp: DateTime<Utc>,
    /// Observation window that was scored, oldest first
    pub observations: Vec<usize>,
    /// Viterbi state path
    pub path: Vec<usize>,
    pub path_probability: f64,
    pub log_path_probability: f64,
    /// Forward P(window | model)
    pub probability: f64,
    pub log_probability: f64,
    /// Value that beat the threshold (linear; per-symbol if so configured)
    pub score: f64,
    pub scale: Scale,
}

/// Outcome of scoring one window
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub path: Vec<usize>,
    pub log_path_probability: f64,
    pub log_probability: f64,
    pub log_score: f64,
    pub accepted: bool,
}

// ============================================================================
// GESTURE
// ============================================================================

/// Runtime form of a gesture: name, tuning, extractor and shared model
#[derive(Clone)]
pub struct Gesture {
    name: String,
    config: RecognizerConfig,
    extractor: Arc<dyn FeatureExtractor>,
    model: Arc<HiddenMarkovModel>,
}

impl Gesture {
    pub fn new(
        name: &str,
        config: RecognizerConfig,
        extractor: Arc<dyn FeatureExtractor>,
        model: Arc<HiddenMarkovModel>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        extractor.validate().map_err(|e| match e {
            ConfigError::Invalid(msg) => {
                ConfigError::Invalid(format!("gesture '{}': {}", name, msg))
            }
            other => other,
        })?;
        if extractor.symbols() > model.symbols() {
            return Err(ConfigError::Invalid(format!(
                "gesture '{}': extractor emits {} symbols but the model only knows {}",
                name,
                extractor.symbols(),
                model.symbols()
            )));
        }
        Ok(Self {
            name: name.to_string(),
            config,
            extractor,
            model,
        })
    }

    pub fn from_definition(definition: &GestureDefinition) -> Result<Self, ConfigError> {
        Self::new(
            &definition.name,
            definition.recognizer.clone(),
            Arc::new(definition.extractor.clone()),
            Arc::new(definition.model.clone()),
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &RecognizerConfig {
        &self.config
    }

    pub fn extractor(&self) -> &dyn FeatureExtractor {
        self.extractor.as_ref()
    }

    pub fn model(&self) -> &HiddenMarkovModel {
        &self.model
    }

    /// Decode and evaluate `window` in the configured scale, then apply the threshold
    pub fn classify(&self, window: &[usize]) -> Result<Classification, HmmError> {
        let scale = self.config.scale;
        let (path, path_score) = decode(&self.model, window, scale)?;
        let evaluation = evaluate(&self.model, window, scale)?;

        let (log_path_probability, log_probability) = match scale {
            Scale::Log => (path_score, evaluation),
            Scale::Linear => (safe_ln(path_score), safe_ln(evaluation)),
        };

        let (log_score, accepted) = match scale {
            Scale::Log => {
                let log_score = match self.config.score {
                    AcceptanceScore::Sequence => log_probability,
                    AcceptanceScore::PerSymbol => log_probability / window.len() as f64,
                };
                (log_score, log_score > self.config.threshold.ln())
            }
            Scale::Linear => {
                let score = match self.config.score {
                    AcceptanceScore::Sequence => evaluation,
                    AcceptanceScore::PerSymbol => evaluation.powf(1.0 / window.len() as f64),
                };
                (safe_ln(score), score > self.config.threshold)
            }
        };

        Ok(Classification {
            path,
            log_path_probability,
            log_probability,
            log_score,
            accepted,
        })
    }

    pub(crate) fn result(
        &self,
        subject: SubjectId,
        timestamp: DateTime<Utc>,
        window: Vec<usize>,
        classification: Classification,
    ) -> RecognitionResult {
        RecognitionResult {
            id: Uuid::new_v4(),
            gesture: self.name.clone(),
            subject,
            timestamp,
            observations: window,
            path: classification.path,
            path_probability: classification.log_path_probability.exp(),
            log_path_probability: classification.log_path_probability,
            probability: classification.log_probability.exp(),
            log_probability: classification.log_probability,
            score: classification.log_score.exp(),
            scale: self.config.scale,
        }
    }
}

impl fmt::Debug for Gesture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gesture")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("symbols", &self.extractor.symbols())
            .field("states", &self.model.states())
            .finish()
    }
}
