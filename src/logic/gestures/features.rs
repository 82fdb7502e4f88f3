//! Feature Extraction - skeleton frames to observation symbols
//!
//! The recognizer keeps a short history of corrected frames per subject and
//! asks its extractor for one symbol per frame. The stock extractor,
//! `DirectionQuantizer`, tracks a single joint and buckets its movement
//! direction into equal angular sectors, with symbol 0 reserved for "still".

use std::f64::consts::TAU;

use serde::{Deserialize, Serialize};

use super::window::ObservationSymbol;
use crate::logic::error::ConfigError;
use crate::logic::skeleton::{Joint, Point3, SkeletonFrame};

/// Maps recent frames to one observation symbol
pub trait FeatureExtractor: Send + Sync {
    /// Alphabet size M this extractor can emit
    fn symbols(&self) -> usize;

    /// `history` is oldest first, the current frame last.
    /// `None` means no symbol for this frame (not enough history, joint missing).
    fn extract(&self, history: &[SkeletonFrame]) -> Option<ObservationSymbol>;

    /// Reject settings `extract` cannot work with
    fn validate(&self) -> Result<(), ConfigError> {
        Ok(())
    }
}

// ============================================================================
// DIRECTION QUANTIZER
// ============================================================================

/// Projection plane for direction quantization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Plane {
    /// Frontal plane (sensor facing the subject)
    #[default]
    Xy,
    /// Horizontal plane
    Xz,
    Yz,
}

impl Plane {
    fn project(self, p: Point3) -> (f64, f64) {
        match self {
            Plane::Xy => (p.x, p.y),
            Plane::Xz => (p.x, p.z),
            Plane::Yz => (p.y, p.z),
        }
    }
}

fn default_sectors() -> usize {
    8
}

fn default_dead_zone() -> f64 {
    0.01
}

/// Movement direction of one joint, quantized into `sectors` buckets
///
/// Symbol 0 is "still" (displacement under `dead_zone`), symbols
/// `1..=sectors` are directions counter-clockwise from +x, each sector
/// centered on its direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectionQuantizer {
    pub joint: Joint,
    #[serde(default = "default_sectors")]
    pub sectors: usize,
    /// Minimum planar displacement (meters) counted as movement
    #[serde(default = "default_dead_zone")]
    pub dead_zone: f64,
    #[serde(default)]
    pub plane: Plane,
}

impl DirectionQuantizer {
    pub fn new(joint: Joint, sectors: usize) -> Self {
        Self {
            joint,
            sectors,
            dead_zone: default_dead_zone(),
            plane: Plane::Xy,
        }
    }

    pub fn with_dead_zone(mut self, dead_zone: f64) -> Self {
        self.dead_zone = dead_zone;
        self
    }

    pub fn with_plane(mut self, plane: Plane) -> Self {
        self.plane = plane;
        self
    }

    /// Quantize one displacement vector
    pub fn quantize(&self, delta: Point3) -> Option<ObservationSymbol> {
        if self.sectors == 0 {
            return None;
        }
        let (dx, dy) = self.plane.project(delta);
        if !dx.is_finite() || !dy.is_finite() {
            return None;
        }
        if (dx * dx + dy * dy).sqrt() < self.dead_zone || (dx == 0.0 && dy == 0.0) {
            return Some(ObservationSymbol(0));
        }

        let width = TAU / self.sectors as f64;
        let angle = dy.atan2(dx).rem_euclid(TAU);
        let sector = ((angle + width / 2.0) / width).floor() as usize % self.sectors;
        Some(ObservationSymbol(sector + 1))
    }
}

impl FeatureExtractor for DirectionQuantizer {
    fn symbols(&self) -> usize {
        self.sectors + 1
    }

    fn extract(&self, history: &[SkeletonFrame]) -> Option<ObservationSymbol> {
        let [.., previous, current] = history else {
            return None;
        };
        let from = previous.joint(self.joint)?;
        let to = current.joint(self.joint)?;
        self.quantize(to - from)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.sectors == 0 {
            return Err(ConfigError::Invalid("extractor needs at least one sector".to_string()));
        }
        if !self.dead_zone.is_finite() || self.dead_zone < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "dead_zone must be finite and non-negative, got {}",
                self.dead_zone
            )));
        }
        Ok(())
    }
}
