//! Correction Filter
//!
//! Computes a per-joint bias correction for every incoming frame, notifies
//! one `CorrectionVector` per corrected joint, and routes the corrected frame
//! downstream. A joint the correction function rejects is skipped; the rest
//! of the frame is still processed.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::logic::error::{CorrectionError, GestureResult};
use crate::logic::events::SkeletonEvent;
use crate::logic::pipeline::{EventSink, ObserverId, ObserverList, Pipeline, PipelineStage};
use crate::logic::skeleton::{CorrectionVector, Joint, Point3, SkeletonFrame};

// ============================================================================
// CORRECTION FUNCTIONS
// ============================================================================

/// Supplies the correction delta for one joint position
pub trait CorrectionFunction: Send + Sync {
    fn correction_for(&self, joint: Joint, point: Point3) -> Result<Point3, CorrectionError>;
}

impl<F> CorrectionFunction for F
where
    F: Fn(Joint, Point3) -> Result<Point3, CorrectionError> + Send + Sync,
{
    fn correction_for(&self, joint: Joint, point: Point3) -> Result<Point3, CorrectionError> {
        self(joint, point)
    }
}

/// No bias anywhere
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityCorrection;

impl CorrectionFunction for IdentityCorrection {
    fn correction_for(&self, _joint: Joint, _point: Point3) -> Result<Point3, CorrectionError> {
        Ok(Point3::ZERO)
    }
}

/// Constant per-joint bias table
///
/// Joints missing from the table are reported as unknown.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OffsetCorrection {
    offsets: BTreeMap<Joint, Point3>,
}

impl OffsetCorrection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_offset(mut self, joint: Joint, offset: Point3) -> Self {
        self.offsets.insert(joint, offset);
        self
    }

    pub fn from_table(table: &BTreeMap<Joint, [f64; 3]>) -> Self {
        Self {
            offsets: table.iter().map(|(j, v)| (*j, Point3::from(*v))).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }
}

impl CorrectionFunction for OffsetCorrection {
    fn correction_for(&self, joint: Joint, point: Point3) -> Result<Point3, CorrectionError> {
        if !point.is_finite() {
            return Err(CorrectionError::OutOfRange {
                joint,
                reason: format!("non-finite position {:?}", point),
            });
        }
        self.offsets
            .get(&joint)
            .copied()
            .ok_or(CorrectionError::UnknownJoint(joint))
    }
}

// ============================================================================
// FILTER STAGE
// ============================================================================

/// Filter counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrectionStats {
    pub frames: u64,
    pub corrected: u64,
    pub skipped: u64,
}

/// Correction filter stage logic (wrap in `Stage` for hooks)
pub struct CorrectionFilter {
    name: String,
    correction: Box<dyn CorrectionFunction>,
    corrections: ObserverList<CorrectionVector>,
    downstream: Pipeline<SkeletonEvent>,
    frames: AtomicU64,
    corrected: AtomicU64,
    skipped: AtomicU64,
}

impl CorrectionFilter {
    pub fn new<C: CorrectionFunction + 'static>(correction: C) -> Self {
        Self {
            name: "correction".to_string(),
            correction: Box::new(correction),
            corrections: ObserverList::new(),
            downstream: Pipeline::new(),
            frames: AtomicU64::new(0),
            corrected: AtomicU64::new(0),
            skipped: AtomicU64::new(0),
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Route corrected frames to `sink`
    pub fn connect(&mut self, sink: Arc<dyn EventSink<SkeletonEvent>>) {
        self.downstream.connect(sink);
    }

    pub fn corrections(&self) -> &ObserverList<CorrectionVector> {
        &self.corrections
    }

    pub fn on_correction<F>(&self, callback: F) -> ObserverId
    where
        F: Fn(&CorrectionVector) + Send + Sync + 'static,
    {
        self.corrections.subscribe(callback)
    }

    /// Compute corrections for a frame without notifying anyone
    ///
    /// Returns the corrected frame and one vector per corrected joint.
    /// Rejected joints keep their original position.
    pub fn correct(&self, frame: &SkeletonFrame) -> (SkeletonFrame, Vec<CorrectionVector>) {
        let mut vectors = Vec::with_capacity(frame.joint_count());
        let mut points = Vec::with_capacity(frame.joint_count());

        for (joint, point) in frame.joints() {
            match self.correction.correction_for(joint, point) {
                Ok(delta) => {
                    let vector = CorrectionVector::new(joint, point, delta);
                    points.push((joint, vector.corrected()));
                    vectors.push(vector);
                }
                Err(CorrectionError::UnknownJoint(j)) => {
                    log::debug!(
                        "[{}] No correction for {} on {}, skipped",
                        self.name,
                        j,
                        frame.subject()
                    );
                    points.push((joint, point));
                }
                Err(e) => {
                    log::warn!("[{}] Skipping joint on {}: {}", self.name, frame.subject(), e);
                    points.push((joint, point));
                }
            }
        }

        let corrected = SkeletonFrame::from_joints(frame.subject(), frame.timestamp(), points);
        (corrected, vectors)
    }

    pub fn stats(&self) -> CorrectionStats {
        CorrectionStats {
            frames: self.frames.load(Ordering::Relaxed),
            corrected: self.corrected.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
        }
    }
}

impl PipelineStage<SkeletonEvent> for CorrectionFilter {
    fn name(&self) -> &str {
        &self.name
    }

    fn execute(&self, event: &SkeletonEvent) -> GestureResult<()> {
        let frame = match event {
            SkeletonEvent::Updated(frame) => frame,
            SkeletonEvent::Lost { .. } => return self.downstream.process(event),
        };

        let (corrected, vectors) = self.correct(frame);

        self.frames.fetch_add(1, Ordering::Relaxed);
        self.corrected.fetch_add(vectors.len() as u64, Ordering::Relaxed);
        self.skipped
            .fetch_add((frame.joint_count() - vectors.len()) as u64, Ordering::Relaxed);

        let observers = self.corrections.snapshot();
        for vector in &vectors {
            observers.notify(vector);
        }

        self.downstream.process(&SkeletonEvent::Updated(corrected))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::pipeline::Stage;
    use crate::logic::skeleton::SubjectId;
    use chrono::Utc;
    use parking_lot::Mutex;

    fn frame() -> SkeletonFrame {
        SkeletonFrame::new(SubjectId(1), Utc::now())
            .with_joint(Joint::Head, Point3::new(0.0, 1.7, 2.0))
            .with_joint(Joint::LeftHand, Point3::new(-0.5, 1.0, 1.9))
            .with_joint(Joint::RightHand, Point3::new(0.5, 1.0, 1.9))
    }

    struct Collect(Arc<Mutex<Vec<SkeletonEvent>>>);

    impl EventSink<SkeletonEvent> for Collect {
        fn process(&self, event: &SkeletonEvent) -> GestureResult<()> {
            self.0.lock().push(event.clone());
            Ok(())
        }
    }

    #[test]
    fn test_identity_emits_every_joint() {
        let filter = CorrectionFilter::new(IdentityCorrection);
        let input = frame();
        let (corrected, vectors) = filter.correct(&input);
        assert_eq!(vectors.len(), 3);
        assert!(vectors.iter().all(|v| v.correction == Point3::ZERO));
        assert_eq!(corrected, input);
    }

    #[test]
    fn test_unknown_joints_are_skipped() {
        let offsets = OffsetCorrection::new()
            .with_offset(Joint::LeftHand, Point3::new(0.1, 0.0, 0.0));
        let mut filter = CorrectionFilter::new(offsets);

        let routed = Arc::new(Mutex::new(Vec::new()));
        filter.connect(Arc::new(Collect(Arc::clone(&routed))));

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        filter.on_correction(move |v| sink.lock().push(*v));

        let stage = Stage::new(filter);
        let input = frame();
        stage.process(&SkeletonEvent::Updated(input.clone())).unwrap();

        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].joint, Joint::LeftHand);
        assert!((seen[0].corrected().x - (-0.4)).abs() < 1e-12);

        let routed = routed.lock();
        let out = routed[0].frame().unwrap();
        assert_eq!(out.joint_count(), 3);
        assert!((out.joint(Joint::LeftHand).unwrap().x - (-0.4)).abs() < 1e-12);
        assert_eq!(out.joint(Joint::Head), input.joint(Joint::Head));

        let stats = stage.inner().stats();
        assert_eq!(stats, CorrectionStats { frames: 1, corrected: 1, skipped: 2 });
    }

    #[test]
    fn test_input_frame_is_untouched() {
        let shift = |_: Joint, _: Point3| -> Result<Point3, CorrectionError> {
            Ok(Point3::new(1.0, 1.0, 1.0))
        };
        let filter = CorrectionFilter::new(shift);
        let input = frame();
        let before = input.clone();
        let (corrected, _) = filter.correct(&input);
        assert_eq!(input, before);
        assert_ne!(corrected, input);
    }

    #[test]
    fn test_out_of_range_point_is_skipped() {
        let offsets = OffsetCorrection::new().with_offset(Joint::Head, Point3::ZERO);
        let filter = CorrectionFilter::new(offsets);
        let bad = SkeletonFrame::new(SubjectId(2), Utc::now())
            .with_joint(Joint::Head, Point3::new(f64::NAN, 0.0, 0.0));
        let (_, vectors) = filter.correct(&bad);
        assert!(vectors.is_empty());
    }

    #[test]
    fn test_lost_events_pass_through() {
        let mut filter = CorrectionFilter::new(IdentityCorrection);
        let routed = Arc::new(Mutex::new(Vec::new()));
        filter.connect(Arc::new(Collect(Arc::clone(&routed))));

        let lost = SkeletonEvent::lost(SubjectId(4));
        filter.execute(&lost).unwrap();
        assert_eq!(*routed.lock(), vec![lost]);
        assert_eq!(filter.stats().frames, 0);
    }

    #[test]
    fn test_offsets_from_config_table() {
        let mut table = BTreeMap::new();
        table.insert(Joint::Torso, [0.0, -0.02, 0.01]);
        let offsets = OffsetCorrection::from_table(&table);
        assert_eq!(offsets.len(), 1);
        assert_eq!(
            offsets.correction_for(Joint::Torso, Point3::ZERO).unwrap(),
            Point3::new(0.0, -0.02, 0.01)
        );
        assert_eq!(
            offsets.correction_for(Joint::Head, Point3::ZERO),
            Err(CorrectionError::UnknownJoint(Joint::Head))
        );
    }
}
