//! Gesture Engine - pipeline assembled from a `PipelineConfig`
//!
//! ```text
//! SkeletonEvent ─▶ [Stage: CorrectionFilter] ─┬─▶ [Stage: GestureRecognizer "a"]
//!                                             └─▶ [Stage: GestureRecognizer "b"]
//! ```

use std::sync::Arc;

use super::config::PipelineConfig;
use super::error::{ConfigError, GestureResult};
use super::events::SkeletonEvent;
use super::filters::{CorrectionFilter, CorrectionFunction, IdentityCorrection, OffsetCorrection};
use super::gestures::{Gesture, GestureRecognizer, RecognitionResult};
use super::pipeline::{
    Callback, EventSink, ObserverId, QueueConfig, QueueStats, QueuedObserver, Stage,
};
use super::skeleton::CorrectionVector;
use crate::constants::{APP_NAME, APP_VERSION};

pub type FilterStage = Stage<SkeletonEvent, CorrectionFilter>;
pub type RecognizerStage = Stage<SkeletonEvent, GestureRecognizer>;

pub struct GestureEngine {
    filter: Arc<FilterStage>,
    recognizers: Vec<Arc<RecognizerStage>>,
    queue: QueueConfig,
}

impl GestureEngine {
    /// Wire a correction filter in front of one recognizer per gesture
    pub fn new<C: CorrectionFunction + 'static>(correction: C, gestures: Vec<Gesture>) -> Self {
        let recognizers: Vec<Arc<RecognizerStage>> = gestures
            .into_iter()
            .map(|g| Arc::new(Stage::new(GestureRecognizer::new(g))))
            .collect();

        let mut filter = CorrectionFilter::new(correction);
        for recognizer in &recognizers {
            filter.connect(Arc::clone(recognizer) as Arc<dyn EventSink<SkeletonEvent>>);
        }

        Self {
            filter: Arc::new(Stage::new(filter)),
            recognizers,
            queue: QueueConfig::default(),
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let gestures = config
            .gestures
            .iter()
            .map(Gesture::from_definition)
            .collect::<Result<Vec<_>, _>>()?;

        let mut engine = if config.correction.offsets.is_empty() {
            Self::new(IdentityCorrection, gestures)
        } else {
            Self::new(OffsetCorrection::from_table(&config.correction.offsets), gestures)
        };
        engine.queue = config.observer_queue.clone();

        log::info!(
            "{} v{}: engine built with {} correction offsets, {} gestures",
            APP_NAME,
            APP_VERSION,
            config.correction.offsets.len(),
            engine.recognizers.len()
        );
        Ok(engine)
    }

    /// Push one event through the whole pipeline
    pub fn process(&self, event: &SkeletonEvent) -> GestureResult<()> {
        self.filter.process(event)
    }

    pub fn filter(&self) -> &FilterStage {
        &self.filter
    }

    pub fn recognizers(&self) -> &[Arc<RecognizerStage>] {
        &self.recognizers
    }

    pub fn recognizer(&self, gesture: &str) -> Option<&RecognizerStage> {
        self.recognizers
            .iter()
            .map(Arc::as_ref)
            .find(|stage| stage.inner().gesture().name() == gesture)
    }

    /// Subscribe to every recognizer; returns one id per recognizer, in order
    pub fn on_recognized<F>(&self, callback: F) -> Vec<ObserverId>
    where
        F: Fn(&RecognitionResult) + Send + Sync + 'static,
    {
        let callback: Callback<RecognitionResult> = Arc::new(callback);
        self.recognizers
            .iter()
            .map(|stage| stage.inner().recognitions().subscribe_callback(Arc::clone(&callback)))
            .collect()
    }

    pub fn on_correction<F>(&self, callback: F) -> ObserverId
    where
        F: Fn(&CorrectionVector) + Send + Sync + 'static,
    {
        self.filter.inner().on_correction(callback)
    }

    /// Run `handler` for every recognition on a worker thread behind the configured queue
    ///
    /// The subscriptions live as long as the returned handle.
    pub fn offload_recognitions<F>(&self, handler: F) -> std::io::Result<OffloadedRecognitions>
    where
        F: FnMut(RecognitionResult) + Send + 'static,
    {
        let queue = QueuedObserver::spawn("recognitions", self.queue.clone(), handler)?;
        let callback: Callback<RecognitionResult> = Arc::new(queue.callback());
        let subscriptions = self
            .recognizers
            .iter()
            .map(|stage| {
                let id = stage.inner().recognitions().subscribe_callback(Arc::clone(&callback));
                (Arc::clone(stage), id)
            })
            .collect();
        Ok(OffloadedRecognitions {
            queue: Some(queue),
            subscriptions,
        })
    }
}

// ============================================================================
// OFFLOADED RECOGNITIONS
// ============================================================================

/// Queue fed by every recognizer; unsubscribes when shut down or dropped
pub struct OffloadedRecognitions {
    queue: Option<QueuedObserver<RecognitionResult>>,
    subscriptions: Vec<(Arc<RecognizerStage>, ObserverId)>,
}

impl OffloadedRecognitions {
    pub fn stats(&self) -> QueueStats {
        self.queue.as_ref().map(QueuedObserver::stats).unwrap_or_default()
    }

    /// Detach from the recognizers, then drain the queue and join its worker
    pub fn shutdown(mut self) -> QueueStats {
        self.unsubscribe();
        self.queue.take().map(QueuedObserver::shutdown).unwrap_or_default()
    }

    fn unsubscribe(&mut self) {
        for (stage, id) in self.subscriptions.drain(..) {
            stage.inner().recognitions().unsubscribe(id);
        }
    }
}

impl Drop for OffloadedRecognitions {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::gestures::TrackState;
    use crate::logic::skeleton::{Joint, Point3, SkeletonFrame, SubjectId};
    use chrono::{Duration, Utc};
    use parking_lot::Mutex;

    const CONFIG: &str = r#"{
        "correction": { "offsets": { "right_hand": [0.1, 0.0, 0.0] } },
        "observer_queue": { "capacity": 4 },
        "gestures": [
            {
                "name": "swipe_right",
                "recognizer": {
                    "window_capacity": 6, "min_length": 3, "threshold": 0.5, "score": "per_symbol"
                },
                "extractor": { "joint": "right_hand", "sectors": 4 },
                "model": {
                    "initial": [0.5, 0.5],
                    "transitions": [[0.9, 0.1], [0.1, 0.9]],
                    "emissions": [[0.05, 0.8, 0.05, 0.05, 0.05], [0.05, 0.8, 0.05, 0.05, 0.05]]
                }
            },
            {
                "name": "swipe_left",
                "recognizer": {
                    "window_capacity": 6, "min_length": 3, "threshold": 0.5, "score": "per_symbol"
                },
                "extractor": { "joint": "right_hand", "sectors": 4 },
                "model": {
                    "initial": [1.0],
                    "transitions": [[1.0]],
                    "emissions": [[0.05, 0.05, 0.05, 0.8, 0.05]]
                }
            }
        ]
    }"#;

    /// Right hand sweeping +x, 5 cm per frame
    fn sweep(subject: u32, frames: usize) -> Vec<SkeletonEvent> {
        let start = Utc::now();
        (0..frames)
            .map(|i| {
                let timestamp = start + Duration::milliseconds(33 * i as i64);
                let frame = SkeletonFrame::new(SubjectId(subject), timestamp)
                    .with_joint(Joint::RightHand, Point3::new(0.05 * i as f64, 1.0, 2.0));
                SkeletonEvent::Updated(frame)
            })
            .collect()
    }

    fn engine() -> GestureEngine {
        GestureEngine::from_config(&PipelineConfig::from_json(CONFIG).unwrap()).unwrap()
    }

    #[test]
    fn test_end_to_end_recognition() {
        let engine = engine();
        let recognized = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&recognized);
        let ids = engine.on_recognized(move |r| sink.lock().push(r.clone()));
        assert_eq!(ids.len(), 2);

        let corrections = Arc::new(Mutex::new(0usize));
        let count = Arc::clone(&corrections);
        engine.on_correction(move |_| *count.lock() += 1);

        let events = sweep(1, 4);
        for event in &events {
            engine.process(event).unwrap();
        }

        let recognized = recognized.lock();
        assert_eq!(recognized.len(), 1);
        assert_eq!(recognized[0].gesture, "swipe_right");
        assert_eq!(recognized[0].observations, vec![1, 1, 1]);
        assert_eq!(recognized[0].timestamp, events[3].timestamp());
        assert!(recognized[0].score > 0.5);

        assert_eq!(*corrections.lock(), 4);
        assert_eq!(engine.filter().inner().stats().frames, 4);
    }

    #[test]
    fn test_lost_reaches_every_recognizer() {
        let engine = engine();
        for event in sweep(2, 2) {
            engine.process(&event).unwrap();
        }
        let right = engine.recognizer("swipe_right").unwrap().inner();
        assert_eq!(right.track_state(SubjectId(2)), Some(TrackState::Accumulating));

        engine.process(&SkeletonEvent::lost(SubjectId(2))).unwrap();
        for stage in engine.recognizers() {
            assert!(stage.inner().tracked_subjects().is_empty());
        }
    }

    #[test]
    fn test_stage_hooks_fire_per_event() {
        let engine = engine();
        let started = Arc::new(Mutex::new(0usize));
        let completed = Arc::new(Mutex::new(0usize));
        for stage in engine.recognizers() {
            let s = Arc::clone(&started);
            stage.on_started(move |_| *s.lock() += 1);
            let c = Arc::clone(&completed);
            stage.on_completed(move |_| *c.lock() += 1);
        }

        for event in sweep(3, 3) {
            engine.process(&event).unwrap();
        }
        // three events through two recognizers
        assert_eq!(*started.lock(), 6);
        assert_eq!(*completed.lock(), 6);
    }

    #[test]
    fn test_offloaded_recognitions() {
        let engine = engine();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let queue = engine
            .offload_recognitions(move |r| sink.lock().push(r.gesture))
            .unwrap();

        for event in sweep(4, 7) {
            engine.process(&event).unwrap();
        }
        let stats = queue.shutdown();

        // fires on the 4th frame, resets, fires again on the 7th
        assert_eq!(*seen.lock(), vec!["swipe_right".to_string(), "swipe_right".to_string()]);
        assert_eq!(stats.delivered, 2);
    }

    #[test]
    fn test_offload_shutdown_unsubscribes() {
        let engine = engine();
        for _ in 0..3 {
            let queue = engine.offload_recognitions(|_| {}).unwrap();
            for stage in engine.recognizers() {
                assert_eq!(stage.inner().recognitions().len(), 1);
            }
            queue.shutdown();
        }
        for stage in engine.recognizers() {
            assert!(stage.inner().recognitions().is_empty());
        }

        // dropping the handle detaches too
        drop(engine.offload_recognitions(|_| {}).unwrap());
        for stage in engine.recognizers() {
            assert!(stage.inner().recognitions().is_empty());
        }
    }

    #[test]
    fn test_unknown_gesture_lookup() {
        assert!(engine().recognizer("clap").is_none());
    }
}
