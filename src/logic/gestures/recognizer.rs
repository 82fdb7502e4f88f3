//! Gesture Recognizer Stage
//!
//! One recognizer per gesture. Each subject gets its own track behind its own
//! mutex, so frames for different subjects are processed in parallel while
//! frames for one subject are serialized. Recognition observers run after the
//! subject lock is released.
//!
//! `subject_lost` retires the track while it still holds the map lock, so a
//! frame racing with it either lands before the retirement or starts a fresh
//! track. A lost subject's old window never fires.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use super::gesture::{Gesture, RecognitionResult};
use super::track::{SubjectTrack, TrackState};
use super::window::WindowStatus;
use crate::logic::error::GestureResult;
use crate::logic::events::SkeletonEvent;
use crate::logic::pipeline::{ObserverId, ObserverList, PipelineStage};
use crate::logic::skeleton::{SkeletonFrame, SubjectId};

type SharedTrack = Arc<Mutex<SubjectTrack>>;

pub struct GestureRecognizer {
    gesture: Gesture,
    tracks: RwLock<HashMap<SubjectId, SharedTrack>>,
    recognitions: ObserverList<RecognitionResult>,
    recognized: AtomicU64,
}

impl GestureRecognizer {
    pub fn new(gesture: Gesture) -> Self {
        log::info!(
            "Recognizer '{}' ready ({} states, {} symbols, {:?})",
            gesture.name(),
            gesture.model().states(),
            gesture.model().symbols(),
            gesture.config().scale
        );
        Self {
            gesture,
            tracks: RwLock::new(HashMap::new()),
            recognitions: ObserverList::new(),
            recognized: AtomicU64::new(0),
        }
    }

    pub fn gesture(&self) -> &Gesture {
        &self.gesture
    }

    /// "Gesture recognized" observers
    pub fn recognitions(&self) -> &ObserverList<RecognitionResult> {
        &self.recognitions
    }

    pub fn on_recognized<F>(&self, callback: F) -> ObserverId
    where
        F: Fn(&RecognitionResult) + Send + Sync + 'static,
    {
        self.recognitions.subscribe(callback)
    }

    /// Feed one frame for its subject
    pub fn observe(&self, frame: &SkeletonFrame) -> Option<RecognitionResult> {
        let result = loop {
            let shared = self.track_for(frame.subject());
            let mut track = shared.lock();
            // removed by subject_lost after we looked it up
            if track.is_retired() {
                continue;
            }
            break track.observe(frame, &self.gesture);
        };

        if let Some(ref result) = result {
            self.recognized.fetch_add(1, Ordering::Relaxed);
            log::info!(
                "[{}] Recognized for {} (p={:.3e}, path {:?})",
                self.gesture.name(),
                result.subject,
                result.probability,
                result.path
            );
            self.recognitions.notify(result);
        }
        result
    }

    /// Discard all state for a subject; false if it was not tracked
    pub fn subject_lost(&self, subject: SubjectId) -> bool {
        let mut tracks = self.tracks.write();
        let removed = tracks.remove(&subject);
        match removed {
            Some(track) => {
                track.lock().retire();
                drop(tracks);
                log::debug!("[{}] {} lost, state discarded", self.gesture.name(), subject);
                true
            }
            None => false,
        }
    }

    pub fn tracked_subjects(&self) -> Vec<SubjectId> {
        let mut subjects: Vec<_> = self.tracks.read().keys().copied().collect();
        subjects.sort();
        subjects
    }

    pub fn track_state(&self, subject: SubjectId) -> Option<TrackState> {
        let track = self.tracks.read().get(&subject).cloned()?;
        let state = track.lock().state();
        Some(state)
    }

    pub fn window_status(&self, subject: SubjectId) -> Option<WindowStatus> {
        let track = self.tracks.read().get(&subject).cloned()?;
        let status = track.lock().status(&self.gesture);
        Some(status)
    }

    /// Total recognitions since construction
    pub fn recognized(&self) -> u64 {
        self.recognized.load(Ordering::Relaxed)
    }

    fn track_for(&self, subject: SubjectId) -> SharedTrack {
        if let Some(track) = self.tracks.read().get(&subject) {
            return Arc::clone(track);
        }
        let mut tracks = self.tracks.write();
        let track = tracks
            .entry(subject)
            .or_insert_with(|| Arc::new(Mutex::new(SubjectTrack::new(subject, &self.gesture))));
        Arc::clone(track)
    }
}

impl PipelineStage<SkeletonEvent> for GestureRecognizer {
    fn name(&self) -> &str {
        self.gesture.name()
    }

    fn execute(&self, event: &SkeletonEvent) -> GestureResult<()> {
        match event {
            SkeletonEvent::Updated(frame) => {
                self.observe(frame);
            }
            SkeletonEvent::Lost { subject, .. } => {
                self.subject_lost(*subject);
            }
        }
        Ok(())
    }
}
