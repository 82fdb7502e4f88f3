//! Subject Track - per-subject recognition state
//!
//! ```text
//! Idle ──next frame───▶ Accumulating ──len >= min_length──▶ Ready
//!   ▲                                                          │
//!   └──────────── recognition fired (reset policy) ────────────┘
//! ```
//!
//! A track is only ever touched by one thread at a time: behind a mutex in
//! `GestureRecognizer`, or owned outright by a task in `SubjectWorkers`.
//! A retired track belongs to a lost subject and ignores further frames.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use super::gesture::{Gesture, RecognitionResult};
use super::window::{ObservationWindow, WindowStatus};
use crate::logic::config::ResetPolicy;
use crate::logic::error::HmmError;
use crate::logic::skeleton::{SkeletonFrame, SubjectId};

/// Recognition state of one subject
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackState {
    /// Empty window
    Idle,
    /// Collecting symbols, below `min_length`
    Accumulating,
    /// Window long enough to classify on every new symbol
    Ready,
}

#[derive(Debug, Clone)]
pub struct SubjectTrack {
    subject: SubjectId,
    window: ObservationWindow,
    history: VecDeque<SkeletonFrame>,
    history_len: usize,
    state: TrackState,
    retired: bool,
}

impl SubjectTrack {
    pub fn new(subject: SubjectId, gesture: &Gesture) -> Self {
        let config = gesture.config();
        Self {
            subject,
            window: ObservationWindow::new(config.window_capacity),
            history: VecDeque::with_capacity(config.frame_history + 1),
            history_len: config.frame_history,
            state: TrackState::Idle,
            retired: false,
        }
    }

    pub fn subject(&self) -> SubjectId {
        self.subject
    }

    pub fn state(&self) -> TrackState {
        self.state
    }

    pub fn window(&self) -> &ObservationWindow {
        &self.window
    }

    pub fn status(&self, gesture: &Gesture) -> WindowStatus {
        self.window.status(gesture.config().min_length)
    }

    /// Drop every symbol and frame
    pub fn reset(&mut self) {
        self.window.clear();
        self.history.clear();
        self.state = TrackState::Idle;
    }

    /// Reset and stop accepting frames
    pub fn retire(&mut self) {
        self.reset();
        self.retired = true;
    }

    pub fn is_retired(&self) -> bool {
        self.retired
    }

    /// Feed one corrected frame; returns a result when the gesture fires
    pub fn observe(
        &mut self,
        frame: &SkeletonFrame,
        gesture: &Gesture,
    ) -> Option<RecognitionResult> {
        if self.retired {
            return None;
        }
        if self.state == TrackState::Idle {
            self.state = TrackState::Accumulating;
        }
        self.history.push_back(frame.clone());
        while self.history.len() > self.history_len {
            self.history.pop_front();
        }

        let symbol = gesture.extractor().extract(self.history.make_contiguous())?;
        self.window.push(symbol);

        let config = gesture.config();
        if self.window.len() < config.min_length {
            self.state = TrackState::Accumulating;
            return None;
        }
        self.state = TrackState::Ready;

        let window = self.window.indices();
        let classification = match gesture.classify(&window) {
            Ok(c) => c,
            Err(HmmError::EmptySequence) => return None,
            Err(e) => {
                log::warn!(
                    "[{}] Skipping window for {}: {}",
                    gesture.name(),
                    self.subject,
                    e
                );
                return None;
            }
        };

        if !classification.accepted {
            log::trace!(
                "[{}] {} rejected (log score {:.3})",
                gesture.name(),
                self.subject,
                classification.log_score
            );
            return None;
        }

        if config.reset == ResetPolicy::Reset {
            self.window.clear();
            self.state = TrackState::Idle;
        }

        Some(gesture.result(self.subject, frame.timestamp(), window, classification))
    }
}
