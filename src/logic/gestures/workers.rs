//! Subject Workers - one async task per subject
//!
//! Alternative to the lock-based `GestureRecognizer`: each subject's track is
//! owned by its own tokio task fed through a bounded channel, so no locks are
//! involved at all. Frames for one subject are processed in arrival order; a
//! full channel makes `dispatch` wait. Recognitions are sent to the results
//! channel returned by `SubjectWorkers::new`.
//!
//! Neither `Lost` nor `shutdown` waits on a worker task. A lost subject's task
//! is aborted, along with any frames still queued for it. `shutdown` closes the
//! frame channels and detaches the tasks; they finish their queued frames as
//! the results receiver is drained, and the receiver yields `None` once the
//! last of them is done.

use std::collections::HashMap;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::gesture::{Gesture, RecognitionResult};
use super::track::SubjectTrack;
use crate::constants::DEFAULT_SUBJECT_CHANNEL_CAPACITY;
use crate::logic::error::{GestureError, GestureResult};
use crate::logic::events::SkeletonEvent;
use crate::logic::skeleton::{SkeletonFrame, SubjectId};

struct Worker {
    frames: mpsc::Sender<SkeletonFrame>,
    handle: JoinHandle<()>,
}

pub struct SubjectWorkers {
    gesture: Gesture,
    capacity: usize,
    workers: HashMap<SubjectId, Worker>,
    results: mpsc::Sender<RecognitionResult>,
}

impl SubjectWorkers {
    pub fn new(gesture: Gesture) -> (Self, mpsc::Receiver<RecognitionResult>) {
        Self::with_capacity(gesture, DEFAULT_SUBJECT_CHANNEL_CAPACITY)
    }

    /// `capacity` bounds both the per-subject frame channels and the results channel
    pub fn with_capacity(
        gesture: Gesture,
        capacity: usize,
    ) -> (Self, mpsc::Receiver<RecognitionResult>) {
        let capacity = capacity.max(1);
        let (results, receiver) = mpsc::channel(capacity);
        let workers = Self {
            gesture,
            capacity,
            workers: HashMap::new(),
            results,
        };
        (workers, receiver)
    }

    /// Route one event to its subject's task, spawning it on first sight
    pub async fn dispatch(&mut self, event: SkeletonEvent) -> GestureResult<()> {
        match event {
            SkeletonEvent::Updated(frame) => {
                let subject = frame.subject();
                if !self.workers.contains_key(&subject) {
                    let worker = self.spawn(subject);
                    self.workers.insert(subject, worker);
                }
                let sent = match self.workers.get(&subject) {
                    Some(worker) => worker.frames.send(frame).await.is_ok(),
                    None => false,
                };
                if !sent {
                    self.workers.remove(&subject);
                    return Err(GestureError::Stage {
                        stage: self.gesture.name().to_string(),
                        reason: format!("worker for {} has stopped", subject),
                    });
                }
                Ok(())
            }
            SkeletonEvent::Lost { subject, .. } => {
                if let Some(worker) = self.workers.remove(&subject) {
                    drop(worker.frames);
                    worker.handle.abort();
                    log::debug!("[{}] {} lost, worker stopped", self.gesture.name(), subject);
                }
                Ok(())
            }
        }
    }

    pub fn active_subjects(&self) -> Vec<SubjectId> {
        let mut subjects: Vec<_> = self.workers.keys().copied().collect();
        subjects.sort();
        subjects
    }

    /// Close every frame channel and let the tasks drain in the background
    pub fn shutdown(self) {
        log::debug!(
            "[{}] Shutting down {} workers",
            self.gesture.name(),
            self.workers.len()
        );
        for worker in self.workers.into_values() {
            drop(worker.frames);
            drop(worker.handle);
        }
    }

    fn spawn(&self, subject: SubjectId) -> Worker {
        let (frames, mut receiver) = mpsc::channel::<SkeletonFrame>(self.capacity);
        let gesture = self.gesture.clone();
        let results = self.results.clone();

        let handle = tokio::spawn(async move {
            let mut track = SubjectTrack::new(subject, &gesture);
            while let Some(frame) = receiver.recv().await {
                if let Some(result) = track.observe(&frame, &gesture) {
                    log::info!("[{}] Recognized for {}", gesture.name(), subject);
                    if results.send(result).await.is_err() {
                        log::warn!(
                            "[{}] Results receiver dropped, stopping {}",
                            gesture.name(),
                            subject
                        );
                        break;
                    }
                }
            }
        });

        log::debug!("[{}] Worker started for {}", self.gesture.name(), subject);
        Worker { frames, handle }
    }
}
