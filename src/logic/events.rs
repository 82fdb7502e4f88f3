//! Pipeline Events
//!
//! The event type that flows between pipeline stages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::skeleton::{SkeletonFrame, SubjectId};

/// Skeleton update delivered to every stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SkeletonEvent {
    /// New (raw or corrected) frame for a subject
    Updated(SkeletonFrame),
    /// Sensor lost track of the subject
    Lost {
        subject: SubjectId,
        timestamp: DateTime<Utc>,
    },
}

impl SkeletonEvent {
    pub fn lost(subject: SubjectId) -> Self {
        SkeletonEvent::Lost {
            subject,
            timestamp: Utc::now(),
        }
    }

    pub fn subject(&self) -> SubjectId {
        match self {
            SkeletonEvent::Updated(frame) => frame.subject(),
            SkeletonEvent::Lost { subject, .. } => *subject,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            SkeletonEvent::Updated(frame) => frame.timestamp(),
            SkeletonEvent::Lost { timestamp, .. } => *timestamp,
        }
    }

    pub fn frame(&self) -> Option<&SkeletonFrame> {
        match self {
            SkeletonEvent::Updated(frame) => Some(frame),
            SkeletonEvent::Lost { .. } => None,
        }
    }
}

impl From<SkeletonFrame> for SkeletonEvent {
    fn from(frame: SkeletonFrame) -> Self {
        SkeletonEvent::Updated(frame)
    }
}
