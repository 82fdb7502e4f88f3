//! Gestures Module - sliding-window HMM gesture recognition
//!
//! - `window.rs` - bounded observation window
//! - `features.rs` - frame history to observation symbol
//! - `gesture.rs` - model + settings, window scoring, results
//! - `track.rs` - per-subject state machine
//! - `recognizer.rs` - lock-based pipeline stage
//! - `workers.rs` - task-per-subject async alternative

pub mod features;
pub mod gesture;
pub mod recognizer;
pub mod track;
pub mod window;
pub mod workers;


// Re-export common types
pub use features::{DirectionQuantizer, FeatureExtractor, Plane};
pub use gesture::{Classification, Gesture, RecognitionResult};
pub use recognizer::GestureRecognizer;
pub use track::{SubjectTrack, TrackState};
pub use window::{ObservationSymbol, ObservationWindow, WindowStatus};
pub use workers::SubjectWorkers;
