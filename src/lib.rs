//! Gesture Core - skeleton frames in, recognized gestures out
//!
//! Frames from a depth sensor flow through a correction filter and then
//! through one HMM-based recognizer per gesture. Every stage exposes
//! "processing started" / "processing completed" hooks; recognizers also
//! notify a `RecognitionResult` whenever a gesture is detected.

pub mod constants;
pub mod logic;

// Re-export common types
pub use logic::config::{
    AcceptanceScore, CorrectionConfig, GestureDefinition, PipelineConfig, RecognizerConfig,
    ResetPolicy,
};
pub use logic::engine::{GestureEngine, OffloadedRecognitions};
pub use logic::error::{ConfigError, CorrectionError, GestureError, GestureResult, HmmError};
pub use logic::events::SkeletonEvent;
pub use logic::filters::CorrectionFilter;
pub use logic::gestures::{
    DirectionQuantizer, FeatureExtractor, Gesture, GestureRecognizer, RecognitionResult,
    SubjectWorkers, TrackState,
};
pub use logic::hmm::{decode, evaluate, HiddenMarkovModel, Scale};
pub use logic::pipeline::{EventSink, ObserverList, PipelineStage, Stage};
pub use logic::skeleton::{CorrectionVector, Joint, Point3, SkeletonFrame, SubjectId};

/// Install the `env_logger` backend (`RUST_LOG`, default `info`)
///
/// Safe to call more than once; later calls are ignored.
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}
