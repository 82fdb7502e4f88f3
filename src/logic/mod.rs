//! Logic Module - Pipeline, Stages & Engines
//!
//! - `pipeline/` - stage hooks, observers, fan-out, offload queue
//! - `filters/` - skeleton correction stage
//! - `gestures/` - sliding-window recognizer stage and async workers
//! - `hmm/` - Forward / Viterbi over discrete HMMs
//! - `engine.rs` - filter + recognizers wired from config

// Data types
pub mod error;
pub mod events;
pub mod probability;
pub mod skeleton;

// Pipeline
pub mod config;
pub mod engine;
pub mod filters;
pub mod gestures;
pub mod hmm;
pub mod pipeline;
