//! HMM Engine - Sequence inference over discrete observations
//!
//! Model parameters are plain arrays (`model.rs`); the algorithms are free
//! functions that only read them, so a model can be shared across threads
//! behind an `Arc` and evaluated concurrently.
//!
//! - `evaluate` - Forward algorithm, P(O | model)
//! - `decode` - Viterbi, most likely state path
//! - `forward` / `backward` / `posteriors` - full lattices

pub mod forward;
pub mod model;
pub mod viterbi;

#[cfg(test)]
mod tests;

// Re-export common types
pub use forward::{backward, evaluate, forward, posteriors};
pub use model::{Emission, HiddenMarkovModel, ModelSpec, Scale};
pub use viterbi::decode;
