//! Event Pipeline Core
//!
//! - `observer.rs` - copy-on-write observer lists
//! - `stage.rs` - `Stage` (pre/post hooks around stage logic) and fan-out
//! - `queue.rs` - bounded offload queue for slow observers

pub mod observer;
pub mod queue;
pub mod stage;

// Re-export common types
pub use observer::{Callback, ObserverId, ObserverList, ObserverSnapshot};
pub use queue::{Backpressure, QueueConfig, QueueStats, QueuedObserver};
pub use stage::{EventSink, Pipeline, PipelineStage, Stage};
