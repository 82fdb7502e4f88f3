//! Central Configuration Constants
//!
//! Single source of truth for defaults used across the pipeline.

/// Tolerance when checking that π and the rows of A/B sum to 1
pub const DISTRIBUTION_TOLERANCE: f64 = 1e-9;

/// Default sliding window capacity (symbols)
pub const DEFAULT_WINDOW_CAPACITY: usize = 32;

/// Default minimum window length before classification is attempted
pub const DEFAULT_MIN_LENGTH: usize = 8;

/// Default acceptance threshold
pub const DEFAULT_THRESHOLD: f64 = 0.5;

/// Default number of recent frames kept per subject for feature extraction
pub const DEFAULT_FRAME_HISTORY: usize = 2;

/// Default capacity of an offloaded observer queue
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Default per-subject channel capacity in worker mode
pub const DEFAULT_SUBJECT_CHANNEL_CAPACITY: usize = 64;

/// Crate version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const APP_NAME: &str = "gesture-core";
