//! Observation Window - bounded FIFO of quantized symbols per subject

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// Index into a model's observation alphabet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObservationSymbol(pub usize);

impl ObservationSymbol {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Fixed-capacity sliding window; the oldest symbol is evicted first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservationWindow {
    symbols: VecDeque<ObservationSymbol>,
    capacity: usize,
}

impl ObservationWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            symbols: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a symbol; returns the evicted one when the window was full
    pub fn push(&mut self, symbol: ObservationSymbol) -> Option<ObservationSymbol> {
        let evicted = if self.symbols.len() == self.capacity {
            self.symbols.pop_front()
        } else {
            None
        };
        self.symbols.push_back(symbol);
        evicted
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.symbols.len() == self.capacity
    }

    pub fn clear(&mut self) {
        self.symbols.clear();
    }

    /// Oldest first
    pub fn iter(&self) -> impl Iterator<Item = ObservationSymbol> + '_ {
        self.symbols.iter().copied()
    }

    /// Raw indices, oldest first, as the HMM engine consumes them
    pub fn indices(&self) -> Vec<usize> {
        self.symbols.iter().map(|s| s.0).collect()
    }

    pub fn status(&self, required_size: usize) -> WindowStatus {
        let current_size = self.symbols.len();
        WindowStatus {
            current_size,
            capacity: self.capacity,
            required_size,
            is_ready: current_size >= required_size,
            fill_percent: if required_size > 0 {
                (current_size as f32 / required_size as f32 * 100.0).min(100.0)
            } else {
                0.0
            },
        }
    }
}

/// Window status information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowStatus {
    pub current_size: usize,
    pub capacity: usize,
    pub required_size: usize,
    pub is_ready: bool,
    pub fill_percent: f32,
}
