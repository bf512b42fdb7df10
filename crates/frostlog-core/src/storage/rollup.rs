//! Finalized aggregate records.

use core::fmt::Display;

use serde::{Deserialize, Serialize};

/// Seconds since epoch (or boot)
pub type Timestamp = u32;

/// One finalized observation at a layer's resolution
///
/// `mean` is already averaged over the layer's aggregation interval; `max`
/// is the largest raw value folded into it, however many layers deep.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct AggregateEntry {
    /// Timestamp of the input that completed the aggregate
    pub timestamp: Timestamp,
    pub mean: f64,
    pub max: f64,
}

impl AggregateEntry {
    pub const fn new(timestamp: Timestamp, mean: f64, max: f64) -> Self {
        Self {
            timestamp,
            mean,
            max,
        }
    }
}

impl Display for AggregateEntry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "[Entry] timestamp: {}, mean: {:.2}, max: {:.2}",
            self.timestamp, self.mean, self.max
        )
    }
}
