use core::fmt::Display;

use heapless::Deque;
use log::{debug, info, trace};

use super::{AggregateEntry, Timestamp};
use crate::config::LayerConfig;

/// Forwarding latch of a layer
///
/// A layer starts out `Filling` and moves to `Overflowed` the first time a
/// finalized entry has to evict an older one. There is no way back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerState {
    /// History has never overflowed; finalized entries stay local
    Filling,
    /// History has overflowed; every finalized entry is also fed to the next layer
    Overflowed,
}

/// Outcome of a finalization, consumed by the cascade
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Finalized {
    pub(crate) entry: AggregateEntry,
    pub(crate) forward: bool,
}

/// One stage of the cascade
///
/// Buffers elementary inputs into a running accumulator, finalizes an
/// [`AggregateEntry`] every `aggregation_interval` inputs and keeps the newest
/// `CAPACITY` entries in a fixed ring buffer.
#[derive(Debug, Clone)]
pub struct Layer<const CAPACITY: usize> {
    index: usize,
    aggregation_interval: u32,
    emit: bool,
    pending_sum: f64,
    pending_max: f64,
    pending_count: u32,
    last_timestamp: Option<Timestamp>,
    /// Newest entry at the front
    history: Deque<AggregateEntry, CAPACITY>,
    state: LayerState,
}

impl<const CAPACITY: usize> Layer<CAPACITY> {
    pub(crate) fn new(index: usize, config: LayerConfig) -> Self {
        Self {
            index,
            aggregation_interval: config.aggregation_interval,
            emit: config.emit,
            pending_sum: 0.0,
            pending_max: f64::NEG_INFINITY,
            pending_count: 0,
            last_timestamp: None,
            history: Deque::new(),
            state: LayerState::Filling,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn aggregation_interval(&self) -> u32 {
        self.aggregation_interval
    }

    pub fn state(&self) -> LayerState {
        self.state
    }

    /// Whether finalized entries of this layer go to the emit sink
    pub fn emits(&self) -> bool {
        self.emit
    }

    /// Inputs absorbed since the last finalization
    pub fn pending_count(&self) -> u32 {
        self.pending_count
    }

    /// Mean of the inputs absorbed since the last finalization
    pub fn pending_mean(&self) -> Option<f64> {
        (self.pending_count > 0).then(|| self.pending_sum / f64::from(self.pending_count))
    }

    /// Timestamp of the most recent input, finalized or not
    pub fn last_timestamp(&self) -> Option<Timestamp> {
        self.last_timestamp
    }

    /// Finalized entries, newest first
    pub fn history(&self) -> impl DoubleEndedIterator<Item = &AggregateEntry> {
        self.history.iter()
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.history.is_full()
    }

    /// Timestamp of the oldest retained entry, or of the last input if
    /// nothing has been finalized yet.
    pub fn oldest_timestamp(&self) -> Option<Timestamp> {
        self.history
            .back()
            .map(|entry| entry.timestamp)
            .or(self.last_timestamp)
    }

    /// Fold one elementary input into the accumulator.
    ///
    /// Returns the finalized entry when this input completes an aggregation
    /// interval. By then the entry is already stored in the history.
    pub(crate) fn absorb(
        &mut self,
        value: f64,
        max: Option<f64>,
        timestamp: Timestamp,
    ) -> Option<Finalized> {
        self.pending_sum += value;
        self.pending_max = self
            .pending_max
            .max(value)
            .max(max.unwrap_or(f64::NEG_INFINITY));
        self.pending_count += 1;
        self.last_timestamp = Some(timestamp);
        trace!(
            " Layer {} absorbed {} ({}/{})",
            self.index, value, self.pending_count, self.aggregation_interval
        );

        if self.pending_count < self.aggregation_interval {
            return None;
        }

        let entry = AggregateEntry::new(
            timestamp,
            self.pending_sum / f64::from(self.pending_count),
            self.pending_max,
        );

        if self.history.is_full() && self.state == LayerState::Filling {
            self.state = LayerState::Overflowed;
            info!(
                " Layer {} overflowed, forwarding from now on",
                self.index
            );
        }
        let forward = self.state == LayerState::Overflowed;

        if let Some(evicted) = self.insert_newest(entry) {
            trace!(" Layer {} evicted {}", self.index, evicted);
        }
        self.reset_accumulator();
        debug!(" Layer {} finalized {}", self.index, entry);

        Some(Finalized { entry, forward })
    }

    /// Push `entry` to the front of the history, evicting the oldest entry
    /// when full. Returns the evicted entry.
    fn insert_newest(&mut self, entry: AggregateEntry) -> Option<AggregateEntry> {
        let evicted = if self.history.is_full() {
            self.history.pop_back()
        } else {
            None
        };
        // Room was made above; a zero-capacity layer is rejected at construction.
        let pushed = self.history.push_front(entry);
        debug_assert!(pushed.is_ok());
        evicted
    }

    fn reset_accumulator(&mut self) {
        self.pending_sum = 0.0;
        self.pending_max = f64::NEG_INFINITY;
        self.pending_count = 0;
    }

    /// Statistics of this layer combined with everything finer than it.
    ///
    /// `finer` is the result of the same call on the previous layer. Its
    /// weight is scaled down by this layer's interval so the combination stays
    /// a properly weighted mean.
    pub(crate) fn stats(&self, finer: Option<&LayerStats>) -> LayerStats {
        let interval = f64::from(self.aggregation_interval);

        let mut stats = LayerStats {
            effective_count: self.history.len() as f64 + f64::from(self.pending_count) / interval,
            weighted_sum: self.pending_sum / interval,
            max: self.pending_max,
            oldest: self.oldest_timestamp(),
            samples_per_entry: interval,
        };
        for entry in self.history.iter() {
            stats.weighted_sum += entry.mean;
            stats.max = stats.max.max(entry.max);
        }

        if let Some(finer) = finer {
            stats.effective_count += finer.effective_count / interval;
            stats.weighted_sum += finer.weighted_sum / interval;
            stats.max = stats.max.max(finer.max);
            stats.oldest = match (stats.oldest, finer.oldest) {
                (Some(own), Some(other)) => Some(own.min(other)),
                (own, other) => own.or(other),
            };
            stats.samples_per_entry *= finer.samples_per_entry;
        }

        stats
    }
}

impl<const CAPACITY: usize> Display for Layer<CAPACITY> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "[Layer {}] n: {}/{}, pending: {}/{}, state: {:?}",
            self.index,
            self.history.len(),
            CAPACITY,
            self.pending_count,
            self.aggregation_interval,
            self.state
        )
    }
}

/// Read-side statistics of a layer and every finer layer below it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerStats {
    effective_count: f64,
    /// Mean times effective count
    weighted_sum: f64,
    max: f64,
    oldest: Option<Timestamp>,
    /// Raw samples represented by one entry of this layer
    samples_per_entry: f64,
}

impl LayerStats {
    /// Weight of the data, in entries of this layer
    pub fn effective_count(&self) -> f64 {
        self.effective_count
    }

    /// Weight of the data, in raw samples
    pub fn sample_equivalent(&self) -> f64 {
        self.effective_count * self.samples_per_entry
    }

    /// Weighted mean, `None` when there is nothing to weigh
    pub fn mean(&self) -> Option<f64> {
        (self.effective_count > 0.0).then(|| self.weighted_sum / self.effective_count)
    }

    /// Maximum, `None` when nothing has been absorbed
    pub fn max(&self) -> Option<f64> {
        (self.max > f64::NEG_INFINITY).then_some(self.max)
    }

    /// Maximum as folded, `NEG_INFINITY` when every input was NaN or `-inf`
    pub(crate) fn raw_max(&self) -> f64 {
        self.max
    }

    /// Earliest oldest-timestamp among the traversed layers
    pub fn oldest(&self) -> Option<Timestamp> {
        self.oldest
    }
}
