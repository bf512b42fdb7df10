use serde::{Deserialize, Serialize};
use thiserror_no_std::Error;

use super::{EmitSink, Layer, LayerStats, Timestamp};
use crate::config::{CascadeConfig, ConfigError, DEFAULT_CAPACITY, DEFAULT_DEPTH};

/// Cascade with the layout of the original freezer logger: ten layers of
/// three entries each, two inputs per entry
pub type DefaultCascade<S> = AggregationCascade<S, DEFAULT_CAPACITY, DEFAULT_DEPTH>;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CascadeError {
    #[error("Layer {index} does not exist in a cascade of depth {depth}")]
    LayerOutOfRange { index: usize, depth: usize },
}

/// Summary of everything the cascade still remembers
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    /// Earliest timestamp still represented
    pub oldest: Timestamp,
    /// Layer the summary was computed through
    pub root_layer: usize,
    /// Effective count in entries of `root_layer`
    ///
    /// Not monotone: it drops whenever the root moves to a coarser layer and
    /// whenever the root finalizes an entry. Use `samples` to compare
    /// summaries over time.
    pub count: f64,
    /// Effective count in raw samples
    pub samples: f64,
    /// Maximum as aggregated; `NEG_INFINITY` if every retained input was NaN
    /// or `-inf`
    pub max: f64,
    pub mean: f64,
}

/// Answer to a read-side query
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub enum QueryResult {
    /// Nothing has been finalized yet
    NoData,
    Summary(Summary),
}

impl QueryResult {
    pub fn summary(&self) -> Option<&Summary> {
        match self {
            Self::NoData => None,
            Self::Summary(summary) => Some(summary),
        }
    }

    pub fn is_no_data(&self) -> bool {
        matches!(self, Self::NoData)
    }
}

/// Multi-resolution rollup of a stream of timestamped samples
///
/// Layer 0 receives raw samples. Every layer finalizes one entry per
/// `aggregation_interval` inputs and keeps the newest `CAPACITY` of them.
/// Once a layer has overflowed, each entry it finalizes is also fed as one
/// input to the next layer, so older data survives at coarser resolution.
/// Memory use is `DEPTH × CAPACITY` entries no matter how long the stream.
///
/// ## Usage
///
/// ```rust
/// use frostlog_core::{AggregationCascade, CascadeConfig, NoSink, QueryResult};
///
/// let mut cascade: AggregationCascade<NoSink, 3, 2> =
///     AggregationCascade::new(CascadeConfig::uniform(2), NoSink).unwrap();
///
/// assert_eq!(cascade.query(), QueryResult::NoData);
/// for t in 1..=4 {
///     cascade.log(f64::from(t), t);
/// }
/// let summary = cascade.query().summary().copied().unwrap();
/// assert_eq!(summary.mean, 2.5);
/// assert_eq!(summary.max, 4.0);
/// ```
#[derive(Debug, Clone)]
pub struct AggregationCascade<S, const CAPACITY: usize, const DEPTH: usize> {
    /// Finest layer first; layer `i + 1` is fed by layer `i`
    layers: [Layer<CAPACITY>; DEPTH],
    sink: S,
}

impl<S, const CAPACITY: usize, const DEPTH: usize> AggregationCascade<S, CAPACITY, DEPTH>
where
    S: EmitSink,
{
    /// Build a cascade, rejecting zero capacity, zero depth and zero intervals.
    pub fn new(config: CascadeConfig<DEPTH>, sink: S) -> Result<Self, ConfigError> {
        config.validate(CAPACITY)?;
        Ok(Self {
            layers: core::array::from_fn(|index| Layer::new(index, config.layers[index])),
            sink,
        })
    }

    /// Record a raw sample.
    pub fn log(&mut self, value: f64, timestamp: Timestamp) {
        self.log_at(0, value, None, timestamp);
    }

    /// Record a raw sample together with a maximum observed alongside it.
    pub fn log_with_max(&mut self, value: f64, max: f64, timestamp: Timestamp) {
        self.log_at(0, value, Some(max), timestamp);
    }

    /// Feed one input into layer `start` and carry finalized entries upward
    /// for as long as the receiving layers are overflowed.
    fn log_at(&mut self, start: usize, value: f64, max: Option<f64>, timestamp: Timestamp) {
        let mut input = (value, max);

        for layer in self.layers.iter_mut().skip(start) {
            let Some(finalized) = layer.absorb(input.0, input.1, timestamp) else {
                return;
            };

            if layer.emits() {
                self.sink.emit(layer.index(), finalized.entry);
            }

            if !finalized.forward {
                return;
            }
            input = (finalized.entry.mean, Some(finalized.entry.max));
        }
    }

    pub fn depth(&self) -> usize {
        DEPTH
    }

    pub fn capacity(&self) -> usize {
        CAPACITY
    }

    pub fn layer(&self, index: usize) -> Option<&Layer<CAPACITY>> {
        self.layers.get(index)
    }

    pub fn layers(&self) -> &[Layer<CAPACITY>] {
        &self.layers
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Statistics of layer `index` combined with all finer layers.
    pub fn stats_through(&self, index: usize) -> Result<LayerStats, CascadeError> {
        let Some((finest, coarser)) = self.layers.get(..=index).and_then(<[_]>::split_first)
        else {
            return Err(CascadeError::LayerOutOfRange {
                index,
                depth: DEPTH,
            });
        };

        let mut stats = finest.stats(None);
        for layer in coarser {
            stats = layer.stats(Some(&stats));
        }
        Ok(stats)
    }

    /// Sample-equivalent weight of layer `index` and everything finer, in
    /// entries of that layer.
    pub fn effective_count(&self, index: usize) -> Result<f64, CascadeError> {
        Ok(self.stats_through(index)?.effective_count())
    }

    /// Weighted mean through layer `index`; `None` when there is nothing to weigh.
    pub fn mean_since(&self, index: usize) -> Result<Option<f64>, CascadeError> {
        Ok(self.stats_through(index)?.mean())
    }

    /// Maximum through layer `index`; `None` when nothing was logged.
    pub fn max_since(&self, index: usize) -> Result<Option<f64>, CascadeError> {
        Ok(self.stats_through(index)?.max())
    }

    /// Oldest retained timestamp of layer `index` alone.
    pub fn oldest_timestamp(&self, index: usize) -> Result<Option<Timestamp>, CascadeError> {
        self.layers
            .get(index)
            .map(Layer::oldest_timestamp)
            .ok_or(CascadeError::LayerOutOfRange {
                index,
                depth: DEPTH,
            })
    }

    /// Summarize everything retained.
    ///
    /// The summary is taken through the coarsest layer that has received any
    /// input, so it covers all retained data.
    pub fn query(&self) -> QueryResult {
        let root = self
            .layers
            .iter()
            .rposition(|layer| layer.last_timestamp().is_some())
            .unwrap_or(0);
        self.summarize(root)
    }

    /// Summarize layer `index` and everything finer.
    pub fn query_from(&self, index: usize) -> Result<QueryResult, CascadeError> {
        if index >= DEPTH {
            return Err(CascadeError::LayerOutOfRange {
                index,
                depth: DEPTH,
            });
        }
        Ok(self.summarize(index))
    }

    fn summarize(&self, root: usize) -> QueryResult {
        // Layer 0 keeps at least one entry once it has finalized anything
        if self.layers.first().is_none_or(|layer| layer.is_empty()) {
            return QueryResult::NoData;
        }

        let Ok(stats) = self.stats_through(root) else {
            return QueryResult::NoData;
        };
        // Both are set once layer 0 holds an entry
        match (stats.oldest(), stats.mean()) {
            (Some(oldest), Some(mean)) => QueryResult::Summary(Summary {
                oldest,
                root_layer: root,
                count: stats.effective_count(),
                samples: stats.sample_equivalent(),
                max: stats.raw_max(),
                mean,
            }),
            _ => QueryResult::NoData,
        }
    }
}
