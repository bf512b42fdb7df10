//! Cascade configuration
//!
//! Depth and history capacity are compile-time parameters of
//! [`AggregationCascade`](crate::AggregationCascade); everything that can vary
//! per layer lives here.

use serde::{Deserialize, Serialize};
use thiserror_no_std::Error;

/// Number of finalized entries each layer keeps
pub const DEFAULT_CAPACITY: usize = 3;

/// Number of layers in the default cascade
pub const DEFAULT_DEPTH: usize = 10;

/// Number of inputs combined into one entry by default
pub const DEFAULT_AGGREGATION_INTERVAL: u32 = 2;

/// Per-layer settings
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerConfig {
    /// Elementary inputs combined into one finalized entry
    pub aggregation_interval: u32,
    /// Hand every finalized entry of this layer to the emit sink
    pub emit: bool,
}

impl LayerConfig {
    pub const fn new(aggregation_interval: u32) -> Self {
        Self {
            aggregation_interval,
            emit: false,
        }
    }
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self::new(DEFAULT_AGGREGATION_INTERVAL)
    }
}

/// Settings for every layer of a cascade of depth `DEPTH`, finest first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CascadeConfig<const DEPTH: usize> {
    pub layers: [LayerConfig; DEPTH],
}

impl<const DEPTH: usize> CascadeConfig<DEPTH> {
    /// Every layer aggregates `aggregation_interval` inputs; no layer emits.
    pub const fn uniform(aggregation_interval: u32) -> Self {
        Self {
            layers: [LayerConfig::new(aggregation_interval); DEPTH],
        }
    }

    /// Override the aggregation interval of one layer. Out-of-range layers are ignored.
    pub fn with_interval(mut self, layer: usize, aggregation_interval: u32) -> Self {
        if let Some(config) = self.layers.get_mut(layer) {
            config.aggregation_interval = aggregation_interval;
        }
        self
    }

    /// Mark a layer as emitting its finalized entries.
    pub fn with_emit(mut self, layer: usize) -> Self {
        if let Some(config) = self.layers.get_mut(layer) {
            config.emit = true;
        }
        self
    }

    /// Check the configuration against a history capacity.
    pub fn validate(&self, capacity: usize) -> Result<(), ConfigError> {
        if DEPTH == 0 {
            return Err(ConfigError::EmptyCascade);
        }
        if capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        match self
            .layers
            .iter()
            .position(|layer| layer.aggregation_interval == 0)
        {
            Some(layer) => Err(ConfigError::ZeroInterval { layer }),
            None => Ok(()),
        }
    }
}

impl<const DEPTH: usize> Default for CascadeConfig<DEPTH> {
    fn default() -> Self {
        Self::uniform(DEFAULT_AGGREGATION_INTERVAL)
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    #[error("History capacity must be at least 1")]
    ZeroCapacity,
    #[error("Cascade must have at least one layer")]
    EmptyCascade,
    #[error("Layer {layer} has an aggregation interval of 0")]
    ZeroInterval { layer: usize },
}
