//! Hardware-independent core library for frostlog
//!
//! This crate contains the platform-agnostic statistics engine of the frostlog
//! sensor logger: a cascade of fixed-capacity aggregation layers that keeps
//! recent readings at full resolution and older readings at progressively
//! coarser resolution, in a bounded amount of memory.
//!
//! It is `#![no_std]` and never allocates, so it compiles on both embedded
//! targets and desktop hosts (for the simulator and tests).

#![no_std]

pub mod config;
pub mod storage;

pub use config::{CascadeConfig, ConfigError, LayerConfig};
pub use storage::*;
