pub mod cascade;
pub mod layer;
pub mod rollup;
pub mod shared;
pub mod sink;

pub use cascade::*;
pub use layer::{Layer, LayerState, LayerStats};
pub use rollup::*;
pub use shared::SharedCascade;
pub use sink::*;
