//! Stream operations over parsed templates
//!
//! # Organization
//!
//! - `filter`: [`unique`], [`unmapped`] and mapping-level [`filter_maps`]
//! - `interleave`: round-robin merge of several streams
//! - `stats`: [`MapStats`] accumulator
//!
//! Every adapter is lazy and consumes its input exactly once.

pub mod filter;
pub mod interleave;
pub mod stats;

pub use filter::{filter_maps, unique, unmapped, FilterMaps, FilterParams, Unique, Unmapped};
pub use interleave::{interleave, Interleave};
pub use stats::MapStats;
