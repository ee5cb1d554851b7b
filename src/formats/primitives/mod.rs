//! Shared primitives for map-format parsing.
//!
//! - [`fields`]: field splitting and numeric conversion with record-level errors
//! - [`genomic`]: strand orientation
//!
//! # Example
//!
//! ```
//! use gemtools::formats::primitives::{fields::parse_count, Strand};
//! use std::str::FromStr;
//!
//! let strand = Strand::from_str("-")?;
//! assert_eq!(strand, Strand::Reverse);
//! assert_eq!(parse_count("1234", "position")?, 1234);
//! # Ok::<(), gemtools::GemError>(())
//! ```

pub mod fields;
pub mod genomic;

pub use genomic::Strand;
