//! gemtools: streaming reader for GEM mapper alignment files
//!
//! # Overview
//!
//! gemtools reads `.map` files (plain or gzip) one template at a time and
//! offers a handful of lazy stream operations on top: uniqueness and
//! mismatch filters, mapping-level pruning, round-robin interleaving and
//! summary statistics.
//!
//! ## Quick Start
//!
//! ```no_run
//! use gemtools::operations::unique;
//! use gemtools::InputFile;
//!
//! # fn main() -> gemtools::Result<()> {
//! let input = InputFile::open("sample.map.gz");
//!
//! for template in unique(input.templates(), 0) {
//!     let template = template?;
//!     println!("{}\t{}", template.tag(), template.num_maps());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! - [`types`]: the template model (reads, counters, mappings, blocks)
//! - [`formats`]: map line parser
//! - [`io`]: sources, gzip detection, streaming parser, input handles
//! - [`operations`]: filters, interleave, statistics
//! - [`error`]: error type shared by everything above

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod error;
pub mod formats;
pub mod io;
pub mod operations;
pub mod types;

// Re-export commonly used types
pub use error::{GemError, Result};
pub use formats::{parse_template, Strand};
pub use io::{AlignmentRecord, DataSource, InputFile, MapStream, ParserOptions};
pub use operations::{interleave, unique, unmapped};
pub use types::{Block, Junction, JunctionKind, Mapping, Mismatch, MismatchKind, ReadEnd, Template};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
