//! Map file format parsing.
//!
//! - [`map`]: the record parser, one line to one [`Template`](crate::types::Template)
//! - [`primitives`]: field helpers and strand type shared by the parser
//!
//! Parsers here are pure functions over a single line; reading lines from a
//! (possibly compressed) source lives in [`crate::io`].

pub mod map;
pub mod primitives;

pub use map::{parse_template, parse_template_with_limit};
pub use primitives::Strand;
