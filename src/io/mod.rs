//! I/O module: sources, line reading and streaming map parsing
//!
//! Everything here streams: a cursor holds one line and one parsed template
//! at a time, whatever the size of the input.

pub mod compression;
pub mod input;
pub mod lines;
pub mod map;

pub use compression::{CompressedReader, DataSource, MMAP_THRESHOLD};
pub use input::{AlignmentRecord, Alignments, InputFile, Templates};
pub use lines::LineSource;
pub use map::{MalformedPolicy, MapStream, ParserOptions};
