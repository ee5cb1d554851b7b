//! Map input handles with independent, lazily opened cursors
//!
//! An [`InputFile`] only remembers where its data lives and how to parse it.
//! Each call to [`InputFile::templates`] or [`InputFile::alignments`] returns
//! a fresh cursor that opens its own handle on first use, so two cursors over
//! the same local file never share read position. Standard input can only be
//! consumed once; a second cursor over it sees whatever the first one left.
//!
//! # Example
//!
//! ```no_run
//! use gemtools::InputFile;
//!
//! # fn main() -> gemtools::Result<()> {
//! let input = InputFile::open("sample.map.gz");
//!
//! let first_pass = input.templates().count();
//! let unique = input.templates().filter(|t| matches!(t, Ok(t) if t.level() == 0)).count();
//! println!("{} of {} templates are unique", unique, first_pass);
//! # Ok(())
//! # }
//! ```

use crate::error::Result;
use crate::io::compression::{CompressedReader, DataSource};
use crate::io::map::{MapStream, ParserOptions};
use crate::types::{Block, Template};
use std::path::Path;

/// A map file (or stdin) that can be iterated any number of times
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFile {
    source: DataSource,
    options: ParserOptions,
}

impl InputFile {
    /// Input over an arbitrary data source, with default parser options
    pub fn new(source: DataSource) -> Self {
        Self {
            source,
            options: ParserOptions::default(),
        }
    }

    /// Input over a local file
    ///
    /// Nothing is opened here; a missing file is reported by the first
    /// cursor that tries to read it.
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        Self::new(DataSource::from_path(path))
    }

    /// Replace the parser options used by future cursors
    pub fn with_options(mut self, options: ParserOptions) -> Self {
        self.options = options;
        self
    }

    /// Where this input reads from
    pub fn source(&self) -> &DataSource {
        &self.source
    }

    /// Parser options handed to every cursor
    pub fn options(&self) -> &ParserOptions {
        &self.options
    }

    /// Fresh cursor over all templates, starting at the first record
    pub fn templates(&self) -> Templates {
        Templates {
            state: CursorState::Pending(self.source.clone(), self.options.clone()),
        }
    }

    /// Fresh cursor over every block of every mapping of every template
    pub fn alignments(&self) -> Alignments {
        Alignments {
            templates: self.templates(),
            tag: String::new(),
            pending: Vec::new().into_iter(),
        }
    }
}

enum CursorState {
    Pending(DataSource, ParserOptions),
    Open(MapStream<CompressedReader>),
    Closed,
}

/// Lazy template cursor returned by [`InputFile::templates`]
///
/// The underlying handle is opened on the first call to `next` and released
/// as soon as the cursor is exhausted, fails fatally, or is closed. If the
/// source cannot be opened, the open error is the first and only element.
pub struct Templates {
    state: CursorState,
}

impl Templates {
    /// Release the underlying handle; later calls to `next` return `None`
    pub fn close(&mut self) {
        self.state = CursorState::Closed;
    }

    /// Returns `true` once the handle has been released
    pub fn is_closed(&self) -> bool {
        matches!(self.state, CursorState::Closed)
    }
}

impl Iterator for Templates {
    type Item = Result<Template>;

    fn next(&mut self) -> Option<Self::Item> {
        if let CursorState::Pending(source, options) = &self.state {
            match MapStream::new(source.clone(), options.clone()) {
                Ok(stream) => self.state = CursorState::Open(stream),
                Err(e) => {
                    self.state = CursorState::Closed;
                    return Some(Err(e));
                }
            }
        }

        let CursorState::Open(stream) = &mut self.state else {
            return None;
        };

        match stream.next() {
            Some(Ok(template)) => Some(Ok(template)),
            Some(Err(e)) => {
                if !e.is_record_error() {
                    self.state = CursorState::Closed;
                }
                Some(Err(e))
            }
            None => {
                self.state = CursorState::Closed;
                None
            }
        }
    }
}

/// One block of one mapping, tagged with its template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlignmentRecord {
    /// Tag of the template the block belongs to
    pub tag: String,
    /// Read end the block belongs to
    pub end: usize,
    /// Index of the mapping within the template
    pub map_index: usize,
    /// The aligned block itself
    pub block: Block,
}

/// Lazy block cursor returned by [`InputFile::alignments`]
///
/// Templates without mappings contribute nothing.
pub struct Alignments {
    templates: Templates,
    tag: String,
    pending: std::vec::IntoIter<(usize, Block)>,
}

impl Alignments {
    /// Release the underlying handle
    pub fn close(&mut self) {
        self.templates.close();
        self.pending = Vec::new().into_iter();
    }

    /// Returns `true` once the underlying handle has been released
    pub fn is_closed(&self) -> bool {
        self.templates.is_closed()
    }
}

impl Iterator for Alignments {
    type Item = Result<AlignmentRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((map_index, block)) = self.pending.next() {
                return Some(Ok(AlignmentRecord {
                    tag: self.tag.clone(),
                    end: block.end,
                    map_index,
                    block,
                }));
            }

            let template = match self.templates.next()? {
                Ok(template) => template,
                Err(e) => return Some(Err(e)),
            };

            let (tag, maps) = template.into_tag_and_maps();
            self.tag = tag;
            self.pending = maps
                .into_iter()
                .enumerate()
                .flat_map(|(i, m)| m.blocks.into_iter().map(move |b| (i, b)))
                .collect::<Vec<_>>()
                .into_iter();
        }
    }
}
