//! Streaming map file reader
//!
//! [`MapStream`] turns a line source into a lazy sequence of
//! [`Template`](crate::types::Template)s, one per non-blank line, in file
//! order. Memory use is one line plus one parsed template regardless of file
//! size.
//!
//! # Malformed records
//!
//! By default a line that does not parse is yielded as
//! [`GemError::MalformedRecord`](crate::GemError::MalformedRecord) carrying
//! its line number. With [`MalformedPolicy::Skip`] such lines are logged at
//! `warn` level, counted, and skipped. I/O and decompression errors are
//! always yielded.

use crate::error::Result;
use crate::formats::map::parse_template_with_limit;
use crate::io::compression::{CompressedReader, DataSource};
use crate::io::lines::LineSource;
use crate::types::Template;
use log::{debug, warn};
use std::io::BufRead;
use std::path::Path;

/// What a stream does with a line that fails to parse
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MalformedPolicy {
    /// Yield the error to the caller
    #[default]
    Fail,

    /// Log a warning and move on to the next line
    Skip,
}

/// Parser configuration shared by every stream opened from an input
///
/// # Example
///
/// ```
/// use gemtools::io::{MalformedPolicy, ParserOptions};
///
/// let options = ParserOptions::new().permissive(true).max_maps(10);
/// assert_eq!(options.on_malformed, MalformedPolicy::Skip);
/// assert_eq!(options.max_maps, Some(10));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParserOptions {
    /// Handling of unparseable lines
    pub on_malformed: MalformedPolicy,

    /// Keep at most this many mappings per template (file order)
    pub max_maps: Option<usize>,
}

impl ParserOptions {
    /// Strict options: fail on malformed lines, keep every mapping
    pub fn new() -> Self {
        Self::default()
    }

    /// Skip malformed lines instead of failing
    pub fn permissive(mut self, permissive: bool) -> Self {
        self.on_malformed = if permissive {
            MalformedPolicy::Skip
        } else {
            MalformedPolicy::Fail
        };
        self
    }

    /// Truncate the mapping list of every template to `max_maps`
    pub fn max_maps(mut self, max_maps: usize) -> Self {
        self.max_maps = Some(max_maps);
        self
    }

    /// Returns `true` if malformed lines are skipped
    pub fn is_permissive(&self) -> bool {
        self.on_malformed == MalformedPolicy::Skip
    }
}

/// Map file streaming parser
///
/// # Example
///
/// ```no_run
/// use gemtools::MapStream;
///
/// # fn main() -> gemtools::Result<()> {
/// let stream = MapStream::from_path("sample.map.gz")?;
///
/// for template in stream {
///     let template = template?;
///     println!("{}\t{}", template.tag(), template.level());
/// }
/// # Ok(())
/// # }
/// ```
pub struct MapStream<R: BufRead> {
    lines: LineSource<R>,
    options: ParserOptions,
    records_read: usize,
    records_skipped: usize,
}

impl<R: BufRead> MapStream<R> {
    /// Create a map stream over an uncompressed buffered reader
    pub fn from_reader(reader: R) -> Self {
        Self::from_lines(LineSource::new(reader), ParserOptions::default())
    }

    /// Create a map stream over an uncompressed reader with explicit options
    pub fn with_options(reader: R, options: ParserOptions) -> Self {
        Self::from_lines(LineSource::new(reader), options)
    }

    /// Create a map stream over an existing line source
    pub fn from_lines(lines: LineSource<R>, options: ParserOptions) -> Self {
        Self {
            lines,
            options,
            records_read: 0,
            records_skipped: 0,
        }
    }

    /// Templates successfully parsed so far
    pub fn records_read(&self) -> usize {
        self.records_read
    }

    /// Malformed lines skipped so far (permissive mode only)
    pub fn records_skipped(&self) -> usize {
        self.records_skipped
    }

    /// Physical line number of the last line read
    pub fn line_number(&self) -> usize {
        self.lines.line_number()
    }

    /// Options this stream was created with
    pub fn options(&self) -> &ParserOptions {
        &self.options
    }

    fn skip(&mut self, reason: &dyn std::fmt::Display) {
        warn!("Skipping malformed record: {}", reason);
        self.records_skipped += 1;
    }
}

impl MapStream<CompressedReader> {
    /// Open a data source (gzip detected automatically)
    pub fn new(source: DataSource, options: ParserOptions) -> Result<Self> {
        debug!("Opening map stream on {}", source);
        let lines = LineSource::open(source)?;
        Ok(Self::from_lines(lines, options))
    }

    /// Open a local map file with default options
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::new(DataSource::from_path(path), ParserOptions::default())
    }
}

impl<R: BufRead> Iterator for MapStream<R> {
    type Item = Result<Template>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) if e.is_record_error() && self.options.is_permissive() => {
                    self.skip(&e);
                    continue;
                }
                Err(e) => return Some(Err(e)),
            };

            match parse_template_with_limit(&line, self.options.max_maps) {
                Ok(template) => {
                    self.records_read += 1;
                    return Some(Ok(template));
                }
                Err(e) => {
                    let e = e.at_line(self.lines.line_number());
                    if self.options.is_permissive() {
                        self.skip(&e);
                        continue;
                    }
                    return Some(Err(e));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GemError;
    use std::io::Cursor;

    const TWO_RECORDS: &str = "r1\tACGT\t1\tchr1:+:10:4\n\
                               r2\tGGCC\t0:0\t-\n";

    fn stream(data: &str, options: ParserOptions) -> MapStream<Cursor<Vec<u8>>> {
        MapStream::with_options(Cursor::new(data.as_bytes().to_vec()), options)
    }

    #[test]
    fn test_reads_in_order() {
        let tags: Vec<String> = MapStream::from_reader(Cursor::new(TWO_RECORDS.as_bytes()))
            .map(|t| t.unwrap().tag().to_string())
            .collect();
        assert_eq!(tags, vec!["r1", "r2"]);
    }

    #[test]
    fn test_empty_input_yields_nothing() {
        let mut s = stream("", ParserOptions::default());
        assert!(s.next().is_none());
        assert_eq!(s.records_read(), 0);
    }

    #[test]
    fn test_malformed_line_fails_with_line_number() {
        let data = "r1\tACGT\t1\tchr1:+:10:4\n\nbroken line\n";
        let mut s = stream(data, ParserOptions::default());
        assert!(s.next().unwrap().is_ok());

        match s.next() {
            Some(Err(GemError::MalformedRecord { line, record, .. })) => {
                assert_eq!(line, 3);
                assert_eq!(record, "broken line");
            }
            other => panic!("expected malformed record, got {:?}", other),
        }
    }

    #[test]
    fn test_permissive_skips_malformed() {
        let data = "junk\nr1\tACGT\t1\tchr1:+:10:4\nr2\tACGT\tx\t-\nr3\tGGCC\t0\t-\n";
        let mut s = stream(data, ParserOptions::new().permissive(true));
        let tags: Vec<String> = s.by_ref().map(|t| t.unwrap().tag().to_string()).collect();

        assert_eq!(tags, vec!["r1", "r3"]);
        assert_eq!(s.records_read(), 2);
        assert_eq!(s.records_skipped(), 2);
    }

    #[test]
    fn test_permissive_skips_invalid_utf8() {
        let mut data = b"\xff\tA\t0\t-\n".to_vec();
        data.extend_from_slice(b"r1\tACGT\t0\t-\n");
        let s = MapStream::with_options(Cursor::new(data), ParserOptions::new().permissive(true));
        let templates: Vec<_> = s.collect::<Result<_>>().unwrap();
        assert_eq!(templates.len(), 1);
    }

    #[test]
    fn test_max_maps_truncates() {
        let data = "r1\tACGT\t3\tchr1:+:10:4,chr1:+:20:4,chr2:-:5:4\n";
        let mut s = stream(data, ParserOptions::new().max_maps(2));
        let template = s.next().unwrap().unwrap();
        assert_eq!(template.num_maps(), 2);
        assert_eq!(template.counters(), &[3]);
    }
}
