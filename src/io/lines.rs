//! Line source over a (possibly decompressed) byte stream
//!
//! [`LineSource`] yields one logical line at a time with the line terminator
//! (`\n` or `\r\n`) removed. Blank lines are skipped. Only the current line
//! is held in memory.
//!
//! Read failures are classified by what sits underneath: on a gzip stream
//! any read error means the compressed data is damaged and becomes
//! [`GemError::CorruptStream`]; on a plain source it stays [`GemError::Io`].
//! Either way the source stops after the first read failure.

use crate::error::{GemError, Result};
use crate::io::compression::{CompressedReader, DataSource};
use std::io::{self, BufRead};

/// Iterator over the non-empty lines of a reader
pub struct LineSource<R: BufRead> {
    reader: R,
    buffer: Vec<u8>,
    line_number: usize,
    compressed: bool,
    finished: bool,
}

impl<R: BufRead> LineSource<R> {
    /// Create a line source over an uncompressed reader
    pub fn new(reader: R) -> Self {
        Self::with_compression(reader, false)
    }

    /// Create a line source, marking whether `reader` decodes gzip
    pub fn with_compression(reader: R, compressed: bool) -> Self {
        Self {
            reader,
            buffer: Vec::with_capacity(512),
            line_number: 0,
            compressed,
            finished: false,
        }
    }

    /// Number of physical lines read so far (blank lines included)
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    /// Returns `true` once the source is exhausted or has failed
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn read_error(&self, err: io::Error) -> GemError {
        if self.compressed {
            GemError::CorruptStream {
                line: self.line_number,
                msg: err.to_string(),
            }
        } else {
            GemError::Io(err)
        }
    }
}

impl LineSource<CompressedReader> {
    /// Open `source`, detecting gzip compression
    pub fn open(source: DataSource) -> Result<Self> {
        let reader = CompressedReader::new(source)?;
        let compressed = reader.is_compressed();
        Ok(Self::with_compression(reader, compressed))
    }
}

impl<R: BufRead> Iterator for LineSource<R> {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.finished {
                return None;
            }

            self.buffer.clear();
            match self.reader.read_until(b'\n', &mut self.buffer) {
                Ok(0) => {
                    self.finished = true;
                    return None;
                }
                Ok(_) => {
                    self.line_number += 1;

                    let mut end = self.buffer.len();
                    while end > 0 && matches!(self.buffer[end - 1], b'\n' | b'\r') {
                        end -= 1;
                    }
                    if end == 0 {
                        continue;
                    }

                    let line = &self.buffer[..end];
                    return Some(match std::str::from_utf8(line) {
                        Ok(text) => Ok(text.to_string()),
                        Err(_) => Err(GemError::MalformedRecord {
                            line: self.line_number,
                            reason: "line is not valid UTF-8".to_string(),
                            record: String::from_utf8_lossy(line).into_owned(),
                        }),
                    });
                }
                Err(e) => {
                    self.finished = true;
                    return Some(Err(self.read_error(e)));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufReader, Cursor, Read};

    fn collect(data: &[u8]) -> Vec<String> {
        LineSource::new(Cursor::new(data.to_vec()))
            .map(|line| line.unwrap())
            .collect()
    }

    #[test]
    fn test_strips_terminators() {
        assert_eq!(collect(b"a\r\nb\nc"), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_skips_blank_lines() {
        let mut source = LineSource::new(Cursor::new(b"\n\na\n\r\n\nb\n".to_vec()));
        assert_eq!(source.next().unwrap().unwrap(), "a");
        assert_eq!(source.line_number(), 3);
        assert_eq!(source.next().unwrap().unwrap(), "b");
        assert_eq!(source.line_number(), 6);
        assert!(source.next().is_none());
        assert!(source.is_finished());
    }

    #[test]
    fn test_empty_input() {
        assert!(collect(b"").is_empty());
        assert!(collect(b"\n\n").is_empty());
    }

    #[test]
    fn test_invalid_utf8_is_record_error() {
        let mut source = LineSource::new(Cursor::new(b"ok\n\xff\xfe\nnext\n".to_vec()));
        assert_eq!(source.next().unwrap().unwrap(), "ok");

        let err = source.next().unwrap().unwrap_err();
        assert!(err.is_record_error());
        assert!(matches!(err, GemError::MalformedRecord { line: 2, .. }));

        // the source keeps going after a bad line
        assert_eq!(source.next().unwrap().unwrap(), "next");
    }

    struct FailingReader {
        served: bool,
    }

    impl Read for FailingReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.served {
                return Err(io::Error::new(io::ErrorKind::InvalidData, "broken"));
            }
            self.served = true;
            let data = b"first\n";
            buf[..data.len()].copy_from_slice(data);
            Ok(data.len())
        }
    }

    #[test]
    fn test_read_error_on_plain_source() {
        let reader = BufReader::new(FailingReader { served: false });
        let mut source = LineSource::new(reader);
        assert_eq!(source.next().unwrap().unwrap(), "first");
        assert!(matches!(source.next(), Some(Err(GemError::Io(_)))));
        assert!(source.next().is_none());
    }

    #[test]
    fn test_read_error_on_compressed_source() {
        let reader = BufReader::new(FailingReader { served: false });
        let mut source = LineSource::with_compression(reader, true);
        assert_eq!(source.next().unwrap().unwrap(), "first");
        match source.next() {
            Some(Err(GemError::CorruptStream { line, .. })) => assert_eq!(line, 1),
            other => panic!("expected corrupt stream, got {:?}", other),
        }
        assert!(source.next().is_none());
    }
}
