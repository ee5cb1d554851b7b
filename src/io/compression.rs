//! Byte sources and transparent gzip decoding
//!
//! [`DataSource`] names where map data comes from; [`CompressedReader`] opens
//! it and decides, from the first bytes (or the file extension), whether a
//! gzip decoder has to sit in between. Multi-member streams (bgzip output,
//! concatenated `.gz` files) decode as one continuous stream.
//!
//! # Opening strategy
//!
//! - Plain files below [`MMAP_THRESHOLD`]: `BufReader` over the file
//! - Plain files at or above it: memory-mapped
//! - Gzip: `MultiGzDecoder` over the file reader, re-buffered for line reads

use crate::error::Result;
use flate2::bufread::MultiGzDecoder;
use log::debug;
use memmap2::Mmap;
use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

/// Memory-mapped file threshold (50 MB)
pub const MMAP_THRESHOLD: u64 = 50 * 1024 * 1024;

/// First two bytes of every gzip member
pub const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// File extensions treated as gzip even when the magic bytes disagree
const COMPRESSED_EXTENSIONS: &[&str] = &["gz", "bgz", "gzip"];

/// Where map data is read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    /// Local file path
    Local(PathBuf),

    /// Standard input; cannot be rewound, so only one cursor sees the data
    Stdin,
}

impl DataSource {
    /// Create a local file data source
    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        DataSource::Local(path.as_ref().to_path_buf())
    }

    /// Open the data source and return a buffered reader
    ///
    /// Every call opens a new, independent handle.
    pub fn open(&self) -> Result<Box<dyn BufRead + Send>> {
        match self {
            DataSource::Local(path) => open_local_file(path),
            DataSource::Stdin => Ok(Box::new(BufReader::new(io::stdin()))),
        }
    }

    /// Returns `true` if the file name ends in a gzip extension
    pub fn has_compressed_extension(&self) -> bool {
        match self {
            DataSource::Local(path) => path
                .extension()
                .and_then(|ext| ext.to_str())
                .map_or(false, |ext| {
                    COMPRESSED_EXTENSIONS
                        .iter()
                        .any(|c| ext.eq_ignore_ascii_case(c))
                }),
            DataSource::Stdin => false,
        }
    }

    /// Returns `true` if opening again starts over from the first byte
    pub fn is_restartable(&self) -> bool {
        matches!(self, DataSource::Local(_))
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::Local(path) => write!(f, "{}", path.display()),
            DataSource::Stdin => write!(f, "<stdin>"),
        }
    }
}

/// Open a local file, memory-mapping it when it is large
fn open_local_file(path: &Path) -> Result<Box<dyn BufRead + Send>> {
    let metadata = std::fs::metadata(path)?;
    let file_size = metadata.len();

    if file_size >= MMAP_THRESHOLD {
        debug!("Memory-mapping {} ({} bytes)", path.display(), file_size);
        open_mmap_file(path)
    } else {
        let file = File::open(path)?;
        Ok(Box::new(BufReader::new(file)))
    }
}

fn open_mmap_file(path: &Path) -> Result<Box<dyn BufRead + Send>> {
    let file = File::open(path)?;
    // The map is read-only and dropped together with the reader.
    let mmap = unsafe { Mmap::map(&file)? };
    Ok(Box::new(io::Cursor::new(mmap)))
}

/// Reader that decodes gzip input transparently
///
/// # Example
///
/// ```no_run
/// use gemtools::io::compression::{CompressedReader, DataSource};
/// use std::io::BufRead;
///
/// # fn main() -> gemtools::Result<()> {
/// let reader = CompressedReader::new(DataSource::from_path("sample.map.gz"))?;
/// assert!(reader.is_compressed());
/// for line in reader.lines() {
///     let _line = line?;
/// }
/// # Ok(())
/// # }
/// ```
pub struct CompressedReader {
    inner: Box<dyn BufRead + Send>,
    compressed: bool,
}

impl CompressedReader {
    /// Open `source` and wrap it in a gzip decoder if needed
    ///
    /// Gzip is detected from the magic bytes, or from a gzip file extension
    /// on a non-empty file (a mislabelled plain file then fails to decode).
    pub fn new(source: DataSource) -> Result<Self> {
        let mut reader = source.open()?;

        let (has_magic, is_empty) = {
            let peeked = reader.fill_buf()?;
            (peeked.starts_with(&GZIP_MAGIC), peeked.is_empty())
        };
        let compressed = has_magic || (!is_empty && source.has_compressed_extension());

        if compressed {
            debug!("Opening {} as gzip", source);
            Ok(Self {
                inner: Box::new(BufReader::new(MultiGzDecoder::new(reader))),
                compressed,
            })
        } else {
            debug!("Opening {} as plain text", source);
            Ok(Self {
                inner: reader,
                compressed,
            })
        }
    }

    /// Returns `true` if reads go through the gzip decoder
    pub fn is_compressed(&self) -> bool {
        self.compressed
    }

    /// Get the inner buffered reader
    pub fn into_inner(self) -> Box<dyn BufRead + Send> {
        self.inner
    }
}

impl Read for CompressedReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl BufRead for CompressedReader {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        self.inner.fill_buf()
    }

    fn consume(&mut self, amt: usize) {
        self.inner.consume(amt)
    }
}
