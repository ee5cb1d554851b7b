//! Record model for map files
//!
//! A [`Template`] is one read (or read pair) together with every alignment the
//! mapper reported for it. The hierarchy is:
//!
//! ```text
//! Template ── reads: [ReadEnd; 1 or 2]
//!          ├─ counters: per-stratum match counts (stratum = edit distance)
//!          └─ maps: [Mapping]        one placement of the whole template
//!                     └─ blocks: [Block]   one contiguous segment on the reference
//!                                  └─ mismatches: [Mismatch]
//! ```
//!
//! Split reads produce several blocks for one read end (joined by a
//! [`JunctionKind::Splice`]); paired mappings chain the blocks of the second
//! end after the first (joined by a [`JunctionKind::Insert`]).

use crate::formats::primitives::Strand;
use std::cell::OnceCell;

/// `level()` of a template with no alignment at any stratum
pub const UNMAPPED: i64 = -1;

/// `level()` of a template with exactly one best alignment
pub const UNIQUE: i64 = 0;

/// Kind of a single alignment difference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MismatchKind {
    /// Base substitution; carries the reference base
    Substitution(u8),
    /// Bases present in the read but not in the reference
    Insertion(u64),
    /// Reference bases missing from the read
    Deletion(u64),
    /// Read bases skipped without being aligned (trimmed)
    Skip(u64),
}

/// One difference between a read end and the reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Mismatch {
    /// Offset in the read end (0-based)
    pub position: u64,
    /// What kind of difference this is
    pub kind: MismatchKind,
}

impl Mismatch {
    /// Create a new mismatch
    pub fn new(position: u64, kind: MismatchKind) -> Self {
        Self { position, kind }
    }

    /// Returns `true` for events that count towards the edit distance
    ///
    /// Skipped (trimmed) bases are not an edit.
    #[inline]
    pub fn is_edit(&self) -> bool {
        !matches!(self.kind, MismatchKind::Skip(_))
    }

    /// Bases this event contributes to the Levenshtein distance
    pub fn edit_length(&self) -> u64 {
        match self.kind {
            MismatchKind::Substitution(_) => 1,
            MismatchKind::Insertion(n) | MismatchKind::Deletion(n) => n,
            MismatchKind::Skip(_) => 0,
        }
    }
}

/// How a block relates to the block that follows it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JunctionKind {
    /// Spliced: the next block continues the same read end further downstream
    Splice,
    /// The next block belongs to the mate of a paired mapping
    Insert,
    /// Last block of the mapping
    NoJunction,
}

/// Junction to the next block, with its distance on the reference
///
/// `distance` is `-1` when it does not apply (no following block, or a mate
/// placed on a different sequence).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Junction {
    /// Junction kind
    pub kind: JunctionKind,
    /// Reference distance to the next block
    pub distance: i64,
}

impl Junction {
    /// Junction of the final block of a mapping
    pub const NONE: Junction = Junction {
        kind: JunctionKind::NoJunction,
        distance: -1,
    };

    /// Splice junction skipping `distance` reference bases
    ///
    /// Distances beyond `i64::MAX` are clamped.
    pub fn splice(distance: u64) -> Self {
        Self {
            kind: JunctionKind::Splice,
            distance: i64::try_from(distance).unwrap_or(i64::MAX),
        }
    }

    /// Mate junction with the given gap (`-1` if not applicable)
    pub fn insert(distance: i64) -> Self {
        Self {
            kind: JunctionKind::Insert,
            distance,
        }
    }
}

impl Default for Junction {
    fn default() -> Self {
        Junction::NONE
    }
}

/// One contiguous aligned segment of a read end
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// Read end this block belongs to (0 for the first mate)
    pub end: usize,
    /// Reference sequence name
    pub sequence_name: String,
    /// Strand of the placement
    pub strand: Strand,
    /// 1-based start position on the reference
    pub position: u64,
    /// Number of reference bases covered by the block
    pub reference_span: u64,
    /// Differences to the reference, ordered by read offset
    pub mismatches: Vec<Mismatch>,
    /// Relation to the next block of the mapping
    pub junction: Junction,
}

impl Block {
    /// Number of edit events (substitutions, insertions, deletions)
    pub fn mismatch_count(&self) -> usize {
        self.mismatches.iter().filter(|m| m.is_edit()).count()
    }

    /// Levenshtein distance of the block: indels count one per base
    pub fn levenshtein_distance(&self) -> u64 {
        self.mismatches
            .iter()
            .fold(0, |total, m| total.saturating_add(m.edit_length()))
    }

    /// 1-based position one past the last covered reference base
    #[inline]
    pub fn end_position(&self) -> u64 {
        self.position.saturating_add(self.reference_span)
    }

    /// Returns `true` if the block matches the reference exactly
    pub fn is_perfect(&self) -> bool {
        self.mismatch_count() == 0
    }
}

/// One placement of a whole template (both ends for a pair)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mapping {
    /// Blocks in read order: all blocks of end 0, then end 1
    pub blocks: Vec<Block>,
    /// Optional mapping score reported by the mapper
    pub score: Option<u64>,
}

impl Mapping {
    /// Edit distance of the whole mapping (the stratum it counts towards)
    pub fn distance(&self) -> u64 {
        self.blocks.iter().map(|b| b.mismatch_count() as u64).sum()
    }

    /// Levenshtein distance summed over every block
    pub fn levenshtein_distance(&self) -> u64 {
        self.blocks
            .iter()
            .fold(0, |total, b| total.saturating_add(b.levenshtein_distance()))
    }

    /// Blocks belonging to read end `end`
    pub fn end_blocks(&self, end: usize) -> impl Iterator<Item = &Block> {
        self.blocks.iter().filter(move |b| b.end == end)
    }

    /// Returns `true` if any read end of this mapping is spliced
    pub fn is_split(&self) -> bool {
        self.blocks
            .iter()
            .any(|b| b.junction.kind == JunctionKind::Splice)
    }

    /// Number of read ends placed by this mapping
    pub fn num_ends(&self) -> usize {
        self.blocks.last().map_or(0, |b| b.end + 1)
    }

    /// Strand of the first block of read end `end`
    pub fn end_strand(&self, end: usize) -> Option<Strand> {
        self.end_blocks(end).next().map(|b| b.strand)
    }

    /// Template length of a paired mapping on a single sequence
    ///
    /// Distance from the leftmost covered base to one past the rightmost one,
    /// `None` for single-end mappings or mates on different sequences.
    pub fn insert_size(&self) -> Option<i64> {
        if self.num_ends() < 2 {
            return None;
        }
        let first = self.blocks.first()?;
        if self
            .blocks
            .iter()
            .any(|b| b.sequence_name != first.sequence_name)
        {
            return None;
        }
        let start = self.blocks.iter().map(|b| b.position).min()?;
        let end = self.blocks.iter().map(|b| b.end_position()).max()?;
        i64::try_from(end - start).ok()
    }
}

/// Sequence and qualities of one read end
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadEnd {
    /// Read bases
    pub sequence: String,
    /// Quality string, if the file carries qualities
    pub qualities: Option<String>,
}

impl ReadEnd {
    /// Create a new read end
    pub fn new(sequence: String, qualities: Option<String>) -> Self {
        Self { sequence, qualities }
    }

    /// Number of bases
    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    /// Returns `true` for an empty read
    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }
}

/// One read or read pair with all of its alignments
///
/// Templates are immutable once built; operators that drop mappings build a
/// new template with [`Template::with_maps`].
///
/// # Examples
///
/// ```
/// use gemtools::formats::map::parse_template;
///
/// # fn main() -> gemtools::Result<()> {
/// let t = parse_template(
///     "read1\tACGTACGTAC\t0:2:1\tchr1:+:100:4A5,chr1:-:900:2C7,chr2:+:7:3G2T3",
/// )?;
/// assert_eq!(t.tag(), "read1");
/// assert_eq!(t.num_blocks(), 1);
/// assert_eq!(t.counters(), &[0, 2, 1]);
/// assert_eq!(t.level(), 1); // two equally good alignments at stratum 1
/// assert_eq!(t.alignments().count(), 3);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Template {
    tag: String,
    reads: Vec<ReadEnd>,
    counters: Vec<u64>,
    mcs: usize,
    maps: Vec<Mapping>,
    level: OnceCell<i64>,
}

impl Template {
    /// Assemble a template from parsed parts
    pub fn new(
        tag: String,
        reads: Vec<ReadEnd>,
        counters: Vec<u64>,
        mcs: usize,
        maps: Vec<Mapping>,
    ) -> Self {
        Self {
            tag,
            reads,
            counters,
            mcs,
            maps,
            level: OnceCell::new(),
        }
    }

    /// Template identifier
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Read ends (one for single-end, two for paired-end)
    pub fn reads(&self) -> &[ReadEnd] {
        &self.reads
    }

    /// Number of read ends
    pub fn num_blocks(&self) -> usize {
        self.reads.len()
    }

    /// Returns `true` for a read pair
    pub fn is_paired(&self) -> bool {
        self.reads.len() > 1
    }

    /// Per-stratum alignment counts, in stratum order
    pub fn counters(&self) -> &[u64] {
        &self.counters
    }

    /// Max complete strata
    pub fn mcs(&self) -> usize {
        self.mcs
    }

    /// Mappings in file order
    pub fn maps(&self) -> &[Mapping] {
        &self.maps
    }

    /// Number of mappings
    pub fn num_maps(&self) -> usize {
        self.maps.len()
    }

    /// Every block of every mapping, in file order
    pub fn alignments(&self) -> impl Iterator<Item = &Block> {
        self.maps.iter().flat_map(|m| m.blocks.iter())
    }

    /// Uniqueness level: `-1` unmapped, `0` unique, `i` ambiguous at stratum `i`
    ///
    /// Computed from the counters on first use and cached.
    pub fn level(&self) -> i64 {
        *self.level.get_or_init(|| uniqueness_level(&self.counters))
    }

    /// Returns `true` if no stratum holds an alignment
    pub fn is_unmapped(&self) -> bool {
        self.level() == UNMAPPED
    }

    /// First mapping with the smallest edit distance
    pub fn best_mapping(&self) -> Option<&Mapping> {
        self.maps
            .iter()
            .enumerate()
            .min_by_key(|(i, m)| (m.distance(), *i))
            .map(|(_, m)| m)
    }

    /// Copy of this template carrying only `maps`
    ///
    /// Counters are rebuilt from the mapping distances; tag, reads and max
    /// complete strata are kept.
    pub fn with_maps(&self, maps: Vec<Mapping>) -> Template {
        let counters = recalculate_counters(&maps);
        Template::new(
            self.tag.clone(),
            self.reads.clone(),
            counters,
            self.mcs,
            maps,
        )
    }

    /// Counters as they would be computed from this template's own mappings
    pub fn recalculated_counters(&self) -> Vec<u64> {
        recalculate_counters(&self.maps)
    }

    pub(crate) fn into_tag_and_maps(self) -> (String, Vec<Mapping>) {
        (self.tag, self.maps)
    }
}

impl PartialEq for Template {
    fn eq(&self, other: &Self) -> bool {
        self.tag == other.tag
            && self.reads == other.reads
            && self.counters == other.counters
            && self.mcs == other.mcs
            && self.maps == other.maps
    }
}

impl Eq for Template {}

/// Uniqueness level of a counters histogram
///
/// Only the first non-zero stratum matters: a count of one there is a unique
/// hit (`0`), anything larger is ambiguous at that stratum's index.
///
/// ```
/// use gemtools::types::uniqueness_level;
///
/// assert_eq!(uniqueness_level(&[0, 0, 0]), -1);
/// assert_eq!(uniqueness_level(&[0, 1, 5]), 0);
/// assert_eq!(uniqueness_level(&[0, 0, 3]), 2);
/// ```
pub fn uniqueness_level(counters: &[u64]) -> i64 {
    match counters.iter().position(|&c| c != 0) {
        None => UNMAPPED,
        Some(i) if counters[i] == 1 => UNIQUE,
        Some(i) => i as i64,
    }
}

/// Histogram of mapping distances; `[0]` when there are no mappings
fn recalculate_counters(maps: &[Mapping]) -> Vec<u64> {
    let max = maps.iter().map(|m| m.distance()).max();
    let mut counters = vec![0u64; max.map_or(1, |d| d as usize + 1)];
    for map in maps {
        counters[map.distance() as usize] += 1;
    }
    counters
}
