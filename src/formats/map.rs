//! GEM map record parser
//!
//! Turns one line of a map file into a [`Template`]. Parsing is purely
//! syntactic and looks at nothing but the line itself, so a stream only ever
//! holds the record it is currently producing.
//!
//! # Format
//!
//! One template per line, tab-separated, in one of two layouts:
//!
//! ```text
//! TAG  READ  QUALITIES  COUNTERS  MAPS     (5 columns)
//! TAG  READ  COUNTERS  MAPS                (4 columns, no qualities)
//! ```
//!
//! - **READ / QUALITIES**: read ends separated by a single space
//!   (two ends for a pair).
//! - **COUNTERS**: integers separated by `:`; one separator may be `+`, which
//!   marks the end of the complete strata (`0:0+0` has mcs 2).
//! - **MAPS**: `-` for none, else mappings separated by `,`. A mapping is one
//!   end-map per read end joined by `::`, optionally followed by `:::SCORE`.
//!   An end-map is `NAME:STRAND:POSITION:MISMATCHES` and is split from the
//!   right, so sequence names may themselves contain `:`.
//!
//! Mismatch strings are read left to right:
//!
//! | Token | Meaning |
//! |-------|---------|
//! | `36`  | 36 matching bases |
//! | `A`   | substitution, reference base `A` |
//! | `>3+` | deletion of 3 reference bases |
//! | `>2-` | insertion of 2 read bases |
//! | `>334*` | splice: a new block starts 334 bases downstream |
//! | `(5)` | 5 read bases skipped (trimmed) |
//!
//! # Example
//!
//! ```
//! use gemtools::formats::map::parse_template;
//! use gemtools::types::JunctionKind;
//!
//! # fn main() -> gemtools::Result<()> {
//! let line = "pair\tACGTACGTAC TTTTTGGGGG\t0+1\tchr7:+:1000:4>334*6::chr7:-:1409:10";
//! let t = parse_template(line)?;
//!
//! assert!(t.is_paired());
//! assert_eq!(t.mcs(), 1);
//! let junctions: Vec<_> = t
//!     .alignments()
//!     .map(|b| (b.junction.kind, b.junction.distance))
//!     .collect();
//! assert_eq!(junctions, vec![
//!     (JunctionKind::Splice, 334),
//!     (JunctionKind::Insert, 65),
//!     (JunctionKind::NoJunction, -1),
//! ]);
//! # Ok(())
//! # }
//! ```

use crate::error::{GemError, Result};
use crate::formats::primitives::fields::{parse_count, split_fields};
use crate::formats::primitives::Strand;
use crate::types::{Block, Junction, Mapping, Mismatch, MismatchKind, ReadEnd, Template};
use std::str::FromStr;

/// Marker used in the maps column for "no mappings"
pub const NO_MAPS: &str = "-";

/// Parse one map line into a [`Template`].
///
/// # Errors
///
/// Returns [`GemError::MalformedRecord`] carrying `line` when the column count
/// is wrong, a numeric field is not numeric, or a block is truncated.
pub fn parse_template(line: &str) -> Result<Template> {
    parse_template_with_limit(line, None)
}

/// Parse one map line, keeping at most `max_maps` mappings.
///
/// Mappings past the limit are not parsed at all; counters are left as read.
pub fn parse_template_with_limit(line: &str, max_maps: Option<usize>) -> Result<Template> {
    parse_line(line, max_maps).map_err(|e| match e {
        GemError::MalformedRecord { line: n, reason, .. } => GemError::MalformedRecord {
            line: n,
            reason,
            record: line.to_string(),
        },
        other => other,
    })
}

fn parse_line(line: &str, max_maps: Option<usize>) -> Result<Template> {
    let fields = split_fields(line, &[4, 5])?;
    let (tag, read_field, quality_field, counters_field, maps_field) = match fields[..] {
        [tag, read, counters, maps] => (tag, read, None, counters, maps),
        [tag, read, qualities, counters, maps] => (tag, read, Some(qualities), counters, maps),
        _ => return Err(GemError::malformed(line, "unexpected field layout")),
    };

    if tag.is_empty() {
        return Err(GemError::malformed(line, "empty tag"));
    }

    let reads = parse_reads(read_field, quality_field)?;
    let (counters, mcs) = parse_counters(counters_field)?;
    let maps = parse_maps(maps_field, reads.len(), max_maps)?;

    Ok(Template::new(tag.to_string(), reads, counters, mcs, maps))
}

fn parse_reads(read_field: &str, quality_field: Option<&str>) -> Result<Vec<ReadEnd>> {
    let sequences: Vec<&str> = read_field.split(' ').collect();

    let Some(quality_field) = quality_field else {
        return Ok(sequences
            .into_iter()
            .map(|s| ReadEnd::new(s.to_string(), None))
            .collect());
    };

    let qualities: Vec<&str> = quality_field.split(' ').collect();
    if qualities.len() != sequences.len() {
        return Err(GemError::malformed(
            quality_field,
            format!(
                "{} quality ends for {} read ends",
                qualities.len(),
                sequences.len()
            ),
        ));
    }

    sequences
        .into_iter()
        .zip(qualities)
        .map(|(sequence, quality)| {
            if sequence.len() != quality.len() {
                return Err(GemError::malformed(
                    quality,
                    format!(
                        "read length ({}) != quality length ({})",
                        sequence.len(),
                        quality.len()
                    ),
                ));
            }
            Ok(ReadEnd::new(sequence.to_string(), Some(quality.to_string())))
        })
        .collect()
}

/// Parse the counters column, returning the counters and the max complete strata.
fn parse_counters(field: &str) -> Result<(Vec<u64>, usize)> {
    if field.is_empty() {
        return Err(GemError::malformed(field, "empty counters"));
    }

    let (complete, rest) = match field.split_once('+') {
        Some((complete, rest)) => (complete, Some(rest)),
        None => (field, None),
    };
    if rest.map_or(false, |r| r.contains('+')) {
        return Err(GemError::malformed(
            field,
            "counters contain more than one '+' separator",
        ));
    }

    let mut counters = complete
        .split(':')
        .map(|c| parse_count(c, "counter"))
        .collect::<Result<Vec<_>>>()?;
    let mcs = counters.len();

    if let Some(rest) = rest {
        for c in rest.split(':') {
            counters.push(parse_count(c, "counter")?);
        }
    }

    Ok((counters, mcs))
}

fn parse_maps(field: &str, num_ends: usize, max_maps: Option<usize>) -> Result<Vec<Mapping>> {
    if field.is_empty() || field == NO_MAPS {
        return Ok(Vec::new());
    }

    let limit = max_maps.unwrap_or(usize::MAX);
    field
        .split(',')
        .take(limit)
        .map(|text| parse_mapping(text, num_ends))
        .collect()
}

fn parse_mapping(text: &str, num_ends: usize) -> Result<Mapping> {
    let (body, score) = match text.split_once(":::") {
        Some((body, score)) => (body, Some(parse_count(score, "score")?)),
        None => (text, None),
    };

    let end_maps: Vec<&str> = body.split("::").collect();
    if end_maps.len() != num_ends {
        return Err(GemError::malformed(
            text,
            format!(
                "mapping places {} read ends, template has {}",
                end_maps.len(),
                num_ends
            ),
        ));
    }

    let mut blocks: Vec<Block> = Vec::with_capacity(num_ends);
    for (end, end_map) in end_maps.into_iter().enumerate() {
        let end_blocks = parse_end_map(end_map, end)?;
        if let (Some(previous), Some(next)) = (blocks.last_mut(), end_blocks.first()) {
            previous.junction = mate_junction(previous, next, text)?;
        }
        blocks.extend(end_blocks);
    }

    Ok(Mapping { blocks, score })
}

/// Junction from the last block of one mate to the first block of the next
fn mate_junction(previous: &Block, next: &Block, text: &str) -> Result<Junction> {
    if previous.sequence_name != next.sequence_name {
        return Ok(Junction::insert(-1));
    }
    let start = i64::try_from(next.position).map_err(|_| out_of_range(text))?;
    let end = i64::try_from(previous.end_position()).map_err(|_| out_of_range(text))?;
    let gap = start.checked_sub(end).ok_or_else(|| out_of_range(text))?;
    Ok(Junction::insert(gap))
}

fn parse_end_map(text: &str, end: usize) -> Result<Vec<Block>> {
    let mut parts = text.rsplitn(4, ':');
    let (Some(mismatches), Some(position), Some(strand), Some(name)) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(GemError::malformed(text, format!("truncated block '{}'", text)));
    };
    if name.is_empty() {
        return Err(GemError::malformed(text, "block without sequence name"));
    }

    let strand = Strand::from_str(strand)?;
    let position = parse_count(position, "position")?;
    let first = Block {
        end,
        sequence_name: name.to_string(),
        strand,
        position,
        reference_span: 0,
        mismatches: Vec::new(),
        junction: Junction::NONE,
    };

    parse_mismatch_string(mismatches, first)
}

/// Walk a mismatch string, filling `current` and starting a new block at every splice.
fn parse_mismatch_string(text: &str, mut current: Block) -> Result<Vec<Block>> {
    if text.is_empty() {
        return Err(GemError::malformed(text, "empty mismatch string"));
    }

    let bytes = text.as_bytes();
    let mut blocks = Vec::new();
    let mut offset: u64 = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'0'..=b'9' => {
                let (n, next) = read_number(text, i)?;
                offset = add(offset, n, text)?;
                current.reference_span = add(current.reference_span, n, text)?;
                i = next;
            }
            b'A' | b'C' | b'G' | b'T' | b'N' | b'a' | b'c' | b'g' | b't' | b'n' => {
                let base = bytes[i].to_ascii_uppercase();
                current
                    .mismatches
                    .push(Mismatch::new(offset, MismatchKind::Substitution(base)));
                offset = add(offset, 1, text)?;
                current.reference_span = add(current.reference_span, 1, text)?;
                i += 1;
            }
            b'>' => {
                let (n, next) = read_number(text, i + 1)?;
                match bytes.get(next) {
                    Some(b'+') => {
                        current
                            .mismatches
                            .push(Mismatch::new(offset, MismatchKind::Deletion(n)));
                        current.reference_span = add(current.reference_span, n, text)?;
                    }
                    Some(b'-') => {
                        current
                            .mismatches
                            .push(Mismatch::new(offset, MismatchKind::Insertion(n)));
                        offset = add(offset, n, text)?;
                    }
                    Some(b'*') => {
                        if i64::try_from(n).is_err() {
                            return Err(out_of_range(text));
                        }
                        let next_block = Block {
                            position: add(block_end(&current, text)?, n, text)?,
                            reference_span: 0,
                            mismatches: Vec::new(),
                            junction: Junction::NONE,
                            sequence_name: current.sequence_name.clone(),
                            ..current
                        };
                        current.junction = Junction::splice(n);
                        blocks.push(std::mem::replace(&mut current, next_block));
                    }
                    Some(&other) => {
                        return Err(GemError::malformed(
                            text,
                            format!("unknown skip type '{}'", other as char),
                        ));
                    }
                    None => {
                        return Err(GemError::malformed(text, "truncated skip"));
                    }
                }
                i = next + 1;
            }
            b'(' => {
                let (n, next) = read_number(text, i + 1)?;
                if bytes.get(next) != Some(&b')') {
                    return Err(GemError::malformed(text, "unterminated '(' in mismatch string"));
                }
                current
                    .mismatches
                    .push(Mismatch::new(offset, MismatchKind::Skip(n)));
                offset = add(offset, n, text)?;
                i = next + 1;
            }
            other => {
                return Err(GemError::malformed(
                    text,
                    format!("unexpected character '{}' in mismatch string", other as char),
                ));
            }
        }
    }

    if !blocks.is_empty() && current.reference_span == 0 && current.mismatches.is_empty() {
        return Err(GemError::malformed(text, "splice at end of mismatch string"));
    }
    block_end(&current, text)?;
    blocks.push(current);

    Ok(blocks)
}

fn out_of_range(text: &str) -> GemError {
    GemError::malformed(text, "value out of range")
}

fn add(value: u64, by: u64, text: &str) -> Result<u64> {
    value.checked_add(by).ok_or_else(|| out_of_range(text))
}

/// End position of a block, rejecting blocks that run past `u64::MAX`
fn block_end(block: &Block, text: &str) -> Result<u64> {
    add(block.position, block.reference_span, text)
}

/// Read the decimal number starting at `start`; returns it and the index after it.
fn read_number(text: &str, start: usize) -> Result<(u64, usize)> {
    let digits = text
        .get(start..)
        .map_or(0, |rest| rest.bytes().take_while(u8::is_ascii_digit).count());
    if digits == 0 {
        return Err(GemError::malformed(
            text,
            format!("expected a number at offset {} of '{}'", start, text),
        ));
    }
    let end = start + digits;
    Ok((parse_count(&text[start..end], "length")?, end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::JunctionKind;

    const FIRST_TAG: &str = "HWI-ST661:153:D0FTJACXX:2:1102:13924:124292 1:N:0:GCCAAT";

    fn reason_of(result: Result<Template>) -> String {
        match result {
            Err(GemError::MalformedRecord { reason, .. }) => reason,
            other => panic!("expected a malformed record, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_unmapped_with_qualities() {
        let line = format!("{}\tACGTACGT\tIIIIIIII\t0:0+0\t-", FIRST_TAG);
        let t = parse_template(&line).unwrap();

        assert_eq!(t.tag(), FIRST_TAG);
        assert_eq!(t.num_blocks(), 1);
        assert_eq!(t.counters().len(), 3);
        assert_eq!(t.mcs(), 2);
        assert_eq!(t.level(), -1);
        assert_eq!(t.num_maps(), 0);
        assert_eq!(t.reads()[0].qualities.as_deref(), Some("IIIIIIII"));
    }

    #[test]
    fn test_parse_without_qualities() {
        let t = parse_template("r1\tACGTACGTAC\t1\tchr1:+:100:10").unwrap();
        assert_eq!(t.reads()[0].qualities, None);
        assert_eq!(t.mcs(), 1);
        assert_eq!(t.level(), 0);

        let block = t.alignments().next().unwrap();
        assert_eq!(block.sequence_name, "chr1");
        assert_eq!(block.strand, Strand::Forward);
        assert_eq!(block.position, 100);
        assert_eq!(block.reference_span, 10);
        assert!(block.is_perfect());
        assert_eq!(block.junction, Junction::NONE);
    }

    #[test]
    fn test_parse_mismatch_tokens() {
        let t = parse_template("r1\tACGTACGTACGTAC\t0:0:0:1\tchr2:-:50:(2)3a2>2+1>1-3").unwrap();
        let block = t.alignments().next().unwrap();

        assert_eq!(
            block.mismatches,
            vec![
                Mismatch::new(0, MismatchKind::Skip(2)),
                Mismatch::new(5, MismatchKind::Substitution(b'A')),
                Mismatch::new(8, MismatchKind::Deletion(2)),
                Mismatch::new(9, MismatchKind::Insertion(1)),
            ]
        );
        assert_eq!(block.mismatch_count(), 3);
        // 3 + 1 + 2 + 2 (deletion) + 1 + 3 reference bases
        assert_eq!(block.reference_span, 12);
        assert_eq!(t.maps()[0].distance(), 3);
    }

    #[test]
    fn test_parse_paired_split_map() {
        let line = "pair\tACGTACGTAC TTTTTGGGGG\tIIIIIIIIII IIIIIIIIII\t0:1\t\
                    chr7:+:1000:4>334*6::chr7:-:1409:10:::254,\
                    chr7:+:5000:10::chr9:-:100:3C6";
        let t = parse_template(line).unwrap();

        assert!(t.is_paired());
        assert_eq!(t.num_maps(), 2);

        let first = &t.maps()[0];
        assert_eq!(first.score, Some(254));
        assert!(first.is_split());
        assert_eq!(first.num_ends(), 2);
        let kinds: Vec<_> = first.blocks.iter().map(|b| b.junction.kind).collect();
        assert_eq!(
            kinds,
            vec![JunctionKind::Splice, JunctionKind::Insert, JunctionKind::NoJunction]
        );
        let distances: Vec<_> = first.blocks.iter().map(|b| b.junction.distance).collect();
        assert_eq!(distances, vec![334, 65, -1]);
        assert_eq!(first.blocks[1].position, 1338);
        assert_eq!(first.blocks[1].end, 0);
        assert_eq!(first.blocks[2].end, 1);
        assert_eq!(first.end_strand(1), Some(Strand::Reverse));

        // mates on different sequences have no insert distance
        let second = &t.maps()[1];
        assert_eq!(second.score, None);
        assert_eq!(second.blocks[0].junction, Junction::insert(-1));
        assert_eq!(second.distance(), 1);
    }

    #[test]
    fn test_sequence_name_with_colon() {
        let t = parse_template("r1\tACGT\t1\tHLA-A*01:01:+:7:4").unwrap();
        let block = t.alignments().next().unwrap();
        assert_eq!(block.sequence_name, "HLA-A*01:01");
        assert_eq!(block.position, 7);
    }

    #[test]
    fn test_max_maps_limit() {
        let line = "r1\tACGT\t0:3\tchr1:+:1:1A2,chr1:+:9:2C1,chr2:-:4:T3";
        let t = parse_template_with_limit(line, Some(2)).unwrap();
        assert_eq!(t.num_maps(), 2);
        // counters are kept as read
        assert_eq!(t.counters(), &[0, 3]);
        assert_eq!(t.level(), 1);

        let none = parse_template_with_limit(line, Some(0)).unwrap();
        assert_eq!(none.num_maps(), 0);
    }

    #[test]
    fn test_wrong_field_count() {
        let reason = reason_of(parse_template("r1\tACGT\t1"));
        assert_eq!(reason, "expected 4 or 5 fields, found 3");
        assert!(parse_template("a\tb\tc\td\te\tf").is_err());
    }

    #[test]
    fn test_error_carries_whole_line() {
        let line = "r1\tACGT\t1:x\tchr1:+:1:4";
        match parse_template(line) {
            Err(GemError::MalformedRecord { line: n, record, .. }) => {
                assert_eq!(n, 0);
                assert_eq!(record, line);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_bad_counters() {
        assert!(parse_template("r1\tACGT\t\tchr1:+:1:4").is_err());
        assert!(parse_template("r1\tACGT\t1::2\tchr1:+:1:4").is_err());
        assert!(parse_template("r1\tACGT\t1+2+3\tchr1:+:1:4").is_err());
        assert!(parse_template("r1\tACGT\t-1\tchr1:+:1:4").is_err());
    }

    #[test]
    fn test_truncated_block() {
        let reason = reason_of(parse_template("r1\tACGT\t1\tchr1:+:100"));
        assert!(reason.contains("truncated block"), "{}", reason);

        assert!(parse_template("r1\tACGT\t1\t:+:100:4").is_err());
        assert!(parse_template("r1\tACGT\t1\tchr1:+:100:").is_err());
        assert!(parse_template("r1\tACGT\t1\tchr1:+:1:2>3").is_err());
        assert!(parse_template("r1\tACGT\t1\tchr1:+:1:2>*2").is_err());
        assert!(parse_template("r1\tACGT\t1\tchr1:+:1:(2").is_err());
        assert!(parse_template("r1\tACGT\t1\tchr1:+:1:4>10*").is_err());
    }

    #[test]
    fn test_bad_block_fields() {
        assert!(parse_template("r1\tACGT\t1\tchr1:x:1:4").is_err());
        assert!(parse_template("r1\tACGT\t1\tchr1:+:one:4").is_err());
        assert!(parse_template("r1\tACGT\t1\tchr1:+:1:4Z").is_err());
        assert!(parse_template("r1\tACGT\t1\tchr1:+:1:2>3?1").is_err());
        assert!(parse_template("r1\tACGT\t1\tchr1:+:1:4:::high").is_err());
    }

    #[test]
    fn test_coordinates_out_of_range() {
        let lines = [
            "r\tACGT\t1\tchr1:+:1:18446744073709551615A",
            "r\tACGT\t1\tchr1:+:18446744073709551615:4",
            "r\tACGT ACGT\t1\tchr1:+:18446744073709551615:4::chr1:-:10:4",
            "r\tACGT ACGT\t1\tchr1:+:9223372036854775808:0::chr1:-:10:4",
            "r\tACGT\t1\tchr1:+:18446744073709551615:2>5*2",
            "r\tACGT\t1\tchr1:+:1:2>9223372036854775808*2",
            "r\tACGT\t1\tchr1:+:1:2>18446744073709551614+2",
            "r\tACGT\t1\tchr1:+:1:2(18446744073709551615)",
        ];
        for line in lines {
            assert_eq!(reason_of(parse_template(line)), "value out of range", "{}", line);
        }

        // the largest splice distance that still fits is accepted
        let t = parse_template("r\tACGT\t1\tchr1:+:1:2>9223372036854775807*2").unwrap();
        assert_eq!(t.maps()[0].blocks[0].junction.distance, i64::MAX);
    }

    #[test]
    fn test_end_count_mismatch() {
        let reason = reason_of(parse_template("r1\tACGT TTTT\t1\tchr1:+:1:4"));
        assert_eq!(reason, "mapping places 1 read ends, template has 2");
    }

    #[test]
    fn test_quality_mismatch() {
        assert!(parse_template("r1\tACGT\tIII\t1\tchr1:+:1:4").is_err());
        assert!(parse_template("r1\tACGT TTTT\tIIII\t1\t-").is_err());
    }

    #[test]
    fn test_empty_tag() {
        assert!(parse_template("\tACGT\t1\tchr1:+:1:4").is_err());
    }

    use proptest::prelude::*;

    proptest! {
        #[test]
        fn test_counters_roundtrip(
            counters in proptest::collection::vec(0u64..1000, 1..50),
            split in 0usize..50,
        ) {
            let split = split.min(counters.len());
            let text: Vec<String> = counters.iter().map(|c| c.to_string()).collect();
            let field = if split == counters.len() {
                text.join(":")
            } else if split == 0 {
                // '+' needs a counter on its left
                text.join(":")
            } else {
                format!("{}+{}", text[..split].join(":"), text[split..].join(":"))
            };
            let line = format!("r\tACGT\t{}\t-", field);
            let t = parse_template(&line).unwrap();
            prop_assert_eq!(t.counters(), &counters[..]);
            let expected_mcs = if split == 0 { counters.len() } else { split };
            prop_assert_eq!(t.mcs(), expected_mcs);
        }

        #[test]
        fn test_substitutions_counted(
            runs in proptest::collection::vec((1u64..20, "[ACGT]"), 0..10),
            tail in 1u64..20,
        ) {
            let mut cigar = String::new();
            for (run, base) in &runs {
                cigar.push_str(&run.to_string());
                cigar.push_str(base);
            }
            cigar.push_str(&tail.to_string());
            let line = format!("r\tACGT\t0:1\tchr1:+:1:{}", cigar);

            let t = parse_template(&line).unwrap();
            let block = t.alignments().next().unwrap();
            prop_assert_eq!(block.mismatch_count(), runs.len());
            let span: u64 = runs.iter().map(|(r, _)| r + 1).sum::<u64>() + tail;
            prop_assert_eq!(block.reference_span, span);
        }
    }
}
