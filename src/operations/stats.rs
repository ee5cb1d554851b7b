//! Summary statistics over a template stream
//!
//! [`MapStats`] is a plain accumulator: feed it templates with
//! [`MapStats::update`], combine partial results with [`MapStats::merge`].
//! In best-map mode only the best mapping of each template (lowest distance,
//! first in file order on ties) is profiled; template-level counts are the
//! same in both modes.

use crate::error::Result;
use crate::types::{Mapping, MismatchKind, Template};
use std::collections::BTreeMap;
use std::fmt;

/// Insert sizes are histogrammed in bins of this width
pub const INSERT_SIZE_BIN: i64 = 100;

/// Counters collected from a stream of templates
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MapStats {
    best_map_only: bool,

    /// Templates seen
    pub templates: u64,
    /// Read ends seen (2 per paired template)
    pub read_ends: u64,
    /// Templates with at least one alignment in their counters
    pub mapped: u64,
    /// Templates with level -1
    pub unmapped: u64,
    /// Templates with level 0
    pub unique: u64,

    /// Mappings profiled
    pub mappings: u64,
    /// Blocks in profiled mappings
    pub blocks: u64,
    /// Profiled mappings containing a splice
    pub split_mappings: u64,
    /// Profiled mappings placing both ends of a pair
    pub paired_mappings: u64,

    /// Substitutions in profiled mappings
    pub substitutions: u64,
    /// Insertions in profiled mappings
    pub insertions: u64,
    /// Deletions in profiled mappings
    pub deletions: u64,
    /// Skipped (trimmed) stretches in profiled mappings
    pub skips: u64,

    /// Templates per uniqueness level
    pub levels: BTreeMap<i64, u64>,
    /// Paired mappings per insert-size bin (bin start, width [`INSERT_SIZE_BIN`])
    pub insert_sizes: BTreeMap<i64, u64>,
}

impl MapStats {
    /// Empty statistics; `best_map_only` profiles one mapping per template
    pub fn new(best_map_only: bool) -> Self {
        Self {
            best_map_only,
            ..Self::default()
        }
    }

    /// Returns `true` if only the best mapping of each template is profiled
    pub fn best_map_only(&self) -> bool {
        self.best_map_only
    }

    /// Collect statistics over a whole stream
    ///
    /// Stops at the first error.
    pub fn from_stream<I>(stream: I, best_map_only: bool) -> Result<Self>
    where
        I: IntoIterator<Item = Result<Template>>,
    {
        let mut stats = Self::new(best_map_only);
        for template in stream {
            stats.update(&template?);
        }
        Ok(stats)
    }

    /// Account for one template
    pub fn update(&mut self, template: &Template) {
        self.templates += 1;
        self.read_ends += template.num_blocks() as u64;

        let level = template.level();
        *self.levels.entry(level).or_insert(0) += 1;
        if template.is_unmapped() {
            self.unmapped += 1;
        } else {
            self.mapped += 1;
        }
        if level == 0 {
            self.unique += 1;
        }

        if self.best_map_only {
            if let Some(best) = template.best_mapping() {
                self.profile(best);
            }
        } else {
            for mapping in template.maps() {
                self.profile(mapping);
            }
        }
    }

    fn profile(&mut self, mapping: &Mapping) {
        self.mappings += 1;
        self.blocks += mapping.blocks.len() as u64;
        if mapping.is_split() {
            self.split_mappings += 1;
        }

        if mapping.num_ends() > 1 {
            self.paired_mappings += 1;
            if let Some(size) = mapping.insert_size() {
                let bin = size.div_euclid(INSERT_SIZE_BIN) * INSERT_SIZE_BIN;
                *self.insert_sizes.entry(bin).or_insert(0) += 1;
            }
        }

        for mismatch in mapping.blocks.iter().flat_map(|b| b.mismatches.iter()) {
            match mismatch.kind {
                MismatchKind::Substitution(_) => self.substitutions += 1,
                MismatchKind::Insertion(_) => self.insertions += 1,
                MismatchKind::Deletion(_) => self.deletions += 1,
                MismatchKind::Skip(_) => self.skips += 1,
            }
        }
    }

    /// Add the counts of `other` to these
    pub fn merge(&mut self, other: &MapStats) {
        self.templates += other.templates;
        self.read_ends += other.read_ends;
        self.mapped += other.mapped;
        self.unmapped += other.unmapped;
        self.unique += other.unique;
        self.mappings += other.mappings;
        self.blocks += other.blocks;
        self.split_mappings += other.split_mappings;
        self.paired_mappings += other.paired_mappings;
        self.substitutions += other.substitutions;
        self.insertions += other.insertions;
        self.deletions += other.deletions;
        self.skips += other.skips;
        for (level, count) in &other.levels {
            *self.levels.entry(*level).or_insert(0) += count;
        }
        for (bin, count) in &other.insert_sizes {
            *self.insert_sizes.entry(*bin).or_insert(0) += count;
        }
    }

    /// Fraction of templates that are mapped (0 when empty)
    pub fn mapped_fraction(&self) -> f64 {
        if self.templates == 0 {
            0.0
        } else {
            self.mapped as f64 / self.templates as f64
        }
    }
}

fn percent(count: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        100.0 * count as f64 / total as f64
    }
}

impl fmt::Display for MapStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[GENERAL.STATS]")?;
        writeln!(f, "  Templates     {}", self.templates)?;
        writeln!(f, "  Read ends     {}", self.read_ends)?;
        writeln!(
            f,
            "  Mapped        {} ({:.2}%)",
            self.mapped,
            percent(self.mapped, self.templates)
        )?;
        writeln!(
            f,
            "  Unmapped      {} ({:.2}%)",
            self.unmapped,
            percent(self.unmapped, self.templates)
        )?;
        writeln!(
            f,
            "  Unique        {} ({:.2}%)",
            self.unique,
            percent(self.unique, self.templates)
        )?;

        let mode = if self.best_map_only { "BEST" } else { "ALL" };
        writeln!(f, "[MAPS.PROFILE.{}]", mode)?;
        writeln!(f, "  Mappings      {}", self.mappings)?;
        writeln!(f, "  Blocks        {}", self.blocks)?;
        writeln!(f, "  Split         {}", self.split_mappings)?;
        writeln!(f, "  Paired        {}", self.paired_mappings)?;
        writeln!(f, "  Substitutions {}", self.substitutions)?;
        writeln!(f, "  Insertions    {}", self.insertions)?;
        writeln!(f, "  Deletions     {}", self.deletions)?;
        writeln!(f, "  Skips         {}", self.skips)?;

        writeln!(f, "[LEVELS]")?;
        for (level, count) in &self.levels {
            writeln!(f, "  {:>4}  {}", level, count)?;
        }

        if !self.insert_sizes.is_empty() {
            writeln!(f, "[INSERT.SIZE]")?;
            for (bin, count) in &self.insert_sizes {
                writeln!(f, "  [{}, {})  {}", bin, bin + INSERT_SIZE_BIN, count)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::map::parse_template;

    const LINES: &[&str] = &[
        "a\tACGTACGT\t0:0\t-",
        "b\tACGTACGT\t1:1\tchr1:+:10:8,chr1:+:90:3A4",
        "c\tACGTACGT\t0:2\tchr2:-:5:1>2-5,chr2:+:50:(2)2>1+4",
        "d\tACGT TTTT\t1\tchr1:+:100:2>20*2::chr1:-:350:4",
    ];

    fn stream() -> Vec<Result<Template>> {
        LINES.iter().map(|l| parse_template(l)).collect()
    }

    #[test]
    fn test_all_maps() {
        let stats = MapStats::from_stream(stream(), false).unwrap();

        assert_eq!(stats.templates, 4);
        assert_eq!(stats.read_ends, 5);
        assert_eq!(stats.mapped, 3);
        assert_eq!(stats.unmapped, 1);
        assert_eq!(stats.unique, 2);
        assert_eq!(stats.mappings, 5);
        // d: two blocks for the spliced first end plus one for the mate
        assert_eq!(stats.blocks, 7);
        assert_eq!(stats.split_mappings, 1);
        assert_eq!(stats.paired_mappings, 1);
        assert_eq!(stats.substitutions, 1);
        assert_eq!(stats.insertions, 1);
        assert_eq!(stats.deletions, 1);
        assert_eq!(stats.skips, 1);
        assert_eq!(stats.levels.get(&-1), Some(&1));
        assert_eq!(stats.levels.get(&0), Some(&2));
        assert_eq!(stats.levels.get(&1), Some(&1));
        // 100..354
        assert_eq!(stats.insert_sizes.get(&200), Some(&1));
    }

    #[test]
    fn test_best_map_only() {
        let stats = MapStats::from_stream(stream(), true).unwrap();

        assert_eq!(stats.templates, 4);
        assert_eq!(stats.mappings, 3);
        assert_eq!(stats.substitutions, 0);
        // c: both mappings have distance 1, the first one wins
        assert_eq!(stats.insertions, 1);
        assert_eq!(stats.deletions, 0);
    }

    #[test]
    fn test_merge_matches_single_pass() {
        let whole = MapStats::from_stream(stream(), false).unwrap();

        let mut left = MapStats::from_stream(stream().into_iter().take(2), false).unwrap();
        let right = MapStats::from_stream(stream().into_iter().skip(2), false).unwrap();
        left.merge(&right);

        assert_eq!(left, whole);
    }

    #[test]
    fn test_stops_at_error() {
        let input = vec![
            parse_template("a\tACGT\t1\tchr1:+:1:4"),
            parse_template("broken"),
        ];
        assert!(MapStats::from_stream(input, false).is_err());
    }

    #[test]
    fn test_display_sections() {
        let text = MapStats::from_stream(stream(), true).unwrap().to_string();
        assert!(text.contains("[GENERAL.STATS]"));
        assert!(text.contains("[MAPS.PROFILE.BEST]"));
        assert!(text.contains("[INSERT.SIZE]"));
        assert!(MapStats::new(false).to_string().contains("[MAPS.PROFILE.ALL]"));
    }

    #[test]
    fn test_mapped_fraction() {
        assert_eq!(MapStats::new(false).mapped_fraction(), 0.0);
        let stats = MapStats::from_stream(stream(), false).unwrap();
        assert!((stats.mapped_fraction() - 0.75).abs() < 1e-9);
    }
}
