//! Template filters
//!
//! [`unique`] and [`unmapped`] drop whole templates; [`filter_maps`] keeps
//! every template but prunes its mapping list. All three are lazy adapters
//! over `Result<Template>` streams: order is preserved and upstream errors
//! come out at the position they went in.
//!
//! # Example
//!
//! ```no_run
//! use gemtools::operations::{filter_maps, unique, FilterParams};
//! use gemtools::InputFile;
//!
//! # fn main() -> gemtools::Result<()> {
//! let input = InputFile::open("sample.map.gz");
//!
//! for template in unique(input.templates(), 0) {
//!     println!("{}", template?.tag());
//! }
//!
//! let params = FilterParams::new().distance_range(0, 2).max_matches(5);
//! for template in filter_maps(input.templates(), params)? {
//!     let template = template?;
//!     println!("{}\t{:?}", template.tag(), template.counters());
//! }
//! # Ok(())
//! # }
//! ```

use crate::error::{GemError, Result};
use crate::types::{JunctionKind, Mapping, Template};
use std::cmp::Reverse;

/// Stream of templates whose level lies in `0..=max_level`
pub struct Unique<I> {
    inner: I,
    max_level: i64,
}

/// Keep templates that are mapped and at most ambiguous at `max_level`
///
/// `max_level = 0` keeps only uniquely mapped templates. Unmapped templates
/// (level `-1`) are never kept, and a negative `max_level` keeps nothing.
pub fn unique<I>(stream: I, max_level: i64) -> Unique<I::IntoIter>
where
    I: IntoIterator<Item = Result<Template>>,
{
    Unique {
        inner: stream.into_iter(),
        max_level,
    }
}

impl<I> Iterator for Unique<I>
where
    I: Iterator<Item = Result<Template>>,
{
    type Item = Result<Template>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.inner.next()? {
                Ok(template) => {
                    let level = template.level();
                    if (0..=self.max_level).contains(&level) {
                        return Some(Ok(template));
                    }
                }
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

/// Stream of templates with no block within a mismatch budget
pub struct Unmapped<I> {
    inner: I,
    max_mismatches: usize,
}

/// Keep templates none of whose blocks has at most `max_mismatches` edits
///
/// Templates without any mapping are always kept. Raising
/// `max_mismatches` can only shrink the output.
pub fn unmapped<I>(stream: I, max_mismatches: usize) -> Unmapped<I::IntoIter>
where
    I: IntoIterator<Item = Result<Template>>,
{
    Unmapped {
        inner: stream.into_iter(),
        max_mismatches,
    }
}

impl<I> Iterator for Unmapped<I>
where
    I: Iterator<Item = Result<Template>>,
{
    type Item = Result<Template>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.inner.next()? {
                Ok(template) => {
                    let max = self.max_mismatches;
                    if !template.alignments().any(|b| b.mismatch_count() <= max) {
                        return Some(Ok(template));
                    }
                }
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

/// Mapping-level filter configuration
///
/// Every criterion is off by default, so `FilterParams::default()` keeps
/// every mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterParams {
    /// Drop mappings with fewer edit events
    pub min_distance: Option<u64>,
    /// Drop mappings with more edit events
    pub max_distance: Option<u64>,
    /// Drop mappings with a smaller Levenshtein distance
    pub min_levenshtein_distance: Option<u64>,
    /// Drop mappings with a larger Levenshtein distance
    pub max_levenshtein_distance: Option<u64>,
    /// Keep at most this many accepted mappings (best first)
    pub max_matches: Option<usize>,
    /// Drop mappings scored below this (unscored mappings count as 0)
    pub min_score: Option<u64>,
    /// Drop paired mappings whose ends lie on the same strand
    pub filter_by_strand: bool,
    /// Drop paired mappings with a shorter insert
    pub min_insert_size: Option<i64>,
    /// Drop paired mappings with a longer insert
    pub max_insert_size: Option<i64>,
    /// Drop split mappings whose shortest splice junction is shorter
    pub min_intron_length: Option<u64>,
    /// Drop split mappings whose shortest block spans fewer reference bases
    pub min_block_length: Option<u64>,
    /// Keep only the best accepted mapping of templates at least this unique
    ///
    /// Applies when the template's level is in `min_unique_level..`; the
    /// level is taken before filtering.
    pub min_unique_level: Option<i64>,
    /// Leave templates with exactly one mapping untouched
    pub keep_unique: bool,
}

impl FilterParams {
    /// Parameters that accept everything
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept mappings whose distance lies in `min..=max`
    pub fn distance_range(mut self, min: u64, max: u64) -> Self {
        self.min_distance = Some(min);
        self.max_distance = Some(max);
        self
    }

    /// Accept mappings whose Levenshtein distance lies in `min..=max`
    pub fn levenshtein_range(mut self, min: u64, max: u64) -> Self {
        self.min_levenshtein_distance = Some(min);
        self.max_levenshtein_distance = Some(max);
        self
    }

    /// Keep at most `max` mappings per template
    pub fn max_matches(mut self, max: usize) -> Self {
        self.max_matches = Some(max);
        self
    }

    /// Minimum mapping score
    pub fn min_score(mut self, score: u64) -> Self {
        self.min_score = Some(score);
        self
    }

    /// Drop same-strand pairs
    pub fn filter_by_strand(mut self, enabled: bool) -> Self {
        self.filter_by_strand = enabled;
        self
    }

    /// Accept paired mappings whose insert size lies in `min..=max`
    pub fn insert_size_range(mut self, min: i64, max: i64) -> Self {
        self.min_insert_size = Some(min);
        self.max_insert_size = Some(max);
        self
    }

    /// Minimum splice junction distance of split mappings
    pub fn min_intron_length(mut self, length: u64) -> Self {
        self.min_intron_length = Some(length);
        self
    }

    /// Minimum reference span of every block of split mappings
    pub fn min_block_length(mut self, length: u64) -> Self {
        self.min_block_length = Some(length);
        self
    }

    /// Reduce templates with level `>= level` to their best mapping
    pub fn min_unique_level(mut self, level: i64) -> Self {
        self.min_unique_level = Some(level);
        self
    }

    /// Bypass filtering for templates with a single mapping
    pub fn keep_unique(mut self, enabled: bool) -> Self {
        self.keep_unique = enabled;
        self
    }

    /// Reject ranges that can never match
    pub fn validate(&self) -> Result<()> {
        if let (Some(min), Some(max)) = (self.min_distance, self.max_distance) {
            if min > max {
                return Err(GemError::InvalidFilter(format!(
                    "min distance {} > max distance {}",
                    min, max
                )));
            }
        }
        if let (Some(min), Some(max)) =
            (self.min_levenshtein_distance, self.max_levenshtein_distance)
        {
            if min > max {
                return Err(GemError::InvalidFilter(format!(
                    "min levenshtein distance {} > max levenshtein distance {}",
                    min, max
                )));
            }
        }
        if let Some(level) = self.min_unique_level {
            if level < 0 {
                return Err(GemError::InvalidFilter(format!(
                    "min unique level {} is negative",
                    level
                )));
            }
        }
        if let (Some(min), Some(max)) = (self.min_insert_size, self.max_insert_size) {
            if min > max {
                return Err(GemError::InvalidFilter(format!(
                    "min insert size {} > max insert size {}",
                    min, max
                )));
            }
        }
        Ok(())
    }

    /// Returns `true` if `mapping` passes every per-mapping criterion
    pub fn accepts(&self, mapping: &Mapping) -> bool {
        let distance = mapping.distance();
        if self.min_distance.map_or(false, |min| distance < min)
            || self.max_distance.map_or(false, |max| distance > max)
        {
            return false;
        }

        if self.min_levenshtein_distance.is_some() || self.max_levenshtein_distance.is_some() {
            let levenshtein = mapping.levenshtein_distance();
            if self.min_levenshtein_distance.map_or(false, |min| levenshtein < min)
                || self.max_levenshtein_distance.map_or(false, |max| levenshtein > max)
            {
                return false;
            }
        }

        if let Some(min) = self.min_score {
            if mapping.score.unwrap_or(0) < min {
                return false;
            }
        }

        if mapping.is_split() {
            if let Some(min) = self.min_intron_length {
                let shortest = mapping
                    .blocks
                    .iter()
                    .filter(|b| b.junction.kind == JunctionKind::Splice)
                    .map(|b| b.junction.distance)
                    .min();
                if shortest.map_or(false, |d| d < i64::try_from(min).unwrap_or(i64::MAX)) {
                    return false;
                }
            }
            if let Some(min) = self.min_block_length {
                if mapping.blocks.iter().any(|b| b.reference_span < min) {
                    return false;
                }
            }
        }

        if mapping.num_ends() < 2 {
            return true;
        }

        if self.filter_by_strand && mapping.end_strand(0) == mapping.end_strand(1) {
            return false;
        }

        if self.min_insert_size.is_some() || self.max_insert_size.is_some() {
            let Some(size) = mapping.insert_size() else {
                return false;
            };
            if self.min_insert_size.map_or(false, |min| size < min)
                || self.max_insert_size.map_or(false, |max| size > max)
            {
                return false;
            }
        }

        true
    }

    /// Copy of `template` holding only the accepted mappings
    ///
    /// Accepted mappings are ordered by distance, then by descending score
    /// (unscored last), before `max_matches` is applied. Counters are
    /// recalculated from the kept mappings.
    pub fn apply(&self, template: &Template) -> Template {
        if self.keep_unique && template.num_maps() == 1 {
            return template.clone();
        }

        let mut limit = self.max_matches.unwrap_or(usize::MAX);
        if let Some(min) = self.min_unique_level {
            let level = template.level();
            if level >= 0 && level >= min {
                limit = limit.min(1);
            }
        }

        let mut accepted: Vec<&Mapping> =
            template.maps().iter().filter(|m| self.accepts(m)).collect();
        accepted.sort_by_key(|m| (m.distance(), Reverse(m.score)));
        let kept: Vec<Mapping> = accepted.into_iter().take(limit).cloned().collect();

        template.with_maps(kept)
    }
}

/// Stream of templates with their mapping lists pruned
pub struct FilterMaps<I> {
    inner: I,
    params: FilterParams,
}

impl<I> FilterMaps<I> {
    /// Parameters in use
    pub fn params(&self) -> &FilterParams {
        &self.params
    }
}

/// Prune the mappings of every template with `params`
///
/// # Errors
///
/// Returns [`GemError::InvalidFilter`] up front if `params` holds an empty
/// range.
pub fn filter_maps<I>(stream: I, params: FilterParams) -> Result<FilterMaps<I::IntoIter>>
where
    I: IntoIterator<Item = Result<Template>>,
{
    params.validate()?;
    Ok(FilterMaps {
        inner: stream.into_iter(),
        params,
    })
}

impl<I> Iterator for FilterMaps<I>
where
    I: Iterator<Item = Result<Template>>,
{
    type Item = Result<Template>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner
            .next()
            .map(|item| item.map(|template| self.params.apply(&template)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}
