//! Round-robin merging of several streams
//!
//! [`interleave`] takes one element from each stream in turn:
//! `s1[0], s2[0], ..., sn[0], s1[1], s2[1], ...`. The first pull that finds
//! any stream exhausted ends the whole interleave, so with unequal lengths
//! the output stops inside the round where the shortest stream ran out.
//! Elements of that round pulled before the exhausted stream are still
//! yielded; streams after it are not pulled again.
//!
//! Typical use is pairing two map files whose records correspond line by
//! line (first and second mates mapped separately):
//!
//! ```no_run
//! use gemtools::operations::interleave;
//! use gemtools::InputFile;
//!
//! # fn main() -> gemtools::Result<()> {
//! let first = InputFile::open("sample_1.map.gz");
//! let second = InputFile::open("sample_2.map.gz");
//!
//! for template in interleave(vec![first.templates(), second.templates()]) {
//!     let template = template?;
//!     println!("{}", template.tag());
//! }
//! # Ok(())
//! # }
//! ```

use log::debug;

/// Round-robin iterator returned by [`interleave`]
pub struct Interleave<I> {
    streams: Vec<I>,
    current: usize,
    emitted: usize,
}

/// Interleave `streams` element by element
///
/// Works on any iterator type; for `Result` items, errors are yielded at the
/// position they were pulled. An empty list yields nothing.
pub fn interleave<I: Iterator>(streams: Vec<I>) -> Interleave<I> {
    Interleave {
        streams,
        current: 0,
        emitted: 0,
    }
}

impl<I> Interleave<I> {
    /// Number of input streams still attached (0 once finished)
    pub fn num_streams(&self) -> usize {
        self.streams.len()
    }

    /// Elements yielded so far
    pub fn emitted(&self) -> usize {
        self.emitted
    }
}

impl<I: Iterator> Iterator for Interleave<I> {
    type Item = I::Item;

    fn next(&mut self) -> Option<Self::Item> {
        let stream = self.streams.get_mut(self.current)?;

        match stream.next() {
            Some(item) => {
                self.current = (self.current + 1) % self.streams.len();
                self.emitted += 1;
                Some(item)
            }
            None => {
                debug!(
                    "Interleave stopped: stream {} exhausted after {} elements",
                    self.current, self.emitted
                );
                // drops the remaining streams and their file handles
                self.streams.clear();
                self.current = 0;
                None
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.streams.is_empty() {
            return (0, Some(0));
        }
        let n = self.streams.len();
        // the run ends when some stream is pulled while empty
        let upper = self
            .streams
            .iter()
            .enumerate()
            .filter_map(|(i, s)| {
                let remaining = s.size_hint().1?;
                let pulls_before = (i + n - self.current) % n;
                Some(remaining.saturating_mul(n).saturating_add(pulls_before))
            })
            .min();
        (0, upper)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{GemError, Result};
    use proptest::prelude::*;

    #[test]
    fn test_alternates_equal_lengths() {
        let out: Vec<i32> =
            interleave(vec![vec![1, 3, 5].into_iter(), vec![2, 4, 6].into_iter()]).collect();
        assert_eq!(out, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_three_streams() {
        let out: Vec<&str> = interleave(vec![
            vec!["a1", "a2"].into_iter(),
            vec!["b1", "b2"].into_iter(),
            vec!["c1", "c2"].into_iter(),
        ])
        .collect();
        assert_eq!(out, vec!["a1", "b1", "c1", "a2", "b2", "c2"]);
    }

    #[test]
    fn test_shortest_stream_terminates() {
        // first stream longer: stops when the second runs dry
        let out: Vec<i32> =
            interleave(vec![vec![1, 3, 5].into_iter(), vec![2].into_iter()]).collect();
        assert_eq!(out, vec![1, 2, 3]);

        // first stream shorter: stops at the start of the round
        let out: Vec<i32> =
            interleave(vec![vec![1].into_iter(), vec![2, 4, 6].into_iter()]).collect();
        assert_eq!(out, vec![1, 2]);
    }

    #[test]
    fn test_stays_finished() {
        let mut it = interleave(vec![Vec::<i32>::new().into_iter(), vec![1].into_iter()]);
        assert_eq!(it.next(), None);
        assert_eq!(it.num_streams(), 0);
        assert_eq!(it.next(), None);
    }

    #[test]
    fn test_empty_list() {
        let mut it = interleave(Vec::<std::vec::IntoIter<i32>>::new());
        assert_eq!(it.next(), None);
        assert_eq!(it.size_hint(), (0, Some(0)));
    }

    #[test]
    fn test_errors_in_position() {
        let a: Vec<Result<u32>> = vec![Ok(1), Err(GemError::InvalidFilter("x".into()))];
        let b: Vec<Result<u32>> = vec![Ok(2), Ok(4)];
        let out: Vec<Result<u32>> = interleave(vec![a.into_iter(), b.into_iter()]).collect();
        assert_eq!(out.len(), 4);
        assert!(out[2].is_err());
        assert_eq!(*out[3].as_ref().unwrap(), 4);
    }

    proptest! {
        #[test]
        fn test_equal_length_yields_both_in_order(
            a in prop::collection::vec(any::<u16>(), 0..50),
        ) {
            let b: Vec<u16> = a.iter().map(|x| x.wrapping_add(1)).collect();
            let out: Vec<u16> =
                interleave(vec![a.clone().into_iter(), b.clone().into_iter()]).collect();

            prop_assert_eq!(out.len(), a.len() * 2);
            for (i, pair) in out.chunks(2).enumerate() {
                prop_assert_eq!(pair[0], a[i]);
                prop_assert_eq!(pair[1], b[i]);
            }
        }

        #[test]
        fn test_length_bounded_by_shortest(
            lens in prop::collection::vec(0usize..10, 1..5),
        ) {
            let streams: Vec<_> = lens
                .iter()
                .map(|&n| (0..n).collect::<Vec<_>>().into_iter())
                .collect();
            let out = interleave(streams).count();

            let n = lens.len();
            let min = *lens.iter().min().unwrap();
            let first_short = lens.iter().position(|&l| l == min).unwrap();
            prop_assert_eq!(out, min * n + first_short);
        }
    }
}
