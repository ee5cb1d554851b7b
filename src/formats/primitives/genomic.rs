//! Genomic placement primitives.
//!
//! Map files give every block a strand (`+` or `-`) and a **1-based**
//! position on a named reference sequence. Unlike BED-style formats there is
//! no "unknown" strand: an aligned block always has an orientation.
//!
//! # Examples
//!
//! ```
//! use gemtools::formats::primitives::Strand;
//! use std::str::FromStr;
//!
//! assert_eq!(Strand::from_str("+")?, Strand::Forward);
//! assert_eq!(Strand::from_str("-")?, Strand::Reverse);
//! assert!(Strand::from_str(".").is_err());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use crate::error::{GemError, Result};
use std::fmt;
use std::str::FromStr;

/// Orientation of an aligned block relative to the reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strand {
    /// Plus strand (+)
    Forward,

    /// Minus strand (-)
    Reverse,
}

impl Strand {
    /// Returns `true` for the plus strand.
    #[inline]
    pub fn is_forward(self) -> bool {
        self == Strand::Forward
    }

    /// Single-character representation used in map files.
    #[inline]
    pub fn as_char(self) -> char {
        match self {
            Strand::Forward => '+',
            Strand::Reverse => '-',
        }
    }
}

impl FromStr for Strand {
    type Err = GemError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "+" => Ok(Strand::Forward),
            "-" => Ok(Strand::Reverse),
            _ => Err(GemError::malformed(
                s,
                format!("invalid strand '{}' (expected '+' or '-')", s),
            )),
        }
    }
}

impl fmt::Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strand_from_str() {
        assert_eq!(Strand::from_str("+").unwrap(), Strand::Forward);
        assert_eq!(Strand::from_str("-").unwrap(), Strand::Reverse);

        for bad in [".", "", "F", "++"] {
            let result = Strand::from_str(bad);
            assert!(matches!(result, Err(GemError::MalformedRecord { .. })), "{:?}", bad);
        }
    }

    #[test]
    fn test_strand_display() {
        assert_eq!(Strand::Forward.to_string(), "+");
        assert_eq!(Strand::Reverse.to_string(), "-");
        assert!(Strand::Forward.is_forward());
        assert!(!Strand::Reverse.is_forward());
    }
}
