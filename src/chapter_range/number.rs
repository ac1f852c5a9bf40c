use std::{fmt, str::FromStr};

use thiserror::Error;

/// Number of fixed-point units in one whole chapter.
const SCALE: u64 = 1000;
const FRACTION_DIGITS: usize = 3;

/// A non-negative chapter number such as `10` or `10.5`.
///
/// Stored as fixed-point thousandths so `10`, `10.0` and `10.000` are the same
/// chapter and interval arithmetic never drifts.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChapterNumber(u64);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseChapterNumberError {
    #[error("empty chapter number")]
    Empty,
    #[error("chapter numbers can not be negative: {0:?}")]
    Negative(String),
    #[error("{0:?} is not a number")]
    NotANumber(String),
    #[error("{0:?} has more than {FRACTION_DIGITS} decimal places")]
    TooPrecise(String),
    #[error("{0:?} is too large")]
    TooLarge(String),
}

impl ChapterNumber {
    pub const ZERO: ChapterNumber = ChapterNumber(0);

    pub const fn whole(chapter: u64) -> Self {
        Self(chapter * SCALE)
    }

    /// Builds a chapter from thousandths, `from_thousandths(10_500)` is `10.5`.
    pub const fn from_thousandths(thousandths: u64) -> Self {
        Self(thousandths)
    }

    pub fn is_whole(self) -> bool {
        self.0 % SCALE == 0
    }

    pub fn floor(self) -> Self {
        Self(self.0 - self.0 % SCALE)
    }

    pub fn ceil(self) -> Self {
        if self.is_whole() {
            self
        } else {
            Self(self.floor().0.saturating_add(SCALE))
        }
    }

    pub fn next(self) -> Self {
        Self(self.0.saturating_add(SCALE))
    }

    /// One chapter before, stopping at zero.
    pub fn previous(self) -> Self {
        Self(self.0.saturating_sub(SCALE))
    }
}

impl fmt::Display for ChapterNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / SCALE;
        let fraction = self.0 % SCALE;
        if fraction == 0 {
            return write!(f, "{}", whole);
        }
        let digits = format!("{:0width$}", fraction, width = FRACTION_DIGITS);
        write!(f, "{}.{}", whole, digits.trim_end_matches('0'))
    }
}

impl fmt::Debug for ChapterNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

impl FromStr for ChapterNumber {
    type Err = ParseChapterNumberError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim();
        if value.is_empty() {
            return Err(ParseChapterNumberError::Empty);
        }
        if value.starts_with('-') {
            return Err(ParseChapterNumberError::Negative(value.to_string()));
        }
        let unsigned = value.strip_prefix('+').unwrap_or(value);

        let (whole, fraction) = match unsigned.split_once('.') {
            Some((whole, fraction)) => (whole, fraction),
            None => (unsigned, ""),
        };
        let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if (whole.is_empty() && fraction.is_empty()) || !all_digits(whole) || !all_digits(fraction)
        {
            return Err(ParseChapterNumberError::NotANumber(value.to_string()));
        }

        let fraction = fraction.trim_end_matches('0');
        if fraction.len() > FRACTION_DIGITS {
            return Err(ParseChapterNumberError::TooPrecise(value.to_string()));
        }

        let too_large = || ParseChapterNumberError::TooLarge(value.to_string());
        let whole: u64 = match whole.trim_start_matches('0') {
            "" => 0,
            digits => digits.parse().map_err(|_| too_large())?,
        };
        let fraction: u64 = if fraction.is_empty() {
            0
        } else {
            // Pad to thousandths: ".5" is 500, ".25" is 250.
            format!("{:0<width$}", fraction, width = FRACTION_DIGITS)
                .parse()
                .map_err(|_| too_large())?
        };

        whole
            .checked_mul(SCALE)
            .and_then(|units| units.checked_add(fraction))
            .map(ChapterNumber)
            .ok_or_else(too_large)
    }
}

impl TryFrom<f64> for ChapterNumber {
    type Error = ParseChapterNumberError;

    /// Converts the numbers found in JSON payloads. `f64` formats with its
    /// shortest round-trip representation, so `10.5` stays exactly `10.5`.
    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if !value.is_finite() {
            return Err(ParseChapterNumberError::NotANumber(value.to_string()));
        }
        value.to_string().parse()
    }
}

impl From<u32> for ChapterNumber {
    fn from(value: u32) -> Self {
        Self::whole(value.into())
    }
}
