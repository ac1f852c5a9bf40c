use thiserror::Error;

use super::{interval::merge, ChapterNumber, Interval, IntervalFormat, ParseChapterNumberError};

pub const LAST: &str = "last";

pub const CHAPTERS_FORMAT: &str = "Format: start..end or chapters with commas. \
Example: --chapter 3 will download chapter 3, \
--chapter last will download the last chapter available, \
--chapters 3..last will download chapters from 3 to the last chapter, \
--chapters \"3, 12\" will download chapters 3 and 12, \
--chapters \"3..12, 15\" will download chapters from 3 to 12 and also chapter 15.";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectionError {
    #[error("Invalid chapters format: {token:?}")]
    InvalidFormat {
        token: String,
        #[source]
        source: ParseChapterNumberError,
        hint: &'static str,
    },
}

impl SelectionError {
    pub fn hint(&self) -> &'static str {
        match self {
            SelectionError::InvalidFormat { hint, .. } => hint,
        }
    }
}

/// Parses a selection like `3..last, 15` into merged intervals.
///
/// The separators are the ones `format_intervals` prints with, usually
/// [`IntervalFormat::SELECTION`]. `last` is replaced by the given chapter. A range token may carry any number
/// of boundaries, the smallest one starts the interval and the largest ends it.
/// Any boundary that is not a number fails the whole selection.
pub fn parse_selection(
    selection: &str,
    last: ChapterNumber,
    format: &IntervalFormat,
) -> Result<Vec<Interval>, SelectionError> {
    let intervals = selection
        .split(format.interval_sep)
        .map(|token| parse_interval(token, last, format.range_sep))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(merge(intervals))
}

fn parse_interval(token: &str, last: ChapterNumber, range_sep: &str) -> Result<Interval, SelectionError> {
    let mut boundaries = token.trim().split(range_sep);
    // `split` always yields at least one item, even for an empty token.
    let first = parse_chapter(boundaries.next().unwrap_or_default(), last, token)?;

    let mut interval = Interval::single(first);
    for boundary in boundaries {
        let chapter = parse_chapter(boundary, last, token)?;
        interval = Interval::new(
            interval.start().min(chapter),
            interval.end().max(chapter),
        );
    }
    Ok(interval)
}

fn parse_chapter(boundary: &str, last: ChapterNumber, token: &str) -> Result<ChapterNumber, SelectionError> {
    let boundary = boundary.trim();
    if boundary == LAST {
        return Ok(last);
    }
    boundary
        .parse()
        .map_err(|source| SelectionError::InvalidFormat {
            token: token.trim().to_string(),
            source,
            hint: CHAPTERS_FORMAT,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chapter_range::format_intervals;
    use proptest::prelude::*;

    fn ch(n: u64) -> ChapterNumber {
        ChapterNumber::whole(n)
    }

    fn iv(start: u64, end: u64) -> Interval {
        Interval::new(ch(start), ch(end))
    }

    fn parse(selection: &str, last: u64) -> Result<Vec<Interval>, SelectionError> {
        parse_selection(selection, ch(last), &IntervalFormat::SELECTION)
    }

    #[test]
    fn parse_last_and_single() -> anyhow::Result<()> {
        assert_eq!(parse("3..last,15", 12)?, vec![iv(3, 12), iv(15, 15)]);
        assert_eq!(parse("last", 3)?, vec![iv(3, 3)]);
        Ok(())
    }

    #[test]
    fn parse_merges_overlaps() -> anyhow::Result<()> {
        assert_eq!(parse("3..12,10..20", 50)?, vec![iv(3, 20)]);
        assert_eq!(parse("15, 3..12, 12", 50)?, vec![iv(3, 12), iv(15, 15)]);
        Ok(())
    }

    #[test]
    fn parse_is_order_independent() -> anyhow::Result<()> {
        assert_eq!(parse("12..3", 50)?, vec![iv(3, 12)]);
        assert_eq!(parse("5..1..9", 50)?, vec![iv(1, 9)]);
        assert_eq!(parse("last..2", 8)?, vec![iv(2, 8)]);
        Ok(())
    }

    #[test]
    fn parse_fractional_with_spaces() -> anyhow::Result<()> {
        let half = ChapterNumber::from_thousandths(10_500);
        assert_eq!(
            parse(" 10.5 .. 12 ", 50)?,
            vec![Interval::new(half, ch(12))]
        );
        Ok(())
    }

    #[test]
    fn parse_custom_separators() -> anyhow::Result<()> {
        let format = IntervalFormat {
            range_sep: "-",
            interval_sep: ";",
        };
        assert_eq!(
            parse_selection("1-4;9", ch(20), &format)?,
            vec![iv(1, 4), iv(9, 9)]
        );
        Ok(())
    }

    #[test]
    fn invalid_boundary_fails_everything() {
        let err = parse("3..12,a", 50).unwrap_err();
        assert_eq!(
            err,
            SelectionError::InvalidFormat {
                token: "a".into(),
                source: ParseChapterNumberError::NotANumber("a".into()),
                hint: CHAPTERS_FORMAT,
            }
        );
        assert_eq!(err.to_string(), "Invalid chapters format: \"a\"");
        assert_eq!(err.hint(), CHAPTERS_FORMAT);
    }

    #[test]
    fn empty_parts_are_invalid() {
        assert!(parse("", 5).is_err());
        assert!(parse("3,", 5).is_err());
        assert!(parse("3..", 5).is_err());
        assert!(parse("Last", 5).is_err());
        assert!(parse("-2..4", 5).is_err());
    }

    proptest! {
        #[test]
        fn prop_format_then_parse_round_trips(
            bounds in prop::collection::vec((0u64..100_000, 0u64..100_000), 1..15),
            format in prop_oneof![Just(IntervalFormat::SELECTION), Just(IntervalFormat::REPORT)],
        ) {
            let merged = merge(bounds.into_iter().map(|(a, b)| {
                Interval::new(
                    ChapterNumber::from_thousandths(a),
                    ChapterNumber::from_thousandths(b),
                )
            }));
            let text = format_intervals(&merged, &format);
            let parsed = parse_selection(&text, ChapterNumber::ZERO, &format);
            prop_assert_eq!(parsed, Ok(merged));
        }
    }
}
