use super::ChapterNumber;

/// An inclusive range of chapters, `start <= end` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Interval {
    start: ChapterNumber,
    end: ChapterNumber,
}

impl Interval {
    /// Creates the interval spanning both boundaries, in whichever order they are given.
    pub fn new(a: ChapterNumber, b: ChapterNumber) -> Self {
        Self {
            start: a.min(b),
            end: a.max(b),
        }
    }

    pub fn single(chapter: ChapterNumber) -> Self {
        Self::new(chapter, chapter)
    }

    pub fn start(&self) -> ChapterNumber {
        self.start
    }

    pub fn end(&self) -> ChapterNumber {
        self.end
    }

    pub fn contains(&self, chapter: &ChapterNumber) -> bool {
        &self.start <= chapter && chapter <= &self.end
    }
}

/// Merges overlapping or touching intervals into the smallest sorted set of
/// disjoint intervals covering the same chapters.
pub fn merge(intervals: impl IntoIterator<Item = Interval>) -> Vec<Interval> {
    let mut intervals: Vec<Interval> = intervals.into_iter().collect();
    intervals.sort_by_key(|interval| interval.start);

    let mut intervals = intervals.into_iter();
    let Some(mut current) = intervals.next() else {
        return Vec::new();
    };

    let mut merged = Vec::new();
    for other in intervals {
        if other.start <= current.end && other.end >= current.start {
            current = Interval {
                start: current.start.min(other.start),
                end: current.end.max(other.end),
            };
        } else {
            merged.push(current);
            current = other;
        }
    }
    merged.push(current);
    merged
}

/// Splits sorted chapters into runs where each chapter is at most one after
/// the previous, so `1, 1.5, 2, 4` becomes `1..2, 4`.
pub fn group_contiguous(sorted_chapters: &[ChapterNumber]) -> Vec<Interval> {
    let Some((&first, rest)) = sorted_chapters.split_first() else {
        return Vec::new();
    };

    let mut runs = Vec::new();
    let mut start = first;
    let mut end = first;
    for &chapter in rest {
        if chapter > end.next() {
            runs.push(Interval::new(start, end));
            start = chapter;
        }
        end = chapter;
    }
    runs.push(Interval::new(start, end));
    runs
}

/// Separators used to print intervals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalFormat<'a> {
    pub range_sep: &'a str,
    pub interval_sep: &'a str,
}

impl IntervalFormat<'static> {
    /// Same notation `--chapters` accepts.
    pub const SELECTION: Self = Self {
        range_sep: "..",
        interval_sep: ",",
    };
    /// Messages listing chapters to the user.
    pub const REPORT: Self = Self {
        range_sep: "-",
        interval_sep: ", ",
    };
    /// Names of files holding several chapters.
    pub const FILE_NAME: Self = Self {
        range_sep: "-",
        interval_sep: ",",
    };
}

impl Default for IntervalFormat<'static> {
    fn default() -> Self {
        Self::SELECTION
    }
}

pub fn format_intervals(intervals: &[Interval], format: &IntervalFormat) -> String {
    intervals
        .iter()
        .map(|interval| {
            if interval.start == interval.end {
                interval.start.to_string()
            } else {
                format!("{}{}{}", interval.start, format.range_sep, interval.end)
            }
        })
        .collect::<Vec<_>>()
        .join(format.interval_sep)
}

/// Formats sorted chapters as their contiguous runs, `1, 2, 3, 5` is `1-3,5`.
pub fn format_chapters(sorted_chapters: &[ChapterNumber], format: &IntervalFormat) -> String {
    format_intervals(&group_contiguous(sorted_chapters), format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ch(n: u64) -> ChapterNumber {
        ChapterNumber::whole(n)
    }

    fn iv(start: u64, end: u64) -> Interval {
        Interval::new(ch(start), ch(end))
    }

    #[test]
    fn new_orders_boundaries() {
        assert_eq!(Interval::new(ch(9), ch(2)), iv(2, 9));
        assert_eq!(Interval::single(ch(4)), iv(4, 4));
    }

    #[test]
    fn merge_empty_and_single() {
        assert_eq!(merge(Vec::new()), Vec::new());
        assert_eq!(merge([iv(3, 5)]), vec![iv(3, 5)]);
    }

    #[test]
    fn merge_overlapping_unsorted() {
        assert_eq!(merge([iv(10, 20), iv(3, 12)]), vec![iv(3, 20)]);
        assert_eq!(
            merge([iv(15, 15), iv(1, 2), iv(2, 4), iv(8, 9)]),
            vec![iv(1, 4), iv(8, 9), iv(15, 15)]
        );
    }

    #[test]
    fn merge_contained() {
        assert_eq!(merge([iv(1, 10), iv(3, 4), iv(2, 9)]), vec![iv(1, 10)]);
    }

    #[test]
    fn merge_keeps_unit_apart_intervals() {
        // Touching means sharing an endpoint, 4 and 5 are different chapters.
        assert_eq!(merge([iv(5, 6), iv(1, 4)]), vec![iv(1, 4), iv(5, 6)]);
        assert_eq!(merge([iv(4, 6), iv(1, 4)]), vec![iv(1, 6)]);
    }

    #[test]
    fn merge_keeps_the_last_run_even_when_ends_repeat() {
        assert_eq!(merge([iv(1, 5), iv(7, 9), iv(8, 9)]), vec![iv(1, 5), iv(7, 9)]);
    }

    #[test]
    fn group_runs() {
        assert_eq!(group_contiguous(&[]), Vec::new());
        assert_eq!(group_contiguous(&[ch(7)]), vec![iv(7, 7)]);
        assert_eq!(
            group_contiguous(&[ch(1), ch(2), ch(3), ch(5), ch(6), ch(8)]),
            vec![iv(1, 3), iv(5, 6), iv(8, 8)]
        );
    }

    #[test]
    fn group_fractional_runs() {
        let half = ChapterNumber::from_thousandths(1_500);
        let far = ChapterNumber::from_thousandths(3_600);
        assert_eq!(
            group_contiguous(&[ch(1), half, ch(2), far]),
            vec![iv(1, 2), Interval::single(far)]
        );
    }

    #[test]
    fn format_with_presets() {
        let intervals = [iv(3, 12), iv(15, 15)];
        assert_eq!(format_intervals(&intervals, &IntervalFormat::SELECTION), "3..12,15");
        assert_eq!(format_intervals(&intervals, &IntervalFormat::REPORT), "3-12, 15");
        assert_eq!(format_intervals(&[], &IntervalFormat::REPORT), "");
        assert_eq!(
            format_intervals(
                &[Interval::single(ChapterNumber::from_thousandths(10_500))],
                &IntervalFormat::default()
            ),
            "10.5"
        );
    }

    #[test]
    fn format_chapter_runs() {
        assert_eq!(
            format_chapters(&[ch(1), ch(2), ch(3), ch(5)], &IntervalFormat::FILE_NAME),
            "1-3,5"
        );
    }

    fn arb_interval() -> impl Strategy<Value = Interval> {
        (0u64..200_000, 0u64..200_000).prop_map(|(a, b)| {
            Interval::new(
                ChapterNumber::from_thousandths(a),
                ChapterNumber::from_thousandths(b),
            )
        })
    }

    fn covered(intervals: &[Interval], point: ChapterNumber) -> bool {
        intervals.iter().any(|interval| interval.contains(&point))
    }

    proptest! {
        #[test]
        fn prop_merge_is_idempotent(intervals in prop::collection::vec(arb_interval(), 0..20)) {
            let once = merge(intervals);
            prop_assert_eq!(merge(once.clone()), once);
        }

        #[test]
        fn prop_merge_is_sorted_disjoint_and_not_touching(
            intervals in prop::collection::vec(arb_interval(), 0..20)
        ) {
            let merged = merge(intervals);
            for pair in merged.windows(2) {
                prop_assert!(pair[0].end() < pair[1].start());
            }
        }

        #[test]
        fn prop_merge_covers_the_same_points(
            intervals in prop::collection::vec(arb_interval(), 0..20),
            probes in prop::collection::vec(0u64..200_000, 0..50),
        ) {
            let merged = merge(intervals.clone());
            let mut points: Vec<ChapterNumber> = intervals
                .iter()
                .flat_map(|interval| [interval.start(), interval.end()])
                .collect();
            points.extend(probes.into_iter().map(ChapterNumber::from_thousandths));
            for point in points {
                prop_assert_eq!(covered(&intervals, point), covered(&merged, point));
            }
        }

        #[test]
        fn prop_grouping_places_every_chapter_in_one_run(
            chapters in prop::collection::btree_set(0u64..50_000, 0..40)
        ) {
            let chapters: Vec<ChapterNumber> =
                chapters.into_iter().map(ChapterNumber::from_thousandths).collect();
            let runs = group_contiguous(&chapters);
            for chapter in &chapters {
                let holding = runs.iter().filter(|run| run.contains(chapter)).count();
                prop_assert_eq!(holding, 1);
            }
            for run in &runs {
                prop_assert!(chapters.contains(&run.start()));
                prop_assert!(chapters.contains(&run.end()));
            }
        }
    }
}
