use super::{interval::merge, ChapterNumber, Interval};

/// The chapters of a selection that a source has, and the parts of the
/// selection it does not have.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    pub found: Vec<ChapterNumber>,
    pub missing: Vec<Interval>,
}

/// Matches the requested intervals against the sorted, deduplicated chapters
/// a source has available.
///
/// Gaps are rounded to whole chapters around the available ones: between `3`
/// and `5` chapter `4` is missing, between `1` and `1.5` nothing is.
pub fn resolve(available: &[ChapterNumber], requested: &[Interval]) -> Resolution {
    let mut found = Vec::new();
    let mut missing = Vec::new();

    for interval in merge(requested.iter().copied()) {
        let (start, end) = (interval.start(), interval.end());
        let first = available.partition_point(|chapter| *chapter < start);
        let in_interval: Vec<ChapterNumber> = available[first..]
            .iter()
            .copied()
            .take_while(|chapter| *chapter <= end)
            .collect();

        let (Some(&head), Some(&tail)) = (in_interval.first(), in_interval.last()) else {
            missing.push(interval);
            continue;
        };

        if head > start {
            missing.push(Interval::new(start, head.previous().ceil().max(start)));
        }

        for pair in in_interval.windows(2) {
            let after_previous = pair[0].next().floor();
            if after_previous < pair[1] {
                missing.push(Interval::new(after_previous, pair[1].previous().ceil()));
            }
        }

        if tail < end {
            missing.push(Interval::new(tail.next().floor().min(end), end));
        }

        found.extend(in_interval);
    }

    Resolution {
        found,
        missing: merge(missing),
    }
}
