//! Chapter selections and the chapters a source actually has.
//!
//! A selection such as `3..last, 15` is parsed into merged [`Interval`]s,
//! matched against the sorted chapters of a source with [`resolve`], and the
//! missing parts are printed back with [`format_intervals`].

mod interval;
mod number;
mod resolve;
mod selection;

pub use interval::{format_chapters, format_intervals, group_contiguous, Interval, IntervalFormat};
pub use number::{ChapterNumber, ParseChapterNumberError};
pub use resolve::{resolve, Resolution};
pub use selection::{parse_selection, SelectionError, CHAPTERS_FORMAT};
