//! Calendar-aware partition step
//!
//! An [`Interval`] is the semantic width of one physical partition. Its
//! only job here is enumeration: producing every partition boundary
//! between two instants so the strategy can label each one.

use crate::error::{Error, Result};

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;
const MILLIS_PER_WEEK: i64 = 7 * MILLIS_PER_DAY;

/// Semantic duration of one partition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Interval {
    /// Whole days
    Days(u32),
    /// Whole weeks
    Weeks(u32),
    /// Arbitrary fixed step in milliseconds
    Millis(i64),
}

impl Interval {
    /// One-day interval
    pub fn of_days(days: u32) -> Self {
        Interval::Days(days)
    }

    /// One-week interval
    pub fn of_weeks(weeks: u32) -> Self {
        Interval::Weeks(weeks)
    }

    /// Arbitrary millisecond step. Fails fast on a non-positive step.
    pub fn of_millis(millis: i64) -> Result<Self> {
        if millis <= 0 {
            return Err(Error::configuration(format!(
                "interval step must be positive, got {millis}"
            )));
        }
        Ok(Interval::Millis(millis))
    }

    /// Step width in milliseconds
    pub fn as_millis(&self) -> i64 {
        match self {
            Interval::Days(d) => i64::from(*d) * MILLIS_PER_DAY,
            Interval::Weeks(w) => i64::from(*w) * MILLIS_PER_WEEK,
            Interval::Millis(ms) => *ms,
        }
    }

    /// Enumerate ascending partition boundaries covering `[start, end]`,
    /// inclusive.
    ///
    /// Yields `start`, then every whole step up to `end`, and finally `end`
    /// itself when the last step falls short, so the partition containing
    /// `end` is always represented. A degenerate range (`start >= end`)
    /// yields exactly `[start]`.
    pub fn iterate(&self, start: i64, end: i64) -> Vec<i64> {
        let step = self.as_millis().max(1);
        if start >= end {
            return vec![start];
        }
        let mut boundaries = Vec::with_capacity(((end - start) / step + 2) as usize);
        let mut cursor = start;
        while cursor <= end {
            boundaries.push(cursor);
            cursor = match cursor.checked_add(step) {
                Some(next) => next,
                None => break,
            };
        }
        if *boundaries.last().unwrap_or(&start) < end {
            boundaries.push(end);
        }
        boundaries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iterate_exact_steps() {
        let interval = Interval::of_millis(5).unwrap();
        assert_eq!(interval.iterate(0, 10), vec![0, 5, 10]);
    }

    #[test]
    fn test_iterate_includes_trailing_end() {
        let interval = Interval::of_millis(5).unwrap();
        assert_eq!(interval.iterate(0, 12), vec![0, 5, 10, 12]);
    }

    #[test]
    fn test_iterate_degenerate_range() {
        let interval = Interval::of_days(1);
        assert_eq!(interval.iterate(100, 100), vec![100]);
        assert_eq!(interval.iterate(100, 50), vec![100]);
    }

    #[test]
    fn test_iterate_is_strictly_ascending() {
        let interval = Interval::of_days(1);
        let boundaries = interval.iterate(0, 10 * 24 * 60 * 60 * 1000 + 7);
        assert!(boundaries.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(boundaries.first(), Some(&0));
        assert_eq!(boundaries.last(), Some(&(10 * 24 * 60 * 60 * 1000 + 7)));
    }

    #[test]
    fn test_week_width() {
        assert_eq!(Interval::of_weeks(1).as_millis(), 7 * 24 * 60 * 60 * 1000);
    }

    #[test]
    fn test_non_positive_step_rejected() {
        assert!(Interval::of_millis(0).is_err());
        assert!(Interval::of_millis(-5).is_err());
    }
}
