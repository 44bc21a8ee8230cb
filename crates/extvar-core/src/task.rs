use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ExtvarError, Result};
use crate::types::{Component, Frequency};

// ---------------------------------------------------------------------------
// YearMonth
// ---------------------------------------------------------------------------

/// A calendar month. Ordering is chronological.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(ExtvarError::InvalidMonth(month));
        }
        Ok(Self { year, month })
    }

    /// The following month, or `None` past the last representable year.
    pub fn succ(self) -> Option<Self> {
        if self.month == 12 {
            let year = self.year.checked_add(1)?;
            Some(Self { year, month: 1 })
        } else {
            Some(Self {
                year: self.year,
                month: self.month + 1,
            })
        }
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

// ---------------------------------------------------------------------------
// MonthSequence
// ---------------------------------------------------------------------------

/// Every month from January of `start_year` through December of `end_year`,
/// in strictly increasing order. Appends rely on this order.
#[derive(Debug, Clone)]
pub struct MonthSequence {
    next: Option<YearMonth>,
    end_year: i32,
}

impl MonthSequence {
    pub fn new(start_year: i32, end_year: i32) -> Self {
        Self {
            next: Some(YearMonth {
                year: start_year,
                month: 1,
            }),
            end_year,
        }
    }
}

impl Iterator for MonthSequence {
    type Item = YearMonth;

    fn next(&mut self) -> Option<YearMonth> {
        let current = self.next.filter(|ym| ym.year <= self.end_year)?;
        self.next = current.succ();
        Some(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = match self.next {
            Some(ym) if ym.year <= self.end_year => {
                let years = i64::from(self.end_year) - i64::from(ym.year) + 1;
                let months = years * 12 - i64::from(ym.month - 1);
                usize::try_from(months).unwrap_or(usize::MAX)
            }
            _ => 0,
        };
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for MonthSequence {}

// ---------------------------------------------------------------------------
// ExtractionTask
// ---------------------------------------------------------------------------

/// One external-command step: a single variable for a single month of a
/// single ensemble member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionTask {
    pub ensemble: String,
    pub component: Component,
    pub frequency: Frequency,
    pub variable: String,
    pub year: i32,
    pub month: u32,
}

impl ExtractionTask {
    pub fn year_month(&self) -> YearMonth {
        YearMonth {
            year: self.year,
            month: self.month,
        }
    }

    /// True for January of the first year: the step that creates the
    /// destination file rather than appending to it.
    pub fn is_first(&self, start_year: i32) -> bool {
        self.year == start_year && self.month == 1
    }
}

impl fmt::Display for ExtractionTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{} {}",
            self.ensemble,
            self.component,
            self.frequency,
            self.variable,
            self.year_month()
        )
    }
}

/// The ordered task list for one (ensemble, component, frequency, variable).
pub fn variable_tasks<'a>(
    ensemble: &'a str,
    component: Component,
    frequency: &'a Frequency,
    variable: &'a str,
    start_year: i32,
    end_year: i32,
) -> impl Iterator<Item = ExtractionTask> + 'a {
    MonthSequence::new(start_year, end_year).map(move |ym| ExtractionTask {
        ensemble: ensemble.to_string(),
        component,
        frequency: frequency.clone(),
        variable: variable.to_string(),
        year: ym.year,
        month: ym.month,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_sequence_covers_range() {
        let months: Vec<YearMonth> = MonthSequence::new(2000, 2001).collect();
        assert_eq!(months.len(), 24);
        assert_eq!(months[0], YearMonth { year: 2000, month: 1 });
        assert_eq!(months[11], YearMonth { year: 2000, month: 12 });
        assert_eq!(months[12], YearMonth { year: 2001, month: 1 });
        assert_eq!(months[23], YearMonth { year: 2001, month: 12 });
    }

    #[test]
    fn month_sequence_is_strictly_increasing() {
        let months: Vec<YearMonth> = MonthSequence::new(1999, 2003).collect();
        assert!(months.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn month_sequence_size_hint_tracks_progress() {
        let mut seq = MonthSequence::new(2000, 2000);
        assert_eq!(seq.len(), 12);
        seq.next();
        seq.next();
        assert_eq!(seq.len(), 10);
        assert_eq!(seq.count(), 10);
    }

    #[test]
    fn empty_range_yields_nothing() {
        let seq = MonthSequence::new(2001, 2000);
        assert_eq!(seq.len(), 0);
        assert_eq!(seq.count(), 0);
    }

    #[test]
    fn year_month_rejects_bad_month() {
        assert!(matches!(YearMonth::new(2000, 13), Err(ExtvarError::InvalidMonth(13))));
        assert!(matches!(YearMonth::new(2000, 0), Err(ExtvarError::InvalidMonth(0))));
        let dec = YearMonth::new(2000, 12).unwrap();
        assert_eq!(dec.succ().unwrap().to_string(), "2001-01");
        assert_eq!(YearMonth::new(i32::MAX, 12).unwrap().succ(), None);
    }

    #[test]
    fn only_january_of_start_year_is_first() {
        let freq = Frequency::monthly();
        let tasks: Vec<ExtractionTask> =
            variable_tasks("0101", Component::Ocn, &freq, "SST", 2000, 2001).collect();
        let firsts: Vec<&ExtractionTask> = tasks.iter().filter(|t| t.is_first(2000)).collect();
        assert_eq!(firsts.len(), 1);
        assert_eq!(firsts[0].year_month(), YearMonth { year: 2000, month: 1 });
        assert_eq!(tasks[0].to_string(), "0101/ocn/monthly/SST 2000-01");
    }

    #[test]
    fn sequence_ending_at_last_representable_year_terminates() {
        let seq = MonthSequence::new(i32::MAX, i32::MAX);
        assert_eq!(seq.len(), 12);
        let months: Vec<YearMonth> = seq.take(13).collect();
        assert_eq!(months.len(), 12);
        assert_eq!(months[11], YearMonth { year: i32::MAX, month: 12 });
    }
}
