use chrono::{Datelike, NaiveDate, Weekday};

use super::enums::{HabitRepeatsStrategy, RecurringTaskPeriod};
use super::values::{ADate, InputValidationError, Timeline};

impl RecurringTaskPeriod {
    /// First and last day (inclusive) of the period instance containing `date`.
    pub fn bounds(&self, date: ADate) -> Result<(ADate, ADate), InputValidationError> {
        let d = date.as_naive();
        let (start, end) = match self {
            Self::Daily => (date, date),
            Self::Weekly => {
                let start = date.add_days(-i64::from(d.weekday().num_days_from_monday()))?;
                (start, start.add_days(6)?)
            }
            Self::Monthly => month_bounds(d.year(), d.month())?,
            Self::Quarterly => {
                let first_month = (d.month() - 1) / 3 * 3 + 1;
                let (start, _) = month_bounds(d.year(), first_month)?;
                let (_, end) = month_bounds(d.year(), first_month + 2)?;
                (start, end)
            }
            Self::Yearly => (first_day(d.year(), 1)?, first_day(d.year() + 1, 1)?.add_days(-1)?),
        };
        Ok((start, end))
    }

    /// Length in days of the shortest instance of this period.
    pub fn min_days(&self) -> u32 {
        match self {
            Self::Daily => 1,
            Self::Weekly => 7,
            Self::Monthly => 28,
            Self::Quarterly => 90,
            Self::Yearly => 365,
        }
    }

    /// Canonical key of the period instance containing `date`.
    pub fn timeline(&self, date: ADate) -> Timeline {
        let d = date.as_naive();
        let raw = match self {
            Self::Daily => d.format("%Y-%m-%d").to_string(),
            Self::Weekly => {
                let week = d.iso_week();
                format!("{}-W{:02}", week.year(), week.week())
            }
            Self::Monthly => d.format("%Y-%m").to_string(),
            Self::Quarterly => format!("{}-Q{}", d.year(), (d.month() - 1) / 3 + 1),
            Self::Yearly => d.year().to_string(),
        };
        Timeline::from_generated(raw)
    }

    /// Inverse of [`Self::timeline`]: the first day of the instance.
    pub fn start_of_timeline(&self, timeline: &Timeline) -> Result<ADate, InputValidationError> {
        let raw = timeline.as_str();
        let invalid = || InputValidationError::new(format!("timeline `{raw}` is not {self}"));
        let date = match self {
            Self::Daily => ADate::from_raw(raw)?.as_naive(),
            Self::Weekly => {
                let (year, week) = raw.split_once("-W").ok_or_else(invalid)?;
                NaiveDate::from_isoywd_opt(
                    year.parse().map_err(|_| invalid())?,
                    week.parse().map_err(|_| invalid())?,
                    Weekday::Mon,
                )
                .ok_or_else(invalid)?
            }
            Self::Monthly => {
                let (year, month) = raw.split_once('-').ok_or_else(invalid)?;
                NaiveDate::from_ymd_opt(
                    year.parse().map_err(|_| invalid())?,
                    month.parse().map_err(|_| invalid())?,
                    1,
                )
                .ok_or_else(invalid)?
            }
            Self::Quarterly => {
                let (year, quarter) = raw.split_once("-Q").ok_or_else(invalid)?;
                let quarter: u32 = quarter.parse().map_err(|_| invalid())?;
                if !(1..=4).contains(&quarter) {
                    return Err(invalid());
                }
                NaiveDate::from_ymd_opt(year.parse().map_err(|_| invalid())?, (quarter - 1) * 3 + 1, 1)
                    .ok_or_else(invalid)?
            }
            Self::Yearly => NaiveDate::from_ymd_opt(raw.parse().map_err(|_| invalid())?, 1, 1)
                .ok_or_else(invalid)?,
        };
        Ok(ADate::from_naive(date))
    }
}

fn first_day(year: i32, month: u32) -> Result<ADate, InputValidationError> {
    NaiveDate::from_ymd_opt(year, month, 1)
        .map(ADate::from_naive)
        .ok_or_else(|| InputValidationError::new(format!("{year}-{month:02} is out of range")))
}

fn month_bounds(year: i32, month: u32) -> Result<(ADate, ADate), InputValidationError> {
    let start = first_day(year, month)?;
    let next = if month == 12 {
        first_day(year + 1, 1)?
    } else {
        first_day(year, month + 1)?
    };
    Ok((start, next.add_days(-1)?))
}

impl HabitRepeatsStrategy {
    /// Splits the period `[start, end]` into `repeats_in_period` date ranges.
    ///
    /// `AllSame` repeats the whole period. `SpreadOutNoOverlap` partitions it
    /// into contiguous day-aligned chunks in chronological order; the first
    /// `days % repeats` chunks are one day longer than the rest.
    pub fn spread_tasks(
        &self,
        start: ADate,
        end: ADate,
        repeats_in_period: u32,
    ) -> Result<Vec<(ADate, ADate)>, InputValidationError> {
        if repeats_in_period < 1 {
            return Err(InputValidationError::new(
                "repeats in period must be at least 1",
            ));
        }
        if end < start {
            return Err(InputValidationError::new(format!(
                "period end {end} is before its start {start}"
            )));
        }

        match self {
            Self::AllSame => Ok(vec![(start, end); repeats_in_period as usize]),
            Self::SpreadOutNoOverlap => {
                let total_days = start.days_until_inclusive(end);
                let repeats = i64::from(repeats_in_period);
                if repeats > total_days {
                    return Err(InputValidationError::new(format!(
                        "cannot spread {repeats} repeats over a {total_days} day period"
                    )));
                }

                let base = total_days / repeats;
                let longer = total_days % repeats;
                let mut intervals = Vec::with_capacity(repeats_in_period as usize);
                let mut cursor = start;
                for index in 0..repeats {
                    let length = base + i64::from(index < longer);
                    let interval_end = cursor.add_days(length - 1)?;
                    intervals.push((cursor, interval_end));
                    cursor = interval_end.add_days(1)?;
                }
                Ok(intervals)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(raw: &str) -> ADate {
        ADate::from_raw(raw).unwrap()
    }

    #[test]
    fn spread_out_splits_ten_days_into_four_three_three() {
        let intervals = HabitRepeatsStrategy::SpreadOutNoOverlap
            .spread_tasks(date("2024-01-01"), date("2024-01-10"), 3)
            .unwrap();
        assert_eq!(
            intervals,
            vec![
                (date("2024-01-01"), date("2024-01-04")),
                (date("2024-01-05"), date("2024-01-07")),
                (date("2024-01-08"), date("2024-01-10")),
            ]
        );
    }

    #[test]
    fn spread_out_partitions_the_whole_period_with_balanced_lengths() {
        let start = date("2024-02-01");
        let end = date("2024-02-29");
        for repeats in 1..=29 {
            let intervals = HabitRepeatsStrategy::SpreadOutNoOverlap
                .spread_tasks(start, end, repeats)
                .unwrap();
            assert_eq!(intervals.len(), repeats as usize);
            assert_eq!(intervals.first().unwrap().0, start);
            assert_eq!(intervals.last().unwrap().1, end);
            for pair in intervals.windows(2) {
                assert_eq!(pair[0].1.add_days(1).unwrap(), pair[1].0);
            }
            let lengths: Vec<i64> = intervals
                .iter()
                .map(|(s, e)| s.days_until_inclusive(*e))
                .collect();
            let max = lengths.iter().max().unwrap();
            let min = lengths.iter().min().unwrap();
            assert!(max - min <= 1);
        }
    }

    #[test]
    fn all_same_replicates_the_period() {
        let intervals = HabitRepeatsStrategy::AllSame
            .spread_tasks(date("2024-01-01"), date("2024-01-07"), 3)
            .unwrap();
        assert_eq!(intervals, vec![(date("2024-01-01"), date("2024-01-07")); 3]);
    }

    #[test]
    fn single_repeat_yields_the_whole_period_for_both_strategies() {
        for strategy in HabitRepeatsStrategy::ALL {
            let intervals = strategy
                .spread_tasks(date("2024-01-01"), date("2024-01-31"), 1)
                .unwrap();
            assert_eq!(intervals, vec![(date("2024-01-01"), date("2024-01-31"))]);
        }
    }

    #[test]
    fn zero_repeats_is_a_validation_error() {
        for strategy in HabitRepeatsStrategy::ALL {
            assert!(strategy
                .spread_tasks(date("2024-01-01"), date("2024-01-31"), 0)
                .is_err());
        }
    }

    #[test]
    fn more_repeats_than_days_cannot_be_spread_out() {
        assert!(HabitRepeatsStrategy::SpreadOutNoOverlap
            .spread_tasks(date("2024-01-01"), date("2024-01-02"), 3)
            .is_err());
    }

    #[test]
    fn period_bounds_cover_the_expected_calendar_ranges() {
        let d = date("2024-03-06");
        assert_eq!(RecurringTaskPeriod::Daily.bounds(d).unwrap(), (d, d));
        assert_eq!(
            RecurringTaskPeriod::Weekly.bounds(d).unwrap(),
            (date("2024-03-04"), date("2024-03-10"))
        );
        assert_eq!(
            RecurringTaskPeriod::Monthly.bounds(d).unwrap(),
            (date("2024-03-01"), date("2024-03-31"))
        );
        assert_eq!(
            RecurringTaskPeriod::Quarterly.bounds(d).unwrap(),
            (date("2024-01-01"), date("2024-03-31"))
        );
        assert_eq!(
            RecurringTaskPeriod::Yearly.bounds(d).unwrap(),
            (date("2024-01-01"), date("2024-12-31"))
        );
    }

    #[test]
    fn timelines_use_canonical_keys_and_invert() {
        let d = date("2024-03-06");
        assert_eq!(RecurringTaskPeriod::Weekly.timeline(d).as_str(), "2024-W10");
        assert_eq!(RecurringTaskPeriod::Quarterly.timeline(d).as_str(), "2024-Q1");
        assert_eq!(RecurringTaskPeriod::Monthly.timeline(d).as_str(), "2024-03");
        for period in RecurringTaskPeriod::ALL {
            let timeline = period.timeline(d);
            let start = period.start_of_timeline(&timeline).unwrap();
            assert_eq!(start, period.bounds(d).unwrap().0);
        }
    }

    #[test]
    fn arithmetic_past_the_calendar_range_is_an_error() {
        let last = ADate::from_naive(NaiveDate::MAX);
        assert!(last.add_days(1).is_err());
        assert!(RecurringTaskPeriod::Yearly.bounds(last).is_err());
        assert!(RecurringTaskPeriod::Weekly.bounds(last).is_err());
        assert!(ADate::from_naive(NaiveDate::MIN).add_days(-1).is_err());
    }
}
