//! Time-axis tick generation.

use chrono::{Datelike, Days, Months, NaiveDate, Weekday};
use serde::Serialize;

use crate::config::TimeScaleUnit;

/// Day gridlines get a label every this many days.
const DAY_LABEL_INTERVAL: i64 = 7;

/// Upper bound on generated ticks per axis; later ticks are dropped.
pub const MAX_TICKS: usize = 50_000;

/// Inclusive visible date range of the chart.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Whole days from `start` to `end`.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Grow the range to cover `date`.
    pub fn widen(&mut self, date: NaiveDate) {
        self.start = self.start.min(date);
        self.end = self.end.max(date);
    }

    /// Horizontal pixel offset of a date relative to the range start.
    pub fn offset(&self, date: NaiveDate, pixels_per_day: f64) -> f64 {
        (date - self.start).num_days() as f64 * pixels_per_day
    }
}

/// One labeled gridline unit on the time axis.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Tick {
    pub date: NaiveDate,
    pub left: f64,
    /// Pixel width of the unit (day, week or calendar month).
    pub width: f64,
    pub label: Option<String>,
}

/// ISO-8601 week number (weeks start Monday; week 1 holds the first Thursday).
pub fn iso_week_number(date: NaiveDate) -> u32 {
    date.iso_week().week()
}

/// The Monday on or before `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    let back = date.weekday().num_days_from_monday();
    date.checked_sub_days(Days::new(u64::from(back)))
        .unwrap_or(date)
}

fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

fn days_in_month(first: NaiveDate) -> i64 {
    match first.checked_add_months(Months::new(1)) {
        Some(next) => (next - first).num_days(),
        None => 31,
    }
}

/// Generate ticks covering `range` in the given unit.
pub fn ticks(range: &DateRange, unit: TimeScaleUnit, pixels_per_day: f64) -> Vec<Tick> {
    match unit {
        TimeScaleUnit::Days => day_ticks(range, pixels_per_day),
        TimeScaleUnit::Weeks => week_ticks(range, pixels_per_day),
        TimeScaleUnit::Months => month_ticks(range, pixels_per_day),
    }
}

fn day_ticks(range: &DateRange, pixels_per_day: f64) -> Vec<Tick> {
    let count = usize::try_from(range.days().max(0))
        .unwrap_or(usize::MAX)
        .saturating_add(1)
        .min(MAX_TICKS);
    let mut ticks = Vec::with_capacity(count);
    for (i, date) in range.start.iter_days().take(count).enumerate() {
        let i = i as i64;
        let label = (i % DAY_LABEL_INTERVAL == 0).then(|| date.format("%b %-d").to_string());
        ticks.push(Tick {
            date,
            left: i as f64 * pixels_per_day,
            width: pixels_per_day,
            label,
        });
    }
    ticks
}

fn week_ticks(range: &DateRange, pixels_per_day: f64) -> Vec<Tick> {
    let mut ticks = Vec::new();
    let mut date = week_start(range.start);
    debug_assert_eq!(date.weekday(), Weekday::Mon);
    while date <= range.end && ticks.len() < MAX_TICKS {
        ticks.push(Tick {
            date,
            left: range.offset(date, pixels_per_day),
            width: 7.0 * pixels_per_day,
            label: Some(format!("W.{}", iso_week_number(date))),
        });
        match date.checked_add_days(Days::new(7)) {
            Some(next) => date = next,
            None => break,
        }
    }
    ticks
}

fn month_ticks(range: &DateRange, pixels_per_day: f64) -> Vec<Tick> {
    let mut ticks = Vec::new();
    let mut date = month_start(range.start);
    while date <= range.end && ticks.len() < MAX_TICKS {
        ticks.push(Tick {
            date,
            left: range.offset(date, pixels_per_day),
            width: days_in_month(date) as f64 * pixels_per_day,
            label: Some(date.format("%B %Y").to_string()),
        });
        match date.checked_add_months(Months::new(1)) {
            Some(next) => date = next,
            None => break,
        }
    }
    ticks
}
