//! Month arithmetic on `(year, month0)` pairs.
//!
//! Months are zero-based (`0` = January) and may be passed out of range;
//! `-1` and `12` roll into the neighbouring year the same way a date
//! constructor with month overflow does.

use chrono::{
  Datelike,
  Duration,
  NaiveDate
};

/// Folds an overflowing zero-based month into a valid `(year, month0)`.
#[must_use]
pub fn roll_month(
  year: i32,
  month0: i32
) -> (i32, u32) {
  let carry = month0.div_euclid(12);
  let month0 = month0.rem_euclid(12);
  (year.saturating_add(carry), month0 as u32)
}

pub fn first_day_of_month(
  year: i32,
  month0: i32
) -> NaiveDate {
  let (year, month0) =
    roll_month(year, month0);
  NaiveDate::from_ymd_opt(
    year,
    month0 + 1,
    1
  )
  .unwrap_or(NaiveDate::MIN)
}

/// Last day of the month, found as "day 0" of the following month.
pub fn last_day_of_month(
  year: i32,
  month0: i32
) -> NaiveDate {
  add_days(
    first_day_of_month(
      year,
      month0.saturating_add(1)
    ),
    -1
  )
}

/// Weekday of day 1, `0` = Sunday through `6` = Saturday.
#[must_use]
pub fn first_weekday_of_month(
  year: i32,
  month0: i32
) -> u32 {
  first_day_of_month(year, month0)
    .weekday()
    .num_days_from_sunday()
}

/// Remaps a Sunday-first weekday index to Monday-first.
#[must_use]
pub fn monday_index(
  sunday_index: u32
) -> u32 {
  if sunday_index == 0 {
    6
  } else {
    sunday_index - 1
  }
}

#[must_use]
pub fn days_in_month(
  year: i32,
  month0: i32
) -> u32 {
  last_day_of_month(year, month0).day()
}

#[must_use]
pub fn days_in_previous_month(
  year: i32,
  month0: i32
) -> u32 {
  // day 0 of this month is the last day of the previous one
  add_days(
    first_day_of_month(year, month0),
    -1
  )
  .day()
}

pub fn add_days(
  date: NaiveDate,
  days: i64
) -> NaiveDate {
  date
    .checked_add_signed(Duration::days(
      days
    ))
    .unwrap_or(date)
}

/// Monday of the week containing `day`.
pub fn start_of_week(
  day: NaiveDate
) -> NaiveDate {
  let offset = day
    .weekday()
    .num_days_from_monday()
    as i64;
  add_days(day, -offset)
}

/// Steps a `(year, month0)` pair by whole months.
#[must_use]
pub fn shift_month(
  year: i32,
  month0: u32,
  step: i32
) -> (i32, u32) {
  roll_month(
    year,
    (month0 as i32).saturating_add(step)
  )
}

pub const WEEKDAY_LABELS: [&str; 7] = [
  "Mon", "Tue", "Wed", "Thu", "Fri",
  "Sat", "Sun"
];

pub const MONTH_NAMES: [&str; 12] = [
  "January",
  "February",
  "March",
  "April",
  "May",
  "June",
  "July",
  "August",
  "September",
  "October",
  "November",
  "December"
];

pub fn month_name(
  month0: u32
) -> &'static str {
  MONTH_NAMES
    .get(month0 as usize)
    .copied()
    .unwrap_or("?")
}
