//! Day-boundary normalization.
//!
//! Range boundaries are stored as `NaiveDateTime` values pinned to either
//! the first or the last representable millisecond of their calendar day.

use chrono::{
  Datelike,
  NaiveDate,
  NaiveDateTime,
  NaiveTime
};

/// `00:00:00.000`
pub const DAY_START: NaiveTime =
  NaiveTime::MIN;

/// `23:59:59.999`, checked at compile time.
pub const DAY_END: NaiveTime =
  match NaiveTime::from_hms_milli_opt(
    23, 59, 59, 999
  ) {
    | Some(time) => time,
    | None => panic!("invalid end-of-day time")
  };

#[must_use]
pub fn start_of_day(
  d: NaiveDateTime
) -> NaiveDateTime {
  d.date().and_time(DAY_START)
}

#[must_use]
pub fn end_of_day(
  d: NaiveDateTime
) -> NaiveDateTime {
  d.date().and_time(DAY_END)
}

#[must_use]
pub fn date_start(
  date: NaiveDate
) -> NaiveDateTime {
  date.and_time(DAY_START)
}

#[must_use]
pub fn date_end(
  date: NaiveDate
) -> NaiveDateTime {
  date.and_time(DAY_END)
}

#[must_use]
pub fn year_start(
  d: NaiveDateTime
) -> NaiveDateTime {
  NaiveDate::from_ymd_opt(
    d.year(),
    1,
    1
  )
  .map(date_start)
  .unwrap_or_else(|| start_of_day(d))
}

#[must_use]
pub fn year_end(
  d: NaiveDateTime
) -> NaiveDateTime {
  NaiveDate::from_ymd_opt(
    d.year(),
    12,
    31
  )
  .map(date_end)
  .unwrap_or_else(|| end_of_day(d))
}

/// True when `d` sits exactly on a start boundary.
pub fn is_day_start(
  d: NaiveDateTime
) -> bool {
  d.time() == DAY_START
}

/// True when `d` sits exactly on an end boundary.
pub fn is_day_end(
  d: NaiveDateTime
) -> bool {
  d.time() == DAY_END
}

#[cfg(test)]
mod tests {
  use chrono::{
    NaiveDate,
    NaiveDateTime,
    Timelike
  };

  use super::*;

  fn at(
    y: i32,
    m: u32,
    d: u32,
    h: u32,
    min: u32
  ) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
      .expect("valid date")
      .and_hms_opt(h, min, 7)
      .expect("valid time")
  }

  #[test]
  fn start_and_end_pin_the_same_day() {
    let d = at(2025, 9, 17, 14, 32);
    let start = start_of_day(d);
    let end = end_of_day(d);

    assert_eq!(start.date(), d.date());
    assert_eq!(end.date(), d.date());
    assert_eq!(start.time(), DAY_START);
    assert_eq!(end.hour(), 23);
    assert_eq!(end.minute(), 59);
    assert_eq!(end.second(), 59);
    assert_eq!(
      end.nanosecond(),
      999_000_000
    );
  }

  #[test]
  fn day_end_is_the_last_millisecond() {
    assert_ne!(DAY_END, DAY_START);
    assert_eq!(
      DAY_END.format("%H:%M:%S%.3f").to_string(),
      "23:59:59.999"
    );
  }

  #[test]
  fn normalization_is_idempotent() {
    let d = at(2024, 2, 29, 0, 1);
    assert_eq!(
      start_of_day(start_of_day(d)),
      start_of_day(d)
    );
    assert_eq!(
      end_of_day(end_of_day(d)),
      end_of_day(d)
    );
    assert!(is_day_start(
      start_of_day(d)
    ));
    assert!(is_day_end(end_of_day(d)));
    assert!(!is_day_start(d));
  }

  #[test]
  fn year_bounds() {
    let d = at(2025, 9, 17, 8, 0);
    assert_eq!(
      year_start(d),
      at(2025, 1, 1, 0, 0)
        .date()
        .and_time(DAY_START)
    );
    assert_eq!(
      year_end(d).date(),
      NaiveDate::from_ymd_opt(
        2025, 12, 31
      )
      .expect("valid date")
    );
    assert!(is_day_end(year_end(d)));
  }
}
