//! Reference-instant and day expressions accepted on the command line.
//!
//! Everything here is local calendar time; no time-zone conversion happens
//! beyond reading the system clock and folding RFC3339 offsets into it.

use std::sync::OnceLock;

use anyhow::{
  Context,
  anyhow
};
use chrono::{
  DateTime,
  Datelike,
  Duration,
  Local,
  NaiveDate,
  NaiveDateTime,
  Weekday
};
use regex::Regex;

use crate::calendar::roll_month;
use crate::codec::{
  DateStyle,
  parse_date
};
use crate::normalize::date_start;

/// Current wall-clock time.
#[must_use]
pub fn local_now() -> NaiveDateTime {
  Local::now().naive_local()
}

fn relative_re() -> Option<&'static Regex> {
  static RE: OnceLock<Option<Regex>> =
    OnceLock::new();
  RE.get_or_init(|| {
    Regex::new(
      r"^(?P<sign>[+-])(?P<num>\d+)(?P<unit>[dhm])$"
    )
    .ok()
  })
  .as_ref()
}

fn month_re() -> Option<&'static Regex> {
  static RE: OnceLock<Option<Regex>> =
    OnceLock::new();
  RE.get_or_init(|| {
    Regex::new(
      r"^(?P<year>\d{4})-(?P<month>\d{1,2})$"
    )
    .ok()
  })
  .as_ref()
}

/// Parses the instant every range is resolved against.
#[tracing::instrument(skip(now), fields(input = input))]
pub fn parse_reference_expr(
  input: &str,
  now: NaiveDateTime
) -> anyhow::Result<NaiveDateTime> {
  let token = input.trim();
  let lower =
    token.to_ascii_lowercase();

  match lower.as_str() {
    | "now" => return Ok(now),
    | "today" => {
      return Ok(date_start(now.date()));
    }
    | "yesterday" => {
      return Ok(
        date_start(now.date())
          - Duration::days(1)
      );
    }
    | "tomorrow" => {
      return Ok(
        date_start(now.date())
          + Duration::days(1)
      );
    }
    | _ => {}
  }

  if let Some(target) =
    parse_weekday_name(&lower)
  {
    let day = previous_weekday_date(
      now.date(),
      target
    );
    return Ok(date_start(day));
  }

  if let Some(caps) = relative_re()
    .and_then(|re| re.captures(token))
  {
    let num: i64 = caps["num"]
      .parse()
      .context("invalid relative number")?;
    let out_of_range = || {
      anyhow!(
        "relative offset out of range: \
         {input}"
      )
    };
    let duration = match &caps["unit"] {
      | "d" => Duration::try_days(num),
      | "h" => Duration::try_hours(num),
      | "m" => Duration::try_minutes(num),
      | unit => {
        return Err(anyhow!(
          "unknown relative unit: {unit}"
        ));
      }
    }
    .ok_or_else(out_of_range)?;
    let shifted = if &caps["sign"] == "-" {
      now.checked_sub_signed(duration)
    } else {
      now.checked_add_signed(duration)
    };
    return shifted.ok_or_else(out_of_range);
  }

  if let Ok(dt) =
    DateTime::parse_from_rfc3339(token)
  {
    return Ok(
      dt.with_timezone(&Local)
        .naive_local()
    );
  }

  if let Some(date) = parse_day(token) {
    return Ok(date_start(date));
  }

  for fmt in [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M"
  ] {
    if let Ok(ndt) =
      NaiveDateTime::parse_from_str(
        token, fmt
      )
    {
      return Ok(ndt);
    }
  }

  Err(anyhow!(
    "unrecognized reference instant: \
     {input}"
  ))
  .with_context(|| {
    "supported formats: \
     now/today/yesterday/tomorrow, \
     weekday names (most recent), \
     +Nd/+Nh/+Nm, RFC3339, YYYY-MM-DD, \
     DD/MM/YYYY, YYYY-MM-DDTHH:MM, \
     YYYY-MM-DD HH:MM"
  })
}

/// A calendar day as typed into a custom-range bound.
pub fn parse_day_expr(
  input: &str,
  now: NaiveDateTime
) -> anyhow::Result<NaiveDate> {
  if let Some(date) = parse_day(input) {
    return Ok(date);
  }
  parse_reference_expr(input, now)
    .map(|instant| instant.date())
}

/// `YYYY-MM`, a month name (this year) or `this`/`next`/`last`.
///
/// Returns `(year, month0)`.
pub fn parse_month_expr(
  input: &str,
  today: NaiveDate
) -> anyhow::Result<(i32, u32)> {
  let token = input.trim();
  let lower =
    token.to_ascii_lowercase();
  let year = today.year();
  let month0 = today.month0() as i32;

  match lower.as_str() {
    | "this" | "current" => {
      return Ok(roll_month(year, month0));
    }
    | "next" => {
      return Ok(roll_month(
        year,
        month0 + 1
      ));
    }
    | "last" | "prev" | "previous" => {
      return Ok(roll_month(
        year,
        month0 - 1
      ));
    }
    | _ => {}
  }

  if let Some(month) =
    parse_month_name(&lower)
  {
    return Ok((year, month - 1));
  }

  let caps = month_re()
    .and_then(|re| re.captures(token))
    .ok_or_else(|| {
      anyhow!(
        "unrecognized month: {input} \
         (expected YYYY-MM or a month \
         name)"
      )
    })?;
  let year: i32 = caps["year"]
    .parse()
    .context("invalid year")?;
  let month: u32 = caps["month"]
    .parse()
    .context("invalid month")?;
  if !(1..=12).contains(&month) {
    return Err(anyhow!(
      "month out of range: {month}"
    ));
  }
  Ok((year, month - 1))
}

fn parse_day(
  token: &str
) -> Option<NaiveDate> {
  parse_date(
    token,
    DateStyle::SharedState
  )
  .or_else(|| {
    parse_date(
      token,
      DateStyle::InputBox
    )
  })
}

fn parse_weekday_name(
  token: &str
) -> Option<Weekday> {
  match token.trim() {
    | "monday" | "mon" => {
      Some(Weekday::Mon)
    }
    | "tuesday" | "tue" | "tues" => {
      Some(Weekday::Tue)
    }
    | "wednesday" | "wed" => {
      Some(Weekday::Wed)
    }
    | "thursday" | "thu" | "thur"
    | "thurs" => Some(Weekday::Thu),
    | "friday" | "fri" => {
      Some(Weekday::Fri)
    }
    | "saturday" | "sat" => {
      Some(Weekday::Sat)
    }
    | "sunday" | "sun" => {
      Some(Weekday::Sun)
    }
    | _ => None
  }
}

/// Most recent `target` on or before `from`.
fn previous_weekday_date(
  from: NaiveDate,
  target: Weekday
) -> NaiveDate {
  let from_idx = from
    .weekday()
    .num_days_from_monday()
    as i64;
  let target_idx = target
    .num_days_from_monday()
    as i64;
  let delta =
    (7 + from_idx - target_idx) % 7;
  from
    .checked_sub_signed(Duration::days(
      delta
    ))
    .unwrap_or(from)
}

fn parse_month_name(
  token: &str
) -> Option<u32> {
  match token.trim() {
    | "january" | "jan" => Some(1),
    | "february" | "feb" => Some(2),
    | "march" | "mar" => Some(3),
    | "april" | "apr" => Some(4),
    | "may" => Some(5),
    | "june" | "jun" => Some(6),
    | "july" | "jul" => Some(7),
    | "august" | "aug" => Some(8),
    | "september" | "sep" | "sept" => {
      Some(9)
    }
    | "october" | "oct" => Some(10),
    | "november" | "nov" => Some(11),
    | "december" | "dec" => Some(12),
    | _ => None
  }
}

#[cfg(test)]
mod tests {
  use chrono::NaiveDate;

  use super::*;

  fn now() -> NaiveDateTime {
    // a Wednesday
    NaiveDate::from_ymd_opt(2025, 9, 17)
      .expect("valid date")
      .and_hms_opt(14, 30, 0)
      .expect("valid time")
  }

  fn ymd(
    y: i32,
    m: u32,
    d: u32
  ) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d)
      .expect("valid date")
  }

  #[test]
  fn keywords() {
    assert_eq!(
      parse_reference_expr("now", now())
        .expect("now"),
      now()
    );
    assert_eq!(
      parse_reference_expr(
        "Yesterday",
        now()
      )
      .expect("yesterday"),
      date_start(ymd(2025, 9, 16))
    );
  }

  #[test]
  fn weekday_names_look_back() {
    let monday = parse_reference_expr(
      "monday",
      now()
    )
    .expect("weekday");
    assert_eq!(
      monday.date(),
      ymd(2025, 9, 15)
    );
    let wednesday = parse_reference_expr(
      "wed",
      now()
    )
    .expect("weekday");
    assert_eq!(
      wednesday.date(),
      ymd(2025, 9, 17)
    );
  }

  #[test]
  fn relative_offsets() {
    let parsed =
      parse_reference_expr("-3d", now())
        .expect("relative");
    assert_eq!(
      parsed,
      now() - Duration::days(3)
    );
    let parsed =
      parse_reference_expr("+2h", now())
        .expect("relative");
    assert_eq!(
      parsed.format("%H:%M").to_string(),
      "16:30"
    );
  }

  #[test]
  fn huge_offsets_are_errors() {
    for expr in [
      "+1000000000d",
      "-1000000000d",
      "+99999999999999999d",
      "+99999999999999999m"
    ] {
      let err =
        parse_reference_expr(expr, now())
          .expect_err(expr);
      assert!(
        err
          .to_string()
          .contains("out of range"),
        "{expr}: {err}"
      );
    }
  }

  #[test]
  fn explicit_dates() {
    assert_eq!(
      parse_reference_expr(
        "2024-02-29",
        now()
      )
      .expect("date"),
      date_start(ymd(2024, 2, 29))
    );
    assert_eq!(
      parse_reference_expr(
        "2024-02-29 08:15",
        now()
      )
      .expect("datetime")
      .format("%Y-%m-%d %H:%M")
      .to_string(),
      "2024-02-29 08:15"
    );
    assert_eq!(
      parse_day_expr("07/09/2025", now())
        .expect("input box"),
      ymd(2025, 9, 7)
    );
    assert!(
      parse_reference_expr(
        "soon",
        now()
      )
      .is_err()
    );
  }

  #[test]
  fn month_expressions() {
    let today = ymd(2025, 1, 10);
    assert_eq!(
      parse_month_expr("2025-09", today)
        .expect("month"),
      (2025, 8)
    );
    assert_eq!(
      parse_month_expr("last", today)
        .expect("month"),
      (2024, 11)
    );
    assert_eq!(
      parse_month_expr("March", today)
        .expect("month"),
      (2025, 2)
    );
    assert!(
      parse_month_expr("2025-13", today)
        .is_err()
    );
  }
}
