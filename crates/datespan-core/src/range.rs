//! Range tokens and their resolution into concrete day-aligned intervals.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use chrono::{
  Datelike,
  Days,
  Months,
  NaiveDate,
  NaiveDateTime
};
use regex::Regex;
use serde::Serialize;

use crate::calendar::{
  add_days,
  first_day_of_month,
  last_day_of_month,
  start_of_week
};
use crate::error::{
  RangeError,
  Result
};
use crate::normalize::{
  date_end,
  date_start,
  end_of_day,
  start_of_day,
  year_end,
  year_start
};

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
)]
pub enum Period {
  Day,
  Week,
  Month,
  Year
}

impl Period {
  fn from_word(
    word: &str
  ) -> Option<Self> {
    match word
      .trim_end_matches('s')
    {
      | "d" | "day" => Some(Self::Day),
      | "w" | "week" => {
        Some(Self::Week)
      }
      | "m" | "month" => {
        Some(Self::Month)
      }
      | "y" | "year" => {
        Some(Self::Year)
      }
      | _ => None
    }
  }

  pub fn label(self) -> &'static str {
    match self {
      | Self::Day => "Day",
      | Self::Week => "Week",
      | Self::Month => "Month",
      | Self::Year => "Year"
    }
  }
}

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
)]
pub enum RelativeKind {
  This,
  Last
}

/// `This <period>` (period to date) or `Last <n> <periods>`.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
)]
pub struct RelativeRange {
  kind:     RelativeKind,
  quantity: Option<u32>,
  period:   Period
}

impl RelativeRange {
  #[must_use]
  pub fn this(period: Period) -> Self {
    Self {
      kind: RelativeKind::This,
      quantity: None,
      period
    }
  }

  /// Fractional quantities are truncated once they pass the `>= 1` check.
  pub fn last(
    quantity: f64,
    period: Period
  ) -> Result<Self> {
    if !quantity.is_finite()
      || quantity < 1.0
      || quantity > f64::from(u32::MAX)
    {
      return Err(
        RangeError::InvalidQuantity(
          quantity.to_string()
        )
      );
    }

    Ok(Self {
      kind: RelativeKind::Last,
      quantity: Some(
        quantity.trunc() as u32
      ),
      period
    })
  }

  /// Parses free-form quantity text, as typed into a quantity box.
  pub fn last_from_text(
    raw: &str,
    period: Period
  ) -> Result<Self> {
    let trimmed = raw.trim();
    let quantity = trimmed
      .parse::<f64>()
      .map_err(|_| {
        RangeError::InvalidQuantity(
          trimmed.to_string()
        )
      })?;
    Self::last(quantity, period)
  }

  pub fn kind(&self) -> RelativeKind {
    self.kind
  }

  pub fn quantity(&self) -> Option<u32> {
    self.quantity
  }

  pub fn period(&self) -> Period {
    self.period
  }
}

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
)]
pub enum RangeToken {
  Today,
  Yesterday,
  ThisWeek,
  LastWeek,
  ThisMonth,
  LastMonth,
  ThisYear,
  LastYear,
  Custom,
  Relative(RelativeRange)
}

impl RangeToken {
  /// Dropdown order of the named selectors.
  pub const NAMED: [RangeToken; 9] = [
    RangeToken::Today,
    RangeToken::Yesterday,
    RangeToken::ThisWeek,
    RangeToken::LastWeek,
    RangeToken::ThisMonth,
    RangeToken::LastMonth,
    RangeToken::ThisYear,
    RangeToken::LastYear,
    RangeToken::Custom
  ];

  pub fn is_custom(&self) -> bool {
    matches!(self, RangeToken::Custom)
  }
}

impl fmt::Display for RangeToken {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    match self {
      | Self::Today => f.write_str("Today"),
      | Self::Yesterday => {
        f.write_str("Yesterday")
      }
      | Self::ThisWeek => {
        f.write_str("This Week")
      }
      | Self::LastWeek => {
        f.write_str("Last Week")
      }
      | Self::ThisMonth => {
        f.write_str("This Month")
      }
      | Self::LastMonth => {
        f.write_str("Last Month")
      }
      | Self::ThisYear => {
        f.write_str("This Year")
      }
      | Self::LastYear => {
        f.write_str("Last Year")
      }
      | Self::Custom => f.write_str("Custom"),
      | Self::Relative(rel) => {
        match (rel.kind, rel.quantity) {
          | (RelativeKind::Last, Some(n)) => {
            write!(
              f,
              "Last {n} {}{}",
              rel.period.label(),
              if n == 1 { "" } else { "s" }
            )
          }
          | _ => {
            write!(
              f,
              "{} to date",
              rel.period.label()
            )
          }
        }
      }
    }
  }
}

fn short_last_re() -> Option<&'static Regex> {
  static RE: OnceLock<Option<Regex>> =
    OnceLock::new();
  RE.get_or_init(|| {
    Regex::new(
      r"^-(?P<num>[0-9.]+)(?P<unit>[dwmy])$"
    )
    .ok()
  })
  .as_ref()
}

fn long_last_re() -> Option<&'static Regex> {
  static RE: OnceLock<Option<Regex>> =
    OnceLock::new();
  RE.get_or_init(|| {
    Regex::new(
      r"^last\s+(?P<num>\S+)\s+(?P<period>days?|weeks?|months?|years?)$"
    )
    .ok()
  })
  .as_ref()
}

fn to_date_re() -> Option<&'static Regex> {
  static RE: OnceLock<Option<Regex>> =
    OnceLock::new();
  RE.get_or_init(|| {
    Regex::new(
      r"^(?:(?P<unit>[dwmy])td|(?:this[\s_-]+)?(?P<period>day|week|month|year)[\s_-]+to[\s_-]+date)$"
    )
    .ok()
  })
  .as_ref()
}

impl FromStr for RangeToken {
  type Err = RangeError;

  fn from_str(
    s: &str
  ) -> Result<Self> {
    let lower =
      s.trim().to_ascii_lowercase();

    if let Some(caps) = short_last_re()
      .and_then(|re| re.captures(&lower))
    {
      let period = Period::from_word(
        &caps["unit"]
      )
      .ok_or_else(|| {
        RangeError::InvalidRangeToken(
          s.to_string()
        )
      })?;
      return RelativeRange::last_from_text(
        &caps["num"],
        period
      )
      .map(RangeToken::Relative);
    }

    let spaced = lower
      .split_whitespace()
      .collect::<Vec<_>>()
      .join(" ");
    let compact = spaced
      .replace([' ', '-', '_'], "");

    let named = match compact.as_str() {
      | "today" => Some(Self::Today),
      | "yesterday" => {
        Some(Self::Yesterday)
      }
      | "thisweek" => Some(Self::ThisWeek),
      | "lastweek" => Some(Self::LastWeek),
      | "thismonth" => {
        Some(Self::ThisMonth)
      }
      | "lastmonth" => {
        Some(Self::LastMonth)
      }
      | "thisyear" => Some(Self::ThisYear),
      | "lastyear" => Some(Self::LastYear),
      | "custom" => Some(Self::Custom),
      | _ => None
    };
    if let Some(token) = named {
      return Ok(token);
    }

    if let Some(caps) = long_last_re()
      .and_then(|re| re.captures(&spaced))
    {
      let period = Period::from_word(
        &caps["period"]
      )
      .ok_or_else(|| {
        RangeError::InvalidRangeToken(
          s.to_string()
        )
      })?;
      return RelativeRange::last_from_text(
        &caps["num"],
        period
      )
      .map(RangeToken::Relative);
    }

    if let Some(caps) = to_date_re()
      .and_then(|re| re.captures(&spaced))
    {
      let word = caps
        .name("unit")
        .or_else(|| caps.name("period"))
        .map(|m| m.as_str())
        .unwrap_or_default();
      if let Some(period) =
        Period::from_word(word)
      {
        return Ok(Self::Relative(
          RelativeRange::this(period)
        ));
      }
    }

    Err(RangeError::InvalidRangeToken(
      s.to_string()
    ))
  }
}

/// A concrete inclusive interval plus the month its grid opens on.
#[derive(
  Debug,
  Clone,
  PartialEq,
  Eq,
  Hash,
  Serialize,
)]
pub struct ResolvedRange {
  start_date:    NaiveDateTime,
  end_date:      NaiveDateTime,
  anchor_month0: u32,
  anchor_year:   i32
}

impl ResolvedRange {
  /// Callers guarantee `start <= end`.
  pub(crate) fn from_days(
    start: NaiveDate,
    end: NaiveDate
  ) -> Self {
    Self {
      start_date:    date_start(start),
      end_date:      date_end(end),
      anchor_month0: start.month0(),
      anchor_year:   start.year()
    }
  }

  pub fn start_date(
    &self
  ) -> NaiveDateTime {
    self.start_date
  }

  pub fn end_date(
    &self
  ) -> NaiveDateTime {
    self.end_date
  }

  pub fn start_day(&self) -> NaiveDate {
    self.start_date.date()
  }

  pub fn end_day(&self) -> NaiveDate {
    self.end_date.date()
  }

  pub fn anchor_month0(&self) -> u32 {
    self.anchor_month0
  }

  pub fn anchor_year(&self) -> i32 {
    self.anchor_year
  }

  /// Inclusive on both ends.
  pub fn contains(
    &self,
    instant: NaiveDateTime
  ) -> bool {
    self.start_date <= instant
      && instant <= self.end_date
  }

  /// Number of calendar days covered, counting both ends.
  pub fn day_count(&self) -> i64 {
    (self.end_day() - self.start_day())
      .num_days()
      + 1
  }
}

/// Normalizes caller-picked bounds into a range.
pub fn resolve_custom(
  start: NaiveDate,
  end: NaiveDate
) -> Result<ResolvedRange> {
  if start > end {
    return Err(
      RangeError::InvalidCustomRange {
        start: start.to_string(),
        end:   end.to_string()
      }
    );
  }
  Ok(ResolvedRange::from_days(
    start, end
  ))
}

/// Maps `token` to an interval relative to `now`.
///
/// `Custom` keeps `current` as is; without one it falls back to the day
/// containing `now`. Errors never touch `current`.
pub fn resolve(
  token: &RangeToken,
  now: NaiveDateTime,
  current: Option<&ResolvedRange>
) -> Result<ResolvedRange> {
  let today = now.date();

  let range = match token {
    | RangeToken::Today => {
      ResolvedRange::from_days(
        today, today
      )
    }
    | RangeToken::Yesterday => {
      let yesterday =
        add_days(today, -1);
      ResolvedRange::from_days(
        yesterday, yesterday
      )
    }
    | RangeToken::ThisWeek => {
      week_of(start_of_week(today))
    }
    | RangeToken::LastWeek => {
      week_of(add_days(
        start_of_week(today),
        -7
      ))
    }
    | RangeToken::ThisMonth => {
      month_of(
        today.year(),
        today.month0() as i32
      )
    }
    | RangeToken::LastMonth => {
      month_of(
        today.year(),
        today.month0() as i32 - 1
      )
    }
    | RangeToken::ThisYear => {
      ResolvedRange::from_days(
        year_start(now).date(),
        year_end(now).date()
      )
    }
    | RangeToken::LastYear => {
      year_of(
        today.year().saturating_sub(1)
      )
    }
    | RangeToken::Custom => {
      current.cloned().unwrap_or_else(
        || {
          ResolvedRange::from_days(
            today, today
          )
        }
      )
    }
    | RangeToken::Relative(rel) => {
      resolve_relative(rel, now)?
    }
  };

  Ok(range)
}

fn week_of(
  monday: NaiveDate
) -> ResolvedRange {
  ResolvedRange::from_days(
    monday,
    add_days(monday, 6)
  )
}

fn month_of(
  year: i32,
  month0: i32
) -> ResolvedRange {
  ResolvedRange::from_days(
    first_day_of_month(year, month0),
    last_day_of_month(year, month0)
  )
}

fn year_of(
  year: i32
) -> ResolvedRange {
  ResolvedRange::from_days(
    first_day_of_month(year, 0),
    last_day_of_month(year, 11)
  )
}

fn resolve_relative(
  rel: &RelativeRange,
  now: NaiveDateTime
) -> Result<ResolvedRange> {
  let today = now.date();
  let end = end_of_day(now).date();

  let start = match rel.kind {
    | RelativeKind::This => {
      match rel.period {
        | Period::Day => {
          start_of_day(now).date()
        }
        | Period::Week => {
          start_of_week(today)
        }
        | Period::Month => {
          first_day_of_month(
            today.year(),
            today.month0() as i32
          )
        }
        | Period::Year => {
          year_start(now).date()
        }
      }
    }
    | RelativeKind::Last => {
      let n = rel
        .quantity
        .filter(|n| *n >= 1)
        .ok_or_else(|| {
          RangeError::InvalidQuantity(
            format!("{:?}", rel.quantity)
          )
        })?;
      shift_back(today, n, rel.period)
        .ok_or_else(|| {
          RangeError::InvalidQuantity(
            n.to_string()
          )
        })?
    }
  };

  Ok(ResolvedRange::from_days(
    start, end
  ))
}

fn shift_back(
  today: NaiveDate,
  n: u32,
  period: Period
) -> Option<NaiveDate> {
  match period {
    | Period::Day => {
      today.checked_sub_days(Days::new(
        u64::from(n)
      ))
    }
    | Period::Week => today
      .checked_sub_days(Days::new(
        u64::from(n) * 7
      )),
    | Period::Month => today
      .checked_sub_months(Months::new(
        n
      )),
    | Period::Year => {
      let months = n.checked_mul(12)?;
      today.checked_sub_months(
        Months::new(months)
      )
    }
  }
}
