//! Canonical `"YYYY-MM-DD to YYYY-MM-DD"` shared-state text.

use chrono::{
  NaiveDate,
  NaiveDateTime
};

use crate::error::{
  RangeError,
  Result
};
use crate::range::{
  ResolvedRange,
  resolve_custom
};

pub const SEPARATOR: &str = " to ";

const SHARED_FORMAT: &str = "%Y-%m-%d";
const INPUT_BOX_FORMAT: &str =
  "%d/%m/%Y";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateStyle {
  /// `YYYY-MM-DD`
  SharedState,
  /// `DD/MM/YYYY`, as shown in the custom date inputs.
  InputBox
}

impl DateStyle {
  fn pattern(self) -> &'static str {
    match self {
      | Self::SharedState => SHARED_FORMAT,
      | Self::InputBox => INPUT_BOX_FORMAT
    }
  }
}

pub fn format_date(
  date: NaiveDateTime,
  style: DateStyle
) -> String {
  date
    .format(style.pattern())
    .to_string()
}

pub fn parse_date(
  raw: &str,
  style: DateStyle
) -> Option<NaiveDate> {
  NaiveDate::parse_from_str(
    raw.trim(),
    style.pattern()
  )
  .ok()
}

#[must_use]
pub fn encode(
  range: &ResolvedRange
) -> String {
  format!(
    "{}{SEPARATOR}{}",
    format_date(
      range.start_date(),
      DateStyle::SharedState
    ),
    format_date(
      range.end_date(),
      DateStyle::SharedState
    )
  )
}

/// Parses shared text back into a day-aligned range anchored on its start.
///
/// Only the canonical form is accepted: text that would not re-encode to
/// itself (one-digit fields, padding) is malformed.
pub fn decode(
  text: &str
) -> Result<ResolvedRange> {
  let malformed = || {
    RangeError::MalformedSharedState(
      text.to_string()
    )
  };

  let parts =
    text.split(SEPARATOR).collect::<Vec<_>>();
  let [start, end] = parts.as_slice()
  else {
    return Err(malformed());
  };

  let start = parse_date(
    start,
    DateStyle::SharedState
  )
  .ok_or_else(malformed)?;
  let end =
    parse_date(end, DateStyle::SharedState)
      .ok_or_else(malformed)?;

  let range = resolve_custom(start, end)
    .map_err(|_| malformed())?;
  if encode(&range) != text {
    return Err(malformed());
  }
  Ok(range)
}
