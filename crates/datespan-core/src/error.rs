//! Error taxonomy for range resolution and shared-state exchange.

use thiserror::Error;

pub type Result<T> =
  std::result::Result<T, RangeError>;

#[derive(
  Error, Debug, Clone, PartialEq, Eq,
)]
pub enum RangeError {
  /// Token text that names no known range.
  #[error("invalid range token: {0}")]
  InvalidRangeToken(String),

  /// Relative quantity that is not a finite number >= 1.
  #[error(
    "invalid range quantity: {0} (expected a whole number >= 1)"
  )]
  InvalidQuantity(String),

  /// Caller-supplied custom bounds with the start after the end.
  #[error(
    "invalid custom range: start {start} is after end {end}"
  )]
  InvalidCustomRange {
    start: String,
    end:   String
  },

  /// Shared text that does not split into two parseable dates.
  #[error(
    "malformed shared state: {0:?}"
  )]
  MalformedSharedState(String),

  /// No bound column carries the expected temporal role.
  #[error(
    "no field bound to the {0:?} role"
  )]
  EmptyOrMissingDateField(String)
}
