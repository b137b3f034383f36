//! Decides when the host filter must be reissued.

use serde::Serialize;

use crate::range::ResolvedRange;

/// `false` when there is nothing to compare against; otherwise `true` iff
/// either boundary moved (exact comparison).
#[must_use]
pub fn has_changed(
  previous: Option<&ResolvedRange>,
  current: &ResolvedRange
) -> bool {
  match previous {
    | None => false,
    | Some(prev) => {
      prev.start_date()
        != current.start_date()
        || prev.end_date()
          != current.end_date()
    }
  }
}

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
)]
pub enum FilterState {
  /// No range recorded yet.
  Uninitialized,
  /// A range was recorded and has not been evaluated.
  Resolved,
  /// The recorded range differs from the last filtered one.
  AwaitingFilter,
  /// The host filter matches the recorded range.
  Filtered
}

/// Tracks the last range for which a filter was issued.
#[derive(Debug, Clone)]
pub struct RangeChangeTracker {
  state:         FilterState,
  current:       Option<ResolvedRange>,
  last_filtered: Option<ResolvedRange>
}

impl Default for RangeChangeTracker {
  fn default() -> Self {
    Self {
      state:         FilterState::Uninitialized,
      current:       None,
      last_filtered: None
    }
  }
}

impl RangeChangeTracker {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn state(&self) -> FilterState {
    self.state
  }

  pub fn current(
    &self
  ) -> Option<&ResolvedRange> {
    self.current.as_ref()
  }

  pub fn last_filtered(
    &self
  ) -> Option<&ResolvedRange> {
    self.last_filtered.as_ref()
  }

  /// Replaces the current range.
  pub fn record(
    &mut self,
    range: ResolvedRange
  ) {
    self.current = Some(range);
    self.state = FilterState::Resolved;
  }

  /// Returns `true` when a filter must be issued for the current range:
  /// on first resolution, or when it differs from the last filtered one.
  pub fn poll(&mut self) -> bool {
    let Some(current) =
      self.current.as_ref()
    else {
      return false;
    };

    let needs_filter = self
      .last_filtered
      .is_none()
      || has_changed(
        self.last_filtered.as_ref(),
        current
      );

    self.state = if needs_filter {
      FilterState::AwaitingFilter
    } else {
      FilterState::Filtered
    };
    needs_filter
  }

  /// Marks the current range as applied on the host.
  pub fn confirm_filtered(&mut self) {
    if self.state
      != FilterState::AwaitingFilter
    {
      return;
    }
    self.last_filtered =
      self.current.clone();
    self.state = FilterState::Filtered;
  }
}
