//! Fixed 6x7 month grid, Monday-first.

use chrono::{
  Datelike,
  NaiveDate,
  NaiveDateTime
};
use serde::Serialize;

use crate::calendar::{
  days_in_month,
  days_in_previous_month,
  first_day_of_month,
  first_weekday_of_month,
  monday_index,
  roll_month
};
use crate::normalize::date_start;
use crate::range::ResolvedRange;

pub const DAYS_IN_WEEK: usize = 7;
pub const WEEKS_IN_GRID: usize = 6;
pub const GRID_CELLS: usize =
  DAYS_IN_WEEK * WEEKS_IN_GRID;

#[derive(
  Debug,
  Clone,
  PartialEq,
  Eq,
  Serialize,
)]
pub struct DayCell {
  pub day:              u32,
  pub in_current_month: bool,
  pub date:             NaiveDateTime,
  pub is_highlighted:   bool,
  pub is_today:         bool
}

#[derive(
  Debug,
  Clone,
  PartialEq,
  Eq,
  Serialize,
)]
pub struct MonthGrid {
  pub year:   i32,
  pub month0: u32,
  pub cells:  Vec<DayCell>
}

impl MonthGrid {
  pub fn rows(
    &self
  ) -> impl Iterator<Item = &[DayCell]> {
    self.cells.chunks(DAYS_IN_WEEK)
  }

  pub fn highlighted(
    &self
  ) -> impl Iterator<Item = &DayCell> {
    self
      .cells
      .iter()
      .filter(|cell| cell.is_highlighted)
  }

  pub fn today(&self) -> Option<&DayCell> {
    self
      .cells
      .iter()
      .find(|cell| cell.is_today)
  }
}

/// Lays out `(year, month0)` into exactly 42 cells.
///
/// Cells before day 1 come from the previous month and cells after the
/// last day from the next; both are flagged out-of-month. `today` only
/// marks an in-month cell.
#[must_use]
pub fn build_grid(
  year: i32,
  month0: i32,
  highlight: Option<&ResolvedRange>,
  today: NaiveDate
) -> MonthGrid {
  let (year, month0_u) =
    roll_month(year, month0);
  let month0 = month0_u as i32;

  let lead = monday_index(
    first_weekday_of_month(year, month0)
  );
  let prev_days =
    days_in_previous_month(year, month0);
  let month_days =
    days_in_month(year, month0);

  let prev_first =
    first_day_of_month(year, month0 - 1);
  let this_first =
    first_day_of_month(year, month0);
  let next_first =
    first_day_of_month(year, month0 + 1);

  let mut cells =
    Vec::with_capacity(GRID_CELLS);

  for i in 0..lead {
    let day = prev_days - lead + i + 1;
    cells.push(cell(
      prev_first, day, false
    ));
  }

  for day in 1..=month_days {
    cells.push(cell(
      this_first, day, true
    ));
  }

  let mut next_day = 1;
  while cells.len() < GRID_CELLS {
    cells.push(cell(
      next_first, next_day, false
    ));
    next_day += 1;
  }

  let today_start = date_start(today);
  for cell in &mut cells {
    cell.is_highlighted = highlight
      .is_some_and(|range| {
        range.contains(cell.date)
      });
    cell.is_today = cell.in_current_month
      && cell.date == today_start;
  }

  MonthGrid {
    year,
    month0: month0_u,
    cells
  }
}

fn cell(
  month_first: NaiveDate,
  day: u32,
  in_current_month: bool
) -> DayCell {
  let date = month_first
    .with_day0(day - 1)
    .unwrap_or(month_first);
  DayCell {
    day,
    in_current_month,
    date: date_start(date),
    is_highlighted: false,
    is_today: false
  }
}

#[cfg(test)]
mod tests {
  use chrono::{
    Datelike,
    NaiveDate,
    Weekday
  };

  use super::*;
  use crate::range::resolve_custom;

  fn day(
    y: i32,
    m: u32,
    d: u32
  ) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d)
      .expect("valid date")
  }

  #[test]
  fn every_month_has_42_cells() {
    let today = day(2025, 9, 17);
    for year in [1999, 2000, 2024, 2025, 2100]
    {
      for month0 in 0..12 {
        let grid = build_grid(
          year, month0, None, today
        );
        assert_eq!(grid.cells.len(), 42);
        let in_month = grid
          .cells
          .iter()
          .filter(|c| c.in_current_month)
          .count() as u32;
        assert_eq!(
          in_month,
          days_in_month(year, month0),
          "{year}-{month0}"
        );
        assert_eq!(grid.rows().count(), 6);
        // consecutive cells are consecutive days
        for pair in grid.cells.windows(2) {
          assert_eq!(
            (pair[1].date - pair[0].date)
              .num_days(),
            1
          );
        }
        assert_eq!(
          grid.cells[0].date.weekday(),
          Weekday::Mon
        );
      }
    }
  }

  #[test]
  fn september_2025_opens_on_day_one() {
    let grid = build_grid(
      2025,
      8,
      None,
      day(2025, 9, 17)
    );
    let first_row = grid
      .rows()
      .next()
      .expect("first row");
    assert!(first_row[0].in_current_month);
    assert_eq!(first_row[0].day, 1);
    assert_eq!(first_row[6].day, 7);

    // 30 days then 12 October days
    let last = grid.cells.last().expect("cell");
    assert!(!last.in_current_month);
    assert_eq!(last.day, 12);
    assert_eq!(last.date.month(), 10);
  }

  #[test]
  fn leading_cells_come_from_previous_month() {
    // June 2025 starts on a Sunday: six May days lead
    let grid = build_grid(
      2025,
      5,
      None,
      day(2025, 6, 1)
    );
    let days = grid.cells[..7]
      .iter()
      .map(|c| (c.day, c.in_current_month))
      .collect::<Vec<_>>();
    assert_eq!(
      days,
      vec![
        (26, false),
        (27, false),
        (28, false),
        (29, false),
        (30, false),
        (31, false),
        (1, true)
      ]
    );
    assert_eq!(grid.cells[0].date.month(), 5);
  }

  #[test]
  fn january_borrows_from_december() {
    // January 2025 starts on a Wednesday
    let grid = build_grid(
      2025,
      0,
      None,
      day(2025, 1, 1)
    );
    assert_eq!(grid.cells[0].day, 30);
    assert_eq!(grid.cells[0].date.year(), 2024);
    assert_eq!(grid.cells[2].day, 1);
    assert!(grid.cells[2].is_today);
  }

  #[test]
  fn highlight_is_inclusive() {
    let range = resolve_custom(
      day(2025, 9, 29),
      day(2025, 10, 2)
    )
    .expect("range");
    let grid = build_grid(
      2025,
      8,
      Some(&range),
      day(2025, 9, 17)
    );
    let marked = grid
      .highlighted()
      .map(|c| (c.date.month(), c.day))
      .collect::<Vec<_>>();
    assert_eq!(
      marked,
      vec![(9, 29), (9, 30), (10, 1), (10, 2)]
    );
  }

  #[test]
  fn today_only_marks_in_month_cells() {
    let grid = build_grid(
      2025,
      8,
      None,
      day(2025, 10, 3)
    );
    assert!(grid.today().is_none());

    let grid = build_grid(
      2025,
      8,
      None,
      day(2025, 9, 17)
    );
    let today = grid.today().expect("today");
    assert_eq!(today.day, 17);
  }

  #[test]
  fn overflowing_month_is_rolled() {
    let grid = build_grid(
      2025,
      12,
      None,
      day(2025, 9, 17)
    );
    assert_eq!((grid.year, grid.month0), (2026, 0));
  }
}
