use chrono::{
  Datelike,
  NaiveDate,
  Weekday
};
use serde::{
  Deserialize,
  Serialize
};

use crate::datetime::{
  add_days,
  iso_key,
  shift_month_start,
  start_of_week
};

pub const GRID_WEEKS: usize = 6;
pub const GRID_CELLS: usize =
  GRID_WEEKS * 7;

#[derive(
  Debug,
  Clone,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
)]
pub struct CalendarCell {
  pub date:     NaiveDate,
  pub iso:      String,
  #[serde(rename = "inMonth")]
  pub in_month: bool
}

#[derive(
  Debug,
  Clone,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
)]
pub struct MonthGrid {
  pub year:  i32,
  pub month: u32,
  pub cells: Vec<CalendarCell>
}

impl MonthGrid {
  /// Grid for the month `month_offset`
  /// months away from the one holding
  /// `today`. Always six Monday-first
  /// weeks.
  #[tracing::instrument]
  pub fn build(
    today: NaiveDate,
    month_offset: i32
  ) -> Self {
    let first = shift_month_start(
      today,
      month_offset
    );
    let grid_start =
      start_of_week(first, Weekday::Mon);

    let cells = (0..GRID_CELLS as i64)
      .map(|offset| {
        let date =
          add_days(grid_start, offset);
        CalendarCell {
          date,
          iso: iso_key(date),
          in_month: date.year()
            == first.year()
            && date.month()
              == first.month()
        }
      })
      .collect::<Vec<_>>();

    tracing::trace!(
      first = %first,
      grid_start = %grid_start,
      "built month grid"
    );

    Self {
      year: first.year(),
      month: first.month(),
      cells
    }
  }

  pub fn title(&self) -> String {
    NaiveDate::from_ymd_opt(
      self.year, self.month, 1
    )
    .map(|first| {
      first.format("%B %Y").to_string()
    })
    .unwrap_or_else(|| {
      format!(
        "{:04}-{:02}",
        self.year, self.month
      )
    })
  }

  pub fn weeks(
    &self
  ) -> impl Iterator<Item = &[CalendarCell]>
  {
    self.cells.chunks(7)
  }

  pub fn contains(
    &self,
    iso: &str
  ) -> bool {
    self
      .cells
      .iter()
      .any(|cell| cell.iso == iso)
  }
}

pub fn weekday_labels()
-> [&'static str; 7] {
  [
    "Mon", "Tue", "Wed", "Thu", "Fri",
    "Sat", "Sun"
  ]
}

#[cfg(test)]
mod tests {
  use chrono::{
    Datelike,
    NaiveDate,
    Weekday
  };

  use super::{
    GRID_CELLS,
    MonthGrid
  };
  use crate::datetime::{
    days_in_month,
    shift_month_start
  };

  fn date(
    y: i32,
    m: u32,
    d: u32
  ) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d)
      .expect("valid date")
  }

  #[test]
  fn every_offset_yields_six_monday_first_weeks()
   {
    let today = date(2025, 4, 15);
    let extremes = [
      i32::MIN,
      -4_000_000,
      -3_200_000,
      3_200_000,
      4_000_000,
      i32::MAX
    ];
    for offset in
      (-36..=36).chain(extremes)
    {
      let grid =
        MonthGrid::build(today, offset);
      assert_eq!(
        (grid.year, grid.month)
          >= (today.year(), today.month()),
        offset >= 0
      );
      assert_eq!(
        (grid.cells[GRID_CELLS - 1].date
          - grid.cells[0].date)
          .num_days(),
        GRID_CELLS as i64 - 1
      );
      assert_eq!(
        grid.cells.len(),
        GRID_CELLS
      );
      assert_eq!(
        grid.cells[0].date.weekday(),
        Weekday::Mon
      );
      assert_eq!(grid.weeks().count(), 6);

      let first =
        shift_month_start(today, offset);
      let in_month = grid
        .cells
        .iter()
        .filter(|cell| cell.in_month)
        .count();
      assert_eq!(
        in_month as u32,
        days_in_month(
          first.year(),
          first.month()
        )
      );
    }
  }

  #[test]
  fn april_2025_starts_on_previous_monday()
  {
    let grid = MonthGrid::build(
      date(2025, 4, 15),
      0
    );
    assert_eq!(grid.title(), "April 2025");
    assert_eq!(
      grid.cells[0].iso,
      "2025-03-31"
    );
    assert!(!grid.cells[0].in_month);
    assert_eq!(
      grid.cells[1].iso,
      "2025-04-01"
    );
    assert!(grid.cells[1].in_month);
    assert_eq!(
      grid.cells[41].iso,
      "2025-05-11"
    );
    assert!(grid.contains("2025-04-30"));
  }

  #[test]
  fn month_starting_on_monday_keeps_the_first()
   {
    let grid = MonthGrid::build(
      date(2025, 9, 10),
      0
    );
    assert_eq!(
      grid.cells[0].iso,
      "2025-09-01"
    );
    assert!(grid.cells[0].in_month);
  }

  #[test]
  fn short_february_still_renders_six_rows()
   {
    // February 2021 fits in exactly four
    // Monday-first weeks.
    let grid = MonthGrid::build(
      date(2021, 5, 1),
      -3
    );
    assert_eq!(grid.month, 2);
    assert_eq!(
      grid.cells[0].iso,
      "2021-02-01"
    );
    assert_eq!(grid.cells.len(), 42);
    assert!(
      grid.cells[28..]
        .iter()
        .all(|cell| !cell.in_month)
    );
  }

  #[test]
  fn negative_offsets_cross_year_boundary()
  {
    let grid = MonthGrid::build(
      date(2025, 1, 20),
      -1
    );
    assert_eq!(grid.year, 2024);
    assert_eq!(grid.month, 12);
    assert_eq!(
      grid.title(),
      "December 2024"
    );
  }
}
