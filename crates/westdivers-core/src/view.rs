use anyhow::anyhow;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::bucket::{DateBuckets, bucket_by_date, flatten};
use crate::datetime::{iso_key, month_offset_bounds, parse_iso_date};
use crate::filter::ItemFilter;
use crate::grid::MonthGrid;
use crate::item::{CalendarItem, ItemKind, normalize};
use crate::source::SourceLists;

/// Everything the viewer can change. Owned by whatever drives the UI and fed
/// back into [`CalendarViewState::snapshot`] after each change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarViewState {
    #[serde(flatten)]
    pub filter: ItemFilter,

    #[serde(default)]
    pub month_offset: i32,

    #[serde(default)]
    pub selected: String,
}

impl CalendarViewState {
    pub fn new(today: NaiveDate, show_past: bool) -> Self {
        Self {
            filter: ItemFilter {
                show_past,
                ..ItemFilter::default()
            },
            month_offset: 0,
            selected: iso_key(today),
        }
    }

    /// Accepts any real `YYYY-MM-DD`, inside the displayed month or not.
    /// On error the selection is left alone.
    pub fn select(&mut self, raw: &str) -> anyhow::Result<()> {
        let date = parse_iso_date(raw)
            .ok_or_else(|| anyhow!("not a valid YYYY-MM-DD date: {raw}"))?;
        self.select_date(date);
        Ok(())
    }

    pub fn select_date(&mut self, date: NaiveDate) {
        self.selected = iso_key(date);
        debug!(selected = %self.selected, "selected day");
    }

    /// Back to the current month with today selected, as one update.
    pub fn jump_to_today(&mut self, today: NaiveDate) {
        *self = Self {
            month_offset: 0,
            selected: iso_key(today),
            ..self.clone()
        };
        debug!(selected = %self.selected, "jumped to today");
    }

    /// Moves the displayed month, stopping at the first and last navigable
    /// months as seen from `today`.
    pub fn shift_month(&mut self, step: i32, today: NaiveDate) -> i32 {
        let (lowest, highest) = month_offset_bounds(today);
        self.month_offset = self.month_offset.saturating_add(step).clamp(lowest, highest);
        debug!(month_offset = self.month_offset, "shifted month");
        self.month_offset
    }

    pub fn toggle(&mut self, kind: ItemKind) -> bool {
        self.filter.toggle(kind)
    }

    pub fn set_show_past(&mut self, show_past: bool) {
        self.filter.show_past = show_past;
    }

    pub fn set_search(&mut self, search: impl Into<String>) {
        self.filter.search = search.into();
    }

    /// Repairs a state read back from disk. Returns true when something changed.
    pub fn sanitize(&mut self, today: NaiveDate) -> bool {
        let mut repaired = false;
        if parse_iso_date(&self.selected).is_none() {
            warn!(selected = %self.selected, "stored selection invalid; selecting today");
            self.selected = iso_key(today);
            repaired = true;
        }

        let (lowest, highest) = month_offset_bounds(today);
        let clamped = self.month_offset.clamp(lowest, highest);
        if clamped != self.month_offset {
            warn!(month_offset = self.month_offset, clamped, "stored month offset out of range");
            self.month_offset = clamped;
            repaired = true;
        }
        repaired
    }

    /// Runs normalize, filter and bucket over `sources` and builds the grid.
    /// `can_see_drafts` is asked for on every call; nothing here caches it.
    #[tracing::instrument(skip(self, sources))]
    pub fn snapshot(
        &self,
        sources: &SourceLists,
        can_see_drafts: bool,
        today: NaiveDate,
    ) -> CalendarSnapshot {
        let today_key = iso_key(today);
        let normalized = normalize(sources);
        let items = self.filter.apply(&normalized, can_see_drafts, &today_key);
        let buckets = bucket_by_date(&items);
        let grid = MonthGrid::build(today, self.month_offset);

        CalendarSnapshot {
            grid,
            items,
            buckets,
            selected: self.selected.clone(),
            today: today_key,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarSnapshot {
    pub grid: MonthGrid,
    /// Filtered items in supplier order.
    pub items: Vec<CalendarItem>,
    pub buckets: DateBuckets,
    pub selected: String,
    pub today: String,
}

impl CalendarSnapshot {
    pub fn items_on(&self, iso: &str) -> &[CalendarItem] {
        self.buckets.get(iso).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn selected_items(&self) -> &[CalendarItem] {
        self.items_on(&self.selected)
    }

    pub fn count_on(&self, iso: &str) -> usize {
        self.items_on(iso).len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn ordered(&self) -> Vec<CalendarItem> {
        flatten(&self.buckets)
    }
}
