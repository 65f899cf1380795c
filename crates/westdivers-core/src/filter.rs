use serde::{
  Deserialize,
  Serialize
};
use tracing::{
  debug,
  trace
};

use crate::item::{
  CalendarItem,
  ItemKind
};

#[derive(
  Debug,
  Clone,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
)]
#[serde(default)]
pub struct ItemFilter {
  pub show_trips:   bool,
  pub show_courses: bool,
  pub show_events:  bool,
  pub show_past:    bool,
  pub search:       String
}

impl Default for ItemFilter {
  fn default() -> Self {
    Self {
      show_trips:   true,
      show_courses: true,
      show_events:  true,
      show_past:    false,
      search:       String::new()
    }
  }
}

impl ItemFilter {
  pub fn shows(
    &self,
    kind: ItemKind
  ) -> bool {
    match kind {
      | ItemKind::Trip => {
        self.show_trips
      }
      | ItemKind::Course => {
        self.show_courses
      }
      | ItemKind::Event => {
        self.show_events
      }
    }
  }

  pub fn toggle(
    &mut self,
    kind: ItemKind
  ) -> bool {
    let slot = match kind {
      | ItemKind::Trip => {
        &mut self.show_trips
      }
      | ItemKind::Course => {
        &mut self.show_courses
      }
      | ItemKind::Event => {
        &mut self.show_events
      }
    };
    *slot = !*slot;
    *slot
  }

  /// Every predicate must pass.
  /// `today` is an ISO key; ISO keys
  /// compare chronologically as plain
  /// strings.
  pub fn matches(
    &self,
    item: &CalendarItem,
    can_see_drafts: bool,
    today: &str,
    needle: &str
  ) -> bool {
    if !self.shows(item.kind) {
      trace!(id = %item.id, kind = %item.kind, "dropped by type toggle");
      return false;
    }

    if !can_see_drafts
      && !item.published
    {
      trace!(id = %item.id, "dropped unpublished item");
      return false;
    }

    if !self.show_past
      && item.date.as_str() < today
    {
      trace!(id = %item.id, date = %item.date, "dropped past item");
      return false;
    }

    if !needle.is_empty()
      && !item
        .search_text()
        .contains(needle)
    {
      trace!(id = %item.id, "dropped by search");
      return false;
    }

    true
  }

  /// Filters without touching `items`;
  /// survivors keep their input order.
  #[tracing::instrument(skip(
    self, items
  ))]
  pub fn apply(
    &self,
    items: &[CalendarItem],
    can_see_drafts: bool,
    today: &str
  ) -> Vec<CalendarItem> {
    let needle =
      self.search.to_lowercase();
    let out = items
      .iter()
      .filter(|item| {
        self.matches(
          item,
          can_see_drafts,
          today,
          &needle
        )
      })
      .cloned()
      .collect::<Vec<_>>();

    debug!(
      input = items.len(),
      kept = out.len(),
      "applied calendar filter"
    );
    out
  }
}
