use std::cmp::Ordering;
use std::collections::BTreeMap;

use tracing::debug;

use crate::item::CalendarItem;

/// ISO date key to that day's items, already in display order.
pub type DateBuckets = BTreeMap<String, Vec<CalendarItem>>;

/// Display order inside one day. The date is compared first so the same
/// ordering also serves flat lists.
pub fn compare_items(a: &CalendarItem, b: &CalendarItem) -> Ordering {
    a.date
        .cmp(&b.date)
        .then_with(|| a.kind.priority().cmp(&b.kind.priority()))
        .then_with(|| a.title.cmp(&b.title))
}

#[tracing::instrument(skip_all)]
pub fn bucket_by_date(items: &[CalendarItem]) -> DateBuckets {
    let mut buckets = DateBuckets::new();
    for item in items {
        buckets
            .entry(item.date.clone())
            .or_default()
            .push(item.clone());
    }

    for bucket in buckets.values_mut() {
        // stable: equal kind and title keep filter order
        bucket.sort_by(compare_items);
    }

    debug!(
        items = items.len(),
        days = buckets.len(),
        "bucketed calendar items"
    );
    buckets
}

/// All bucketed items as one list, earliest date first.
pub fn flatten(buckets: &DateBuckets) -> Vec<CalendarItem> {
    buckets.values().flatten().cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::{bucket_by_date, flatten};
    use crate::datetime::SENTINEL_DATE;
    use crate::item::{CalendarItem, ItemKind, ItemStatus};

    fn item(id: &str, kind: ItemKind, title: &str, date: &str) -> CalendarItem {
        CalendarItem {
            id: id.to_string(),
            kind,
            title: title.to_string(),
            date: date.to_string(),
            time: String::new(),
            location: String::new(),
            subtitle: String::new(),
            published: true,
            status: ItemStatus::Active,
        }
    }

    #[test]
    fn trip_precedes_course_regardless_of_title() {
        let items = vec![
            item("c1", ItemKind::Course, "AAA course", "2025-04-12"),
            item("e1", ItemKind::Event, "000 party", "2025-04-12"),
            item("t1", ItemKind::Trip, "ZZZ trip", "2025-04-12"),
        ];

        let buckets = bucket_by_date(&items);
        let ids: Vec<&str> = buckets["2025-04-12"]
            .iter()
            .map(|item| item.id.as_str())
            .collect();
        assert_eq!(ids, vec!["t1", "c1", "e1"]);
    }

    #[test]
    fn titles_break_ties_case_sensitively() {
        let items = vec![
            item("b", ItemKind::Trip, "beach dive", "2025-04-12"),
            item("a", ItemKind::Trip, "Boat dive", "2025-04-12"),
            item("c", ItemKind::Trip, "Alpha", "2025-04-12"),
        ];

        let buckets = bucket_by_date(&items);
        let titles: Vec<&str> = buckets["2025-04-12"]
            .iter()
            .map(|item| item.title.as_str())
            .collect();
        assert_eq!(titles, vec!["Alpha", "Boat dive", "beach dive"]);
    }

    #[test]
    fn buckets_hold_every_item_exactly_once() {
        let items = vec![
            item("t1", ItemKind::Trip, "a", "2025-04-12"),
            item("t2", ItemKind::Trip, "b", "2025-04-13"),
            item("c1", ItemKind::Course, "c", "2025-04-12"),
            item("e1", ItemKind::Event, "d", SENTINEL_DATE),
            item("e2", ItemKind::Event, "d", SENTINEL_DATE),
        ];

        let buckets = bucket_by_date(&items);
        assert_eq!(buckets.len(), 3);

        let mut flat_ids: Vec<String> = flatten(&buckets).into_iter().map(|i| i.id).collect();
        let mut input_ids: Vec<String> = items.into_iter().map(|i| i.id).collect();
        flat_ids.sort();
        input_ids.sort();
        assert_eq!(flat_ids, input_ids);
    }

    #[test]
    fn sentinel_bucket_sorts_last() {
        let items = vec![
            item("x", ItemKind::Event, "undated", SENTINEL_DATE),
            item("t1", ItemKind::Trip, "a", "2030-01-01"),
        ];

        let buckets = bucket_by_date(&items);
        let keys: Vec<&str> = buckets.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["2030-01-01", SENTINEL_DATE]);

        let flat = flatten(&buckets);
        assert_eq!(flat.last().map(|i| i.id.as_str()), Some("x"));
    }
}
