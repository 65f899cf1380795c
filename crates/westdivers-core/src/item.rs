use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::datetime::normalize_date_key;
use crate::source::{CourseRecord, SocialEventRecord, SourceLists, TripRecord};

const SUBTITLE_SEPARATOR: &str = " · ";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Trip,
    Course,
    Event,
}

impl ItemKind {
    pub const ALL: [ItemKind; 3] = [ItemKind::Trip, ItemKind::Course, ItemKind::Event];

    /// Rank inside a day: trips first, then courses, then events.
    pub fn priority(self) -> u8 {
        match self {
            ItemKind::Trip => 1,
            ItemKind::Course => 2,
            ItemKind::Event => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ItemKind::Trip => "trip",
            ItemKind::Course => "course",
            ItemKind::Event => "event",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "trip" | "trips" => Some(ItemKind::Trip),
            "course" | "courses" => Some(ItemKind::Course),
            "event" | "events" => Some(ItemKind::Event),
            _ => None,
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    #[default]
    Active,
    Cancelled,
}

impl ItemStatus {
    fn from_raw(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("cancelled") | Some("canceled") => ItemStatus::Cancelled,
            _ => ItemStatus::Active,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CalendarItem {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ItemKind,
    pub title: String,
    pub date: String,
    pub time: String,
    pub location: String,
    pub subtitle: String,
    pub published: bool,
    pub status: ItemStatus,
}

impl CalendarItem {
    pub fn is_cancelled(&self) -> bool {
        self.status == ItemStatus::Cancelled
    }

    /// Case-folded haystack the free-text search runs against.
    pub fn search_text(&self) -> String {
        format!(
            "{}{}{}{}",
            self.title, self.location, self.subtitle, self.date
        )
        .to_lowercase()
    }

    pub fn from_trip(record: &TripRecord) -> Self {
        Self {
            id: text(&record.id),
            kind: ItemKind::Trip,
            title: text_or(&record.title, &record.name),
            date: normalize_date_key(&text(&record.date)),
            time: String::new(),
            location: text_or(&record.location, &record.site),
            subtitle: join_subtitle(&[level_label(&record.required_level)]),
            published: record.published.unwrap_or(false),
            status: ItemStatus::from_raw(record.status.as_deref()),
        }
    }

    pub fn from_course(record: &CourseRecord) -> Self {
        let date = record.start_date.as_ref().or(record.date.as_ref());
        Self {
            id: text(&record.id),
            kind: ItemKind::Course,
            title: text_or(&record.title, &record.name),
            date: normalize_date_key(date.map(String::as_str).unwrap_or_default()),
            time: String::new(),
            location: text(&record.location),
            subtitle: join_subtitle(&[
                text(&record.schedule),
                level_label(&record.required_level),
            ]),
            published: record.published.unwrap_or(false),
            status: ItemStatus::from_raw(record.status.as_deref()),
        }
    }

    pub fn from_event(record: &SocialEventRecord) -> Self {
        Self {
            id: text(&record.id),
            kind: ItemKind::Event,
            title: text_or(&record.title, &record.name),
            date: normalize_date_key(&text(&record.date)),
            time: text(&record.time),
            location: text(&record.location),
            subtitle: String::new(),
            published: record.published.unwrap_or(false),
            status: ItemStatus::from_raw(record.status.as_deref()),
        }
    }
}

/// Merges the three sources into one list: trips, then courses, then events,
/// each in supplier order. Nothing is dropped.
#[tracing::instrument(skip_all)]
pub fn normalize(sources: &SourceLists) -> Vec<CalendarItem> {
    let mut items = Vec::with_capacity(sources.len());
    items.extend(sources.trips.iter().map(CalendarItem::from_trip));
    items.extend(sources.courses.iter().map(CalendarItem::from_course));
    items.extend(sources.events.iter().map(CalendarItem::from_event));

    debug!(
        trips = sources.trips.len(),
        courses = sources.courses.len(),
        events = sources.events.len(),
        total = items.len(),
        "normalized calendar sources"
    );
    items
}

fn text(value: &Option<String>) -> String {
    value.as_deref().map(str::trim).unwrap_or_default().to_string()
}

fn text_or(primary: &Option<String>, fallback: &Option<String>) -> String {
    let primary = text(primary);
    if primary.is_empty() { text(fallback) } else { primary }
}

fn level_label(level: &Option<String>) -> String {
    let level = text(level);
    if level.is_empty() {
        level
    } else {
        format!("Level: {level}")
    }
}

fn join_subtitle(parts: &[String]) -> String {
    parts
        .iter()
        .filter(|part| !part.is_empty())
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(SUBTITLE_SEPARATOR)
}
