use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::source::{CourseRecord, SocialEventRecord, SourceLists, TripRecord};
use crate::view::CalendarViewState;

/// Snapshot directory the suppliers export into, plus the persisted view state.
#[derive(Debug)]
pub struct ClubStore {
    pub data_dir: PathBuf,
    pub trips_path: PathBuf,
    pub courses_path: PathBuf,
    pub events_path: PathBuf,
    pub view_path: PathBuf,
}

impl ClubStore {
    #[tracing::instrument(skip(data_dir))]
    pub fn open(data_dir: &Path) -> anyhow::Result<Self> {
        let data_dir = data_dir.to_path_buf();
        fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create {}", data_dir.display()))?;

        let trips_path = data_dir.join("trips.jsonl");
        let courses_path = data_dir.join("courses.jsonl");
        let events_path = data_dir.join("events.jsonl");
        let view_path = data_dir.join("view.json");

        info!(
            data_dir = %data_dir.display(),
            trips = %trips_path.display(),
            courses = %courses_path.display(),
            events = %events_path.display(),
            view = %view_path.display(),
            "opened club store"
        );

        Ok(Self {
            data_dir,
            trips_path,
            courses_path,
            events_path,
            view_path,
        })
    }

    #[tracing::instrument(skip(self))]
    pub fn load_trips(&self) -> anyhow::Result<Vec<TripRecord>> {
        load_jsonl(&self.trips_path).context("failed to load trips.jsonl")
    }

    #[tracing::instrument(skip(self))]
    pub fn load_courses(&self) -> anyhow::Result<Vec<CourseRecord>> {
        load_jsonl(&self.courses_path).context("failed to load courses.jsonl")
    }

    #[tracing::instrument(skip(self))]
    pub fn load_events(&self) -> anyhow::Result<Vec<SocialEventRecord>> {
        load_jsonl(&self.events_path).context("failed to load events.jsonl")
    }

    pub fn load_sources(&self) -> anyhow::Result<SourceLists> {
        Ok(SourceLists {
            trips: self.load_trips()?,
            courses: self.load_courses()?,
            events: self.load_events()?,
        })
    }

    /// Stored view state, or a fresh one when none is stored or it is unreadable.
    #[tracing::instrument(skip(self, today))]
    pub fn load_view_state(&self, today: NaiveDate, show_past: bool) -> CalendarViewState {
        let fresh = || CalendarViewState::new(today, show_past);
        if !self.view_path.exists() {
            debug!("no stored view state");
            return fresh();
        }

        let raw = match fs::read_to_string(&self.view_path) {
            Ok(raw) => raw,
            Err(err) => {
                warn!(file = %self.view_path.display(), error = %err, "failed reading view state");
                return fresh();
            }
        };

        match serde_json::from_str::<CalendarViewState>(&raw) {
            Ok(mut state) => {
                state.sanitize(today);
                state
            }
            Err(err) => {
                warn!(file = %self.view_path.display(), error = %err, "failed parsing view state; starting fresh");
                fresh()
            }
        }
    }

    #[tracing::instrument(skip(self, state))]
    pub fn save_view_state(&self, state: &CalendarViewState) -> anyhow::Result<()> {
        let serialized = serde_json::to_string_pretty(state)?;
        write_atomic(&self.view_path, serialized.as_bytes()).context("failed to save view.json")
    }
}

#[tracing::instrument(skip(path))]
fn load_jsonl<T: DeserializeOwned>(path: &Path) -> anyhow::Result<Vec<T>> {
    if !path.exists() {
        debug!(file = %path.display(), "source file missing; treating as empty");
        return Ok(Vec::new());
    }

    debug!(file = %path.display(), "loading jsonl");
    let file = fs::File::open(path)?;
    let reader = BufReader::new(file);

    let mut out = Vec::new();
    for (idx, raw) in reader.split(b'\n').enumerate() {
        let raw = raw?;
        let line = match String::from_utf8(raw) {
            Ok(line) => line,
            Err(err) => {
                warn!(
                    file = %path.display(),
                    line = idx + 1,
                    "record is not valid UTF-8; replacing bad bytes"
                );
                String::from_utf8_lossy(err.as_bytes()).into_owned()
            }
        };
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        // Field-level problems are absorbed by the lenient record types; only
        // lines that are not a JSON object at all are skipped.
        match serde_json::from_str::<T>(trimmed) {
            Ok(record) => out.push(record),
            Err(err) => warn!(
                file = %path.display(),
                line = idx + 1,
                error = %err,
                "skipping unreadable record"
            ),
        }
    }

    debug!(count = out.len(), "loaded records from jsonl");
    Ok(out)
}

fn write_atomic(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(bytes)?;
    temp.flush()?;

    temp.persist(path)
        .map_err(|err| anyhow!("failed to persist {}: {}", path.display(), err))?;

    Ok(())
}
