use std::io::{self, IsTerminal, Write};

use anyhow::anyhow;
use unicode_width::UnicodeWidthStr;

use crate::config::Config;
use crate::datetime::{SENTINEL_DATE, parse_iso_date};
use crate::grid::weekday_labels;
use crate::item::CalendarItem;
use crate::view::CalendarSnapshot;

pub const EMPTY_MESSAGE: &str = "no items for these filters";

const MIN_CELL_WIDTH: usize = 8;

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let color_cfg = cfg.get("color").unwrap_or_else(|| "on".to_string());
        let color = match color_cfg.to_ascii_lowercase().as_str() {
            "on" | "yes" | "true" | "1" => true,
            "off" | "no" | "false" | "0" => false,
            other => return Err(anyhow!("invalid color setting: {other}")),
        };

        Ok(Self { color })
    }

    pub fn plain() -> Self {
        Self { color: false }
    }

    #[tracing::instrument(skip(self, snapshot))]
    pub fn print_month(&mut self, snapshot: &CalendarSnapshot) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        self.write_month(&mut out, snapshot)
    }

    #[tracing::instrument(skip(self, snapshot))]
    pub fn print_day(&mut self, snapshot: &CalendarSnapshot) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        self.write_day(&mut out, snapshot)
    }

    #[tracing::instrument(skip(self, items))]
    pub fn print_items(&mut self, items: &[CalendarItem]) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        self.write_items(&mut out, items)
    }

    pub fn write_month<W: Write>(
        &self,
        mut out: W,
        snapshot: &CalendarSnapshot,
    ) -> anyhow::Result<()> {
        let grid = &snapshot.grid;
        writeln!(out, "{}", self.paint(&grid.title(), "1"))?;

        let labels: Vec<String> = grid
            .cells
            .iter()
            .map(|cell| {
                let mut text = cell.date.format("%e").to_string().trim().to_string();
                let count = snapshot.count_on(&cell.iso);
                if count > 0 {
                    text.push_str(&format!("({count})"));
                }
                if cell.iso == snapshot.today {
                    text.push('*');
                }
                if cell.iso == snapshot.selected {
                    text = format!("[{text}]");
                }
                text
            })
            .collect();

        // One column per weekday, wide enough for the busiest cell plus a gap.
        let width = labels
            .iter()
            .map(|text| UnicodeWidthStr::width(text.as_str()) + 1)
            .max()
            .unwrap_or(0)
            .max(MIN_CELL_WIDTH);

        for label in weekday_labels() {
            write!(out, "{label:<width$}")?;
        }
        writeln!(out)?;

        for (week, texts) in grid.weeks().zip(labels.chunks(7)) {
            for (cell, text) in week.iter().zip(texts) {
                let painted = if cell.iso == snapshot.selected {
                    self.paint(text, "7")
                } else if cell.iso == snapshot.today {
                    self.paint(text, "1;36")
                } else if !cell.in_month {
                    self.paint(text, "2")
                } else if snapshot.count_on(&cell.iso) > 0 {
                    self.paint(text, "33")
                } else {
                    text.clone()
                };
                let padding = width.saturating_sub(UnicodeWidthStr::width(text.as_str()));
                write!(out, "{}{}", painted, " ".repeat(padding))?;
            }
            writeln!(out)?;
        }

        if snapshot.is_empty() {
            writeln!(out)?;
            writeln!(out, "{EMPTY_MESSAGE}")?;
        }
        Ok(())
    }

    pub fn write_day<W: Write>(
        &self,
        mut out: W,
        snapshot: &CalendarSnapshot,
    ) -> anyhow::Result<()> {
        let heading = parse_iso_date(&snapshot.selected)
            .map(|date| date.format("%A, %Y-%m-%d").to_string())
            .unwrap_or_else(|| snapshot.selected.clone());
        writeln!(out, "{}", self.paint(&heading, "1"))?;

        let items = snapshot.selected_items();
        if items.is_empty() {
            writeln!(out, "{EMPTY_MESSAGE}")?;
            return Ok(());
        }
        self.write_items(out, items)
    }

    pub fn write_items<W: Write>(&self, out: W, items: &[CalendarItem]) -> anyhow::Result<()> {
        let mut out = out;
        if items.is_empty() {
            writeln!(out, "{EMPTY_MESSAGE}")?;
            return Ok(());
        }

        let headers = vec![
            "Date".to_string(),
            "Time".to_string(),
            "Type".to_string(),
            "Title".to_string(),
            "Location".to_string(),
            "Details".to_string(),
        ];

        let mut rows = Vec::with_capacity(items.len());
        for item in items {
            let date = if item.date == SENTINEL_DATE {
                "undated".to_string()
            } else {
                item.date.clone()
            };

            let mut details = vec![];
            if !item.subtitle.is_empty() {
                details.push(item.subtitle.clone());
            }
            if item.is_cancelled() {
                details.push(self.paint("[cancelled]", "31"));
            }
            if !item.published {
                details.push(self.paint("[draft]", "35"));
            }

            let title = if item.is_cancelled() {
                self.paint(&item.title, "31")
            } else {
                item.title.clone()
            };

            rows.push(vec![
                date,
                item.time.clone(),
                item.kind.to_string(),
                title,
                item.location.clone(),
                details.join(" "),
            ]);
        }

        write_table(&mut out, headers, rows)?;
        Ok(())
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color || !io::stdout().is_terminal() {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for idx in 0..column_count {
        write!(writer, "{:width$} ", headers[idx], width = widths[idx])?;
    }
    writeln!(writer)?;

    for idx in 0..column_count {
        write!(writer, "{:-<width$} ", "", width = widths[idx])?;
    }
    writeln!(writer)?;

    for row in rows {
        for idx in 0..column_count {
            let cell = &row[idx];
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{EMPTY_MESSAGE, Renderer, strip_ansi};
    use crate::source::{SourceLists, TripRecord};
    use crate::view::CalendarViewState;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 4, 15).expect("valid date")
    }

    fn render_month(sources: &SourceLists) -> String {
        let state = CalendarViewState::new(today(), true);
        let snapshot = state.snapshot(sources, false, today());
        let mut buf = Vec::new();
        Renderer::plain()
            .write_month(&mut buf, &snapshot)
            .expect("render month");
        String::from_utf8(buf).expect("utf8")
    }

    #[test]
    fn month_view_marks_today_and_counts() {
        let sources = SourceLists {
            trips: vec![TripRecord {
                id: Some("t1".to_string()),
                title: Some("Shore dive".to_string()),
                date: Some("2025-04-12".to_string()),
                published: Some(true),
                ..TripRecord::default()
            }],
            ..SourceLists::default()
        };

        let text = render_month(&sources);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "April 2025");
        assert!(lines[1].starts_with("Mon"));
        assert_eq!(lines.len(), 8);
        assert!(text.contains("12(1)"));
        assert!(text.contains("[15*]"));
        assert!(!text.contains(EMPTY_MESSAGE));
    }

    #[test]
    fn busy_selected_today_keeps_columns_aligned() {
        let sources = SourceLists {
            trips: (0..12)
                .map(|n| TripRecord {
                    id: Some(format!("t{n}")),
                    date: Some("2025-04-15".to_string()),
                    published: Some(true),
                    ..TripRecord::default()
                })
                .collect(),
            ..SourceLists::default()
        };

        let text = render_month(&sources);
        let lines: Vec<&str> = text.lines().collect();
        let header = lines[1];
        let row = lines
            .iter()
            .find(|line| line.contains("[15(12)*]"))
            .expect("row with today");

        assert_eq!(row.find("[15(12)*]"), header.find("Tue"));
        assert_eq!(row.find("16"), header.find("Wed"));
    }

    #[test]
    fn empty_month_says_so() {
        let text = render_month(&SourceLists::default());
        assert!(text.trim_end().ends_with(EMPTY_MESSAGE));
    }

    #[test]
    fn item_table_flags_cancelled_and_drafts() {
        let state = CalendarViewState::new(today(), true);
        let sources = SourceLists {
            trips: vec![TripRecord {
                id: Some("t9".to_string()),
                title: Some("Night dive".to_string()),
                date: Some("2025-04-15".to_string()),
                status: Some("cancelled".to_string()),
                ..TripRecord::default()
            }],
            ..SourceLists::default()
        };
        let snapshot = state.snapshot(&sources, true, today());

        let mut buf = Vec::new();
        Renderer::plain()
            .write_day(&mut buf, &snapshot)
            .expect("render day");
        let text = String::from_utf8(buf).expect("utf8");

        assert!(text.starts_with("Tuesday, 2025-04-15"));
        assert!(text.contains("Night dive"));
        assert!(text.contains("[cancelled] [draft]"));
    }

    #[test]
    fn strips_ansi_sequences() {
        assert_eq!(strip_ansi("\x1b[31mred\x1b[0m"), "red");
    }
}
