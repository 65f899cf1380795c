use std::fs;
use std::path::PathBuf;
use std::sync::OnceLock;

use anyhow::{
  Context,
  anyhow
};
use chrono::{
  DateTime,
  Datelike,
  Duration,
  NaiveDate,
  Utc,
  Weekday
};
use chrono_tz::Tz;
use regex::Regex;
use serde::Deserialize;

pub const SENTINEL_DATE: &str =
  "9999-12-31";
pub const ISO_DATE_FORMAT: &str =
  "%Y-%m-%d";

/// Years the calendar will navigate
/// to. Kept inside chrono's range with
/// room for a full 42-day grid.
pub const MIN_CALENDAR_YEAR: i32 =
  -262_000;
pub const MAX_CALENDAR_YEAR: i32 =
  262_000;

const TIMEZONE_CONFIG_FILE: &str =
  "westdivers-time.toml";
const TIMEZONE_ENV_VAR: &str =
  "WESTDIVERS_TIMEZONE";
const TIMEZONE_CONFIG_ENV_VAR: &str =
  "WESTDIVERS_TIME_CONFIG";
const DEFAULT_CLUB_TIMEZONE: &str =
  "Europe/London";

#[derive(Debug, Deserialize)]
struct TimezoneConfig {
  timezone: Option<String>,
  time:     Option<TimezoneSection>
}

#[derive(Debug, Deserialize)]
struct TimezoneSection {
  timezone: Option<String>
}

pub fn club_timezone() -> &'static Tz {
  static CLUB_TZ: OnceLock<Tz> =
    OnceLock::new();
  CLUB_TZ
    .get_or_init(resolve_club_timezone)
}

/// Calendar date the club is living in
/// at `now`.
#[must_use]
pub fn today_in_club(
  now: DateTime<Utc>
) -> NaiveDate {
  now
    .with_timezone(club_timezone())
    .date_naive()
}

#[must_use]
pub fn iso_key(
  date: NaiveDate
) -> String {
  date
    .format(ISO_DATE_FORMAT)
    .to_string()
}

fn iso_date_regex() -> Option<&'static Regex>
{
  static ISO_RE: OnceLock<
    Option<Regex>
  > = OnceLock::new();
  ISO_RE
    .get_or_init(|| {
      Regex::new(
        r"^\d{4}-\d{2}-\d{2}$"
      )
      .map_err(|err| {
        tracing::error!(
          error = %err,
          "failed to compile iso date regex"
        );
        err
      })
      .ok()
    })
    .as_ref()
}

/// Strict `YYYY-MM-DD` that is also a
/// real calendar day.
#[must_use]
pub fn parse_iso_date(
  raw: &str
) -> Option<NaiveDate> {
  let token = raw.trim();
  if !iso_date_regex()?
    .is_match(token)
  {
    return None;
  }
  NaiveDate::parse_from_str(
    token,
    ISO_DATE_FORMAT
  )
  .ok()
}

/// Reduces whatever the store holds in a
/// date field to a sortable ISO key. A
/// timestamp keeps its date part;
/// anything unparseable becomes
/// [`SENTINEL_DATE`].
#[must_use]
pub fn normalize_date_key(
  raw: &str
) -> String {
  let token = raw.trim();
  let (head, rest) =
    match (token.get(..10), token.get(10..)) {
      | (Some(head), Some(rest)) => {
        (head, rest)
      }
      | _ => {
        return SENTINEL_DATE
          .to_string();
      }
    };

  if !rest.is_empty()
    && !rest.starts_with(['T', ' '])
  {
    return SENTINEL_DATE.to_string();
  }

  parse_iso_date(head)
    .map(iso_key)
    .unwrap_or_else(|| {
      SENTINEL_DATE.to_string()
    })
}

#[must_use]
pub fn first_day_of_month(
  year: i32,
  month: u32
) -> NaiveDate {
  NaiveDate::from_ymd_opt(
    year, month, 1
  )
  .unwrap_or(NaiveDate::MIN)
}

#[must_use]
pub fn last_day_of_month(
  year: i32,
  month: u32
) -> NaiveDate {
  let (next_year, next_month) =
    if month >= 12 {
      (year.saturating_add(1), 1_u32)
    } else {
      (year, month + 1)
    };
  add_days(
    first_day_of_month(
      next_year, next_month
    ),
    -1
  )
}

#[must_use]
pub fn days_in_month(
  year: i32,
  month: u32
) -> u32 {
  last_day_of_month(year, month).day()
}

#[must_use]
pub fn add_days(
  date: NaiveDate,
  days: i64
) -> NaiveDate {
  date
    .checked_add_signed(Duration::days(
      days
    ))
    .unwrap_or(date)
}

/// First day of the month `months`
/// away from the month containing
/// `date`, held between January
/// `MIN_CALENDAR_YEAR` and December
/// `MAX_CALENDAR_YEAR`.
#[must_use]
pub fn shift_month_start(
  date: NaiveDate,
  months: i32
) -> NaiveDate {
  let total = (month_index(date)
    + i64::from(months))
  .clamp(
    i64::from(MIN_CALENDAR_YEAR) * 12,
    i64::from(MAX_CALENDAR_YEAR) * 12
      + 11
  );
  let year = i32::try_from(
    total.div_euclid(12)
  )
  .unwrap_or(date.year());
  let month0 = total.rem_euclid(12);

  first_day_of_month(
    year,
    month0 as u32 + 1
  )
}

/// Smallest and largest month offsets
/// from `today` that still land on a
/// navigable month.
#[must_use]
pub fn month_offset_bounds(
  today: NaiveDate
) -> (i32, i32) {
  let here = month_index(today);
  let lowest =
    i64::from(MIN_CALENDAR_YEAR) * 12
      - here;
  let highest =
    i64::from(MAX_CALENDAR_YEAR) * 12
      + 11
      - here;
  (
    i32::try_from(lowest)
      .unwrap_or(i32::MIN),
    i32::try_from(highest)
      .unwrap_or(i32::MAX)
  )
}

fn month_index(date: NaiveDate) -> i64 {
  i64::from(date.year()) * 12
    + i64::from(date.month0())
}

#[must_use]
pub fn start_of_week(
  day: NaiveDate,
  week_start: Weekday
) -> NaiveDate {
  let day_idx = day
    .weekday()
    .num_days_from_monday()
    as i64;
  let start_idx = week_start
    .num_days_from_monday()
    as i64;
  let diff =
    (7 + day_idx - start_idx) % 7;
  add_days(day, -diff)
}

fn resolve_club_timezone() -> Tz {
  if let Ok(raw) =
    std::env::var(TIMEZONE_ENV_VAR)
    && let Some(tz) =
      parse_timezone(&raw, TIMEZONE_ENV_VAR)
  {
    return tz;
  }

  if let Some(path) =
    timezone_config_path()
    && let Some(tz) =
      load_timezone_from_file(&path)
  {
    return tz;
  }

  parse_timezone(
    DEFAULT_CLUB_TIMEZONE,
    "DEFAULT_CLUB_TIMEZONE"
  )
  .unwrap_or_else(|| {
    tracing::error!(
      "failed to parse fallback \
       timezone; using UTC"
    );
    chrono_tz::UTC
  })
}

fn timezone_config_path()
-> Option<PathBuf> {
  if let Ok(raw) = std::env::var(
    TIMEZONE_CONFIG_ENV_VAR
  ) {
    let trimmed = raw.trim();
    if !trimmed.is_empty() {
      return Some(PathBuf::from(
        trimmed
      ));
    }
  }

  std::env::current_dir().ok().map(
    |dir| {
      dir.join(TIMEZONE_CONFIG_FILE)
    }
  )
}

fn load_timezone_from_file(
  path: &PathBuf
) -> Option<Tz> {
  if !path.exists() {
    tracing::debug!(
      file = %path.display(),
      "timezone config file not found"
    );
    return None;
  }

  let raw = match fs::read_to_string(
    path
  ) {
    | Ok(raw) => raw,
    | Err(err) => {
      tracing::error!(
        file = %path.display(),
        error = %err,
        "failed reading timezone config file"
      );
      return None;
    }
  };

  let parsed = match toml::from_str::<
    TimezoneConfig
  >(&raw)
  {
    | Ok(parsed) => parsed,
    | Err(err) => {
      tracing::error!(
        file = %path.display(),
        error = %err,
        "failed parsing timezone config file"
      );
      return None;
    }
  };

  let timezone =
    parsed.timezone.or_else(|| {
      parsed.time.and_then(|section| {
        section.timezone
      })
    });
  let Some(timezone) = timezone else {
    tracing::warn!(
      file = %path.display(),
      "timezone config had no timezone field"
    );
    return None;
  };

  parse_timezone(
    timezone.as_str(),
    &format!("file:{}", path.display())
  )
}

fn parse_timezone(
  raw: &str,
  source: &str
) -> Option<Tz> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    tracing::warn!(
      source,
      "timezone source was empty"
    );
    return None;
  }

  match trimmed.parse::<Tz>() {
    | Ok(tz) => {
      tracing::info!(
        source,
        timezone = %trimmed,
        "configured club timezone"
      );
      Some(tz)
    }
    | Err(err) => {
      tracing::error!(
        source,
        timezone = %trimmed,
        error = %err,
        "failed to parse timezone id"
      );
      None
    }
  }
}

#[tracing::instrument(skip(today), fields(input = input))]
pub fn parse_date_expr(
  input: &str,
  today: NaiveDate
) -> anyhow::Result<NaiveDate> {
  let token = input.trim();
  let lower =
    token.to_ascii_lowercase();

  match lower.as_str() {
    | "today" => return Ok(today),
    | "tomorrow" => {
      return Ok(add_days(today, 1));
    }
    | "yesterday" => {
      return Ok(add_days(today, -1));
    }
    | _ => {}
  }

  if let Some(target_weekday) =
    parse_weekday_name(&lower)
  {
    return Ok(next_weekday_date(
      today,
      target_weekday
    ));
  }

  let rel_re = Regex::new(
    r"^(?P<sign>[+-])(?P<num>\d+)(?P<unit>[dw])$"
  )
  .map_err(|e| {
    anyhow!(
      "internal regex compile \
       failure: {e}"
    )
  })?;

  if let Some(caps) =
    rel_re.captures(&lower)
  {
    let sign = caps
      .name("sign")
      .map(|m| m.as_str())
      .ok_or_else(|| {
        anyhow!("missing relative sign")
      })?;
    let num: i64 = caps
      .name("num")
      .map(|m| m.as_str())
      .ok_or_else(|| {
        anyhow!(
          "missing relative amount"
        )
      })?
      .parse()
      .context(
        "invalid relative number"
      )?;
    let unit = caps
      .name("unit")
      .map(|m| m.as_str())
      .ok_or_else(|| {
        anyhow!("missing relative unit")
      })?;

    let days = match unit {
      | "d" => num,
      | "w" => num.saturating_mul(7),
      | _ => {
        return Err(anyhow!(
          "unknown relative unit: \
           {unit}"
        ));
      }
    };

    return Ok(
      if sign == "-" {
        add_days(today, -days)
      } else {
        add_days(today, days)
      }
    );
  }

  if let Some(date) =
    parse_iso_date(token)
  {
    return Ok(date);
  }

  Err(anyhow!(
    "unrecognized date expression: \
     {input}"
  ))
  .with_context(|| {
    "supported formats: \
     today/tomorrow/yesterday, weekday \
     names (e.g. saturday), +Nd/-Nd, \
     +Nw/-Nw, YYYY-MM-DD"
  })
}

fn parse_weekday_name(
  token: &str
) -> Option<Weekday> {
  match token.trim() {
    | "monday" | "mon" => {
      Some(Weekday::Mon)
    }
    | "tuesday" | "tue" | "tues" => {
      Some(Weekday::Tue)
    }
    | "wednesday" | "wed" => {
      Some(Weekday::Wed)
    }
    | "thursday" | "thu" | "thur"
    | "thurs" => Some(Weekday::Thu),
    | "friday" | "fri" => {
      Some(Weekday::Fri)
    }
    | "saturday" | "sat" => {
      Some(Weekday::Sat)
    }
    | "sunday" | "sun" => {
      Some(Weekday::Sun)
    }
    | _ => None
  }
}

fn next_weekday_date(
  from: NaiveDate,
  target: Weekday
) -> NaiveDate {
  let from_idx = from
    .weekday()
    .num_days_from_monday()
    as i64;
  let target_idx = target
    .num_days_from_monday()
    as i64;
  let mut delta =
    (7 + target_idx - from_idx) % 7;
  if delta == 0 {
    delta = 7;
  }
  add_days(from, delta)
}

#[cfg(test)]
mod tests {
  use chrono::{
    NaiveDate,
    Weekday
  };

  use super::{
    MAX_CALENDAR_YEAR,
    MIN_CALENDAR_YEAR,
    SENTINEL_DATE,
    days_in_month,
    month_offset_bounds,
    normalize_date_key,
    parse_date_expr,
    parse_iso_date,
    shift_month_start,
    start_of_week
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
  fn iso_parsing_is_strict() {
    assert_eq!(
      parse_iso_date("2025-04-12"),
      Some(date(2025, 4, 12))
    );
    assert_eq!(
      parse_iso_date(" 2025-04-12 "),
      Some(date(2025, 4, 12))
    );
    assert_eq!(
      parse_iso_date("2025-4-12"),
      None
    );
    assert_eq!(
      parse_iso_date("2025-02-30"),
      None
    );
    assert_eq!(
      parse_iso_date("12/04/2025"),
      None
    );
  }

  #[test]
  fn date_keys_fall_back_to_sentinel()
  {
    assert_eq!(
      normalize_date_key("2025-04-12"),
      "2025-04-12"
    );
    assert_eq!(
      normalize_date_key(
        "2025-04-12T09:30:00Z"
      ),
      "2025-04-12"
    );
    assert_eq!(
      normalize_date_key(""),
      SENTINEL_DATE
    );
    assert_eq!(
      normalize_date_key("soon"),
      SENTINEL_DATE
    );
    assert_eq!(
      normalize_date_key("2025-13-01"),
      SENTINEL_DATE
    );
    assert_eq!(
      normalize_date_key(
        "2025-04-12garbage"
      ),
      SENTINEL_DATE
    );
  }

  #[test]
  fn month_shift_crosses_years() {
    let base = date(2025, 11, 20);
    assert_eq!(
      shift_month_start(base, 0),
      date(2025, 11, 1)
    );
    assert_eq!(
      shift_month_start(base, 2),
      date(2026, 1, 1)
    );
    assert_eq!(
      shift_month_start(base, -11),
      date(2024, 12, 1)
    );
    assert_eq!(
      shift_month_start(base, -23),
      date(2023, 12, 1)
    );
  }

  #[test]
  fn month_shift_stops_at_navigable_years()
   {
    let base = date(2025, 4, 15);
    assert_eq!(
      shift_month_start(base, 4_000_000),
      date(MAX_CALENDAR_YEAR, 12, 1)
    );
    assert_eq!(
      shift_month_start(base, i32::MAX),
      date(MAX_CALENDAR_YEAR, 12, 1)
    );
    assert_eq!(
      shift_month_start(
        base, -4_000_000
      ),
      date(MIN_CALENDAR_YEAR, 1, 1)
    );
    assert_eq!(
      shift_month_start(base, i32::MIN),
      date(MIN_CALENDAR_YEAR, 1, 1)
    );

    let (lowest, highest) =
      month_offset_bounds(base);
    assert_eq!(
      shift_month_start(base, highest),
      date(MAX_CALENDAR_YEAR, 12, 1)
    );
    assert_eq!(
      shift_month_start(
        base,
        highest - 1
      ),
      date(MAX_CALENDAR_YEAR, 11, 1)
    );
    assert_eq!(
      shift_month_start(base, lowest),
      date(MIN_CALENDAR_YEAR, 1, 1)
    );
  }

  #[test]
  fn month_lengths() {
    assert_eq!(days_in_month(2024, 2), 29);
    assert_eq!(days_in_month(2025, 2), 28);
    assert_eq!(days_in_month(2025, 4), 30);
    assert_eq!(
      days_in_month(2025, 12),
      31
    );
  }

  #[test]
  fn week_starts_on_monday() {
    assert_eq!(
      start_of_week(
        date(2025, 4, 1),
        Weekday::Mon
      ),
      date(2025, 3, 31)
    );
    assert_eq!(
      start_of_week(
        date(2025, 9, 1),
        Weekday::Mon
      ),
      date(2025, 9, 1)
    );
  }

  #[test]
  fn parses_date_expressions() {
    let today = date(2025, 4, 15);
    assert_eq!(
      parse_date_expr("today", today)
        .expect("today"),
      today
    );
    assert_eq!(
      parse_date_expr("tomorrow", today)
        .expect("tomorrow"),
      date(2025, 4, 16)
    );
    assert_eq!(
      parse_date_expr("-3d", today)
        .expect("relative days"),
      date(2025, 4, 12)
    );
    assert_eq!(
      parse_date_expr("+2w", today)
        .expect("relative weeks"),
      date(2025, 4, 29)
    );
    assert_eq!(
      parse_date_expr("saturday", today)
        .expect("weekday"),
      date(2025, 4, 19)
    );
    assert_eq!(
      parse_date_expr(
        "2025-06-01",
        today
      )
      .expect("iso"),
      date(2025, 6, 1)
    );
    assert!(
      parse_date_expr("soonish", today)
        .is_err()
    );
  }
}
