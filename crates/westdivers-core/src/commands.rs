use anyhow::{
  Context,
  anyhow
};
use chrono::{
  NaiveDate,
  Utc
};
use tracing::{
  debug,
  info,
  instrument
};

use crate::access::Role;
use crate::cli::Invocation;
use crate::config::Config;
use crate::datastore::ClubStore;
use crate::datetime::{
  parse_date_expr,
  today_in_club
};
use crate::item::ItemKind;
use crate::render::Renderer;
use crate::view::{
  CalendarSnapshot,
  CalendarViewState
};

const HELP_TEXT: &str = "\
usage: westdivers [--role ROLE] [--data DIR] [--rc KEY=VALUE] <command> [args]

commands:
  month              show the month grid and the selected day
  next [N] / prev [N]
                     move N months forward or back
  today              back to the current month, select today
  select <date>      select a day (YYYY-MM-DD, today, +3d, saturday)
  day                show the selected day
  list               list everything the filters let through
  search [text]      set or clear the search text
  toggle <what>      trips, courses, events or past
  state              print the stored view state
  version            print the version";

pub fn known_command_names()
-> Vec<&'static str> {
  vec![
    "month", "next", "prev", "today",
    "select", "day", "list", "search",
    "toggle", "state", "help",
    "version",
  ]
}

pub fn expand_command_abbrev<'a>(
  token: &'a str,
  known: &[&'a str]
) -> Option<&'a str> {
  if known.contains(&token) {
    return Some(token);
  }

  let mut matches = known
    .iter()
    .copied()
    .filter(|name| {
      name.starts_with(token)
    });
  let first = matches.next()?;
  if matches.next().is_some() {
    None
  } else {
    Some(first)
  }
}

/// What one command run needs besides
/// its arguments.
pub struct Session<'a> {
  pub store:    &'a ClubStore,
  pub renderer: &'a mut Renderer,
  pub role:     Role,
  pub today:    NaiveDate
}

impl Session<'_> {
  fn snapshot(
    &self,
    state: &CalendarViewState
  ) -> anyhow::Result<CalendarSnapshot>
  {
    let sources =
      self.store.load_sources()?;
    Ok(state.snapshot(
      &sources,
      self.role.can_see_drafts(),
      self.today
    ))
  }
}

#[instrument(skip(store, cfg, renderer, inv))]
pub fn dispatch(
  store: &ClubStore,
  cfg: &Config,
  renderer: &mut Renderer,
  role: Role,
  inv: Invocation
) -> anyhow::Result<()> {
  let today = today_in_club(Utc::now());
  let mut session = Session {
    store,
    renderer,
    role,
    today
  };
  let mut state = store.load_view_state(
    today,
    cfg.show_past_default()
  );

  debug!(
    command = %inv.command,
    args = ?inv.command_args,
    role = %role,
    today = %today,
    "dispatching command"
  );

  run_command(
    &mut session,
    &mut state,
    &inv
  )
}

pub fn run_command(
  session: &mut Session<'_>,
  state: &mut CalendarViewState,
  inv: &Invocation
) -> anyhow::Result<()> {
  match inv.command.as_str() {
    | "month" => cmd_month(session, state),
    | "next" => {
      cmd_shift(
        session,
        state,
        &inv.command_args,
        1
      )
    }
    | "prev" => {
      cmd_shift(
        session,
        state,
        &inv.command_args,
        -1
      )
    }
    | "today" => cmd_today(session, state),
    | "select" => {
      cmd_select(
        session,
        state,
        &inv.command_args
      )
    }
    | "day" => cmd_day(session, state),
    | "list" => cmd_list(session, state),
    | "search" => {
      cmd_search(
        session,
        state,
        &inv.command_args
      )
    }
    | "toggle" => {
      cmd_toggle(
        session,
        state,
        &inv.command_args
      )
    }
    | "state" => cmd_state(state),
    | "help" => cmd_help(),
    | "version" => {
      println!(
        "{}",
        env!("CARGO_PKG_VERSION")
      );
      Ok(())
    }
    | other => {
      Err(anyhow!(
        "unknown command: {other}"
      ))
    }
  }
}

fn cmd_month(
  session: &mut Session<'_>,
  state: &CalendarViewState
) -> anyhow::Result<()> {
  let snapshot =
    session.snapshot(state)?;
  session
    .renderer
    .print_month(&snapshot)?;
  println!();
  session.renderer.print_day(&snapshot)
}

fn cmd_shift(
  session: &mut Session<'_>,
  state: &mut CalendarViewState,
  args: &[String],
  direction: i32
) -> anyhow::Result<()> {
  let steps = match args.first() {
    | Some(raw) => {
      raw.parse::<i32>().with_context(
        || {
          format!(
            "expected a month count, \
             got: {raw}"
          )
        }
      )?
    }
    | None => 1
  };
  let offset = state.shift_month(
    steps.saturating_mul(direction),
    session.today
  );
  info!(
    month_offset = offset,
    "moved calendar"
  );
  session
    .store
    .save_view_state(state)?;
  let snapshot =
    session.snapshot(state)?;
  session
    .renderer
    .print_month(&snapshot)
}

fn cmd_today(
  session: &mut Session<'_>,
  state: &mut CalendarViewState
) -> anyhow::Result<()> {
  state.jump_to_today(session.today);
  session
    .store
    .save_view_state(state)?;
  cmd_month(session, state)
}

fn cmd_select(
  session: &mut Session<'_>,
  state: &mut CalendarViewState,
  args: &[String]
) -> anyhow::Result<()> {
  if args.is_empty() {
    return Err(anyhow!(
      "select needs a date, e.g. \
       2025-04-12 or tomorrow"
    ));
  }
  let date = parse_date_expr(
    &args.join(" "),
    session.today
  )?;
  state.select_date(date);
  session
    .store
    .save_view_state(state)?;
  cmd_day(session, state)
}

fn cmd_day(
  session: &mut Session<'_>,
  state: &CalendarViewState
) -> anyhow::Result<()> {
  let snapshot =
    session.snapshot(state)?;
  session.renderer.print_day(&snapshot)
}

fn cmd_list(
  session: &mut Session<'_>,
  state: &CalendarViewState
) -> anyhow::Result<()> {
  let snapshot =
    session.snapshot(state)?;
  session
    .renderer
    .print_items(&snapshot.ordered())
}

fn cmd_search(
  session: &mut Session<'_>,
  state: &mut CalendarViewState,
  args: &[String]
) -> anyhow::Result<()> {
  let text = args.join(" ");
  info!(search = %text, "updated search");
  state.set_search(text);
  session
    .store
    .save_view_state(state)?;
  cmd_list(session, state)
}

fn cmd_toggle(
  session: &mut Session<'_>,
  state: &mut CalendarViewState,
  args: &[String]
) -> anyhow::Result<()> {
  let Some(target) = args.first() else {
    return Err(anyhow!(
      "toggle needs one of: trips, \
       courses, events, past"
    ));
  };

  let (label, on) = if target
    .eq_ignore_ascii_case("past")
  {
    let on = !state.filter.show_past;
    state.set_show_past(on);
    ("past", on)
  } else {
    let kind = ItemKind::parse(target)
      .ok_or_else(|| {
        anyhow!(
          "cannot toggle {target}; \
           expected trips, courses, \
           events or past"
        )
      })?;
    (kind.as_str(), state.toggle(kind))
  };

  session
    .store
    .save_view_state(state)?;
  println!(
    "{label}: {}",
    if on { "shown" } else { "hidden" }
  );
  Ok(())
}

fn cmd_state(
  state: &CalendarViewState
) -> anyhow::Result<()> {
  let raw =
    serde_json::to_string_pretty(state)?;
  println!("{raw}");
  Ok(())
}

fn cmd_help() -> anyhow::Result<()> {
  println!("{HELP_TEXT}");
  Ok(())
}
