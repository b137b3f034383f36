use anyhow::{Context, anyhow};
use chrono::{Datelike, NaiveDateTime};
use tracing::{debug, info, instrument, warn};

use crate::cli::Invocation;
use crate::codec::{decode, encode};
use crate::config::Config;
use crate::datetime::{parse_day_expr, parse_month_expr};
use crate::grid::build_grid;
use crate::host::{RecordingHost, SharedStore};
use crate::range::{RangeToken, ResolvedRange, resolve, resolve_custom};
use crate::render::Renderer;
use crate::store::FileStore;
use crate::widget::{RangeController, SyncOutcome, WidgetKind};

pub fn known_command_names() -> Vec<&'static str> {
    vec![
        "resolve", "grid", "encode", "decode", "select", "custom", "sync", "ranges", "show",
        "commands", "help", "version",
    ]
}

pub fn expand_command_abbrev<'a>(token: &'a str, known: &[&'a str]) -> Option<&'a str> {
    if known.contains(&token) {
        return Some(token);
    }

    let mut matches = known.iter().copied().filter(|name| name.starts_with(token));
    let first = matches.next()?;
    if matches.next().is_some() {
        None
    } else {
        Some(first)
    }
}

#[instrument(skip(store, cfg, renderer, inv))]
pub fn dispatch(
    store: &mut FileStore,
    cfg: &Config,
    renderer: &mut Renderer,
    now: NaiveDateTime,
    inv: Invocation,
) -> anyhow::Result<()> {
    let command = inv.command.as_str();
    let args = inv.command_args.as_slice();

    debug!(command, args = ?args, "dispatching command");

    match command {
        "resolve" => cmd_resolve(store, cfg, renderer, args, now),
        "grid" => cmd_grid(store, cfg, renderer, args, now),
        "encode" => cmd_encode(renderer, args, now),
        "decode" => cmd_decode(renderer, args),
        "select" => cmd_select(store, cfg, renderer, args, now),
        "custom" => cmd_custom(store, cfg, renderer, args, now),
        "sync" => cmd_sync(store, cfg, renderer, now),
        "ranges" => cmd_ranges(renderer, now),
        "show" => cmd_show(cfg),
        "commands" => cmd_commands(),
        "help" => cmd_help(),
        "version" => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        other => Err(anyhow!("unknown command: {other}")),
    }
}

/// Joins the remaining words into one token; no words means the configured
/// default.
fn token_from_args(cfg: &Config, args: &[String]) -> anyhow::Result<RangeToken> {
    if args.is_empty() {
        return Ok(cfg.controller_settings()?.default_token);
    }
    let text = args.join(" ");
    text.parse::<RangeToken>()
        .with_context(|| format!("cannot resolve `{text}`"))
}

/// Last persisted range, if the store holds a valid one.
fn stored_range(store: &FileStore, cfg: &Config) -> anyhow::Result<Option<ResolvedRange>> {
    let key = cfg.controller_settings()?.shared_key;
    let Some(text) = store.read(&key)? else {
        return Ok(None);
    };
    match decode(&text) {
        Ok(range) => Ok(Some(range)),
        Err(err) => {
            warn!(error = %err, "stored shared state is malformed");
            Ok(None)
        }
    }
}

fn controller_for(
    kind: WidgetKind,
    cfg: &Config,
    now: NaiveDateTime,
) -> anyhow::Result<RangeController> {
    let mut controller = RangeController::new(kind, cfg.controller_settings()?, now.date());
    controller.bind_fields(&[cfg.date_column()])?;
    Ok(controller)
}

#[instrument(skip(store, cfg, renderer, args, now))]
fn cmd_resolve(
    store: &mut FileStore,
    cfg: &Config,
    renderer: &mut Renderer,
    args: &[String],
    now: NaiveDateTime,
) -> anyhow::Result<()> {
    info!("command resolve");
    let token = token_from_args(cfg, args)?;
    let current = stored_range(store, cfg)?;
    let range = resolve(&token, now, current.as_ref())?;
    renderer.print_range(&token.to_string(), &range)
}

#[instrument(skip(store, cfg, renderer, args, now))]
fn cmd_grid(
    store: &mut FileStore,
    cfg: &Config,
    renderer: &mut Renderer,
    args: &[String],
    now: NaiveDateTime,
) -> anyhow::Result<()> {
    info!("command grid");
    let today = now.date();

    // `grid last week` is a token, `grid last` a month
    let (month, token_args) = match args.split_first() {
        Some((first, rest)) if rest.is_empty() || token_from_args(cfg, rest).is_ok() => {
            match parse_month_expr(first, today) {
                Ok(month) => (Some(month), rest),
                Err(_) => (None, args),
            }
        }
        _ => (None, args),
    };

    let highlight = if token_args.is_empty() {
        stored_range(store, cfg)?
    } else {
        let token = token_from_args(cfg, token_args)?;
        let current = stored_range(store, cfg)?;
        Some(resolve(&token, now, current.as_ref())?)
    };

    let (year, month0) = month
        .or_else(|| {
            highlight
                .as_ref()
                .map(|range| (range.anchor_year(), range.anchor_month0()))
        })
        .unwrap_or((today.year(), today.month0()));

    let grid = build_grid(year, month0 as i32, highlight.as_ref(), today);
    renderer.print_grid(&grid)?;
    if let Some(range) = highlight {
        renderer.print_line(&encode(&range))?;
    }
    Ok(())
}

#[instrument(skip(renderer, args, now))]
fn cmd_encode(renderer: &mut Renderer, args: &[String], now: NaiveDateTime) -> anyhow::Result<()> {
    let [start, end] = args else {
        return Err(anyhow!("encode requires <start> <end>"));
    };
    let start = parse_day_expr(start, now)?;
    let end = parse_day_expr(end, now)?;
    let range = resolve_custom(start, end)?;
    renderer.print_line(&encode(&range))
}

#[instrument(skip(renderer, args))]
fn cmd_decode(renderer: &mut Renderer, args: &[String]) -> anyhow::Result<()> {
    if args.is_empty() {
        return Err(anyhow!("decode requires shared-state text"));
    }
    let text = args.join(" ");
    let range = decode(&text)?;
    renderer.print_range("Shared", &range)
}

#[instrument(skip(store, cfg, renderer, args, now))]
fn cmd_select(
    store: &mut FileStore,
    cfg: &Config,
    renderer: &mut Renderer,
    args: &[String],
    now: NaiveDateTime,
) -> anyhow::Result<()> {
    info!("command select");
    let token = token_from_args(cfg, args)?;
    let mut controller = controller_for(WidgetKind::DatePicker, cfg, now)?;
    let mut host = RecordingHost::new();

    controller.sync_from_shared(store, &mut host)?;
    let issued_before = host.applied.len();
    let range = controller.apply_token(&token, now, store, &mut host)?;

    renderer.print_range(&token.to_string(), &range)?;
    report_filter(renderer, &host, issued_before)
}

#[instrument(skip(store, cfg, renderer, args, now))]
fn cmd_custom(
    store: &mut FileStore,
    cfg: &Config,
    renderer: &mut Renderer,
    args: &[String],
    now: NaiveDateTime,
) -> anyhow::Result<()> {
    info!("command custom");
    let [start, end] = args else {
        return Err(anyhow!("custom requires <start> <end>"));
    };
    let start = parse_day_expr(start, now)?;
    let end = parse_day_expr(end, now)?;

    let mut controller = controller_for(WidgetKind::DatePicker, cfg, now)?;
    let mut host = RecordingHost::new();

    controller.sync_from_shared(store, &mut host)?;
    let issued_before = host.applied.len();
    let range = controller.apply_custom(start, end, store, &mut host)?;

    renderer.print_range(&RangeToken::Custom.to_string(), &range)?;
    report_filter(renderer, &host, issued_before)
}

#[instrument(skip(store, cfg, renderer, now))]
fn cmd_sync(
    store: &mut FileStore,
    cfg: &Config,
    renderer: &mut Renderer,
    now: NaiveDateTime,
) -> anyhow::Result<()> {
    info!("command sync");
    let mut controller = controller_for(WidgetKind::Calendar, cfg, now)?;
    let mut host = RecordingHost::new();

    match controller.sync_from_shared(store, &mut host)? {
        SyncOutcome::Empty | SyncOutcome::Unchanged => {
            renderer.print_line("no shared range stored")
        }
        SyncOutcome::Ignored(err) => renderer.print_line(&format!("ignored: {err}")),
        SyncOutcome::Applied(range) => {
            renderer.print_range("Shared", &range)?;
            renderer.print_grid(&controller.grid(now.date()))?;
            report_filter(renderer, &host, 0)
        }
    }
}

fn report_filter(
    renderer: &mut Renderer,
    host: &RecordingHost,
    issued_before: usize,
) -> anyhow::Result<()> {
    if host.applied.len() <= issued_before {
        return renderer.print_line("range unchanged; no filter issued");
    }
    match host.last() {
        Some((filter, action)) => renderer.print_filter(filter, *action),
        None => Ok(()),
    }
}

fn cmd_ranges(renderer: &mut Renderer, now: NaiveDateTime) -> anyhow::Result<()> {
    let mut rows = Vec::with_capacity(RangeToken::NAMED.len());
    for token in RangeToken::NAMED {
        let range = resolve(&token, now, None)?;
        rows.push(vec![token.to_string(), encode(&range)]);
    }
    for example in ["-3d", "last 2 weeks", "mtd", "this year to date"] {
        let token = example.parse::<RangeToken>()?;
        let range = resolve(&token, now, None)?;
        rows.push(vec![format!("{token} ({example})"), encode(&range)]);
    }
    renderer.print_rows(vec!["Token".to_string(), "Range".to_string()], rows)
}

fn cmd_show(cfg: &Config) -> anyhow::Result<()> {
    for (k, v) in cfg.iter() {
        println!("{k}={v}");
    }
    Ok(())
}

fn cmd_commands() -> anyhow::Result<()> {
    for command in known_command_names() {
        println!("{command}");
    }
    Ok(())
}

fn cmd_help() -> anyhow::Result<()> {
    println!(
        "Commands: resolve <token>, grid [YYYY-MM] [token], encode <start> <end>, decode <text>, select <token>, custom <start> <end>, sync, ranges, show, commands, version"
    );
    println!(
        "Tokens: today, yesterday, this/last week|month|year, custom, -<n>[dwmy], last <n> <days|weeks|months|years>, dtd/wtd/mtd/ytd"
    );
    Ok(())
}
