use std::ffi::OsString;
use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{ArgAction, Parser};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
pub struct PreprocessedArgs {
    pub cleaned_args: Vec<OsString>,
    pub rc_overrides: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct KeyVal {
    pub key: String,
    pub value: String,
}

impl std::str::FromStr for KeyVal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (k, v) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected KEY=VALUE, got: {s}"))?;
        Ok(Self {
            key: k.trim().to_string(),
            value: v.trim().to_string(),
        })
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "datespan",
    version,
    about = "Resolve, persist and share reporting date ranges",
    disable_help_subcommand = true,
    arg_required_else_help = false
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count)]
    pub quiet: u8,

    #[arg(
        long = "rc",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append
    )]
    pub rc_overrides: Vec<KeyVal>,

    #[arg(long = "rc-file")]
    pub rc_file: Option<PathBuf>,

    #[arg(long = "store")]
    pub store: Option<PathBuf>,

    /// Reference instant ranges are resolved against (default: now).
    #[arg(long = "now", allow_hyphen_values = true)]
    pub now: Option<String>,

    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub rest: Vec<OsString>,
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = if quiet >= 2 {
        "error"
    } else if quiet == 1 {
        "warn"
    } else if verbose >= 3 {
        "trace"
    } else if verbose == 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_level(true)
        .with_thread_ids(true)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}

#[tracing::instrument(skip_all)]
pub fn preprocess_args(raw: &[OsString]) -> anyhow::Result<PreprocessedArgs> {
    let mut cleaned = Vec::with_capacity(raw.len());
    let mut overrides: Vec<(String, String)> = Vec::new();

    let mut iter = raw.iter().cloned();
    if let Some(bin) = iter.next() {
        cleaned.push(bin);
    }

    for arg in iter {
        let s = arg.to_string_lossy();
        if let Some(rest) = s.strip_prefix("rc.") {
            let parsed = if let Some((k, v)) = rest.split_once('=') {
                Some((format!("rc.{k}"), v.to_string()))
            } else if let Some((k, v)) = rest.split_once(':') {
                Some((format!("rc.{k}"), v.to_string()))
            } else {
                None
            };

            if let Some((k, v)) = parsed {
                debug!(key = %k, value = %v, "captured positional rc override");
                overrides.push((k, v));
                continue;
            }
        }

        cleaned.push(arg);
    }

    Ok(PreprocessedArgs {
        cleaned_args: cleaned,
        rc_overrides: overrides,
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub command: String,
    pub command_args: Vec<String>,
}

impl Invocation {
    /// The first token names the command (unique prefixes allowed). Anything
    /// else is read as a range token for `resolve`.
    #[tracing::instrument(skip(rest))]
    pub fn parse(rest: Vec<OsString>) -> anyhow::Result<Self> {
        let tokens: Vec<String> = rest
            .into_iter()
            .map(|arg| arg.to_string_lossy().to_string())
            .collect();

        let Some((first, args)) = tokens.split_first() else {
            debug!("no explicit command, using grid");
            return Ok(Self {
                command: "grid".to_string(),
                command_args: vec![],
            });
        };

        let known = crate::commands::known_command_names();
        if let Some(full) = crate::commands::expand_command_abbrev(first, &known) {
            debug!(token = %first, expanded = %full, "resolved command token");
            return Ok(Self {
                command: full.to_string(),
                command_args: args.to_vec(),
            });
        }

        warn!(token = %first, "no command detected, treating arguments as a range token");
        Ok(Self {
            command: "resolve".to_string(),
            command_args: tokens,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn os(args: &[&str]) -> Vec<OsString> {
        args.iter().map(OsString::from).collect()
    }

    #[test]
    fn positional_rc_overrides_are_captured() {
        let pre = preprocess_args(&os(&["datespan", "rc.color=off", "grid", "rc.field.role:Period"]))
            .expect("preprocess");
        assert_eq!(pre.cleaned_args, os(&["datespan", "grid"]));
        assert_eq!(
            pre.rc_overrides,
            vec![
                ("rc.color".to_string(), "off".to_string()),
                ("rc.field.role".to_string(), "Period".to_string()),
            ]
        );
    }

    #[test]
    fn command_prefix_is_expanded() {
        let inv = Invocation::parse(os(&["sel", "last", "2", "weeks"])).expect("parse");
        assert_eq!(inv.command, "select");
        assert_eq!(inv.command_args, vec!["last", "2", "weeks"]);
    }

    #[test]
    fn bare_token_falls_back_to_resolve() {
        let inv = Invocation::parse(os(&["yesterday"])).expect("parse");
        assert_eq!(inv.command, "resolve");
        assert_eq!(inv.command_args, vec!["yesterday"]);

        let inv = Invocation::parse(vec![]).expect("parse");
        assert_eq!(inv.command, "grid");
    }

    #[test]
    fn global_flags_parse() {
        let cli = GlobalCli::parse_from(os(&[
            "datespan", "-vv", "--now", "2025-09-17", "--rc", "color=off", "resolve", "-3d",
        ]));
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.now.as_deref(), Some("2025-09-17"));
        assert_eq!(cli.rc_overrides[0].key, "color");
        assert_eq!(cli.rest, os(&["resolve", "-3d"]));
    }
}
