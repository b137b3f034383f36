pub mod calendar;
pub mod cli;
pub mod codec;
pub mod commands;
pub mod config;
pub mod datetime;
pub mod error;
pub mod filter;
pub mod grid;
pub mod host;
pub mod normalize;
pub mod range;
pub mod render;
pub mod store;
pub mod tracker;
pub mod widget;

use std::ffi::OsString;

use anyhow::Context;
use clap::Parser;
use tracing::{
  debug,
  info
};

pub use error::RangeError;
pub use range::{
  RangeToken,
  ResolvedRange,
  resolve
};
pub use widget::{
  RangeController,
  WidgetKind
};

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let pre =
    cli::preprocess_args(&raw_args)?;
  let cli = cli::GlobalCli::parse_from(
    pre.cleaned_args
  );

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting datespan CLI"
  );
  debug!(?pre.rc_overrides, "preprocessed rc overrides");

  let mut cfg = config::Config::load(
    cli.rc_file.as_deref()
  )?;
  cfg.apply_overrides(
    pre.rc_overrides.into_iter().chain(
      cli
        .rc_overrides
        .into_iter()
        .map(|kv| (kv.key, kv.value))
    )
  );

  let now = match cli.now.as_deref() {
    | Some(expr) => {
      datetime::parse_reference_expr(
        expr,
        datetime::local_now()
      )
      .context(
        "invalid --now expression"
      )?
    }
    | None => datetime::local_now()
  };
  debug!(%now, "reference instant");

  let store_dir =
    config::resolve_store_dir(
      &cfg,
      cli.store.as_deref()
    )
    .context(
      "failed to resolve store \
       directory"
    )?;

  let mut store =
    store::FileStore::open(&store_dir)
      .with_context(|| {
        format!(
          "failed to open shared store \
           at {}",
          store_dir.display()
        )
      })?;

  let mut renderer =
    render::Renderer::new(&cfg)?;
  let inv =
    cli::Invocation::parse(cli.rest)?;

  commands::dispatch(
    &mut store,
    &cfg,
    &mut renderer,
    now,
    inv
  )?;

  info!("done");
  Ok(())
}
