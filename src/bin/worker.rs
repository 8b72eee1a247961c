//! Worker CLI entry point. Composes `Config`, the platform client, the
//! quota governor, and the embedder once at startup, then drives the three
//! pipelines (or a single stage, for the subcommands) with a graceful
//! shutdown handler installed for SIGINT/SIGTERM.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use tokio::sync::watch;

use nichepulse::config::Config;
use nichepulse::db;
use nichepulse::domain::window::Window;
use nichepulse::embedding::Embedder;
use nichepulse::errors::Error;
use nichepulse::metrics::{debug, log_error, log_ingest_summary, log_process_summary, log_snapshot_summary, Timer};
use nichepulse::platform_client::PlatformClient;
use nichepulse::quota::QuotaGovernor;
use nichepulse::usecases::{ingest, process, snapshot};

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum ModeArg {
  All,
  Ingest,
  Snapshot,
  Process,
}

#[derive(Copy, Clone, ValueEnum)]
enum WindowArg {
  #[value(name = "24h")]
  Hours24,
  #[value(name = "7d")]
  Days7,
  #[value(name = "30d")]
  Days30,
  #[value(name = "90d")]
  Days90,
}

impl From<WindowArg> for Window {
  fn from(arg: WindowArg) -> Self {
    match arg {
      WindowArg::Hours24 => Window::Hours24,
      WindowArg::Days7 => Window::Days7,
      WindowArg::Days30 => Window::Days30,
      WindowArg::Days90 => Window::Days90,
    }
  }
}

#[derive(Subcommand)]
enum Command {
  /// Embeds videos in the window missing an embedding.
  Embed {
    #[arg(long, value_enum, default_value = "7d")]
    window: WindowArg,
  },
  /// Runs one clustering pass for the window.
  Cluster {
    #[arg(long, value_enum, default_value = "7d")]
    window: WindowArg,
  },
  /// Recomputes VideoScore rows for the window.
  Score {
    #[arg(long, value_enum, default_value = "7d")]
    window: WindowArg,
  },
  /// Recomputes cluster ranking aggregates for the window.
  Rank {
    #[arg(long, value_enum, default_value = "7d")]
    window: WindowArg,
  },
  /// Runs the zero-quota free-feed expansion feeder standalone.
  RssExpand {
    #[arg(long, value_enum, default_value = "7d")]
    window: WindowArg,
  },
}

#[derive(Parser)]
#[command(name = "worker", about = "NichePulse discovery-to-ranking pipeline worker")]
struct Cli {
  #[command(subcommand)]
  command: Option<Command>,

  #[arg(long, value_enum)]
  mode: Option<ModeArg>,

  #[arg(long, value_enum, default_value = "7d")]
  window: WindowArg,

  /// Exit after a single pass instead of looping.
  #[arg(long)]
  once: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
  let cli = Cli::parse();

  let config = match Config::from_env() {
    Ok(config) => config,
    Err(e) => {
      log_error("startup", &e);
      return ExitCode::from(1);
    }
  };

  match run(cli, Arc::new(config)).await {
    Ok(Shutdown::Normal) => ExitCode::from(0),
    Ok(Shutdown::Interrupted) => ExitCode::from(130),
    Err(e) => {
      log_error("fatal", &e);
      ExitCode::from(1)
    }
  }
}

enum Shutdown {
  Normal,
  Interrupted,
}

/// Installed once; flips to `true` on SIGINT or SIGTERM. The run loop
/// checks it between iterations and between one-second sleep ticks, per
/// the graceful-shutdown contract — in-flight calls complete, the next
/// iteration does not start.
fn install_shutdown_handler() -> watch::Receiver<bool> {
  let (tx, rx) = watch::channel(false);

  tokio::spawn(async move {
    let ctrl_c = async {
      let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
      match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
        Ok(mut sig) => {
          sig.recv().await;
        }
        Err(_) => std::future::pending::<()>().await,
      }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
      _ = ctrl_c => {}
      _ = terminate => {}
    }
    let _ = tx.send(true);
  });

  rx
}

async fn sleep_interruptible(duration: StdDuration, shutdown: &mut watch::Receiver<bool>) {
  let mut remaining = duration;
  let tick = StdDuration::from_secs(1);
  while remaining > StdDuration::ZERO {
    if *shutdown.borrow() {
      return;
    }
    let step = remaining.min(tick);
    tokio::time::sleep(step).await;
    remaining = remaining.saturating_sub(step);
  }
}

async fn run(cli: Cli, config: Arc<Config>) -> Result<Shutdown, Error> {
  let pool = db::get_pool(&config.database_url).await?;
  let mut shutdown = install_shutdown_handler();

  if let Some(command) = cli.command {
    run_single_stage(pool, &config, command).await?;
    return Ok(Shutdown::Normal);
  }

  let mode = cli.mode.unwrap_or(ModeArg::All);
  let window: Window = cli.window.into();

  let client = PlatformClient::new(config.require_platform_api_key()?);
  let mut governor = QuotaGovernor::new(config.quota.daily_limit, config.quota.buffer_ratio);
  let embedder = Embedder::new(config.require_embedding_api_key()?, &config.embedding_model, config.embedding_dim);

  loop {
    if *shutdown.borrow() {
      return Ok(Shutdown::Interrupted);
    }

    let now = Utc::now();
    run_one_pass(pool, &client, &mut governor, &embedder, &config, mode, window, now).await;

    if cli.once {
      return Ok(Shutdown::Normal);
    }

    let interval = pass_interval(mode, &config);
    sleep_interruptible(interval, &mut shutdown).await;
  }
}

fn pass_interval(mode: ModeArg, config: &Config) -> StdDuration {
  let seconds = match mode {
    ModeArg::Ingest => config.ingest.interval_seconds,
    ModeArg::Snapshot => config.snapshot.interval_seconds,
    ModeArg::Process | ModeArg::All => config.ingest.interval_seconds,
  };
  StdDuration::from_secs(seconds)
}

async fn run_one_pass(
  pool: &sqlx::MySqlPool,
  client: &PlatformClient,
  governor: &mut QuotaGovernor,
  embedder: &Embedder,
  config: &Config,
  mode: ModeArg,
  window: Window,
  now: chrono::DateTime<Utc>,
) {
  if matches!(mode, ModeArg::All | ModeArg::Ingest) {
    let timer = Timer::start();
    match ingest::run_ingest(pool, client, governor, config, window, now).await {
      Ok(metrics) => log_ingest_summary(window.as_str(), &metrics, timer.elapsed_seconds()),
      Err(e) => log_error("ingest", &e),
    }
  }

  if matches!(mode, ModeArg::All | ModeArg::Snapshot) {
    let timer = Timer::start();
    match snapshot::run_snapshot(pool, client, governor, &config.snapshot, now).await {
      Ok(metrics) => log_snapshot_summary(&metrics, timer.elapsed_seconds()),
      Err(e) => log_error("snapshot", &e),
    }
  }

  if matches!(mode, ModeArg::All | ModeArg::Process) {
    let timer = Timer::start();
    match process::run_process(pool, embedder, config, window, now).await {
      Ok(metrics) => log_process_summary(window.as_str(), &metrics, timer.elapsed_seconds()),
      Err(e) => log_error("process", &e),
    }
  }

  debug(config.debug_log, "pass complete");
}

async fn run_single_stage(pool: &sqlx::MySqlPool, config: &Config, command: Command) -> Result<(), Error> {
  let now = Utc::now();

  match command {
    Command::Embed { window } => {
      let embedder = Embedder::new(config.require_embedding_api_key()?, &config.embedding_model, config.embedding_dim);
      let count = process::run_embed(pool, &embedder, config.embedding_batch_size, window.into(), now).await?;
      println!("event=embed_complete count={count}");
    }
    Command::Cluster { window } => {
      let (written, deleted) = process::run_cluster(pool, config, window.into(), now).await?;
      println!("event=cluster_complete written={written} deleted={deleted}");
    }
    Command::Score { window } => {
      let count = process::run_score(pool, window.into(), now).await?;
      println!("event=score_complete count={count}");
    }
    Command::Rank { window } => {
      let count = process::run_rank(pool, window.into()).await?;
      println!("event=rank_complete count={count}");
    }
    Command::RssExpand { window } => {
      let client = PlatformClient::new(config.require_platform_api_key()?);
      let metrics = ingest::run_rss_expand(pool, &client, config, window.into(), now).await?;
      println!(
        "event=rss_expand_complete videos_seen={} videos_inserted={} errors={}",
        metrics.videos_seen, metrics.videos_inserted, metrics.errors
      );
    }
  }

  Ok(())
}
