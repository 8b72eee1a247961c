//! Per-run counters and the plain key=value logging convention used for all
//! end-of-run summaries. Grounded on the worker's JSON metrics collector, but
//! rendered as single-line `key=value` text rather than JSON, matching the
//! rest of this codebase's direct `println!`/`eprintln!` logging style.

use std::time::Instant;

#[derive(Debug, Clone, Default)]
pub struct IngestMetrics {
  pub videos_seen: usize,
  pub videos_inserted: usize,
  pub rejected_duplicate: usize,
  pub rejected_too_old: usize,
  pub rejected_channel_cap: usize,
  pub errors: usize,
  pub quota_used: i64,
  pub quota_remaining: i64,
}

#[derive(Debug, Clone, Default)]
pub struct SnapshotMetrics {
  pub videos_due: usize,
  pub videos_snapshotted: usize,
  pub channels_refreshed: usize,
  pub errors: usize,
  pub quota_used: i64,
  pub quota_remaining: i64,
}

#[derive(Debug, Clone, Default)]
pub struct ProcessMetrics {
  pub videos_embedded: usize,
  pub clusters_written: usize,
  pub clusters_deleted: usize,
  pub videos_scored: usize,
  pub clusters_ranked: usize,
  pub errors: usize,
}

/// Wall-clock timer for a single run phase. Logs at drop-site via an explicit
/// call, not `Drop`, so the duration can be folded into the run's summary
/// line instead of emitting its own.
pub struct Timer {
  started_at: Instant,
}

impl Timer {
  pub fn start() -> Self {
    Timer { started_at: Instant::now() }
  }

  pub fn elapsed_seconds(&self) -> f64 {
    self.started_at.elapsed().as_secs_f64()
  }
}

pub fn log_ingest_summary(window: &str, metrics: &IngestMetrics, duration_seconds: f64) {
  println!(
    "event=ingest_complete window={window} videos_seen={} videos_inserted={} rejected_duplicate={} rejected_too_old={} rejected_channel_cap={} errors={} quota_used={} quota_remaining={} duration_seconds={:.2}",
    metrics.videos_seen,
    metrics.videos_inserted,
    metrics.rejected_duplicate,
    metrics.rejected_too_old,
    metrics.rejected_channel_cap,
    metrics.errors,
    metrics.quota_used,
    metrics.quota_remaining,
    duration_seconds,
  );
}

pub fn log_snapshot_summary(metrics: &SnapshotMetrics, duration_seconds: f64) {
  println!(
    "event=snapshot_complete videos_due={} videos_snapshotted={} channels_refreshed={} errors={} quota_used={} quota_remaining={} duration_seconds={:.2}",
    metrics.videos_due,
    metrics.videos_snapshotted,
    metrics.channels_refreshed,
    metrics.errors,
    metrics.quota_used,
    metrics.quota_remaining,
    duration_seconds,
  );
}

pub fn log_process_summary(window: &str, metrics: &ProcessMetrics, duration_seconds: f64) {
  println!(
    "event=process_complete window={window} videos_embedded={} clusters_written={} clusters_deleted={} videos_scored={} clusters_ranked={} errors={} duration_seconds={:.2}",
    metrics.videos_embedded,
    metrics.clusters_written,
    metrics.clusters_deleted,
    metrics.videos_scored,
    metrics.clusters_ranked,
    metrics.errors,
    duration_seconds,
  );
}

pub fn log_error(stage: &str, err: &dyn std::error::Error) {
  eprintln!("event=error stage={stage} message={:?}", err.to_string());
}

/// Emits a debug-level per-item notice iff the caller's config enabled it.
/// Takes the flag explicitly rather than re-reading the environment, since
/// `Config` is the single place `std::env` is read after startup.
pub fn debug(enabled: bool, message: &str) {
  if enabled {
    eprintln!("event=debug message={message:?}");
  }
}
