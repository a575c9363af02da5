//! Maintenance entry point: find jobs stuck in `running` and mark them
//! failed, once or on an interval.

use anyhow::Context;
use chrono::{DateTime, SecondsFormat};
use clap::Parser;
use jobtrace_core::stuck::DEFAULT_THRESHOLD_MINUTES;
use jobtrace_core::types::TimestampMs;
use jobtrace_tracker::{IdentityResolver, JobTracker, MirrorClient, StuckJobReport};

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Mark abandoned jobs as timed out", long_about = None)]
pub struct Args {
    /// Minutes a job may sit in `running` before it is presumed abandoned
    #[arg(short, long, env = "STUCK_THRESHOLD_MINUTES", default_value_t = DEFAULT_THRESHOLD_MINUTES)]
    pub threshold_minutes: i64,

    /// Path of the SQLite event log
    #[arg(long, env = "DATABASE_PATH", default_value = "data/jobtrace.db")]
    pub database_path: String,

    /// Observer base URL; remediated snapshots are relayed there
    #[arg(long, env = "DASHBOARD_URL")]
    pub dashboard_url: Option<String>,

    /// Sweep every N seconds until interrupted instead of once
    #[arg(long, env = "SWEEP_INTERVAL_SECS")]
    pub interval_secs: Option<u64>,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

/// Open the event log and build a tracker, relaying to the observer when
/// a dashboard URL is configured.
pub async fn build_tracker(args: &Args) -> anyhow::Result<JobTracker> {
    let pool = jobtrace_db::create_pool(&args.database_path)
        .await
        .with_context(|| format!("Failed to open event log at {}", args.database_path))?;
    jobtrace_db::run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;
    jobtrace_db::health_check(&pool)
        .await
        .context("Database health check failed")?;

    let tracker = JobTracker::new(pool.clone(), IdentityResolver::new(pool));
    match args.dashboard_url.as_deref() {
        Some(url) => {
            let client = MirrorClient::new(url).context("Failed to build observer client")?;
            tracing::info!(endpoint = client.endpoint(), "Relaying remediated jobs");
            Ok(tracker.with_mirror(client))
        }
        None => Ok(tracker),
    }
}

fn format_time(ms: TimestampMs) -> String {
    DateTime::from_timestamp_millis(ms)
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_else(|| ms.to_string())
}

/// One human-readable line per remediated job.
pub fn format_report(report: &StuckJobReport) -> String {
    let user = match (&report.username, &report.user_id) {
        (Some(name), Some(id)) => format!("{name} ({id})"),
        (Some(name), None) => name.clone(),
        (None, Some(id)) => id.clone(),
        (None, None) => "-".to_string(),
    };
    format!(
        "{}  type={}  user={}  started={}  last_update={}",
        report.job_id,
        report.job_type.as_str(),
        user,
        format_time(report.start_time),
        format_time(report.last_update),
    )
}

pub fn render_reports(reports: &[StuckJobReport], json: bool) -> anyhow::Result<String> {
    if json {
        return serde_json::to_string_pretty(reports).context("Failed to encode report");
    }
    if reports.is_empty() {
        return Ok("No stuck jobs found".to_string());
    }
    let mut out = format!("Marked {} stuck job(s) as failed:", reports.len());
    for report in reports {
        out.push_str("\n  ");
        out.push_str(&format_report(report));
    }
    Ok(out)
}
