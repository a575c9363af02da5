use std::time::Duration;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use jobtrace_tracker::StuckJobDetector;
use jobtrace_worker::{build_tracker, render_reports, Args};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "jobtrace_worker=info,jobtrace_tracker=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let tracker = build_tracker(&args).await?;
    let detector = StuckJobDetector::new(tracker, args.threshold_minutes);

    let Some(interval_secs) = args.interval_secs else {
        let reports = detector.sweep().await;
        println!("{}", render_reports(&reports, args.json)?);
        return Ok(());
    };

    let cancel = CancellationToken::new();
    let sweep_cancel = cancel.clone();
    let handle = tokio::spawn(async move {
        detector
            .run(Duration::from_secs(interval_secs.max(1)), sweep_cancel)
            .await;
    });

    shutdown_signal().await;
    cancel.cancel();
    handle.await?;
    tracing::info!("Maintenance worker stopped");
    Ok(())
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received SIGINT (Ctrl-C), stopping"),
        () = terminate => tracing::info!("Received SIGTERM, stopping"),
    }
}
