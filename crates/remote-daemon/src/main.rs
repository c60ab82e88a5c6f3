use std::sync::Arc;

use remote_daemon::{metadata, player, server, Backend};
use remote_proto::config::Config;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let data_dir = remote_proto::platform::data_dir();
    std::fs::create_dir_all(&data_dir)?;
    let log_path = data_dir.join("daemon.log");

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(log_file)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,remote_daemon=debug")),
        )
        .init();

    info!("Log file: {:?}", log_path);

    let config = Config::load()?;
    info!("Config loaded from: {:?}", Config::config_path());

    let kind = player::detect().await;
    match kind {
        Some(k) => info!("player: using {}", k),
        None => warn!("player: none found (mpv or Flatpak mpv/VLC)"),
    }

    let backend = Arc::new(Backend::new(kind, &config));
    let token = CancellationToken::new();

    let watchdog = tokio::spawn(
        backend
            .clone()
            .run_watchdog(token.clone(), config.daemon.watchdog_interval()),
    );
    let refresher = tokio::spawn(metadata::run_refresher(
        backend.clone(),
        token.clone(),
        config.daemon.metadata_interval(),
    ));

    // ── shutdown on Ctrl-C ───────────────────────────────────────────────────
    let signal_token = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, shutting down");
        }
        signal_token.cancel();
    });

    let served = server::serve(
        &config.daemon.listen_address(),
        backend.clone(),
        token.clone().cancelled_owned(),
    )
    .await;

    // unload: stop the loops first so the watchdog cannot respawn the player
    token.cancel();
    let _ = watchdog.await;
    let _ = refresher.await;
    backend.unload().await;
    info!("Daemon stopped");

    served
}
