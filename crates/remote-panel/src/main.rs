mod app;
mod theme;
mod widgets;

use std::sync::Arc;

use remote_panel::notify::ChannelNotifier;
use remote_panel::{HttpGateway, Panel};
use remote_proto::config::Config;
use tokio::sync::mpsc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let data_dir = remote_proto::platform::data_dir();
    std::fs::create_dir_all(&data_dir)?;

    let log_path = data_dir.join("panel.log");
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    // Allow RUST_LOG override; keep the HTTP client internals quiet by default.
    let log_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "debug,hyper_util=warn,reqwest=warn,hyper=warn".to_string());
    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_env_filter(log_filter.as_str())
        .with_ansi(false)
        .init();

    eprintln!("nts-remote log: {}", log_path.display());

    let config = Config::load().unwrap_or_default();
    tracing::info!(
        "nts-remote starting, backend {} every {:?}",
        config.panel.endpoint,
        config.panel.poll_interval()
    );

    let gateway = Arc::new(HttpGateway::new(
        &config.panel.endpoint,
        config.panel.rpc_timeout(),
    )?);

    // ── Notifications (dispatcher → toasts) ──────────────────────────────────
    let (notice_tx, notice_rx) = mpsc::unbounded_channel();
    let notifier = Arc::new(ChannelNotifier::new(notice_tx));

    let panel = Panel::mount(gateway, notifier, config.panel.poll_interval());

    let res = app::App::new(panel.model().clone(), panel.dispatcher())
        .run(notice_rx)
        .await;

    panel.unmount().await;
    tracing::info!("nts-remote stopped");
    res
}
