use std::sync::Arc;

use anyhow::Context;
use common::logger::init_logger;
use hunter_backend::{
    config::{AppConfig, ConfigHandle},
    desk_view::DeskView,
    orchestrator::{Orchestrator, Settings},
};
use market::{FeedClient, Simulator};
use scheduler::InferenceClient;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cfg = AppConfig::from_env().context("invalid configuration")?;
    init_logger("hunter", cfg.json_logs);

    tracing::info!(
        feed_url = %cfg.feed.feed_url(),
        simulation = cfg.feed.is_simulation(),
        poll_interval_ms = cfg.feed.poll_interval_ms(),
        "Starting Gold Hunter desk..."
    );

    let feed = Arc::new(FeedClient::new().context("failed to build feed client")?);
    let inference = Arc::new(
        InferenceClient::new(cfg.inference_url.clone())
            .context("failed to build inference client")?,
    );

    let config = ConfigHandle::new(cfg.feed.clone());
    let view = DeskView::new();

    let orchestrator = Orchestrator::new(
        feed,
        inference,
        Simulator::new(cfg.sim_step_scale),
        Settings::from(&cfg),
        config.subscribe(),
        view.clone(),
    );

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = ?e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    orchestrator
        .run(shutdown)
        .await
        .context("desk stopped with an error")?;

    tracing::info!(
        counters = ?view.counters(),
        signals = view.signals().len(),
        "Shutdown complete"
    );

    Ok(())
}
