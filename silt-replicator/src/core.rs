use std::path::PathBuf;

use silt::pipeline::Pipeline;
use silt_config::shared::ReplicatorConfig;
use silt_elastic::EsDestination;
use tokio::signal::unix::{SignalKind, signal};
use tracing::{debug, info, warn};

/// Starts the pipeline against the Elasticsearch destination and runs it
/// until SIGINT or SIGTERM.
pub async fn run(config: ReplicatorConfig, config_dir: PathBuf) -> anyhow::Result<()> {
    info!("starting replicator service");
    log_config(&config);

    let destination = EsDestination::new(&config.elasticsearch);
    let mut pipeline = Pipeline::new(config, config_dir, destination);

    pipeline.start().await?;

    // Listen for shutdown signals and trigger a graceful drain. SIGTERM is
    // what service managers send before a hard kill.
    let shutdown_tx = pipeline.shutdown_tx();
    let shutdown_task = tokio::spawn(async move {
        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(sigterm) => sigterm,
            Err(err) => {
                warn!(error = %err, "failed to register SIGTERM handler");
                return;
            }
        };

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("sigint received, shutting down pipeline");
            }
            _ = sigterm.recv() => {
                info!("sigterm received, shutting down pipeline");
            }
        }

        let _ = shutdown_tx.send(true);
    });

    let result = pipeline.wait().await;

    // The pipeline may have finished on its own; stop the signal listener
    // either way before returning.
    shutdown_task.abort();
    let _ = shutdown_task.await;

    result?;
    info!("replicator service completed");

    Ok(())
}

fn log_config(config: &ReplicatorConfig) {
    debug!(
        host = %config.mysql.host,
        port = config.mysql.port,
        username = %config.mysql.username,
        server_id = config.mysql.server_id,
        "source mysql connection config"
    );
    debug!(url = %config.elasticsearch.url, "elasticsearch connection config");
    debug!(
        max_actions = config.bulk.max_actions,
        max_bytes = config.bulk.max_bytes,
        "bulk config"
    );
    debug!(
        data_dir = %config.data_dir.display(),
        dump_exec = %config.dump.exec_path,
        read_timeout_ms = config.read_timeout_ms,
        sources = config.sources.len(),
        rules = config.rules.len(),
        "pipeline config"
    );
}
