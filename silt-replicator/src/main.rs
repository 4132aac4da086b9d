//! Replicator service binary.
//!
//! Loads configuration, applies command-line overrides, initializes tracing
//! and runs the replication pipeline until a termination signal arrives.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use silt_config::shared::ReplicatorConfig;
use tracing::error;

mod core;

/// MySQL to Elasticsearch replication service.
#[derive(Debug, Parser)]
#[command(name = "silt-replicator", version, about)]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(long, short = 'c', default_value = "/etc/silt/silt.toml")]
    config: PathBuf,

    /// Override the source MySQL host.
    #[arg(long)]
    db_host: Option<String>,

    /// Override the source MySQL user.
    #[arg(long)]
    db_user: Option<String>,

    /// Override the source MySQL password.
    #[arg(long)]
    db_password: Option<String>,

    /// Override the numeric replication follower id.
    #[arg(long)]
    server_id: Option<u32>,

    /// Override the Elasticsearch URL.
    #[arg(long)]
    es_url: Option<String>,

    /// Override the data directory.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Override the bulk action-count threshold.
    #[arg(long)]
    max_actions: Option<usize>,
}

impl Args {
    fn apply_overrides(&self, config: &mut ReplicatorConfig) {
        if let Some(host) = &self.db_host {
            config.mysql.host = host.clone();
        }
        if let Some(user) = &self.db_user {
            config.mysql.username = user.clone();
        }
        if let Some(password) = &self.db_password {
            config.mysql.password = Some(password.clone().into());
        }
        if let Some(server_id) = self.server_id {
            config.mysql.server_id = server_id;
        }
        if let Some(url) = &self.es_url {
            config.elasticsearch.url = url.clone();
        }
        if let Some(data_dir) = &self.data_dir {
            config.data_dir = data_dir.clone();
        }
        if let Some(max_actions) = self.max_actions {
            config.bulk.max_actions = max_actions;
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    if let Err(err) = silt_telemetry::tracing::init_tracing(env!("CARGO_BIN_NAME")) {
        eprintln!("failed to initialize tracing: {err}");
        return ExitCode::FAILURE;
    }

    let mut config: ReplicatorConfig = match silt_config::load_config_from_path(&args.config) {
        Ok(config) => config,
        Err(err) => {
            error!(config = %args.config.display(), error = %err, "failed to load configuration");
            return ExitCode::FAILURE;
        }
    };
    args.apply_overrides(&mut config);

    if let Err(err) = config.validate() {
        error!(error = %err, "invalid configuration");
        return ExitCode::FAILURE;
    }

    let config_dir = args
        .config
        .parent()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(err) => {
            error!(error = %err, "failed to build runtime");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(core::run(config, config_dir)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "replicator failed");
            ExitCode::FAILURE
        }
    }
}
