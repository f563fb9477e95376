use std::path::Path;

use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{filter::filter_fn, prelude::*, EnvFilter};
use uuid::Uuid;

use concord_common::error::Result;

use crate::config::NodeConfig;

/// Writes a single-member default config to `path` if no file exists yet.
pub fn ensure_config(path: &Path) -> Result<()> {
    if !path.exists() {
        info!("⚠️ Config not found. Generating default at {}...", path.display());

        let suffix = Uuid::new_v4().simple().to_string();
        let config = NodeConfig::new(format!("node-{}", &suffix[..8]));
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        config.save_to_file(path)?;
        info!("✅ Config generated for [{}]", config.node_id);
    }
    Ok(())
}

/// Installs the global subscriber.
///
/// Stdout follows `RUST_LOG`. With a log directory, `consensus` target
/// events go to `consensus-<node>.log` instead of stdout. Keep the returned
/// guard alive for the process lifetime.
pub fn init_logging(log_dir: Option<&Path>, node_name: &str) -> Option<WorkerGuard> {
    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::never(dir, format!("consensus-{node_name}.log"));
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_filter(filter_fn(|metadata| metadata.target() == "consensus"));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let split_consensus = file_layer.is_some();
    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info,concord_node=debug".into()))
        .with_filter(filter_fn(move |metadata| !split_consensus || metadata.target() != "consensus"));

    tracing_subscriber::registry()
        .with(file_layer)
        .with(stdout_layer)
        .init();

    guard
}
