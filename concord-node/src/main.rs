use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};

use concord_node::{
    build_runtime,
    cli::Args,
    setup::{ensure_config, init_logging},
    NodeConfig,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Parse arguments
    let args = Args::parse();
    let node_name = args
        .config
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("node")
        .to_string();

    // 2. Logging (guard must outlive the runtime)
    let _guard = init_logging(args.log_dir.as_deref(), &node_name);

    info!("--- STARTING CONCORD NODE ---");
    info!("Config: {}", args.config.display());

    // 3. Config
    ensure_config(&args.config)?;
    let config = NodeConfig::load_from_file(&args.config)?;

    // 4. Runtime
    let runtime = match build_runtime(config).await {
        Ok(rt) => rt,
        Err(e) => {
            error!("Failed to start node: {}", e);
            return Err(e.into());
        }
    };

    // 5. Intake: one JSON cluster message per line until EOF
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match runtime.driver.handle_line(line).await {
            Ok(Some(outcome)) if outcome.committed_now => info!("Commit reached ({} votes)", outcome.votes),
            Ok(_) => {}
            Err(e) => warn!("Rejected message: {}", e),
        }
    }

    // 6. Drain
    info!("Input closed, draining commit pipeline...");
    let applied = runtime.shutdown().await?;
    info!("Node stopped after persisting {} commits", applied);
    Ok(())
}
