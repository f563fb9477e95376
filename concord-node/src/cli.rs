use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "concord-node")]
#[command(about = "Leaderless quorum voting node. Reads newline-delimited cluster messages from stdin.")]
pub struct Args {
    /// Node configuration file; a default one is generated if missing
    #[arg(short, long, value_name = "FILE", default_value = "config.json")]
    pub config: PathBuf,

    /// Directory for the consensus event log
    #[arg(long, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,
}
