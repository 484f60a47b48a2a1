mod commands;

use clap::Parser;
use commands::wem::{self, WemCommands};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "wwriff")]
#[command(about = "Convert Wwise Vorbis (.wem) audio to Ogg Vorbis", long_about = None)]
struct Cli {
    /// Log debug details (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: WemCommands,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    wem::handle(cli.command)
}
