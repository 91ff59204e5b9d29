mod cli;
mod engine;

use clap::Parser;

use cli::Cli;
use engine::{CommandSource, Engine};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .init();

    let source = if let Some(command) = cli.command {
        CommandSource::Command(command)
    } else if !cli.files.is_empty() {
        CommandSource::Files(cli.files)
    } else {
        CommandSource::Stdin
    };

    let mut engine = Engine::new();
    engine.run(source).await;
}
