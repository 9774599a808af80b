mod cli;
mod context;
mod handlers;
mod output;

use clap::{CommandFactory, Parser};
use cli::{Cli, Commands};
use context::CliContext;
use kanban_core::AppConfig;
use tracing_subscriber::EnvFilter;

fn init_tracing() -> anyhow::Result<()> {
    if let Ok(log_path) = std::env::var("KANBAN_DEBUG_LOG") {
        let log_file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)?;

        tracing_subscriber::fmt()
            .with_writer(log_file)
            .with_max_level(tracing::Level::DEBUG)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_ansi(false)
            .init();
    } else {
        let filter = EnvFilter::try_from_env("KANBAN_LOG")
            .or_else(|_| EnvFilter::try_from_default_env())
            .unwrap_or_else(|_| EnvFilter::new("warn"));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
    Ok(())
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    if let Commands::Completions { shell } = cli.command {
        clap_complete::generate(shell, &mut Cli::command(), "kanban", &mut std::io::stdout());
        return Ok(());
    }

    let config = AppConfig::load();
    let file = cli
        .file
        .or_else(|| config.data_file.clone())
        .ok_or_else(|| anyhow::anyhow!("--file (or data_file in config.toml) is required"))?;
    let mut ctx = CliContext::new(file, cli.user, config);

    match cli.command {
        Commands::Board(cmd) => handlers::board::handle(&mut ctx, cmd.action).await,
        Commands::List(cmd) => handlers::list::handle(&mut ctx, cmd.action).await,
        Commands::Card(cmd) => handlers::card::handle(&mut ctx, cmd.action).await,
        Commands::Sprint(cmd) => handlers::sprint::handle(&mut ctx, cmd.action).await,
        Commands::Watch(args) => handlers::watch::handle(&ctx, args).await,
        Commands::Completions { .. } => Ok(()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing()?;
    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        tracing::debug!("Command failed: {:?}", err);
        output::output_error(&format!("{:#}", err));
    }
    Ok(())
}
