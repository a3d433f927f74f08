//! Feathermigrate CLI - versioned schema migrations for DuckDB and SQLite

use clap::Parser;

mod cli;
mod commands;

use cli::{Cli, Commands};
use commands::common::ExitCode;
use commands::{create, migrate, version};

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    init_logging(cli.global.verbose);

    let result = match &cli.command {
        Commands::Create(args) => create::execute(args, &cli.global).await,
        Commands::Up => migrate::execute(migrate::Operation::Up, &cli.global).await,
        Commands::Down => migrate::execute(migrate::Operation::Down, &cli.global).await,
        Commands::Redo => migrate::execute(migrate::Operation::Redo, &cli.global).await,
        Commands::Reset => migrate::execute(migrate::Operation::Reset, &cli.global).await,
        Commands::Migrate(args) => {
            migrate::execute(migrate::Operation::Relative(args.steps), &cli.global).await
        }
        Commands::Goto(args) => {
            migrate::execute(migrate::Operation::Goto(args.version), &cli.global).await
        }
        Commands::Version => version::execute_version(&cli.global).await,
        Commands::Versions(args) => version::execute_versions(args, &cli.global).await,
    };

    match result {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(err) => match err.downcast_ref::<ExitCode>() {
            Some(ExitCode(code)) => std::process::ExitCode::from(*code),
            None => {
                eprintln!("Error: {err:#}");
                std::process::ExitCode::FAILURE
            }
        },
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();
}
