//! Camcorder CLI entry point

use std::process::ExitCode;

use clap::Parser;

use camcorder::cli::{
    app::{load_merged_config, run_check, run_record, RecordOptions, EXIT_ERROR, EXIT_USAGE_ERROR},
    args::{Cli, Commands},
    config_cmd::handle_config_command,
    logging,
    presenter::Presenter,
    signals::StopSignals,
};
use camcorder::infrastructure::XdgConfigStore;

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.quiet);
    let presenter = Presenter::new();
    let cli_config = cli.to_config();

    let check = match cli.command {
        Some(Commands::Config { action }) => {
            let store = XdgConfigStore::new();
            if let Err(e) = handle_config_command(action, &store, &presenter).await {
                presenter.error(&e.to_string());
                return ExitCode::from(EXIT_ERROR);
            }
            return ExitCode::SUCCESS;
        }
        Some(Commands::Check) => true,
        None => false,
    };

    let config = load_merged_config(cli_config).await;
    let options = match RecordOptions::from_config(&config) {
        Ok(options) => options,
        Err(e) => {
            presenter.error(&e);
            return ExitCode::from(EXIT_USAGE_ERROR);
        }
    };

    if check {
        return run_check(options).await;
    }

    let signals = match StopSignals::listen() {
        Ok(signals) => signals,
        Err(e) => {
            presenter.error(&format!("Failed to setup signal handler: {}", e));
            return ExitCode::from(EXIT_ERROR);
        }
    };

    run_record(options, signals).await
}
