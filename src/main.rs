mod artefacts;
mod cli;
mod commands;
mod completion;
mod config;
mod domain;
mod error;
mod fsops;
mod git;
mod index;
mod layout;
mod materialize;
mod output;
mod pathcodec;
mod registry;
mod repair;
mod transform;

use std::process;

use clap::Parser;

fn main() -> process::ExitCode {
    init_logging();

    let cli = cli::Cli::parse();

    match commands::run(cli) {
        Ok(()) => process::ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            e.code.into()
        }
    }
}

/// `BT_LOG` takes precedence over `RUST_LOG`; both fall back to `warn`.
fn init_logging() {
    let filter = std::env::var("BT_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| "warn".to_string());
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&filter)).init();
}
