mod checks;
mod cli;
mod config;
mod inspector;
mod resolve;
mod runner;
mod testutil;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Command};
use config::LoggingConfig;
use inspector::ToolInspector;
use runner::SystemRunner;

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // Usage errors exit 1 rather than clap's default 2; --help and --version exit 0.
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            std::process::exit(code);
        }
    };

    if let Err(e) = run(cli) {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = config::load(cli.config.as_deref())?;
    init_logging(&config.logging);

    // Nothing is run against a server that does not resolve.
    resolve::resolve_host(cli.command.server())?;

    let inspector = ToolInspector::new(SystemRunner, config.tools, config.checks.timeout());

    match cli.command {
        Command::Version { server } => {
            let report = checks::check_version(&inspector, &server);
            output(&report, cli.json, checks::format_version_human)?;
        }
        Command::Share { server, shares } => {
            let report = checks::check_shares(&inspector, &server, &shares);
            output(&report, cli.json, checks::format_share_human)?;
        }
    }
    Ok(())
}

fn init_logging(logging: &LoggingConfig) {
    let level_str = logging.effective_level();
    let level = match level_str.parse() {
        Ok(level) => level,
        Err(_) => {
            eprintln!(
                "warning: invalid log level '{}', falling back to '{}'",
                level_str,
                config::DEFAULT_LOG_LEVEL
            );
            tracing::Level::WARN
        }
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

/// Always prints exactly one line, even when the human rendering is empty.
fn output<T: serde::Serialize>(report: &T, json: bool, human_fn: fn(&T) -> String) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(report)?);
    } else {
        println!("{}", human_fn(report));
    }
    Ok(())
}
