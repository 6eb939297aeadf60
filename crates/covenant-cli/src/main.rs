//! Covenant CLI - answer a question catalogue over long credit agreements.

use clap::Parser;
use covenant_cli::commands;
use covenant_cli::config::OutputFormat;
use covenant_cli::{Cli, Command, Config, Formatter};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", Formatter::new(OutputFormat::Table, !cli.no_color).error(&e.to_string()));
            std::process::exit(1);
        }
    };

    let format = cli.format.map(Into::into).unwrap_or(config.settings.format);
    let formatter = Formatter::new(format, !cli.no_color && config.settings.color);

    if let Err(e) = run(cli.command, &config, &formatter).await {
        eprintln!("{}", formatter.error(&e.to_string()));
        std::process::exit(1);
    }
}

async fn run(command: Command, config: &Config, formatter: &Formatter) -> covenant_cli::Result<()> {
    match command {
        Command::Extract(args) => commands::execute_extract(args, config, formatter).await,
        Command::Chunks(args) => commands::execute_chunks(args, config, formatter),
        Command::Questions(args) => commands::execute_questions(args, formatter),
        Command::Route(args) => commands::execute_route(args, formatter),
    }
}

/// Log to stderr so JSON output on stdout stays machine-readable.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();
}
