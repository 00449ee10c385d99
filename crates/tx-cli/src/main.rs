use clap::Parser;
use color_eyre::{eyre::eyre, Result};

mod cli;
mod commands;
mod config;

use cli::{CommandCli, TxCli};
use commands::Output;
use config::Config;

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = TxCli::parse();
    let config = Config::from_env().map_err(|err| eyre!("{err:#}"))?;
    init_tracing(cli.trace, cli.verbose, config.log_filter.as_deref());

    let outcome = match &cli.command {
        CommandCli::Lock(args) => commands::lock(&config, args),
        CommandCli::Deps(args) => commands::deps(&config, args),
        CommandCli::Clean(args) => commands::clean(args),
    }
    .map_err(|err| eyre!("{err:#}"))?;

    emit_output(&cli, &outcome)
}

fn init_tracing(trace: bool, verbose: u8, override_filter: Option<&str>) {
    let level = if trace {
        "trace"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };

    let filter = override_filter.map_or_else(
        || format!("tx={level},tx_cli={level},tx_pip={level},tx_python={level},tx_util={level}"),
        str::to_string,
    );
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn emit_output(cli: &TxCli, outcome: &Output) -> Result<()> {
    match outcome {
        Output::Json(payload) => println!("{}", serde_json::to_string_pretty(payload)?),
        Output::Lines(lines) if !cli.quiet => {
            for line in lines {
                println!("{line}");
            }
        }
        Output::Lines(_) => {}
    }
    Ok(())
}
