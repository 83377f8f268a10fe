use anyhow::{Context, Result};
use clap::Parser;
use imulog_core::config::Config;
use imulog_core::protocol::list_ports;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod inspect;
mod record;

use cli::{Cli, Command, ConfigArgs};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_filter = match cli.verbose {
        0 => "imulog=info,imulog_core=info",
        1 => "imulog=debug,imulog_core=debug",
        _ => "imulog=trace,imulog_core=trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let exit_code = match run(cli).await {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("error: {:#}", e);
            1
        }
    };

    // Exit directly so a pending stdin read cannot hold the runtime open
    std::process::exit(exit_code);
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load(&cli.config)?;

    match cli.command.unwrap_or(Command::Record(Default::default())) {
        Command::Record(args) => {
            let config = args.apply(config);
            record::execute(args, config).await
        }
        Command::Ports => {
            let ports = list_ports();
            if ports.is_empty() {
                println!("no serial ports found");
            }
            for port in ports {
                match (port.vid, port.pid) {
                    (Some(vid), Some(pid)) => println!(
                        "{}  [{:04x}:{:04x}] {}",
                        port.name,
                        vid,
                        pid,
                        port.product.unwrap_or_default()
                    ),
                    _ => println!("{}", port.name),
                }
            }
            Ok(())
        }
        Command::Inspect(args) => inspect::execute(args),
        Command::Config(ConfigArgs { write }) => {
            if write {
                config
                    .save(&cli.config)
                    .with_context(|| format!("Failed to write {}", cli.config.display()))?;
                println!("wrote {}", cli.config.display());
            } else {
                println!("{}", serde_json::to_string_pretty(&config)?);
            }
            Ok(())
        }
    }
}
