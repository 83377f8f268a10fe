use clap::{Args, Parser, Subcommand};
use imulog_core::config::Config;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "imulog",
    version,
    about = "Live IMU capture with record / pause / export",
    long_about = "Reads 7-channel IMU frames (acc_x,acc_y,acc_z,gyro_x,gyro_y,gyro_z,temp) from a \
                  serial port, shows them live and records sessions to CSV.\n\
                  Runs `record` when no subcommand is given."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Configuration file (JSON); defaults are used if it does not exist
    #[arg(long, global = true, env = "IMULOG_CONFIG", default_value = "imulog.json")]
    pub config: PathBuf,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Command {
    /// Capture from the link and record sessions interactively
    Record(RecordArgs),
    /// List available serial ports
    Ports,
    /// Summarize an exported session file
    Inspect(InspectArgs),
    /// Show the effective configuration
    Config(ConfigArgs),
}

#[derive(Args, Default)]
pub struct RecordArgs {
    /// Serial port the IMU is attached to
    #[arg(long)]
    pub port: Option<String>,

    /// Baud rate
    #[arg(long)]
    pub baud: Option<u32>,

    /// Values kept per channel for the live view
    #[arg(long)]
    pub capacity: Option<usize>,

    /// Directory sessions are exported to
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Initial session name
    #[arg(long)]
    pub name: Option<String>,

    /// Use the simulated IMU instead of a serial port
    #[arg(long)]
    pub demo: bool,

    /// Simulated frame rate in Hz [default: 50]
    #[arg(long)]
    pub demo_rate: Option<f64>,

    /// Fraction of simulated frames to corrupt [default: 0]
    #[arg(long)]
    pub demo_corruption: Option<f64>,

    /// Live status refresh period in milliseconds, 0 disables [default: 1000]
    #[arg(long)]
    pub status_interval_ms: Option<u64>,
}

impl RecordArgs {
    /// Apply command line overrides on top of the file configuration
    pub fn apply(&self, mut config: Config) -> Config {
        if let Some(port) = &self.port {
            config.port = port.clone();
        }
        if let Some(baud) = self.baud {
            config.baud_rate = baud;
        }
        if let Some(capacity) = self.capacity {
            config.history_capacity = capacity;
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(name) = &self.name {
            config.session_name = name.clone();
        }
        config.normalized()
    }
}

#[derive(Args)]
pub struct InspectArgs {
    /// Exported session CSV file
    pub file: PathBuf,

    /// Print the summary as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct ConfigArgs {
    /// Write the effective configuration to the --config path
    #[arg(long)]
    pub write: bool,
}
