//! CLI argument parsing for pingexit

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Output format for the exit condition report
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Single `/`-separated line (default)
    Text,
    /// JSON object for machine parsing
    Json,
}

const SPEC_HELP: &str = "\
EXIT CONDITION (-x SPEC):
  SPEC := [-]COUNT[s]:[OPTIONS]
    -COUNT   count failed rounds instead of successful ones
    s        COUNT rounds must happen in a row
  OPTIONS:
    x        exit status reflects the condition (0 met, 1 not met)
    n        report the counted kind (+n successes, -n failures)
    N        report both counts
    m        keep a ping map: m(SIZE), m(:SF), m(SIZE:SF)
    c        report condition state T/F
    q        omit the report label

EXAMPLES:
  pingexit -x 5s:xNm -- ping -c1 -W1 example.org
  pingexit -x -3:c --outcomes '+-+--'";

#[derive(Parser, Debug)]
#[command(name = "pingexit")]
#[command(version)]
#[command(about = "Probe loop with configurable exit conditions and ping maps", long_about = None)]
#[command(after_help = SPEC_HELP)]
pub struct Cli {
    /// Exit condition specification (e.g., -x 5s:xNm)
    #[arg(
        short = 'x',
        long = "exit-cond",
        value_name = "SPEC",
        allow_hyphen_values = true
    )]
    pub exit_cond: Option<String>,

    /// Stop after COUNT rounds
    #[arg(short = 'c', long = "count", value_name = "COUNT")]
    pub count: Option<u64>,

    /// Seconds to wait between rounds of a command probe
    #[arg(short = 'i', long = "interval", value_name = "SECONDS")]
    pub interval: Option<f64>,

    /// Replay outcomes instead of running a command ('+'/'-', or '-' alone for stdin)
    #[arg(long = "outcomes", value_name = "SCRIPT", allow_hyphen_values = true)]
    pub outcomes: Option<String>,

    /// Report format
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Print the report even if the condition requests no fields
    #[arg(long = "force-report")]
    pub force_report: bool,

    /// Print the raw ping map with its write position to stderr
    #[arg(long = "map-debug")]
    pub map_debug: bool,

    /// Load map and probe defaults from a TOML file
    #[arg(long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable debug logging to stderr
    #[arg(long)]
    pub debug: bool,

    /// Probe command to run each round (e.g., -- ping -c1 host)
    #[arg(last = true)]
    pub command: Option<Vec<String>>,
}
