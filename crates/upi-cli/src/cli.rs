use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "upi",
    about = "Unique Property Identifiers: derive, store and log property records",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Node configuration file (TOML)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Storage directory; overrides `data_dir` from the configuration file
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print the canonical form of an address
    Normalize(NormalizeArgs),
    /// Derive a UPI from coordinates
    Derive(DeriveArgs),
    /// Resolve an address to a UPI through a gazetteer file
    Resolve(ResolveArgs),
    /// Store a payload and print its content address
    Put(PutArgs),
    /// Print the payload stored under a content address
    Get(GetArgs),
    /// Append to, list or verify the record log
    Log(LogArgs),
}

#[derive(Args)]
pub struct NormalizeArgs {
    pub address: String,
}

#[derive(Args)]
pub struct DeriveArgs {
    #[arg(long, allow_hyphen_values = true)]
    pub lat: f64,
    #[arg(long, allow_hyphen_values = true)]
    pub lng: f64,
    #[arg(long)]
    pub unit: Option<String>,
    /// Fractional digits each coordinate must carry
    #[arg(long, default_value = "6")]
    pub min_digits: usize,
}

#[derive(Args)]
pub struct ResolveArgs {
    pub address: String,
    #[arg(long)]
    pub gazetteer: PathBuf,
}

#[derive(Args)]
pub struct PutArgs {
    pub data: String,
}

#[derive(Args)]
pub struct GetArgs {
    pub address: String,
}

#[derive(Args)]
pub struct LogArgs {
    #[command(subcommand)]
    pub action: LogAction,
}

#[derive(Subcommand)]
pub enum LogAction {
    /// Append an entry linking a UPI to a content address
    Add {
        upi: String,
        content_address: String,
        #[arg(long)]
        owner: Option<String>,
        /// Extra metadata as key=value; repeatable
        #[arg(long = "meta", value_parser = parse_key_value)]
        meta: Vec<(String, String)>,
    },
    /// List entries, oldest first
    List {
        #[arg(long)]
        owner: Option<String>,
        #[arg(long)]
        id: Option<String>,
        #[arg(short = 'n', long)]
        limit: Option<usize>,
        #[arg(long)]
        reverse: bool,
    },
    /// Check sequence numbers and the hash chain
    Verify,
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected key=value, got `{raw}`")),
    }
}
