use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "ael",
    about = "Audit Evidence Ledger: tamper-evident audit trail",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Ledger file (overrides the configured path)
    #[arg(short, long, global = true)]
    pub ledger: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Append an audit event
    Append(AppendArgs),
    /// Verify chain integrity from genesis
    Verify(VerifyArgs),
    /// Show recent entries
    Log(LogArgs),
    /// Purge the ledger and start a new chain (requires allow_reset)
    Reset(ResetArgs),
}

#[derive(Args)]
pub struct AppendArgs {
    #[arg(long)]
    pub action: String,
    #[arg(long)]
    pub actor: Option<String>,
    #[arg(long)]
    pub resource: Option<String>,
    #[arg(long = "method")]
    pub http_method: Option<String>,
    #[arg(long)]
    pub outcome: Option<String>,
    #[arg(long)]
    pub reason: Option<String>,
    #[arg(long = "target")]
    pub target_actor: Option<String>,
    /// Structured details as a JSON document
    #[arg(long)]
    pub details: Option<String>,
    #[arg(long = "ip")]
    pub ip_address: Option<String>,
    #[arg(long)]
    pub user_agent: Option<String>,
}

#[derive(Args)]
pub struct VerifyArgs {}

#[derive(Args)]
pub struct LogArgs {
    #[arg(short = 'n', long, default_value = "20")]
    pub limit: usize,
}

#[derive(Args)]
pub struct ResetArgs {
    #[arg(long)]
    pub actor: String,
    #[arg(long)]
    pub reason: String,
}
