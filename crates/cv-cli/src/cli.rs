//! CLI argument definitions using clap derive API

use clap::{Args, Parser, Subcommand};

/// Colvault - schema migrations and at-rest column encryption
#[derive(Parser, Debug)]
#[command(name = "cv")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all commands
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to project directory
    #[arg(short = 'p', long, global = true, default_value = ".")]
    pub project_dir: String,

    /// Override config file path
    #[arg(short, long, global = true)]
    pub config: Option<String>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Apply pending schema migrations and first-time setup
    Migrate(MigrateArgs),

    /// Show schema version, encrypted columns, and key fingerprint
    Status(StatusArgs),

    /// Encrypt every configured column not yet encrypted
    Encrypt,

    /// Decrypt every encrypted column
    Decrypt,

    /// Create the encryption key file
    Keygen(KeygenArgs),

    /// Stop the service, re-key all encrypted columns, and start it again
    ///
    /// Exit codes: 0 success, 2 stop failed, 3 decrypt/rotate/encrypt
    /// failed, 4 start failed.
    RotateKey,
}

/// Arguments for the migrate command
#[derive(Args, Debug)]
pub struct MigrateArgs {
    /// Stop at this schema version instead of the latest one
    #[arg(long)]
    pub target_version: Option<i64>,

    /// Only migrate the schema; skip default settings, fixtures and
    /// encryption
    #[arg(long)]
    pub skip_fixtures: bool,

    /// Username the server uses to monitor its own database
    #[arg(long, env = "CV_SERVER_USERNAME", requires = "server_password")]
    pub server_username: Option<String>,

    /// Password the server uses to monitor its own database
    #[arg(
        long,
        env = "CV_SERVER_PASSWORD",
        hide_env_values = true,
        requires = "server_username"
    )]
    pub server_password: Option<String>,
}

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the keygen command
#[derive(Args, Debug)]
pub struct KeygenArgs {
    /// Overwrite an existing key file; data encrypted under it becomes
    /// unreadable
    #[arg(long)]
    pub force: bool,
}

#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;
