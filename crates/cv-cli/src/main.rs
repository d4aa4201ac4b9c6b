//! Colvault CLI - schema migrations, column encryption, and key rotation

use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;
mod logging;

use cli::Cli;
use commands::common::ExitCode;
use commands::{encrypt, keygen, migrate, rotate_key, status};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.global.verbose);

    let result = match &cli.command {
        cli::Commands::Migrate(args) => migrate::execute(args, &cli.global).await,
        cli::Commands::Status(args) => status::execute(args, &cli.global).await,
        cli::Commands::Encrypt => encrypt::execute_encrypt(&cli.global).await,
        cli::Commands::Decrypt => encrypt::execute_decrypt(&cli.global).await,
        cli::Commands::Keygen(args) => keygen::execute(args, &cli.global).await,
        cli::Commands::RotateKey => rotate_key::execute(&cli.global).await,
    };

    match result {
        Err(err) => match err.downcast_ref::<ExitCode>() {
            Some(ExitCode(code)) => std::process::exit(*code),
            None => Err(err),
        },
        Ok(()) => Ok(()),
    }
}
