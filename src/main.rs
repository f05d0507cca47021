mod cli;
mod config;
mod error;
mod parser;
mod syncer;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use std::{io::Write, process::exit};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stdout)
        .format(|buf, record| writeln!(buf, "{}: {}", record.level(), record.args()))
        .init();

    let cli = Cli::parse();

    if let Err(e) = cli.run().await {
        eprintln!("ERROR: {e:#}");
        exit(1);
    }

    Ok(())
}
