use std::process;
use clap::Parser;

use feed_relay::cli::Cli;

#[tokio::main]
async fn main() {
    // A missing .env file is fine.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    if let Err(e) = cli.run().await {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}
