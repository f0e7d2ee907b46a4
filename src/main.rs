use std::time::Duration;

use clap::Parser;
use retraite::api::{self, Cli, Command};
use retraite::logging::init_logging;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    match cli.command {
        Command::Serve {
            port,
            cache_ttl_secs,
        } => {
            if let Err(e) = api::run_http_server(port, Duration::from_secs(cache_ttl_secs)).await {
                eprintln!("Server error: {e}");
                std::process::exit(1);
            }
        }
        Command::Plan(args) => match api::run_plan(&args) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("Error: {e}");
                for detail in e.details() {
                    eprintln!("  - {detail}");
                }
                std::process::exit(1);
            }
        },
    }
}
