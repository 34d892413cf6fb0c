//! Robot CLI
//!
//! Runs browser automation scripts from JSON files and checks their block
//! structure.

use robot_core::cli;

#[tokio::main]
async fn main() {
    if let Err(e) = cli::run_cli().await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
