use clap::Parser;
use slotmarshal::slog::unique_event_types_in_file;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Lists the distinct event types found in a slog file.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the slog file
    slog_file: PathBuf,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match unique_event_types_in_file(&cli.slog_file).await {
        Ok(types) => match serde_json::to_string(&types) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        },
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
