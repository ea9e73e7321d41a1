use std::fs::OpenOptions;
use std::sync::Mutex;

use sudoku_coop::{ClientConfig, app};
use tracing::info;

fn main() {
    // Load .env if present
    let _ = dotenvy::dotenv();
    let config = ClientConfig::from_env();

    if let Err(e) = init_logging(&config.log_file) {
        eprintln!("Error: cannot open log file {}: {}", config.log_file, e);
        std::process::exit(1);
    }
    info!(server = %config.server_url, "starting");

    if let Err(e) = app::run(config) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Log to a file; the terminal belongs to the UI.
fn init_logging(path: &str) -> std::io::Result<()> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sudoku_coop=info,sudoku_coop_core=info".into()),
        )
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(())
}
