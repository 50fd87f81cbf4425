//! zeto - cursor pagination over document collections
//!
//! Pages through ordered MongoDB collections (or JSON fixtures) with
//! cursor pagination, and evaluates role-based route access.
//!
//! # Usage
//!
//! ```bash
//! # Second page of the newest projects
//! zeto page projects --page 2
//!
//! # Three fetches of an infinite feed from a fixture
//! zeto --fixture projects.json scroll projects --batches 3
//!
//! # Route access
//! zeto route /users/5 --role advertiser
//! ```

use tracing_subscriber::EnvFilter;

use zeto::cli::CliInterface;
use zeto::error::Result;

/// Application entry point
#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Main application logic
///
/// 1. Parse command-line arguments
/// 2. Load configuration
/// 3. Initialize logging
/// 4. Run the selected subcommand
async fn run() -> Result<()> {
    let cli = CliInterface::new()?;
    initialize_logging(&cli);
    cli.run().await
}

/// Initialize logging from the configured level; `RUST_LOG` takes precedence
///
/// # Arguments
/// * `cli` - CLI interface with the effective configuration
fn initialize_logging(cli: &CliInterface) {
    let logging = &cli.config().logging;
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(logging.level.as_filter()));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if logging.timestamps {
        subscriber.init();
    } else {
        subscriber.without_time().init();
    }
}
