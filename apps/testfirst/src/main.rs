//! # testfirst
//!
//! Mines a project's history for evidence of test-first development.
//!
//! ## Usage
//!
//! ```bash
//! # Build the aligned transaction log from extracted history
//! testfirst build -r history.csv -o history.tfdl
//!
//! # Show which tests exercise which sources
//! testfirst bind -p ./project --strategy transitive_reference
//!
//! # Classify sources
//! testfirst analyze -r history.csv -p ./project --discriminator commit_sequence
//!
//! # Fingerprint a stored log
//! testfirst checksum -l history.tfdl
//! ```

use clap::Parser;
use testfirst::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() {
    let cli = cli::Cli::parse();

    // TESTFIRST_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("TESTFIRST_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let default_level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("testfirst={default_level},testfirst_core={default_level}").into()
    });

    // Logs go to stderr so report output on stdout stays parseable.
    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    if let Err(e) = cli::execute(cli) {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}
