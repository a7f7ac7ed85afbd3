//! CDP CLI - Main entry point

use cdp_cli::{commands, Cli, Commands};
use cdp_common::layout::DumpLayout;
use cdp_common::logging::{init_logging, LogConfig, LogLevel};
use clap::Parser;
use std::process;
use tracing::error;

#[tokio::main]
async fn main() {
    // Parse command-line arguments
    let cli = Cli::parse();

    // Verbose flag wins; otherwise default to warnings unless LOG_LEVEL
    // overrides it
    let mut log_config = LogConfig::from_env().unwrap_or_default();
    if cli.verbose {
        log_config.level = LogLevel::Debug;
    } else if std::env::var("LOG_LEVEL").is_err() {
        log_config.level = LogLevel::Warn;
    }

    // Initialize logging (ignore errors as the CLI should work without logging)
    let _ = init_logging(&log_config);

    // Execute command
    if let Err(e) = execute_command(cli).await {
        error!(error = %e, "Command failed");
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Execute the CLI command
async fn execute_command(cli: Cli) -> cdp_cli::Result<()> {
    match cli.command {
        Commands::Fetch {
            version,
            collections,
            base_url,
            force,
            no_verify,
        } => {
            commands::fetch::run(commands::fetch::FetchOptions {
                layout: DumpLayout::new(&cli.data_dir, version),
                base_url,
                collections,
                force,
                verify: !no_verify,
            })
            .await
        },

        Commands::Verify {
            version,
            collections,
        } => {
            commands::verify::run(commands::verify::VerifyOptions {
                layout: DumpLayout::new(&cli.data_dir, version),
                collections,
            })
            .await
        },

        Commands::Import {
            version,
            collections,
            chunk_size,
            max_errors,
            restart,
            bail,
            no_validate,
            include_images,
            database,
        } => {
            let database = database.unwrap_or_else(|| cli.data_dir.join("catalog.db"));
            commands::import::run(commands::import::ImportOptions {
                layout: DumpLayout::new(&cli.data_dir, version),
                collections,
                database,
                chunk_size,
                max_errors,
                restart,
                bail,
                validate: !no_validate,
                include_images,
            })
            .await
        },
    }
}
