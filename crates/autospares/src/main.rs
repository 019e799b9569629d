// SPDX-FileCopyrightText: 2026 AutoSpares Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! AutoSpares Kenya storefront backend.
//!
//! Binary entry point: `serve`, `import-products`, and `check-config`.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod import;
mod serve;
mod shutdown;

use std::path::PathBuf;

use autospares_config::StoreConfig;
use clap::{Parser, Subcommand};

/// AutoSpares Kenya storefront backend.
#[derive(Parser, Debug)]
#[command(name = "autospares", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the XDG hierarchy.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the HTTP and WebSocket API.
    Serve,
    /// Load catalog products from a CSV file.
    ImportProducts {
        /// CSV with a header row (id, sku, name, price, ...).
        path: PathBuf,
    },
    /// Validate configuration and print a summary.
    CheckConfig,
}

fn load_config(path: Option<&PathBuf>) -> StoreConfig {
    let loaded = match path {
        Some(path) => autospares_config::load_and_validate_path(path),
        None => autospares_config::load_and_validate(),
    };
    match loaded {
        Ok(config) => config,
        Err(errors) => {
            autospares_config::render_errors(&errors);
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref());

    let result = match cli.command {
        Some(Commands::Serve) => serve::run_serve(config).await,
        Some(Commands::ImportProducts { path }) => {
            serve::init_tracing(&config.server.log_level);
            import::run_import(&config, &path).await.map(|count| {
                println!("imported {count} products from {}", path.display());
            })
        }
        Some(Commands::CheckConfig) => {
            print_config_summary(&config);
            Ok(())
        }
        None => {
            println!("autospares: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn print_config_summary(config: &StoreConfig) {
    let set = |present: bool| if present { "set" } else { "not set" };
    println!("configuration OK");
    println!("  server:   {}:{}", config.server.host, config.server.port);
    println!("  database: {}", config.storage.database_path);
    println!(
        "  gemini:   model {} (api key {})",
        config.gemini.model,
        set(config.gemini.api_key.is_some() || std::env::var("GEMINI_API_KEY").is_ok())
    );
    println!(
        "  mpesa:    {} shortcode {} (consumer key {})",
        config.mpesa.environment,
        config.mpesa.shortcode,
        set(config.mpesa.consumer_key.is_some() || std::env::var("MPESA_CONSUMER_KEY").is_ok())
    );
    match &config.email.smtp_host {
        Some(host) => println!("  email:    {host}:{}", config.email.smtp_port),
        None => println!("  email:    disabled"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_is_active() {
        use tikv_jemalloc_ctl::{epoch, stats};
        epoch::advance().unwrap();
        let allocated = stats::allocated::read().unwrap();
        assert!(allocated > 0, "jemalloc should report non-zero allocation");
    }

    #[test]
    fn cli_parses_subcommands() {
        let cli = Cli::try_parse_from(["autospares", "import-products", "parts.csv"]).unwrap();
        match cli.command {
            Some(Commands::ImportProducts { path }) => assert_eq!(path, PathBuf::from("parts.csv")),
            other => panic!("unexpected command: {other:?}"),
        }

        let cli =
            Cli::try_parse_from(["autospares", "check-config", "--config", "/tmp/a.toml"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::CheckConfig)));
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/a.toml")));
    }
}
