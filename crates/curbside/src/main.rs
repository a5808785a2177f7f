// SPDX-FileCopyrightText: 2026 Curbside Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Curbside - arrival-gated curbside pickup coordinator.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod serve;
mod shutdown;
mod sweep;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use curbside_config::CurbsideConfig;

/// Curbside - arrival-gated curbside pickup coordinator.
#[derive(Parser, Debug)]
#[command(name = "curbside", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, short, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP gateway with the release worker and expiry sweeper.
    Serve,
    /// Run one expiry and purge pass against the store, then exit.
    Sweep,
    /// Validate configuration and print a summary.
    CheckConfig,
}

fn load_config(path: Option<&PathBuf>) -> CurbsideConfig {
    let loaded = match path {
        Some(path) => curbside_config::load_and_validate_path(path),
        None => curbside_config::load_and_validate(),
    };
    match loaded {
        Ok(config) => config,
        Err(errors) => {
            curbside_config::render_errors(&errors);
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
        Some(Commands::Sweep) => sweep::run_sweep(config).await,
        Some(Commands::CheckConfig) => {
            println!(
                "curbside: config ok (service.name={}, destinations={}, gateway={}:{})",
                config.service.name,
                config.destinations.len(),
                config.gateway.host,
                config.gateway.port,
            );
            Ok(())
        }
        None => {
            println!("curbside: use --help for available commands");
            Ok(())
        }
    };

    if let Err(err) = result {
        eprintln!("curbside: {err}");
        std::process::exit(1);
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
    fn binary_loads_config_defaults() {
        let config = curbside_config::load_and_validate_str("")
            .expect("default config should be valid");
        assert_eq!(config.service.name, "curbside");
        assert!(config.destinations.is_empty());
    }

    #[test]
    fn cli_parses_subcommands() {
        let cli = Cli::try_parse_from(["curbside", "--config", "/tmp/c.toml", "sweep"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.toml")));
        assert!(matches!(cli.command, Some(Commands::Sweep)));

        let cli = Cli::try_parse_from(["curbside", "check-config"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::CheckConfig)));

        assert!(Cli::try_parse_from(["curbside", "launch"]).is_err());
    }

    #[test]
    #[serial_test::serial]
    fn explicit_config_file_takes_env_overrides() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("curbside.toml");
        std::fs::write(&path, "[gateway]\nport = 9100\n").unwrap();

        let config = curbside_config::load_and_validate_path(&path).unwrap();
        assert_eq!(config.gateway.port, 9100);

        unsafe { std::env::set_var("CURBSIDE_GATEWAY_PORT", "9200") };
        let overridden = curbside_config::load_and_validate_path(&path);
        unsafe { std::env::remove_var("CURBSIDE_GATEWAY_PORT") };
        assert_eq!(overridden.unwrap().gateway.port, 9200);
    }
}
