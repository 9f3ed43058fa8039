//! CLI argument definitions for the Velvet assistant server.
//!
//! Uses `clap` with derive macros for ergonomic argument parsing.
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::Parser;
use std::path::PathBuf;

/// Velvet — the conversational assistant service for the nightlife platform.
#[derive(Parser, Debug)]
#[command(name = "velvet", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// API server port.
    #[arg(short = 'p', long = "port")]
    pub port: Option<u16>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > VELVET_CONFIG env var > ~/.velvet/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("VELVET_CONFIG") {
            return PathBuf::from(p);
        }
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(".velvet").join("config.toml");
        }
        PathBuf::from("config.toml")
    }

    /// Resolve the API server port.
    ///
    /// Priority: --port flag > VELVET_PORT env var > config file value.
    pub fn resolve_port(&self, config_port: u16) -> u16 {
        if let Some(p) = self.port {
            return p;
        }
        if let Ok(val) = std::env::var("VELVET_PORT") {
            if let Ok(p) = val.parse::<u16>() {
                return p;
            }
        }
        config_port
    }
}
