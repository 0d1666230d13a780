use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "sandcat-policy")]
#[command(about = "Sandcat request policy - network rules and secret placeholder substitution")]
#[command(version)]
pub struct Cli {
    /// Path to settings file (.json or .toml)
    #[arg(short, long, env = "SANDCAT_SETTINGS", default_value = "settings.json")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a request through the policy and print the verdict
    Check {
        /// HTTP method
        #[arg(short, long, default_value = "GET")]
        method: String,
        /// Destination host
        #[arg(long)]
        host: String,
        /// Full URL (defaults to https://<host>/)
        #[arg(long)]
        url: Option<String>,
        /// Header as "Name: value"; repeatable
        #[arg(short = 'H', long = "header", value_parser = parse_header)]
        headers: Vec<(String, String)>,
        /// Request body
        #[arg(short, long)]
        body: Option<String>,
    },
    /// Show network rules and secret allowlists
    Policy,
    /// Write the placeholder env file for dev containers
    Env {
        /// Output path
        #[arg(short, long, default_value = "sandcat.env")]
        output: PathBuf,
    },
    /// Keep the settings loaded and reload on change or SIGHUP
    Watch,
}

/// Parse a `Name: value` header argument.
pub fn parse_header(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected \"Name: value\", got {:?}", raw))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("empty header name in {:?}", raw));
    }
    Ok((name.to_string(), value.trim_start().to_string()))
}
