use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use sandcat_policy::cli::{Cli, Commands};
use sandcat_policy::inspect::{self, PolicySnapshot, Verdict};
use sandcat_policy::policy::config::{Action, Settings};
use sandcat_policy::policy::reload::{self, SharedSnapshot};
use sandcat_policy::secrets::env_file;
use sandcat_policy::secrets::substitute::Request;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Check {
            method,
            host,
            url,
            headers,
            body,
        } => {
            let url = url.unwrap_or_else(|| format!("https://{}/", host));
            let mut request = Request::new(&method, &host, &url);
            request.headers = headers;
            request.body = body.map(String::into_bytes);
            return cmd_check(&cli.config, request);
        }
        Commands::Policy => cmd_policy(&cli.config)?,
        Commands::Env { output } => cmd_env(&cli.config, &output)?,
        Commands::Watch => cmd_watch(&cli.config).await?,
    }

    Ok(ExitCode::SUCCESS)
}

fn cmd_check(config_path: &Path, mut request: Request) -> anyhow::Result<ExitCode> {
    let settings = Settings::load_or_default(config_path)?;
    let snapshot = PolicySnapshot::from_settings(&settings);

    match inspect::inspect(&snapshot, &mut request) {
        Verdict::Forward(subs) if subs.is_empty() => {
            println!("FORWARD {} {} (unchanged)", request.method, request.host);
            Ok(ExitCode::SUCCESS)
        }
        Verdict::Forward(subs) => {
            println!("FORWARD {} {} (substituted)", request.method, request.host);
            for sub in &subs {
                let parts: Vec<String> = sub.parts.iter().map(ToString::to_string).collect();
                println!("  {} -> {}", sub.secret, parts.join(", "));
            }
            Ok(ExitCode::SUCCESS)
        }
        Verdict::Reject(rejection) => {
            println!("REJECT {} [{}]", rejection.status, rejection.reason.as_str());
            print!("{}", rejection.body_text());
            Ok(ExitCode::FAILURE)
        }
    }
}

fn cmd_policy(config_path: &Path) -> anyhow::Result<()> {
    let settings = Settings::load_or_default(config_path)?;
    println!("Sandcat Policy ({})", config_path.display());
    println!("═══════════════════════════════════════");
    println!(
        "Network rules ({}, first match wins, default deny):",
        settings.network.len()
    );
    for (i, rule) in settings.network.iter().enumerate() {
        let action = match rule.action {
            Action::Allow => "allow",
            Action::Deny => "deny",
        };
        println!(
            "  #{:<3} {:<5} {:<7} {}",
            i + 1,
            action,
            rule.method.as_deref().unwrap_or("*"),
            rule.host
        );
    }
    let snapshot = PolicySnapshot::from_settings(&settings);
    println!("Secrets ({}):", snapshot.secrets.len());
    for secret in &snapshot.secrets {
        let hosts: Vec<&str> = secret.allowed_hosts().collect();
        let hosts = if hosts.is_empty() {
            "(none - always blocked)".to_string()
        } else {
            hosts.join(", ")
        };
        println!("  {} [{}] → {}", secret.name(), secret.placeholder(), hosts);
    }
    Ok(())
}

fn cmd_env(config_path: &Path, output: &Path) -> anyhow::Result<()> {
    let settings = Settings::load_or_default(config_path)?;
    env_file::write_env_file(&settings, output)?;
    println!("Wrote {}", output.display());
    Ok(())
}

async fn cmd_watch(config_path: &Path) -> anyhow::Result<()> {
    let settings = Settings::load_or_default(config_path)?;
    let shared = SharedSnapshot::new(PolicySnapshot::from_settings(&settings));
    let current = shared.current();
    println!("Sandcat policy loaded from {}", config_path.display());
    println!("Rules loaded: {}", current.network.len());
    println!("Secrets loaded: {}", current.secrets.len());

    let _watcher = reload::start_file_watcher(config_path.to_path_buf(), shared.clone())?;
    reload::start_sighup_handler(config_path.to_path_buf(), shared);

    tokio::signal::ctrl_c().await?;
    println!("\nShutting down...");
    Ok(())
}
