//! CLI entry point for spine

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use console::style;
use spine_core::config::validate::validate_config;
use spine_core::config::{Config, ConfigLoader};
use spine_core::logging::init_logging;
use spine_core::model::FeatureAddress;
use spine_core::transport::{ChannelSender, OutboundDatagram};
use spine_features::DeviceDiagnosis;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Parser)]
#[command(name = "spine")]
#[command(about = "SPINE Device Diagnosis heartbeat tool")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration directory
    #[arg(short, long, global = true)]
    config_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a heartbeat and print every outbound datagram as a JSON line
    Heartbeat {
        /// Stop after N seconds (runs until Ctrl+C if omitted)
        #[arg(short, long)]
        seconds: Option<u64>,
        /// Heartbeat period in milliseconds
        #[arg(long)]
        period_ms: Option<u64>,
        /// Heartbeat timeout announced to the peer, in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,
        /// Local feature address (device:entity:feature)
        #[arg(long, default_value = "d:_i:SPINE_CLI:1:1")]
        local: FeatureAddress,
        /// Remote feature address (device:entity:feature)
        #[arg(long, default_value = "d:_i:SPINE_PEER:1:1")]
        remote: FeatureAddress,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print the effective configuration
    Show,
    /// Write the default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_loader = if let Some(dir) = cli.config_dir {
        ConfigLoader::with_dir(dir)
    } else {
        ConfigLoader::new()
    };

    match cli.command {
        Commands::Heartbeat {
            seconds,
            period_ms,
            timeout_ms,
            local,
            remote,
        } => {
            let mut config = config_loader.load()?;
            if let Some(period_ms) = period_ms {
                config.heartbeat.period_ms = period_ms;
            }
            if let Some(timeout_ms) = timeout_ms {
                config.heartbeat.timeout_ms = timeout_ms;
            }
            validate_config(&config)?;

            config.logging.dir = resolve_log_dir(config_loader.config_dir(), &config.logging.dir)
                .to_string_lossy()
                .into_owned();
            let _guard = init_logging(&config.logging);

            run_heartbeat(&config, local, remote, seconds.map(Duration::from_secs)).await?;
        }
        Commands::Config { command } => match command {
            ConfigCommands::Show => run_config_show(&config_loader)?,
            ConfigCommands::Init { force } => run_config_init(&config_loader, force)?,
        },
    }

    Ok(())
}

/// Expand tilde in path
fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Relative log directories live inside the config directory
fn resolve_log_dir(config_dir: &Path, dir: &str) -> PathBuf {
    let dir = expand_tilde(dir);
    if dir.is_absolute() {
        dir
    } else {
        config_dir.join(dir)
    }
}

fn print_datagram(datagram: &OutboundDatagram) -> Result<()> {
    println!("{}", serde_json::to_string(datagram)?);
    Ok(())
}

async fn run_heartbeat(
    config: &Config,
    local: FeatureAddress,
    remote: FeatureAddress,
    run_for: Option<Duration>,
) -> Result<()> {
    let transport = Arc::new(ChannelSender::new());
    let mut outbound = transport
        .take_receiver()
        .await
        .ok_or_else(|| anyhow!("Outbound receiver already taken"))?;

    let diagnosis = DeviceDiagnosis::with_heartbeat_config(local, remote, transport, config.heartbeat);
    diagnosis.start_heartbeat();

    let deadline = async {
        match run_for {
            Some(duration) => tokio::time::sleep(duration).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            Some(datagram) = outbound.recv() => print_datagram(&datagram)?,
            _ = &mut deadline => {
                info!("Run time elapsed");
                break;
            }
            _ = tokio::signal::ctrl_c() => {
                eprintln!("\n{}", style("Shutting down...").yellow());
                break;
            }
        }
    }

    diagnosis.stop_heartbeat();
    while let Ok(datagram) = outbound.try_recv() {
        print_datagram(&datagram)?;
    }

    let heartbeat = diagnosis.heartbeat();
    eprintln!("{}", style("Heartbeat summary").bold().cyan());
    eprintln!("  Sent: {}", heartbeat.counter());
    eprintln!("  Tracked message counters: {:?}", heartbeat.tracked_msg_counters());
    println!("{}", serde_json::to_string(&heartbeat.status())?);

    Ok(())
}

fn run_config_show(loader: &ConfigLoader) -> Result<()> {
    let config = loader.load()?;
    eprintln!(
        "{} {}",
        style("Config file:").bold(),
        loader.config_path().display()
    );
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

fn run_config_init(loader: &ConfigLoader, force: bool) -> Result<()> {
    let config_path = loader.config_path();
    if config_path.exists() && !force {
        println!(
            "{} {} already exists (use --force to overwrite)",
            style("✗").red(),
            config_path.display()
        );
        return Ok(());
    }

    loader.save(&Config::default())?;
    println!(
        "{} Wrote default configuration to {}",
        style("✓").green().bold(),
        config_path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_heartbeat_flags() {
        let cli = Cli::try_parse_from([
            "spine",
            "heartbeat",
            "--seconds",
            "3",
            "--period-ms",
            "250",
            "--remote",
            "d:_i:EVSE:1.1:3",
        ])
        .unwrap();

        match cli.command {
            Commands::Heartbeat {
                seconds,
                period_ms,
                timeout_ms,
                local,
                remote,
            } => {
                assert_eq!(seconds, Some(3));
                assert_eq!(period_ms, Some(250));
                assert_eq!(timeout_ms, None);
                assert_eq!(local, FeatureAddress::new("d:_i:SPINE_CLI", vec![1], 1));
                assert_eq!(remote, FeatureAddress::new("d:_i:EVSE", vec![1, 1], 3));
            }
            _ => panic!("expected heartbeat command"),
        }
    }

    #[test]
    fn test_cli_rejects_bad_address() {
        assert!(Cli::try_parse_from(["spine", "heartbeat", "--local", "nope"]).is_err());
    }

    #[test]
    fn test_relative_log_dir_is_inside_config_dir() {
        let config_dir = Path::new("/tmp/spine-config");
        assert_eq!(
            resolve_log_dir(config_dir, "logs"),
            PathBuf::from("/tmp/spine-config/logs")
        );
        assert_eq!(
            resolve_log_dir(config_dir, "/var/log/spine"),
            PathBuf::from("/var/log/spine")
        );
    }
}
