//! nfsn-dns - Dynamic DNS and ACME dns-01 helper for NearlyFreeSpeech.NET.

use clap::{Parser, Subcommand};
use nfsn_dns::acme::ChallengeManager;
use nfsn_dns::config::Config;
use nfsn_dns::detector::IpVersion;
use nfsn_dns::error::NfsnError;
use nfsn_dns::nfsn::{DnsService, NfsnClient};
use nfsn_dns::reconcile::ReconcileEngine;
use nfsn_dns::record::RecordFilter;
use nfsn_dns::zone;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "nfsn-dns")]
#[command(about = "Dynamic DNS and ACME dns-01 helper for NearlyFreeSpeech.NET")]
#[command(version)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Point the configured record at the current public IP
    Update {
        /// Also reconcile the AAAA record
        #[arg(short = '6', long)]
        ipv6: bool,

        /// Detect the public IP with a DNS TXT query instead of HTTP
        #[arg(short = 'd', long = "use-dig", alias = "useDig")]
        use_dig: bool,

        /// Add the record when it does not exist yet
        #[arg(long)]
        create: bool,

        /// Write the zone to this file afterwards
        #[arg(long)]
        export_to: Option<PathBuf>,
    },

    /// Create the ACME challenge TXT record
    Auth {
        /// Validation token
        token: String,
        /// Record name, e.g. _acme-challenge
        subdomain: String,
    },

    /// Remove the ACME challenge TXT record
    Cleanup {
        /// Record name, e.g. _acme-challenge
        subdomain: String,
    },

    /// Write all records of the domain as a zone file
    Export {
        /// Output path
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(NfsnError::Config(message)) => {
            tracing::error!("{}", message);
            std::process::exit(1);
        }
        Err(e) => return Err(e.into()),
    };

    let Some(command) = cli.command else {
        tracing::info!(record = %config.display_name(), "No command given, nothing to do");
        return Ok(());
    };

    match command {
        Commands::Update {
            ipv6,
            use_dig,
            create,
            export_to,
        } => cmd_update(config, ipv6, use_dig, create, export_to.as_deref()).await?,
        Commands::Auth { token, subdomain } => cmd_auth(config, &token, &subdomain).await?,
        Commands::Cleanup { subdomain } => cmd_cleanup(config, &subdomain).await?,
        Commands::Export { path } => cmd_export(&config, &path).await?,
    }

    Ok(())
}

async fn cmd_update(
    mut config: Config,
    ipv6: bool,
    use_dig: bool,
    create: bool,
    export_to: Option<&Path>,
) -> anyhow::Result<()> {
    config.enable_ipv6 |= ipv6;
    config.ip_use_dig |= use_dig;
    config.create_missing |= create;

    let engine = ReconcileEngine::from_config(&config)?;

    let mut versions = vec![IpVersion::V4];
    if config.enable_ipv6 {
        versions.push(IpVersion::V6);
    }

    for version in versions {
        let result = engine
            .reconcile(&config.domain, &config.subdomain, version)
            .await?;

        if !result.converged {
            tracing::warn!(
                record = %config.display_name(),
                %version,
                "Record did not converge, will be retried on the next run"
            );
        }
    }

    if let Some(path) = export_to {
        cmd_export(&config, path).await?;
    }

    Ok(())
}

async fn cmd_auth(config: Config, token: &str, subdomain: &str) -> anyhow::Result<()> {
    let manager = ChallengeManager::new(records_from(&config)?);
    manager
        .create_challenge(subdomain, &config.domain, token)
        .await?;
    Ok(())
}

async fn cmd_cleanup(config: Config, subdomain: &str) -> anyhow::Result<()> {
    let manager = ChallengeManager::new(records_from(&config)?);
    manager.delete_challenge(subdomain, &config.domain).await?;
    Ok(())
}

async fn cmd_export(config: &Config, path: &Path) -> anyhow::Result<()> {
    let records = records_from(config)?
        .list_records(&config.domain, &RecordFilter::new())
        .await?;

    let lines = zone::render(&records);
    std::fs::write(path, lines.join("\n"))?;

    tracing::info!(
        domain = %config.domain,
        records = records.len(),
        path = %path.display(),
        "Exported zone"
    );
    Ok(())
}

fn records_from(config: &Config) -> nfsn_dns::Result<DnsService> {
    Ok(DnsService::new(NfsnClient::from_config(config)?))
}
