use anyhow::{anyhow, Result};
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wildcard_dns::error::Error::DNSError;
use wildcard_dns::{Config, Resolver, SharedConfig};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_init();

    let mut first_args = std::env::args().take(2);
    let (program_name, config_file) = (
        first_args.next().unwrap_or("wildcard-dns".to_string()),
        first_args.next(),
    );

    let config = config_init(&program_name, config_file)?;
    let resolver = Arc::new(Resolver::from_config(&config)?);
    let shutdown = CancellationToken::new();

    tracing::info!(
        domain = %config.domain,
        nameservers = resolver.authority().ns_domains().len(),
        txt_source = config.txt_source_url.as_deref().unwrap_or("none"),
        "serving"
    );
    tracing::info!("DNS listening on UDP {}", &config.dns_udp_bind_addr);
    tracing::info!("DNS listening on TCP {}", &config.dns_tcp_bind_addr);
    let dns_server = wildcard_dns::dns::new(config.clone(), resolver, shutdown.clone()).await?;
    let dns_handle = tokio::spawn(dns_server.block_until_done());

    tokio::select! {
        _ = signal::ctrl_c() => {
            tracing::info!("quitting from signal");
            shutdown.cancel();
        },
        Ok(dns_res) = dns_handle => {
            if let Err(err) = dns_res {
                return Err(DNSError(err).into())
            }
        }
    }
    tracing::info!("goodbye");
    Ok(())
}

fn tracing_init() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wildcard_dns=info".into()),
        )
        .init();
}

fn config_init(program_name: &str, config_file: Option<String>) -> Result<SharedConfig> {
    match config_file {
        None => Err(anyhow!("usage: {program_name} /path/to/config.json")),
        Some(config_file) => {
            tracing::debug!("loaded config from {config_file}");
            let config = Config::try_from_file(&config_file)?;
            Ok(Arc::new(config))
        }
    }
}
