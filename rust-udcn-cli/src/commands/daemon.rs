//! `udcnd`: runs the forwarder process — spins up the configured number of
//! forwarding threads (spec §5 "a fixed pool of N forwarding threads") and
//! one QUIC listener (spec §1's single in-scope reference transport),
//! then blocks until interrupted.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use log::{info, warn};
use tokio::signal;
use tokio::sync::mpsc;
use tokio::time::interval;

use rust_udcn_fw::config::ForwarderConfig;
use rust_udcn_fw::context::ForwarderContext;
use rust_udcn_fw::packet::InboundItem;
use rust_udcn_fw::pipeline::ForwardingThread;
use rust_udcn_quic::{ClientOptions, ServerOptions};

#[derive(clap::Args)]
pub struct DaemonArgs {
    /// Path to a TOML configuration file (spec §6's `fw.*`/`tables.*`/`faces.*` table).
    #[clap(short, long)]
    pub config: Option<String>,

    /// QUIC listen address.
    #[clap(long, default_value = "0.0.0.0:6367")]
    pub listen: String,

    /// Directory holding (or to generate) `cert.pem`/`key.pem` for the QUIC listener.
    #[clap(long, default_value = "./udcnd-certs")]
    pub cert_dir: PathBuf,
}

pub async fn run(args: DaemonArgs) -> Result<()> {
    let config = ForwarderConfig::load(args.config.as_deref()).context("failed to load forwarder configuration")?;
    info!(
        "starting udcnd: {} forwarding threads, cs capacity {}",
        config.fw.threads, config.tables.cs.capacity
    );

    let ctx = Arc::new(ForwarderContext::new());

    let (senders, receivers): (Vec<_>, Vec<_>) = (0..config.fw.threads.max(1))
        .map(|_| mpsc::channel::<InboundItem>(config.fw.queue_size))
        .unzip();
    let shards = Arc::new(senders);

    ctx.cs_policy.apply(
        Some(config.tables.cs.admit),
        Some(config.tables.cs.serve),
        Some(config.tables.cs.capacity),
    );

    for (id, receiver) in receivers.into_iter().enumerate() {
        let mut thread = ForwardingThread::new(id, config.tables.cs.capacity, ctx.clone())
            .with_cs_policy(config.tables.cs.admit, config.tables.cs.serve)
            .with_dead_nonce_window(Duration::from_millis(config.fw.dead_nonce_window_ms));
        tokio::spawn(async move {
            thread.run(receiver).await;
            info!("forwarding thread {id} stopped");
        });
    }

    {
        let opener_ctx = ctx.clone();
        let opener_shards = shards.clone();
        ctx.set_face_opener(Arc::new(move |uri: String, server_name: String| {
            let ctx = opener_ctx.clone();
            let shards = opener_shards.clone();
            tokio::spawn(async move {
                match uri.parse::<std::net::SocketAddr>() {
                    Ok(addr) => {
                        let client_options = ClientOptions::default();
                        if let Err(e) = rust_udcn_quic::connect(client_options, addr, &server_name, ctx, shards).await {
                            warn!("faces create: failed to connect to {uri}: {e}");
                        }
                    }
                    Err(e) => warn!("faces create: invalid remote uri {uri}: {e}"),
                }
            });
        }));
    }

    {
        let ctx = ctx.clone();
        tokio::spawn(async move {
            let mut tick = interval(Duration::from_millis(100));
            loop {
                tick.tick().await;
                ctx.faces.housekeeping();
            }
        });
    }

    let (cert_path, key_path) = ensure_certificates(&args.cert_dir).context("failed to prepare QUIC certificates")?;
    let server_options = ServerOptions {
        listen_addr: args.listen.clone(),
        cert_path,
        key_path,
        ..Default::default()
    };
    let local_addr = rust_udcn_quic::run_server(server_options, ctx.clone(), shards.clone())
        .await
        .context("failed to start QUIC face listener")?;
    info!("udcnd listening on {local_addr}");

    signal::ctrl_c().await.context("failed to wait for shutdown signal")?;
    info!("udcnd shutting down");
    Ok(())
}

/// Generates a self-signed dev certificate the first time `udcnd` runs with
/// no existing one, so `udcnd` is runnable out of the box without a
/// separately provisioned PKI. Not suitable for a production deployment
/// reachable from untrusted networks.
fn ensure_certificates(dir: &Path) -> Result<(PathBuf, PathBuf)> {
    let cert_path = dir.join("cert.pem");
    let key_path = dir.join("key.pem");
    if cert_path.exists() && key_path.exists() {
        return Ok((cert_path, key_path));
    }

    std::fs::create_dir_all(dir)?;

    use rcgen::{CertificateParams, DnType, KeyPair, KeyUsagePurpose, SanType};

    let key_pair = KeyPair::generate()?;
    let mut params = CertificateParams::default();
    params.key_pair = Some(key_pair);
    params.distinguished_name.push(DnType::CommonName, "localhost");
    params.subject_alt_names = vec![
        SanType::DnsName("localhost".to_string()),
        SanType::IpAddress(std::net::IpAddr::V4(std::net::Ipv4Addr::new(127, 0, 0, 1))),
    ];
    params.is_ca = rcgen::IsCa::SelfSignedOnly;
    params.key_usages = vec![
        KeyUsagePurpose::DigitalSignature,
        KeyUsagePurpose::KeyEncipherment,
        KeyUsagePurpose::KeyAgreement,
    ];

    let cert = rcgen::Certificate::from_params(params)?;
    std::fs::write(&cert_path, cert.serialize_pem()?)?;
    std::fs::write(&key_path, cert.serialize_private_key_pem())?;
    info!("generated self-signed dev certificate at {}", dir.display());

    Ok((cert_path, key_path))
}
