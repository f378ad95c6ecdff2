//! `udcn-cli interest`: sends a single Interest to a remote `udcnd` and
//! prints the Data that satisfies it.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use rust_udcn_common::ndn::{Interest, Name};
use rust_udcn_quic::ClientOptions;

use crate::Remote;

#[derive(clap::Args)]
pub struct InterestArgs {
    /// Name to request, e.g. `/example/data`.
    pub name: String,

    #[clap(long)]
    pub can_be_prefix: bool,

    #[clap(long)]
    pub must_be_fresh: bool,

    #[clap(long, default_value_t = 4000)]
    pub lifetime_ms: u32,

    #[clap(long, default_value_t = 4000)]
    pub timeout_ms: u64,
}

pub async fn run(remote: &Remote, args: InterestArgs) -> Result<()> {
    let addr: SocketAddr = remote.remote.parse().context("invalid --remote address")?;
    let interest = Interest::new(Name::from_string(&args.name))
        .with_can_be_prefix(args.can_be_prefix)
        .with_must_be_fresh(args.must_be_fresh)
        .with_lifetime(args.lifetime_ms);

    let client_options = ClientOptions {
        verify_certificate: !remote.insecure,
        ..Default::default()
    };

    let data = tokio::time::timeout(
        Duration::from_millis(args.timeout_ms),
        rust_udcn_quic::request(client_options, addr, &remote.server_name, interest),
    )
    .await
    .context("interest timed out")??;

    println!("satisfied: {}", data.name);
    println!("content-type: {:?}", data.content_type);
    println!("freshness: {}ms", data.ttl_ms);
    println!("content ({} bytes):", data.content.len());
    match std::str::from_utf8(&data.content) {
        Ok(text) => println!("{text}"),
        Err(_) => println!("{:?}", data.content),
    }
    Ok(())
}
