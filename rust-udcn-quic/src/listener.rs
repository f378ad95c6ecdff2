//! Accepts QUIC connections and bridges them into the forwarding plane.
//!
//! This is the only place in the crate that knows about
//! `rust_udcn_fw::context`/`pipeline` — `QuicFace` itself stays a plain
//! `Face` implementation with no awareness of tables or threads.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use bytes::BytesMut;
use log::{debug, info, warn};
use quinn::{Connection, Endpoint};
use tokio::sync::mpsc;

use rust_udcn_fw::context::ForwarderContext;
use rust_udcn_fw::face::{FaceId, Persistency, Scope};
use rust_udcn_fw::packet::InboundItem;
use rust_udcn_fw::pipeline::{decode_inbound, route};

use crate::config::{configure_client, configure_server, ClientOptions, ServerOptions};
use crate::face::QuicFace;
use crate::DEFAULT_MTU;

/// Ceiling on bytes read from a single incoming stream (one NDNLP frame).
const MAX_FRAME_LEN: usize = 65_536;

static NEXT_FACE_ID: AtomicU64 = AtomicU64::new(1);

fn allocate_face_id() -> FaceId {
    FaceId(NEXT_FACE_ID.fetch_add(1, Ordering::Relaxed))
}

/// Spec §4.1: "Provide scope = Local when the peer address is loopback or a
/// local socket, else NonLocal." Management Interests are only dispatched
/// on Local faces, so an accepted connection's scope is decided once, here,
/// from the peer's address.
fn scope_for_peer(addr: SocketAddr) -> Scope {
    if addr.ip().is_loopback() {
        Scope::Local
    } else {
        Scope::NonLocal
    }
}

/// Starts accepting QUIC connections in the background; each accepted
/// connection becomes a `Scope::NonLocal`, on-demand face registered in
/// `ctx`. Returns the bound local address.
pub async fn run_server(
    options: ServerOptions,
    ctx: Arc<ForwarderContext>,
    shards: Arc<Vec<mpsc::Sender<InboundItem>>>,
) -> Result<SocketAddr> {
    let server_config = configure_server(&options).await?;
    let endpoint = Endpoint::server(
        server_config,
        options.listen_addr.parse().context("invalid listen address")?,
    )?;
    let local_addr = endpoint.local_addr()?;
    info!("quic face listener bound on {local_addr}");

    tokio::spawn(async move {
        while let Some(connecting) = endpoint.accept().await {
            let ctx = ctx.clone();
            let shards = shards.clone();
            tokio::spawn(async move {
                match connecting.await {
                    Ok(connection) => {
                        let scope = scope_for_peer(connection.remote_address());
                        accept_face(connection, scope, Persistency::OnDemand, ctx, shards).await;
                    }
                    Err(e) => warn!("incoming quic connection failed: {e}"),
                }
            });
        }
        info!("quic face listener stopped accepting connections");
    });

    Ok(local_addr)
}

/// Dials a remote forwarder and registers the resulting connection as a
/// `Scope::Local`, permanent face. Management Interests may only be sent on
/// faces reached this way (spec §4.1: management is local-scope only).
pub async fn connect(
    options: ClientOptions,
    remote: SocketAddr,
    server_name: &str,
    ctx: Arc<ForwarderContext>,
    shards: Arc<Vec<mpsc::Sender<InboundItem>>>,
) -> Result<FaceId> {
    let client_config = configure_client(&options).await?;
    let mut endpoint = Endpoint::client("0.0.0.0:0".parse().unwrap())?;
    endpoint.set_default_client_config(client_config);

    let connection = endpoint
        .connect(remote, server_name)?
        .await
        .map_err(|e| anyhow!("failed to connect to {remote}: {e}"))?;

    accept_face(connection, Scope::Local, Persistency::Permanent, ctx, shards)
        .await
        .ok_or_else(|| anyhow!("face registration failed"))
}

async fn accept_face(
    connection: Connection,
    scope: Scope,
    persistency: Persistency,
    ctx: Arc<ForwarderContext>,
    shards: Arc<Vec<mpsc::Sender<InboundItem>>>,
) -> Option<FaceId> {
    let id = allocate_face_id();
    let face = Arc::new(QuicFace::new(id, connection.clone(), scope, persistency, DEFAULT_MTU));
    ctx.faces.insert(face);
    debug!("[{id}] quic face registered, remote {}", connection.remote_address());

    tokio::spawn(read_loop(id, connection, ctx, shards));
    Some(id)
}

/// Accepts uni-directional streams for the lifetime of the connection; each
/// stream carries exactly one NDNLP frame. Ends (and tombstones the face)
/// once the peer closes the connection.
async fn read_loop(
    id: FaceId,
    connection: Connection,
    ctx: Arc<ForwarderContext>,
    shards: Arc<Vec<mpsc::Sender<InboundItem>>>,
) {
    loop {
        let recv = match connection.accept_uni().await {
            Ok(r) => r,
            Err(e) => {
                debug!("[{id}] connection closed: {e}");
                break;
            }
        };
        let ctx = ctx.clone();
        let shards = shards.clone();
        tokio::spawn(handle_stream(id, recv, ctx, shards));
    }
    ctx.faces.remove(id);
}

async fn handle_stream(
    id: FaceId,
    mut recv: quinn::RecvStream,
    ctx: Arc<ForwarderContext>,
    shards: Arc<Vec<mpsc::Sender<InboundItem>>>,
) {
    let frame = match recv.read_to_end(MAX_FRAME_LEN).await {
        Ok(bytes) => BytesMut::from(&bytes[..]).freeze(),
        Err(e) => {
            debug!("[{id}] stream read failed: {e}");
            return;
        }
    };
    let Some(wire) = ctx.faces.handle_incoming_frame(id, id.0, frame) else {
        return;
    };
    let Some(packet) = decode_inbound(wire, id) else {
        warn!("[{id}] dropped frame that decoded to neither Interest nor Data");
        return;
    };
    route(&shards, InboundItem { packet, in_face_id: id }).await;
}

/// One-shot Interest/Data exchange over a fresh QUIC connection, used by
/// clients (the CLI's `fib`/`rib`/`status`/interest/publish subcommands)
/// that want a single round trip without registering a face in a
/// [`ForwarderContext`]. Frames the Interest exactly as the link service
/// would (single NDNLP fragment), since the remote peer's face reassembles
/// through the same `LinkService` the daemon uses for every other face.
pub async fn request(
    options: ClientOptions,
    remote: SocketAddr,
    server_name: &str,
    interest: rust_udcn_common::ndn::Interest,
) -> Result<rust_udcn_common::ndn::Data> {
    use rust_udcn_fw::link_service::LpFragment;

    let client_config = configure_client(&options).await?;
    let mut endpoint = Endpoint::client("0.0.0.0:0".parse().unwrap())?;
    endpoint.set_default_client_config(client_config);

    let connection = endpoint
        .connect(remote, server_name)?
        .await
        .map_err(|e| anyhow!("failed to connect to {remote}: {e}"))?;

    let wire = interest.encode().map_err(|e| anyhow!("failed to encode interest: {e}"))?;
    let frame = LpFragment {
        sequence: 0,
        frag_index: 0,
        frag_count: 1,
        congestion_mark: false,
        payload: wire,
    }
    .encode();

    let mut send = connection.open_uni().await.context("failed to open request stream")?;
    send.write_all(&frame).await.context("failed to send request")?;
    send.finish().await.context("failed to finish request stream")?;

    let mut recv = connection
        .accept_uni()
        .await
        .map_err(|e| anyhow!("no response stream from {remote}: {e}"))?;
    let response_frame = recv.read_to_end(MAX_FRAME_LEN).await.context("failed to read response")?;
    let response_fragment =
        LpFragment::decode(BytesMut::from(&response_frame[..]).freeze()).ok_or_else(|| anyhow!("malformed response frame"))?;

    let data = rust_udcn_common::ndn::Data::decode(&response_fragment.payload)
        .map_err(|e| anyhow!("failed to decode response Data: {e}"))?;

    connection.close(0u32.into(), b"request complete");
    Ok(data)
}
