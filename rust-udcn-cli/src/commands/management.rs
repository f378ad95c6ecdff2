//! Client-side management verbs: build a `ControlParameters` payload, send
//! it as an Interest under `/localhost/nfd/<module>/<verb>` to a running
//! `udcnd`, and print the `ControlResponse` that comes back.

use std::net::SocketAddr;

use anyhow::{bail, Context, Result};
use rust_udcn_common::ndn::{Interest, Name};
use rust_udcn_fw::management::{ControlParameters, ControlResponse};
use rust_udcn_quic::ClientOptions;

use crate::Remote;

#[derive(clap::Subcommand)]
pub enum FibCommand {
    Add {
        name: String,
        face_id: u64,
        #[clap(long, default_value_t = 0)]
        cost: u32,
    },
    Remove {
        name: String,
        face_id: u64,
    },
    List,
}

#[derive(clap::Subcommand)]
pub enum RibCommand {
    Register {
        name: String,
        face_id: u64,
        #[clap(long, default_value_t = 0)]
        cost: u32,
        #[clap(long)]
        no_child_inherit: bool,
        #[clap(long)]
        capture: bool,
    },
    Unregister {
        name: String,
        face_id: u64,
    },
    List,
}

#[derive(clap::Subcommand)]
pub enum StrategyCommand {
    Set { prefix: String, strategy: String },
    Unset { prefix: String },
    List,
}

#[derive(clap::Subcommand)]
pub enum CsCommand {
    Config {
        #[clap(long)]
        admit: Option<bool>,
        #[clap(long)]
        serve: Option<bool>,
        #[clap(long)]
        capacity: Option<usize>,
    },
    Info,
}

#[derive(clap::Subcommand)]
pub enum FacesCommand {
    Create {
        uri: String,
        #[clap(long)]
        server_name: Option<String>,
    },
    List,
    Destroy { face_id: u64 },
}

pub async fn fib(remote: &Remote, cmd: FibCommand) -> Result<()> {
    let (verb, params) = match cmd {
        FibCommand::Add { name, face_id, cost } => (
            "add-nexthop",
            ControlParameters {
                name: Some(name),
                face_id: Some(face_id),
                cost: Some(cost),
                ..Default::default()
            },
        ),
        FibCommand::Remove { name, face_id } => (
            "remove-nexthop",
            ControlParameters {
                name: Some(name),
                face_id: Some(face_id),
                ..Default::default()
            },
        ),
        FibCommand::List => ("list", ControlParameters::default()),
    };
    send_and_print(remote, "fib", verb, &params).await
}

pub async fn rib(remote: &Remote, cmd: RibCommand) -> Result<()> {
    let (verb, params) = match cmd {
        RibCommand::Register {
            name,
            face_id,
            cost,
            no_child_inherit,
            capture,
        } => (
            "register",
            ControlParameters {
                name: Some(name),
                face_id: Some(face_id),
                cost: Some(cost),
                child_inherit: Some(!no_child_inherit),
                capture: Some(capture),
                ..Default::default()
            },
        ),
        RibCommand::Unregister { name, face_id } => (
            "unregister",
            ControlParameters {
                name: Some(name),
                face_id: Some(face_id),
                ..Default::default()
            },
        ),
        RibCommand::List => ("list", ControlParameters::default()),
    };
    send_and_print(remote, "rib", verb, &params).await
}

pub async fn strategy(remote: &Remote, cmd: StrategyCommand) -> Result<()> {
    let (verb, params) = match cmd {
        StrategyCommand::Set { prefix, strategy } => (
            "set",
            ControlParameters {
                name: Some(prefix),
                strategy: Some(strategy),
                ..Default::default()
            },
        ),
        StrategyCommand::Unset { prefix } => (
            "unset",
            ControlParameters {
                name: Some(prefix),
                ..Default::default()
            },
        ),
        StrategyCommand::List => ("list", ControlParameters::default()),
    };
    send_and_print(remote, "strategy-choice", verb, &params).await
}

pub async fn cs(remote: &Remote, cmd: CsCommand) -> Result<()> {
    let (verb, params) = match cmd {
        CsCommand::Config { admit, serve, capacity } => (
            "config",
            ControlParameters {
                admit,
                serve,
                capacity,
                ..Default::default()
            },
        ),
        CsCommand::Info => ("info", ControlParameters::default()),
    };
    send_and_print(remote, "cs", verb, &params).await
}

pub async fn faces(remote: &Remote, cmd: FacesCommand) -> Result<()> {
    let (verb, params) = match cmd {
        FacesCommand::Create { uri, server_name } => (
            "create",
            ControlParameters {
                uri: Some(uri),
                server_name,
                ..Default::default()
            },
        ),
        FacesCommand::List => ("list", ControlParameters::default()),
        FacesCommand::Destroy { face_id } => (
            "destroy",
            ControlParameters {
                face_id: Some(face_id),
                ..Default::default()
            },
        ),
    };
    send_and_print(remote, "faces", verb, &params).await
}

pub async fn status(remote: &Remote) -> Result<()> {
    send_and_print(remote, "status", "general", &ControlParameters::default()).await
}

async fn send_and_print(remote: &Remote, module: &str, verb: &str, params: &ControlParameters) -> Result<()> {
    let response = send(remote, module, verb, params).await?;
    println!("{} {}", response.status_code, response.status_text);
    if let Some(body) = response.body {
        println!("{}", serde_json::to_string_pretty(&body)?);
    }
    if response.status_code >= 400 {
        bail!("management request failed: {} {}", response.status_code, response.status_text);
    }
    Ok(())
}

async fn send(remote: &Remote, module: &str, verb: &str, params: &ControlParameters) -> Result<ControlResponse> {
    let addr: SocketAddr = remote.remote.parse().context("invalid --remote address")?;
    let name = Name::from_string(&format!("/localhost/nfd/{module}/{verb}"));
    let body = serde_json::to_vec(params)?;
    let mut interest = Interest::new(name).with_can_be_prefix(false).with_must_be_fresh(true);
    interest.application_parameters = Some(bytes::Bytes::from(body));

    let client_options = ClientOptions {
        verify_certificate: !remote.insecure,
        ..Default::default()
    };
    let data = rust_udcn_quic::request(client_options, addr, &remote.server_name, interest)
        .await
        .context("management request failed")?;
    serde_json::from_slice(&data.content).context("malformed ControlResponse from daemon")
}
