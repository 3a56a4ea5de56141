//! Public HTTP route table.
//!
//! Every route is admitted through the rate limiter under its `name` before
//! the request reaches the node's handler.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// HTTP verb of a public route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verb {
    Get,
    Post,
}

impl Verb {
    pub fn as_str(self) -> &'static str {
        match self {
            Verb::Get => "GET",
            Verb::Post => "POST",
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One public route
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteSpec {
    pub verb: Verb,
    /// Router path, `:name` segments are parameters
    pub path: &'static str,
    /// Stable identifier, also the limiter binding key
    pub name: &'static str,
}

impl RouteSpec {
    const fn get(path: &'static str, name: &'static str) -> Self {
        Self {
            verb: Verb::Get,
            path,
            name,
        }
    }

    const fn post(path: &'static str, name: &'static str) -> Self {
        Self {
            verb: Verb::Post,
            path,
            name,
        }
    }

    /// Parameter names declared in the path
    pub fn param_names(&self) -> impl Iterator<Item = &'static str> {
        self.path
            .split('/')
            .filter_map(|segment| segment.strip_prefix(':'))
    }
}

/// All public routes
pub static ROUTES: &[RouteSpec] = &[
    // Node
    RouteSpec::get("/node/summary", "node_summary"),
    // Blockchain
    RouteSpec::get("/blockchain/parameters", "blockchain_parameters"),
    RouteSpec::post("/blockchain/membership", "blockchain_membership_submit"),
    RouteSpec::get("/blockchain/memberships/:search", "blockchain_memberships"),
    RouteSpec::post("/blockchain/block", "blockchain_block_submit"),
    RouteSpec::get("/blockchain/block/:number", "blockchain_block"),
    RouteSpec::get("/blockchain/blocks/:count/:from", "blockchain_blocks"),
    RouteSpec::get("/blockchain/current", "blockchain_current"),
    RouteSpec::get("/blockchain/hardship/:search", "blockchain_hardship"),
    RouteSpec::get("/blockchain/difficulties", "blockchain_difficulties"),
    RouteSpec::get("/blockchain/with/newcomers", "blockchain_with_newcomers"),
    RouteSpec::get("/blockchain/with/certs", "blockchain_with_certs"),
    RouteSpec::get("/blockchain/with/joiners", "blockchain_with_joiners"),
    RouteSpec::get("/blockchain/with/actives", "blockchain_with_actives"),
    RouteSpec::get("/blockchain/with/leavers", "blockchain_with_leavers"),
    RouteSpec::get("/blockchain/with/excluded", "blockchain_with_excluded"),
    RouteSpec::get("/blockchain/with/revoked", "blockchain_with_revoked"),
    RouteSpec::get("/blockchain/with/ud", "blockchain_with_ud"),
    RouteSpec::get("/blockchain/with/tx", "blockchain_with_tx"),
    RouteSpec::get("/blockchain/branches", "blockchain_branches"),
    // Network
    RouteSpec::get("/network/peering", "network_peering"),
    RouteSpec::get("/network/peering/peers", "network_peering_peers"),
    RouteSpec::post("/network/peering/peers", "network_peering_peers_submit"),
    RouteSpec::get("/network/peers", "network_peers"),
    // Web of trust
    RouteSpec::post("/wot/add", "wot_add"),
    RouteSpec::post("/wot/certify", "wot_certify"),
    RouteSpec::post("/wot/revoke", "wot_revoke"),
    RouteSpec::get("/wot/lookup/:search", "wot_lookup"),
    RouteSpec::get("/wot/members", "wot_members"),
    RouteSpec::get("/wot/requirements/:search", "wot_requirements"),
    RouteSpec::get("/wot/certifiers-of/:search", "wot_certifiers_of"),
    RouteSpec::get("/wot/certified-by/:search", "wot_certified_by"),
    RouteSpec::get("/wot/identity-of/:search", "wot_identity_of"),
    // Transactions
    RouteSpec::post("/tx/process", "tx_process"),
    RouteSpec::get("/tx/sources/:pubkey", "tx_sources"),
    RouteSpec::get("/tx/history/:pubkey", "tx_history"),
    RouteSpec::get("/tx/history/:pubkey/blocks/:from/:to", "tx_history_blocks"),
    RouteSpec::get("/tx/history/:pubkey/times/:from/:to", "tx_history_times"),
    RouteSpec::get("/tx/history/:pubkey/pending", "tx_history_pending"),
    RouteSpec::get("/tx/pending", "tx_pending"),
    // Universal dividend
    RouteSpec::get("/ud/history/:pubkey", "ud_history"),
    RouteSpec::get("/ud/history/:pubkey/blocks/:from/:to", "ud_history_blocks"),
    RouteSpec::get("/ud/history/:pubkey/times/:from/:to", "ud_history_times"),
];

/// Look up a route by name
pub fn find_route(name: &str) -> Option<&'static RouteSpec> {
    ROUTES.iter().find(|r| r.name == name)
}

/// A call admitted by the limiter, handed to the node
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    /// Route name
    pub route: &'static str,
    pub verb: Verb,
    /// Path parameters
    pub params: HashMap<String, String>,
    /// Query string parameters
    pub query: HashMap<String, String>,
    /// JSON body (POST routes only)
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn new(route: &'static RouteSpec) -> Self {
        Self {
            route: route.name,
            verb: route.verb,
            params: HashMap::new(),
            query: HashMap::new(),
            body: None,
        }
    }

    /// Path parameter by name
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }
}
