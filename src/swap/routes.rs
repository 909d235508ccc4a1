//! Swap route reconstruction
//!
//! Multi-leg router swaps emit their token flows in whatever order the pools
//! happen to log them. The route is recovered from a graph whose nodes are
//! `(holder, token)` pairs:
//! - every token flow is an edge `(from, token) -> (to, token)`
//! - an address that receives one token and sends another gets an exchange edge
//!   between the two, except the sender whose two ends are the route endpoints
//!
//! Graphs with more than one outgoing flow for the same `(holder, token)` are
//! ambiguous and not supported.

use std::collections::{HashMap, HashSet};

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::IdentifiedSwap;
use crate::{
    address_book::AddressBookEntry,
    events::{EnrichedTransaction, NativeTransferEvent, TokenEvent},
};

/// Bounds of the route search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteLimits {
    /// Transactions with more token events than this are not routed, native
    /// transfers do not count
    pub max_events: usize,
    /// Longest route considered, in token flows
    pub max_hops: usize,
}

impl Default for RouteLimits {
    fn default() -> Self {
        Self { max_events: 10, max_hops: 10 }
    }
}

/// A token flow, as placed in the reconstructed route
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "flow", content = "event")]
pub enum RouteEvent {
    Token(TokenEvent<AddressBookEntry>),
    Native(NativeTransferEvent),
}

type Node = (Address, Address);

#[derive(Debug, Clone, Copy)]
struct Edge {
    target: Node,
    /// Index of the flow this edge stands for, `None` for exchange edges
    flow: Option<usize>,
}

struct Flow {
    from: Address,
    to: Address,
    token: Address,
    event: RouteEvent,
}

fn collect_flows(transaction: &EnrichedTransaction) -> Vec<Flow> {
    let token_flows = transaction.token_events().filter(|event| !event.is_approval()).map(|event| Flow {
        from: event.from_address(),
        to: event.to_address(),
        token: event.token_address(),
        event: RouteEvent::Token(event.clone()),
    });
    let native_flows = transaction.native_transfers.iter().map(|transfer| Flow {
        from: transfer.from.address,
        to: transfer.to.address,
        token: transaction.native_token.address,
        event: RouteEvent::Native(transfer.clone()),
    });
    token_flows.chain(native_flows).collect()
}

fn build_graph(flows: &[Flow], sender: Address) -> Option<HashMap<Node, Vec<Edge>>> {
    let mut graph: HashMap<Node, Vec<Edge>> = HashMap::new();
    for (index, flow) in flows.iter().enumerate() {
        let edges = graph.entry((flow.from, flow.token)).or_default();
        if edges.iter().any(|edge| edge.flow.is_some()) {
            debug!(holder = %flow.from, token = %flow.token, "ambiguous swap graph");
            return None;
        }
        edges.push(Edge { target: (flow.to, flow.token), flow: Some(index) });
    }

    for incoming in flows.iter().filter(|flow| flow.to != sender) {
        for outgoing in flows.iter().filter(|flow| flow.from == incoming.to && flow.token != incoming.token) {
            let edges = graph.entry((incoming.to, incoming.token)).or_default();
            let target = (outgoing.from, outgoing.token);
            if !edges.iter().any(|edge| edge.flow.is_none() && edge.target == target) {
                edges.push(Edge { target, flow: None });
            }
        }
    }
    Some(graph)
}

/// Every simple path from `start` to `end` using at most `max_hops` flows
fn find_routes(graph: &HashMap<Node, Vec<Edge>>, start: Node, end: Node, max_hops: usize) -> Vec<Vec<usize>> {
    fn walk(
        graph: &HashMap<Node, Vec<Edge>>,
        node: Node,
        end: Node,
        max_hops: usize,
        visited: &mut HashSet<Node>,
        path: &mut Vec<usize>,
        routes: &mut Vec<Vec<usize>>,
    ) {
        if node == end {
            routes.push(path.clone());
            return;
        }
        let Some(edges) = graph.get(&node) else { return };
        for edge in edges {
            if visited.contains(&edge.target) {
                continue;
            }
            if edge.flow.is_some() && path.len() >= max_hops {
                continue;
            }
            visited.insert(edge.target);
            if let Some(flow) = edge.flow {
                path.push(flow);
            }
            walk(graph, edge.target, end, max_hops, visited, path, routes);
            if edge.flow.is_some() {
                path.pop();
            }
            visited.remove(&edge.target);
        }
    }

    let mut routes = Vec::new();
    let mut visited = HashSet::from([start]);
    walk(graph, start, end, max_hops, &mut visited, &mut Vec::new(), &mut routes);
    routes
}

/// Orders the flows of a swap along its route
///
/// The shortest route from the sender's sent asset to its received asset is
/// selected, ties going to the route found first. Flows on the route come first in
/// route order, the rest follow in their original order.
///
/// Token events come before native transfers in the original order.
///
/// Returns `None` when the transaction has too many token events, when the flow graph is
/// ambiguous, or when no route connects the two assets.
pub fn identify_routes(
    transaction: &EnrichedTransaction,
    swap: &IdentifiedSwap,
    limits: &RouteLimits,
) -> Option<Vec<RouteEvent>> {
    if transaction.token_event_count() > limits.max_events {
        debug!(events = transaction.token_event_count(), "too many token events to route");
        return None;
    }
    let flows = collect_flows(transaction);
    let sender = swap.sender.address;
    let graph = build_graph(&flows, sender)?;

    let start = (sender, swap.send_asset.token().address);
    let end = (sender, swap.receive_asset.token().address);
    let route = find_routes(&graph, start, end, limits.max_hops).into_iter().min_by_key(Vec::len)?;

    let position = |index: usize| {
        route.iter().position(|flow| *flow == index).unwrap_or(route.len() + index)
    };
    let mut ordered: Vec<(usize, RouteEvent)> =
        flows.into_iter().enumerate().map(|(index, flow)| (position(index), flow.event)).collect();
    ordered.sort_by_key(|(position, _)| *position);
    Some(ordered.into_iter().map(|(_, event)| event).collect())
}
