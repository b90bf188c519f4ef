//! Iterative closest-node lookup.

use std::collections::HashSet;
use std::time::Instant;

use tracing::{debug, trace, warn};

use super::Node;
use crate::common::{Id, PeerRef, Value};
use crate::PeerError;

/// Which request a [Lookup] sends at every hop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupKind {
    /// FIND_NODE, only collects peers.
    Peers,
    /// FIND_VALUE, also collects every value reported under the target.
    Values,
}

/// Untried candidates, kept sorted by ascending distance to the target.
#[derive(Debug, Clone)]
struct Frontier {
    target: Id,
    peers: Vec<PeerRef>,
}

impl Frontier {
    fn new(target: Id) -> Self {
        Self {
            target,
            peers: Vec::new(),
        }
    }

    /// Insert a candidate in order, ignoring one that is already queued.
    fn add(&mut self, peer: PeerRef) {
        let seek = peer.id().distance(&self.target);

        if let Err(pos) = self.peers.binary_search_by(|probe| {
            if probe.id() == peer.id() {
                std::cmp::Ordering::Equal
            } else {
                probe.id().distance(&self.target).cmp(&seek)
            }
        }) {
            self.peers.insert(pos, peer)
        }
    }

    /// Remove the closest candidate.
    fn pop(&mut self) -> Option<PeerRef> {
        if self.peers.is_empty() {
            None
        } else {
            Some(self.peers.remove(0))
        }
    }

    fn len(&self) -> usize {
        self.peers.len()
    }

    fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}

/// An exhaustive, sequential walk over every peer reachable from the node's
/// routing table, closest candidates first.
///
/// Every step queries exactly one peer, remembers it in the routing table if it
/// answered, and queues the peers it reported that were not tried yet. The walk
/// is done once no untried candidate is left.
///
/// Dropping a [Lookup] abandons it. Peers touched so far stay in the routing table.
#[derive(Debug)]
pub struct Lookup<'a> {
    node: &'a Node,
    kind: LookupKind,
    target: Id,
    /// The initiating node, never queued.
    self_id: Id,
    frontier: Frontier,
    /// Responding peers, in the order they were queried.
    tried: Vec<PeerRef>,
    /// Ids of every peer dequeued, responding or not.
    visited: HashSet<Id>,
    values: Vec<Value>,
    seen_values: HashSet<Value>,
}

impl<'a> Lookup<'a> {
    /// Seed a new lookup with the node's own answer to the same request.
    pub(crate) fn new(node: &'a Node, target: Id, kind: LookupKind) -> Self {
        let (self_id, values, peers) = node.answer(target, kind);

        trace!(?target, ?kind, seeds = peers.len(), "New lookup");

        let mut lookup = Lookup {
            node,
            kind,
            target,
            self_id,
            frontier: Frontier::new(target),
            tried: Vec::new(),
            visited: HashSet::new(),
            values: Vec::new(),
            seen_values: HashSet::new(),
        };

        lookup.merge(values, peers);

        lookup
    }

    // === Getters ===

    pub fn target(&self) -> &Id {
        &self.target
    }

    pub fn kind(&self) -> LookupKind {
        self.kind
    }

    /// Returns `true` once no untried candidate is left.
    pub fn is_done(&self) -> bool {
        self.frontier.is_empty()
    }

    /// Peers that answered so far, in the order they were queried.
    pub fn tried(&self) -> &[PeerRef] {
        &self.tried
    }

    /// Union of the values collected so far, in the order they were first seen.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    // === Public Methods ===

    /// Query the closest untried candidate.
    ///
    /// Returns `false` if there was nothing left to query.
    pub fn step(&mut self) -> bool {
        self.step_until(None)
    }

    /// Drive the lookup to completion.
    pub fn run(&mut self) {
        while self.step() {}
    }

    /// Drive the lookup until it is done or `deadline` passes.
    ///
    /// A response arriving after the deadline is discarded, its peer is neither
    /// tried nor touched, and is never queried again by this lookup. A later call
    /// resumes with the remaining candidates.
    ///
    /// Returns `true` if the lookup is done.
    pub fn run_until(&mut self, deadline: Instant) -> bool {
        while Instant::now() < deadline {
            if !self.step_until(Some(deadline)) {
                return true;
            }
        }

        self.is_done()
    }

    /// Consume the lookup, returning the tried peers.
    pub fn into_peers(self) -> Vec<PeerRef> {
        self.into_parts().1
    }

    /// Consume the lookup, returning the collected values and the tried peers.
    pub fn into_parts(self) -> (Vec<Value>, Vec<PeerRef>) {
        debug!(
            target = ?self.target,
            kind = ?self.kind,
            tried = self.tried.len(),
            values = self.values.len(),
            candidates = self.frontier.len(),
            "Done lookup"
        );

        (self.values, self.tried)
    }

    // === Private Methods ===

    fn step_until(&mut self, deadline: Option<Instant>) -> bool {
        let peer = match self.frontier.pop() {
            Some(peer) => peer,
            None => return false,
        };

        let response = self.query(&peer);

        // Queried once, whatever happens to the response.
        self.visited.insert(*peer.id());

        if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            trace!(target = ?self.target, ?peer, "Discarding response past deadline");

            return true;
        }

        match response {
            Ok((values, peers)) => {
                trace!(target = ?self.target, ?peer, found = peers.len(), "Lookup hop");

                self.node.touch(peer.clone());
                self.tried.push(peer);

                self.merge(values, peers);
            }
            Err(error) => {
                warn!(target = ?self.target, ?peer, %error, "Skipping unreachable peer");
            }
        }

        true
    }

    fn query(&self, peer: &PeerRef) -> Result<(Vec<Value>, Vec<PeerRef>), PeerError> {
        match self.kind {
            LookupKind::Peers => peer.peers_for(self.target).map(|peers| (vec![], peers)),
            LookupKind::Values => peer.values_for(self.target),
        }
    }

    fn merge(&mut self, values: Vec<Value>, peers: Vec<PeerRef>) {
        for value in values {
            if self.seen_values.insert(value.clone()) {
                self.values.push(value);
            }
        }

        for peer in peers {
            if peer.id() == &self.self_id || self.visited.contains(peer.id()) {
                continue;
            }

            self.frontier.add(peer);
        }
    }
}
