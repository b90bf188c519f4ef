//! Dht node.

mod config;
mod lookup;
mod persistence;

use std::{
    fmt::{self, Debug, Formatter},
    sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak},
};

use tracing::{debug, warn};

use crate::{
    common::{Connector, Id, Key, Peer, PeerRef, RoutingTable, Value, ValueStore},
    PeerError, Result,
};

pub use config::Config;
pub use lookup::{Lookup, LookupKind};

/// A Dht node: its identity, what it knows about other peers, and what it stores.
///
/// The node is both a client, through its outgoing methods ([Node::bootstrap],
/// [Node::ping], [Node::put], [Node::find_peers], [Node::find_values]), and a
/// [Peer] that answers the same four requests from others.
///
/// Routing table and value store sit behind one lock, so a node can be shared
/// between a server answering incoming requests and callers running lookups.
pub struct Node {
    address: String,
    me: Weak<Node>,
    connector: Option<Arc<dyn Connector>>,
    state: RwLock<State>,
}

#[derive(Debug)]
struct State {
    routing_table: RoutingTable,
    value_store: ValueStore,
}

impl Node {
    /// Create a node with the default [Config].
    pub fn new(address: impl Into<String>) -> Arc<Node> {
        Self::with_config(address, Config::default())
    }

    pub fn with_config(address: impl Into<String>, config: Config) -> Arc<Node> {
        let address = address.into();
        let id = config.id.unwrap_or_else(|| Id::for_content(&address));

        Arc::new_cyclic(|me| Node {
            address,
            me: me.clone(),
            connector: config.connector,
            state: RwLock::new(State {
                routing_table: RoutingTable::new(id).with_bucket_size(config.bucket_size),
                value_store: ValueStore::new(id).with_max_values(config.max_values),
            }),
        })
    }

    // === Getters ===

    /// Returns the node's Id
    pub fn id(&self) -> Id {
        *self.read().routing_table.id()
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// A handle to this node, usable wherever a [PeerRef] is expected.
    pub fn as_peer(&self) -> Option<PeerRef> {
        self.me
            .upgrade()
            .map(|node| PeerRef::from_arc(node as Arc<dyn Peer>))
    }

    /// Every peer in the routing table.
    pub fn peers(&self) -> Vec<PeerRef> {
        self.read().routing_table.peers().collect()
    }

    /// Returns `true` if a peer with that id is in the routing table.
    pub fn knows(&self, id: &Id) -> bool {
        self.read().routing_table.contains(id)
    }

    /// Values stored at this node under `key`, without asking anyone else.
    pub fn local_values(&self, key: &Id) -> Vec<Value> {
        self.read().value_store.values_for(key)
    }

    /// Information and statistics about this node.
    pub fn info(&self) -> Info {
        let state = self.read();

        Info {
            id: *state.routing_table.id(),
            address: self.address.clone(),
            peers: state.routing_table.size(),
            keys: state.value_store.keys_count(),
            values: state.value_store.len(),
        }
    }

    // === Options ===

    /// Change this node's identity, re-keying the routing table and the value store together.
    pub fn set_id(&self, id: Id) {
        let mut state = self.write();

        state.routing_table.set_id(id);
        state.value_store.set_id(id);

        debug!(?id, "Node id changed");
    }

    // === Outgoing ===

    /// Join the network through a known peer, then look up our own id to
    /// discover the peers around us.
    ///
    /// Returns the peers visited by that lookup, empty if `peer` did not accept the ping.
    pub fn bootstrap(&self, peer: &PeerRef) -> Vec<PeerRef> {
        if !self.ping(peer) {
            warn!(?peer, "Bootstrapping peer did not accept our ping");
            return vec![];
        }

        let visited = self.lookup(self.id(), LookupKind::Peers).into_peers();

        debug!(table_size = self.read().routing_table.size(), "Bootstrapped");

        visited
    }

    /// Ping `peer`, and remember it if it accepts.
    pub fn ping(&self, peer: &PeerRef) -> bool {
        let me = match self.as_peer() {
            Some(me) => me,
            None => return false,
        };

        match peer.ping_from(&me) {
            Ok(true) => {
                self.touch(peer.clone());
                true
            }
            Ok(false) => false,
            Err(error) => {
                warn!(?peer, %error, "Ping failed");
                false
            }
        }
    }

    /// Store `value` here and on the peers found by looking up `key`.
    ///
    /// A key that is not already an [Id] is hashed with [Id::for_content].
    /// Candidates are this node first, then every peer the lookup visited, closest
    /// first in visitation order. With a `redundancy`, storing stops as soon as
    /// `redundancy + 1` copies (the local one included) succeeded.
    ///
    /// Returns the number of copies made.
    pub fn put(
        &self,
        key: impl Into<Key>,
        value: impl Into<Value>,
        redundancy: Option<usize>,
    ) -> usize {
        let target = key.into().to_content_id();
        let value = value.into();
        let wanted = redundancy.map(|redundancy| redundancy.saturating_add(1));

        let peers = self.lookup(target, LookupKind::Peers).into_peers();

        let mut copies = 0;

        if self.store_local(target, value.clone()) {
            copies += 1;
        } else {
            warn!(?target, "Local store refused the value");
        }

        for peer in peers {
            if wanted.is_some_and(|wanted| copies >= wanted) {
                break;
            }

            match peer.store(target, value.clone()) {
                Ok(true) => copies += 1,
                Ok(false) => debug!(?target, ?peer, "Peer refused to store"),
                Err(error) => warn!(?target, ?peer, %error, "Store failed"),
            }
        }

        debug!(?target, copies, ?redundancy, "Stored value");

        copies
    }

    /// Every peer reachable from the routing table, visited closest to `key` first.
    pub fn find_peers(&self, key: impl Into<Key>) -> Result<Vec<PeerRef>> {
        let target = key.into().to_id()?;

        Ok(self.lookup(target, LookupKind::Peers).into_peers())
    }

    /// Union of the values every reachable peer (this one included) holds under
    /// `key`, along with the peers visited.
    pub fn find_values(&self, key: impl Into<Key>) -> Result<(Vec<Value>, Vec<PeerRef>)> {
        let target = key.into().to_id()?;

        Ok(self.lookup(target, LookupKind::Values).into_parts())
    }

    /// Start a [Lookup] to drive step by step, or abandon midway.
    pub fn lookup(&self, target: Id, kind: LookupKind) -> Lookup<'_> {
        Lookup::new(self, target, kind)
    }

    // === Incoming ===

    /// PING: remember the requester, always accepted.
    pub fn handle_ping(&self, requester: &PeerRef) -> bool {
        self.touch(requester.clone());

        true
    }

    /// STORE: keep `value` under `key`, which must be a valid [Id].
    ///
    /// Returns `false` if the value store is full.
    pub fn handle_store(&self, key: impl Into<Key>, value: impl Into<Value>) -> Result<bool> {
        let key = key.into().to_id()?;

        Ok(self.store_local(key, value.into()))
    }

    /// FIND_NODE: known peers, nearest to `key` first.
    pub fn handle_peers_for(&self, key: impl Into<Key>) -> Result<Vec<PeerRef>> {
        let key = key.into().to_id()?;

        Ok(self.read().routing_table.nearest_to(&key))
    }

    /// FIND_VALUE: values stored under `key`, and known peers nearest to it.
    pub fn handle_values_for(&self, key: impl Into<Key>) -> Result<(Vec<Value>, Vec<PeerRef>)> {
        let key = key.into().to_id()?;
        let (_, values, peers) = self.answer(key, LookupKind::Values);

        Ok((values, peers))
    }

    // === Private Methods ===

    fn read(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn touch(&self, peer: PeerRef) -> bool {
        self.write().routing_table.touch(peer)
    }

    fn store_local(&self, key: Id, value: Value) -> bool {
        self.write().value_store.touch(key, value)
    }

    /// This node's own answer to a lookup request, read under a single lock
    /// together with the current id.
    pub(crate) fn answer(&self, key: Id, kind: LookupKind) -> (Id, Vec<Value>, Vec<PeerRef>) {
        let state = self.read();

        let values = match kind {
            LookupKind::Peers => vec![],
            LookupKind::Values => state.value_store.values_for(&key),
        };

        (
            *state.routing_table.id(),
            values,
            state.routing_table.nearest_to(&key),
        )
    }
}

impl Peer for Node {
    fn id(&self) -> Id {
        Node::id(self)
    }

    fn address(&self) -> &str {
        &self.address
    }

    fn ping_from(&self, requester: &PeerRef) -> std::result::Result<bool, PeerError> {
        Ok(self.handle_ping(requester))
    }

    fn store(&self, key: Id, value: Value) -> std::result::Result<bool, PeerError> {
        Ok(self.store_local(key, value))
    }

    fn peers_for(&self, key: Id) -> std::result::Result<Vec<PeerRef>, PeerError> {
        Ok(self.read().routing_table.nearest_to(&key))
    }

    fn values_for(&self, key: Id) -> std::result::Result<(Vec<Value>, Vec<PeerRef>), PeerError> {
        let (_, values, peers) = self.answer(key, LookupKind::Values);

        Ok((values, peers))
    }
}

impl Debug for Node {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id())
            .field("address", &self.address)
            .finish()
    }
}

/// Information and statistics about a [Node].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Info {
    id: Id,
    address: String,
    peers: usize,
    keys: usize,
    values: usize,
}

impl Info {
    /// This Node's [Id]
    pub fn id(&self) -> &Id {
        &self.id
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Number of peers in the routing table.
    pub fn peers(&self) -> usize {
        self.peers
    }

    /// Number of distinct keys stored.
    pub fn keys(&self) -> usize {
        self.keys
    }

    /// Number of stored entries across all keys.
    pub fn values(&self) -> usize {
        self.values
    }
}
