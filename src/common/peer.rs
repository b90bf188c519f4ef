//! The incoming capability set every participant exposes, and handles to it.

use std::{
    fmt::{self, Debug, Formatter},
    hash::{Hash, Hasher},
    sync::Arc,
};

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use super::Id;
use crate::PeerError;

/// Values stored in the Dht are opaque bytes.
pub type Value = Bytes;

/// Anything that answers the four Dht requests is a peer.
///
/// The local [Node](crate::Node) implements it directly, remote nodes are
/// reached through a transport proxy such as [RemotePeer](crate::rpc::RemotePeer).
pub trait Peer: Send + Sync {
    /// The identifier this peer currently answers with.
    fn id(&self) -> Id;

    /// Transport address, opaque to the core.
    fn address(&self) -> &str;

    /// PING: `requester` asks to be remembered. Returns whether it was accepted.
    fn ping_from(&self, requester: &PeerRef) -> Result<bool, PeerError>;

    /// STORE: keep `value` under `key`. Returns `false` if the peer declined.
    fn store(&self, key: Id, value: Value) -> Result<bool, PeerError>;

    /// FIND_NODE: the peers this peer knows nearest to `key`.
    fn peers_for(&self, key: Id) -> Result<Vec<PeerRef>, PeerError>;

    /// FIND_VALUE: values stored under `key`, along with the nearest known peers.
    fn values_for(&self, key: Id) -> Result<(Vec<Value>, Vec<PeerRef>), PeerError>;
}

#[derive(Clone)]
/// Shared handle to a [Peer].
///
/// Equality and hashing go by the [Id] captured when the handle was created,
/// never by connection state.
pub struct PeerRef {
    id: Id,
    peer: Arc<dyn Peer>,
}

impl PeerRef {
    pub fn new<P: Peer + 'static>(peer: P) -> Self {
        Self::from_arc(Arc::new(peer))
    }

    pub fn from_arc(peer: Arc<dyn Peer>) -> Self {
        PeerRef {
            id: peer.id(),
            peer,
        }
    }

    // === Getters ===

    pub fn id(&self) -> &Id {
        &self.id
    }

    pub fn address(&self) -> &str {
        self.peer.address()
    }

    /// Portable representation of this peer.
    pub fn to_record(&self) -> PeerRecord {
        PeerRecord {
            id: self.id,
            address: self.address().to_string(),
        }
    }

    // === Requests ===

    pub fn ping_from(&self, requester: &PeerRef) -> Result<bool, PeerError> {
        self.peer.ping_from(requester)
    }

    pub fn store(&self, key: Id, value: Value) -> Result<bool, PeerError> {
        self.peer.store(key, value)
    }

    pub fn peers_for(&self, key: Id) -> Result<Vec<PeerRef>, PeerError> {
        self.peer.peers_for(key)
    }

    pub fn values_for(&self, key: Id) -> Result<(Vec<Value>, Vec<PeerRef>), PeerError> {
        self.peer.values_for(key)
    }
}

impl PartialEq for PeerRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for PeerRef {}

impl Hash for PeerRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state)
    }
}

impl Debug for PeerRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "PeerRef({}@{})", self.id, self.address())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Peer as it is persisted or sent over the wire.
pub struct PeerRecord {
    pub id: Id,
    pub address: String,
}

/// Turns [PeerRecord]s back into live peers.
pub trait Connector: Send + Sync + Debug {
    fn connect(&self, record: &PeerRecord) -> PeerRef;
}
