//! In process rpc transport.
//!
//! A [Network] routes bencoded [messages] between [Server]s, each serving one
//! [Node](crate::Node) on its own thread. Peers on the other side of a network
//! are reached through [RemotePeer]s, which fail with a [PeerError](crate::PeerError)
//! when nothing listens at their address or no answer arrives in time.

mod client;
pub mod messages;
mod server;

use std::{
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock},
    time::Duration,
};

use bytes::Bytes;
use flume::Sender;

use crate::common::{Connector, PeerRecord, PeerRef};

pub use client::RemotePeer;
pub use server::Server;

/// Default time to wait for a response before considering a peer unreachable.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(2);

/// What a [Server] receives.
#[derive(Debug)]
pub(crate) enum ServerMessage {
    /// Encoded request, and where to send the encoded response.
    Request(Bytes, Sender<Bytes>),
    Shutdown,
}

#[derive(Debug, Clone)]
/// Switchboard routing requests to servers by address.
///
/// Cloning a [Network] shares the same routes.
pub struct Network {
    routes: Arc<RwLock<HashMap<String, Sender<ServerMessage>>>>,
    request_timeout: Duration,
}

impl Network {
    pub fn new() -> Self {
        Network {
            routes: Arc::new(RwLock::new(HashMap::new())),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    // === Options ===

    /// Sets requests timeout for peers created from this network.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    // === Getters ===

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Returns `true` if a server is listening at `address`.
    pub fn is_listening(&self, address: &str) -> bool {
        self.route(address).is_some()
    }

    // === Public Methods ===

    /// A handle to the peer described by `record`, reached through this network.
    pub fn peer(&self, record: PeerRecord) -> PeerRef {
        PeerRef::new(RemotePeer::new(record, self.clone()))
    }

    // === Private Methods ===

    pub(crate) fn route(&self, address: &str) -> Option<Sender<ServerMessage>> {
        self.routes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(address)
            .cloned()
    }

    pub(crate) fn register(&self, address: &str, inbox: Sender<ServerMessage>) {
        self.routes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(address.to_string(), inbox);
    }

    pub(crate) fn unregister(&self, address: &str) {
        self.routes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(address);
    }
}

impl Default for Network {
    fn default() -> Self {
        Self::new()
    }
}

impl Connector for Network {
    fn connect(&self, record: &PeerRecord) -> PeerRef {
        self.peer(record.clone())
    }
}
