//! Peer on the other side of a [Network].

use bytes::Bytes;
use flume::RecvTimeoutError;
use tracing::trace;

use super::{
    messages::{Request, Response},
    Network, ServerMessage,
};
use crate::common::{Id, Peer, PeerRecord, PeerRef, Value};
use crate::PeerError;

#[derive(Debug, Clone)]
/// Proxy forwarding every [Peer] request to the server at its address.
pub struct RemotePeer {
    record: PeerRecord,
    network: Network,
}

impl RemotePeer {
    pub fn new(record: PeerRecord, network: Network) -> Self {
        RemotePeer { record, network }
    }

    fn call(&self, request: Request) -> Result<Response, PeerError> {
        let id = self.record.id;

        let bytes = request
            .to_bytes()
            .map_err(|error| PeerError::Protocol(error.to_string()))?;

        let inbox = self
            .network
            .route(&self.record.address)
            .ok_or(PeerError::Disconnected(id))?;

        let (sender, receiver) = flume::bounded::<Bytes>(1);

        inbox
            .send(ServerMessage::Request(bytes.into(), sender))
            .map_err(|_| PeerError::Disconnected(id))?;

        let reply = receiver
            .recv_timeout(self.network.request_timeout())
            .map_err(|error| match error {
                RecvTimeoutError::Timeout => PeerError::Timeout(id),
                RecvTimeoutError::Disconnected => PeerError::Disconnected(id),
            })?;

        let response =
            Response::from_bytes(reply).map_err(|error| PeerError::Protocol(error.to_string()))?;

        trace!(?id, ?request, ?response, "Rpc call");

        match response {
            Response::Error { code, message } => {
                Err(PeerError::Protocol(format!("{code}: {message}")))
            }
            response => Ok(response),
        }
    }

    fn peers(&self, records: Vec<PeerRecord>) -> Vec<PeerRef> {
        records
            .into_iter()
            .map(|record| self.network.peer(record))
            .collect()
    }
}

fn unexpected(response: Response) -> PeerError {
    PeerError::Protocol(format!("Unexpected response: {response:?}"))
}

impl Peer for RemotePeer {
    fn id(&self) -> Id {
        self.record.id
    }

    fn address(&self) -> &str {
        &self.record.address
    }

    fn ping_from(&self, requester: &PeerRef) -> Result<bool, PeerError> {
        match self.call(Request::Ping {
            from: requester.to_record(),
        })? {
            Response::Pong { accepted } => Ok(accepted != 0),
            response => Err(unexpected(response)),
        }
    }

    fn store(&self, key: Id, value: Value) -> Result<bool, PeerError> {
        match self.call(Request::Store { key, value })? {
            Response::Stored { stored } => Ok(stored != 0),
            response => Err(unexpected(response)),
        }
    }

    fn peers_for(&self, key: Id) -> Result<Vec<PeerRef>, PeerError> {
        match self.call(Request::FindNode { key })? {
            Response::Nodes { nodes } => Ok(self.peers(nodes)),
            response => Err(unexpected(response)),
        }
    }

    fn values_for(&self, key: Id) -> Result<(Vec<Value>, Vec<PeerRef>), PeerError> {
        match self.call(Request::GetValues { key })? {
            Response::Values { values, nodes } => Ok((values, self.peers(nodes))),
            response => Err(unexpected(response)),
        }
    }
}
