//! Answer requests addressed to a node.

use std::{
    sync::Arc,
    thread::{self, JoinHandle},
};

use flume::{Receiver, Sender};
use tracing::{debug, trace};

use super::{
    messages::{Request, Response, PROTOCOL_ERROR, SERVER_ERROR},
    Network, ServerMessage,
};
use crate::common::{PeerRecord, PeerRef};
use crate::Node;

#[derive(Debug)]
/// Thread answering requests sent through a [Network] to one [Node]'s address.
///
/// The node stays usable by its owner while served, lookups and stores
/// initiated locally run concurrently with incoming requests.
///
/// Stops on [Server::shutdown] or when dropped.
pub struct Server {
    address: String,
    network: Network,
    sender: Sender<ServerMessage>,
    handle: Option<JoinHandle<()>>,
}

impl Server {
    /// Start answering requests for `node` at its address on `network`.
    ///
    /// A server already registered at the same address is replaced.
    pub fn serve(node: Arc<Node>, network: &Network) -> Server {
        let (sender, receiver) = flume::unbounded();
        let address = node.address().to_string();

        network.register(&address, sender.clone());

        let handle = {
            let network = network.clone();
            thread::spawn(move || run(node, network, receiver))
        };

        debug!(?address, "Server started");

        Server {
            address,
            network: network.clone(),
            sender,
            handle: Some(handle),
        }
    }

    // === Getters ===

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    // === Public Methods ===

    /// Stop answering requests, and wait for the server thread to exit.
    ///
    /// Requests sent afterwards fail as disconnected.
    pub fn shutdown(&mut self) {
        let handle = match self.handle.take() {
            Some(handle) => handle,
            None => return,
        };

        // Only remove the route if it is still ours.
        if let Some(route) = self.network.route(&self.address) {
            if route.same_channel(&self.sender) {
                self.network.unregister(&self.address);
            }
        }

        let _ = self.sender.send(ServerMessage::Shutdown);
        let _ = handle.join();

        debug!(address = ?self.address, "Server stopped");
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run(node: Arc<Node>, network: Network, receiver: Receiver<ServerMessage>) {
    while let Ok(message) = receiver.recv() {
        match message {
            ServerMessage::Shutdown => break,
            ServerMessage::Request(bytes, reply) => {
                let response = match Request::from_bytes(&bytes) {
                    Ok(request) => handle_request(&node, &network, request),
                    Err(error) => {
                        debug!(?error, "Invalid request");

                        Response::Error {
                            code: PROTOCOL_ERROR,
                            message: error.to_string(),
                        }
                    }
                };

                match response.to_bytes() {
                    // The requester may have timed out already.
                    Ok(bytes) => {
                        let _ = reply.send(bytes.into());
                    }
                    Err(error) => debug!(?error, "Failed to encode response"),
                }
            }
        }
    }
}

fn handle_request(node: &Node, network: &Network, request: Request) -> Response {
    trace!(address = node.address(), ?request, "Incoming request");

    let result = match request {
        Request::Ping { from } => {
            let accepted = node.handle_ping(&network.peer(from));

            Ok(Response::Pong {
                accepted: accepted as u8,
            })
        }
        Request::Store { key, value } => node
            .handle_store(key, value)
            .map(|stored| Response::Stored {
                stored: stored as u8,
            }),
        Request::FindNode { key } => node
            .handle_peers_for(key)
            .map(|peers| Response::Nodes {
                nodes: to_records(&peers),
            }),
        Request::GetValues { key } => {
            node.handle_values_for(key)
                .map(|(values, peers)| Response::Values {
                    values,
                    nodes: to_records(&peers),
                })
        }
    };

    result.unwrap_or_else(|error| Response::Error {
        code: SERVER_ERROR,
        message: error.to_string(),
    })
}

fn to_records(peers: &[PeerRef]) -> Vec<PeerRecord> {
    peers.iter().map(PeerRef::to_record).collect()
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use super::*;
    use crate::common::{Id, Value};
    use crate::PeerError;

    fn record(node: &Node) -> PeerRecord {
        PeerRecord {
            id: node.id(),
            address: node.address().to_string(),
        }
    }

    #[test]
    fn serve_and_shutdown() {
        let network = Network::new();
        let node = Node::new("a");

        let mut server = Server::serve(node.clone(), &network);
        assert!(network.is_listening("a"));

        let remote = network.peer(record(&node));
        let key = Id::random();

        assert_eq!(remote.store(key, Value::from("v")), Ok(true));
        assert_eq!(node.local_values(&key), vec![Value::from("v")]);

        server.shutdown();
        assert!(!server.is_running());
        assert!(!network.is_listening("a"));

        assert_eq!(
            remote.store(key, Value::from("v")),
            Err(PeerError::Disconnected(node.id()))
        );

        // Idempotent
        server.shutdown();
    }

    #[test]
    fn ping_registers_requester() {
        let network = Network::new();
        let a = Node::new("a");
        let b = Node::new("b");

        let _a = Server::serve(a.clone(), &network);
        let _b = Server::serve(b.clone(), &network);

        let remote_b = network.peer(record(&b));
        let me = network.peer(record(&a));

        assert_eq!(remote_b.ping_from(&me), Ok(true));
        assert!(b.knows(&a.id()));
    }

    #[test]
    fn peers_come_back_as_remote_peers() {
        let network = Network::new();
        let a = Node::new("a");
        let c = Node::new("c");
        a.touch(network.peer(record(&c)));

        let _a = Server::serve(a.clone(), &network);
        let _c = Server::serve(c.clone(), &network);

        let peers = network.peer(record(&a)).peers_for(Id::random()).unwrap();

        assert_eq!(peers.len(), 1);
        assert_eq!(peers[0].id(), &c.id());
        assert_eq!(peers[0].address(), "c");
        assert_eq!(peers[0].peers_for(Id::random()), Ok(vec![]));
    }

    #[test]
    fn malformed_request() {
        let network = Network::new();
        let _server = Server::serve(Node::new("a"), &network);

        let (sender, receiver) = flume::bounded(1);
        network
            .route("a")
            .unwrap()
            .send(ServerMessage::Request("garbage".into(), sender))
            .unwrap();

        let response = Response::from_bytes(receiver.recv().unwrap()).unwrap();

        assert!(matches!(
            response,
            Response::Error {
                code: PROTOCOL_ERROR,
                ..
            }
        ));
    }

    #[test]
    fn timeout() {
        let network = Network::new().with_request_timeout(Duration::from_millis(10));

        // Registered, but nobody answers.
        let (sender, _receiver) = flume::unbounded();
        network.register("silent", sender);

        let id = Id::random();
        let remote = network.peer(PeerRecord {
            id,
            address: "silent".to_string(),
        });

        assert_eq!(remote.peers_for(Id::random()), Err(PeerError::Timeout(id)));
    }
}
