//! Local network of nodes for tests and simulations.

use std::sync::Arc;

use crate::{
    common::{PeerRecord, PeerRef},
    rpc::{Network, Server},
    Config, Node,
};

#[derive(Debug)]
/// Create a testnet of nodes served over an in process [Network], all
/// bootstrapped from the first one.
pub struct Testnet {
    pub network: Network,
    pub nodes: Vec<Arc<Node>>,
    servers: Vec<Server>,
}

impl Testnet {
    /// Start `count` nodes at addresses `testnet-0`, `testnet-1`, ...
    ///
    /// Every node after the first bootstraps from `testnet-0`, in order, so
    /// later nodes know more of the network than earlier ones.
    pub fn new(count: usize) -> Testnet {
        Self::with_network(count, Network::new())
    }

    pub fn with_network(count: usize, network: Network) -> Testnet {
        let mut testnet = Testnet {
            network,
            nodes: Vec::with_capacity(count),
            servers: Vec::with_capacity(count),
        };

        for i in 0..count {
            let node = testnet.spawn(format!("testnet-{i}"));

            if i > 0 {
                node.bootstrap(&testnet.peer(0));
            }
        }

        testnet
    }

    // === Getters ===

    /// Handle to the `index`th node, reached through the network.
    ///
    /// # Panics
    ///
    /// If `index` is out of bounds.
    pub fn peer(&self, index: usize) -> PeerRef {
        let node = &self.nodes[index];

        self.network.peer(PeerRecord {
            id: node.id(),
            address: node.address().to_string(),
        })
    }

    // === Public Methods ===

    /// Start serving one more node, without bootstrapping it.
    pub fn spawn(&mut self, address: String) -> Arc<Node> {
        let node = Node::with_config(
            address,
            Config {
                connector: Some(Arc::new(self.network.clone())),
                ..Default::default()
            },
        );

        self.servers.push(Server::serve(node.clone(), &self.network));
        self.nodes.push(node.clone());

        node
    }

    /// Stop answering requests addressed to the `index`th node.
    pub fn disconnect(&mut self, index: usize) {
        if let Some(server) = self.servers.get_mut(index) {
            server.shutdown();
        }
    }

    /// Stop all servers.
    pub fn shutdown(&mut self) {
        for server in self.servers.iter_mut() {
            server.shutdown();
        }
    }
}
