//! Nodes talking to each other through the in process rpc transport.

use std::{collections::HashSet, sync::Arc, thread, time::Duration};

use dht_node::{
    rpc::{Network, Server},
    Bytes, Id, Node, PeerRecord, PeerRef, Testnet,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

fn remote(network: &Network, node: &Node) -> PeerRef {
    network.peer(PeerRecord {
        id: node.id(),
        address: node.address().to_string(),
    })
}

fn ids(peers: &[PeerRef]) -> HashSet<Id> {
    peers.iter().map(|peer| *peer.id()).collect()
}

#[test]
fn bootstrap_discovers_the_network() {
    init_tracing();

    let network = Network::new();
    let nodes: Vec<_> = ["a", "b", "c", "d"].iter().map(|a| Node::new(*a)).collect();
    let _servers: Vec<_> = nodes
        .iter()
        .map(|node| Server::serve(node.clone(), &network))
        .collect();

    let (a, b, c, d) = (&nodes[0], &nodes[1], &nodes[2], &nodes[3]);

    // b -> c -> d
    assert!(b.ping(&remote(&network, c)));
    assert!(c.ping(&remote(&network, d)));

    let visited = a.bootstrap(&remote(&network, b));

    assert_eq!(ids(&visited), ids(&[b, c, d].map(|n| remote(&network, n))));
    assert!(a.knows(&b.id()));
    assert!(a.knows(&c.id()));
    assert!(a.knows(&d.id()));
    assert!(!visited.iter().any(|peer| peer.id() == &a.id()));
}

#[test]
fn bootstrap_through_unreachable_peer() {
    let network = Network::new();
    let a = Node::new("a");
    let _server = Server::serve(a.clone(), &network);

    let ghost = network.peer(PeerRecord {
        id: Id::random(),
        address: "ghost".to_string(),
    });

    assert!(a.bootstrap(&ghost).is_empty());
    assert_eq!(a.info().peers(), 0);
}

#[test]
fn store_and_retrieve() {
    let testnet = Testnet::new(10);

    let copies = testnet.nodes[3].put("key", "value", None);
    assert_eq!(copies, 10);

    for node in &testnet.nodes {
        let (values, visited) = node.find_values(Id::for_content("key")).unwrap();

        assert_eq!(values, vec![Bytes::from("value")]);
        assert_eq!(visited.len(), 9);
    }
}

#[test]
fn replication_is_bounded() {
    let testnet = Testnet::new(8);
    let key = Id::for_content("bounded");

    assert_eq!(testnet.nodes[5].put("bounded", "v", Some(2)), 3);

    let holders = testnet
        .nodes
        .iter()
        .filter(|node| !node.local_values(&key).is_empty())
        .count();

    assert_eq!(holders, 3);
    assert!(!testnet.nodes[5].local_values(&key).is_empty());
}

#[test]
fn zero_redundancy_stores_locally_only() {
    let testnet = Testnet::new(4);
    let key = Id::for_content("local");

    assert_eq!(testnet.nodes[1].put("local", "v", Some(0)), 1);

    let holders: Vec<_> = testnet
        .nodes
        .iter()
        .map(|node| !node.local_values(&key).is_empty())
        .collect();

    assert_eq!(holders, vec![false, true, false, false]);
}

#[test]
fn values_union_across_the_network() {
    let testnet = Testnet::new(6);
    let key = Id::random();

    testnet.nodes[0].handle_store(key, "one").unwrap();
    testnet.nodes[2].handle_store(key, "two").unwrap();
    testnet.nodes[4].handle_store(key, "two").unwrap();
    testnet.nodes[5].handle_store(key, "three").unwrap();

    let (values, _) = testnet.nodes[1].find_values(key).unwrap();

    let values: HashSet<_> = values.into_iter().collect();
    let expected: HashSet<_> = ["one", "two", "three"]
        .iter()
        .map(|v| Bytes::from(*v))
        .collect();

    assert_eq!(values, expected);
}

#[test]
fn unreachable_peers_are_skipped() {
    init_tracing();

    let network = Network::new().with_request_timeout(Duration::from_millis(200));
    let nodes: Vec<_> = ["a", "b", "c", "d"].iter().map(|a| Node::new(*a)).collect();
    let mut servers: Vec<_> = nodes
        .iter()
        .map(|node| Server::serve(node.clone(), &network))
        .collect();

    let (a, b, c, d) = (&nodes[0], &nodes[1], &nodes[2], &nodes[3]);

    assert!(b.ping(&remote(&network, c)));
    assert!(b.ping(&remote(&network, d)));
    assert!(a.ping(&remote(&network, b)));

    // c goes away after b learned about it.
    servers[2].shutdown();

    let visited = a.find_peers(Id::random()).unwrap();

    assert_eq!(ids(&visited), ids(&[remote(&network, b), remote(&network, d)]));
    assert!(!a.knows(&c.id()));
    assert!(a.knows(&d.id()));
}

#[test]
fn put_survives_disconnected_peers() {
    let mut testnet = Testnet::new(6);
    testnet.disconnect(2);
    testnet.disconnect(4);

    let key = Id::for_content("resilient");

    assert_eq!(testnet.nodes[0].put("resilient", "v", None), 4);
    assert!(testnet.nodes[2].local_values(&key).is_empty());
    assert!(testnet.nodes[4].local_values(&key).is_empty());
}

#[test]
fn malformed_keys_are_refused_remotely() {
    let testnet = Testnet::new(2);

    let peer = testnet.peer(1);
    assert!(peer.store(Id::random(), "v".into()).unwrap());

    assert!(testnet.nodes[0].find_values("not a 20 bytes id").is_err());
    assert!(testnet.nodes[0].find_peers(vec![0u8; 19]).is_err());
}

#[test]
fn concurrent_lookups() {
    let testnet = Arc::new(Testnet::new(12));

    let handles: Vec<_> = (0..testnet.nodes.len())
        .map(|i| {
            let testnet = testnet.clone();

            thread::spawn(move || {
                let node = &testnet.nodes[i];
                let key = format!("key-{i}");

                node.put(key.as_str(), key.clone(), None);

                node.find_peers(Id::random()).unwrap().len()
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), 11);
    }

    for i in 0..testnet.nodes.len() {
        let key = Id::for_content(format!("key-{i}"));

        for node in &testnet.nodes {
            assert_eq!(node.local_values(&key), vec![Bytes::from(format!("key-{i}"))]);
        }
    }
}
