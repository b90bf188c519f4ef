use std::sync::Arc;

use dht_node::{rpc::Server, Bytes, Config, Error, Id, Node, Testnet};

#[test]
fn restart_from_saved_state() {
    let mut testnet = Testnet::new(5);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("node.bencode");

    let node = &testnet.nodes[2];
    let key = Id::random();
    node.handle_store(key, "kept").unwrap();
    node.find_peers(Id::random()).unwrap();

    node.save(&path).unwrap();

    let known = node.info().peers();
    let id = node.id();

    // Replace the node with a fresh one at the same address.
    testnet.disconnect(2);

    let restarted = Node::with_config(
        "testnet-2",
        Config {
            connector: Some(Arc::new(testnet.network.clone())),
            ..Default::default()
        },
    );
    let _server = Server::serve(restarted.clone(), &testnet.network);

    assert_eq!(restarted.id(), id);
    assert!(restarted.load(&path).unwrap());

    assert_eq!(restarted.info().peers(), known);
    assert_eq!(restarted.local_values(&key), vec![Bytes::from("kept")]);

    // Restored peers are live.
    assert_eq!(restarted.find_peers(Id::random()).unwrap().len(), 4);

    let (values, _) = testnet.nodes[0].find_values(key).unwrap();
    assert_eq!(values, vec![Bytes::from("kept")]);
}

#[test]
fn load_without_connector() {
    let testnet = Testnet::new(3);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("node.bencode");

    testnet.nodes[0].save(&path).unwrap();

    let lonely = Node::new("lonely");

    assert!(matches!(lonely.load(&path), Err(Error::MissingConnector(2))));
    assert_eq!(lonely.info().peers(), 0);
}
