//! Save and load a node's routing table and value store.

use std::{fs, path::Path};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::Node;
use crate::{
    common::{PeerRecord, RoutingTable, ValueRecords, ValueStore},
    Error, Result,
};

/// On disk document, bencoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Snapshot {
    peers: Vec<PeerRecord>,
    values: ValueRecords,
}

impl Node {
    /// Replace the routing table and value store with the state saved at `path`.
    ///
    /// Returns `Ok(false)` and changes nothing if `path` does not exist.
    /// A file that fails to parse is reported, leaving the current state untouched.
    pub fn load<P: AsRef<Path>>(&self, path: P) -> Result<bool> {
        let path = path.as_ref();

        if !path.exists() {
            debug!(?path, "No saved state to load");
            return Ok(false);
        }

        let bytes = fs::read(path)?;
        let snapshot: Snapshot = serde_bencode::from_bytes(&bytes)?;

        let (id, bucket_size, max_values) = {
            let state = self.read();

            (
                *state.routing_table.id(),
                state.routing_table.bucket_size(),
                state.value_store.max_values(),
            )
        };

        let mut routing_table = RoutingTable::new(id).with_bucket_size(bucket_size);

        match &self.connector {
            Some(connector) => routing_table.from_records(&snapshot.peers, connector.as_ref()),
            None if snapshot.peers.is_empty() => {}
            None => return Err(Error::MissingConnector(snapshot.peers.len())),
        }

        let mut value_store = ValueStore::new(id).with_max_values(max_values);
        value_store.from_records(&snapshot.values)?;

        let saved: usize = snapshot.values.values().map(Vec::len).sum();
        if saved > value_store.len() {
            warn!(
                ?path,
                saved,
                max_values,
                "Saved values exceed the store capacity, dropping the rest"
            );
        }

        let mut state = self.write();

        // The id may have changed while the file was parsed.
        let current = *state.routing_table.id();
        if current != id {
            routing_table.set_id(current);
            value_store.set_id(current);
        }

        state.routing_table = routing_table;
        state.value_store = value_store;

        debug!(
            ?path,
            peers = state.routing_table.size(),
            values = state.value_store.len(),
            "Loaded saved state"
        );

        Ok(true)
    }

    /// Write the routing table and value store to `path`, overwriting it.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        let snapshot = {
            let state = self.read();

            Snapshot {
                peers: state.routing_table.to_records(),
                values: state.value_store.to_records(),
            }
        };

        let bytes = serde_bencode::to_bytes(&snapshot)?;
        fs::write(path, bytes)?;

        debug!(
            ?path,
            peers = snapshot.peers.len(),
            keys = snapshot.values.len(),
            "Saved state"
        );

        Ok(())
    }
}
