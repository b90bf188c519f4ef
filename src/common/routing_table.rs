//! Simplified Kademlia routing table

use std::collections::BTreeMap;
use std::slice::Iter;
use std::time::Instant;

use crate::common::{Connector, Id, PeerRecord, PeerRef};

/// K = the default maximum size of a k-bucket.
pub const MAX_BUCKET_SIZE_K: usize = 20;

#[derive(Debug, Clone)]
/// Simplified Kademlia routing table
pub struct RoutingTable {
    id: Id,
    bucket_size: usize,
    buckets: BTreeMap<u8, KBucket>,
}

impl RoutingTable {
    /// Create a new [RoutingTable] with a given id.
    pub fn new(id: Id) -> Self {
        RoutingTable {
            id,
            bucket_size: MAX_BUCKET_SIZE_K,
            buckets: BTreeMap::new(),
        }
    }

    // === Options ===

    /// Set the maximum number of peers kept per bucket.
    pub fn with_bucket_size(mut self, bucket_size: usize) -> Self {
        self.bucket_size = bucket_size.max(1);
        self
    }

    // === Getters ===

    /// Returns the [Id] of this node, where the distance is measured from.
    pub fn id(&self) -> &Id {
        &self.id
    }

    /// Maximum number of peers kept per bucket.
    pub fn bucket_size(&self) -> usize {
        self.bucket_size
    }

    /// Returns `true` if this routing table is empty.
    pub fn is_empty(&self) -> bool {
        self.buckets.values().all(|bucket| bucket.is_empty())
    }

    /// Return the number of peers in this routing table.
    pub fn size(&self) -> usize {
        self.buckets
            .values()
            .fold(0, |acc, bucket| acc + bucket.entries.len())
    }

    /// Returns `true` if a peer with that id is known.
    pub fn contains(&self, id: &Id) -> bool {
        let distance = self.id.distance(id).bits();

        self.buckets
            .get(&distance)
            .map(|bucket| bucket.contains(id))
            .unwrap_or(false)
    }

    // === Public Methods ===

    /// Insert a peer, or mark an already known one as freshly seen.
    ///
    /// Returns `false` if the peer was not kept, either because it is this
    /// node itself, or because its bucket is full of other peers.
    pub fn touch(&mut self, peer: PeerRef) -> bool {
        let distance = self.id.distance(peer.id()).bits();

        if distance == 0 {
            // Do not add self to the routing_table
            return false;
        }

        let bucket_size = self.bucket_size;

        self.buckets
            .entry(distance)
            .or_insert_with(|| KBucket::new(bucket_size))
            .touch(peer)
    }

    /// All known peers, ordered by ascending distance to `target`.
    ///
    /// Peers at equal distance keep the order they are iterated in.
    pub fn nearest_to(&self, target: &Id) -> Vec<PeerRef> {
        let mut peers: Vec<PeerRef> = self.peers().collect();

        peers.sort_by_cached_key(|peer| peer.id().distance(target));

        peers
    }

    /// Returns an iterator over the peers in this routing table, closest buckets first,
    /// and least recently seen first within a bucket.
    pub fn peers(&self) -> impl Iterator<Item = PeerRef> + '_ {
        self.buckets
            .values()
            .flat_map(|bucket| bucket.iter().map(|entry| entry.peer.clone()))
    }

    /// Change the id distances are measured from, re-bucketing every known peer.
    ///
    /// A known peer carrying the new id is dropped.
    pub fn set_id(&mut self, id: Id) {
        let peers: Vec<PeerRef> = self.peers().collect();

        self.id = id;
        self.buckets.clear();

        for peer in peers {
            self.touch(peer);
        }
    }

    // === Persistence ===

    /// Export the known peers as portable records.
    pub fn to_records(&self) -> Vec<PeerRecord> {
        self.peers().map(|peer| peer.to_record()).collect()
    }

    /// Replace the content of this table with the given records.
    pub fn from_records(&mut self, records: &[PeerRecord], connector: &dyn Connector) {
        self.buckets.clear();

        for record in records {
            self.touch(connector.connect(record));
        }
    }
}

#[derive(Debug, Clone)]
/// A known peer and when it was last seen.
pub struct PeerEntry {
    pub peer: PeerRef,
    pub last_seen: Instant,
}

/// Kbuckets are similar to LRU caches, except that a full bucket keeps its
/// long lived peers and refuses newcomers.
#[derive(Debug, Clone)]
pub struct KBucket {
    /// K (as in k-bucket) is the maximum number of peers in a k-bucket.
    k: usize,
    /// Peers in the k-bucket, sorted by the least recently seen.
    entries: Vec<PeerEntry>,
}

impl KBucket {
    pub fn new(k: usize) -> Self {
        KBucket {
            k,
            entries: Vec::with_capacity(k.min(MAX_BUCKET_SIZE_K)),
        }
    }

    // === Public Methods ===

    pub fn touch(&mut self, incoming: PeerRef) -> bool {
        let entry = PeerEntry {
            peer: incoming,
            last_seen: Instant::now(),
        };

        if let Some(index) = self.iter().position(|e| e.peer == entry.peer) {
            // Refresh, moving the peer to the end of the bucket.
            self.entries.remove(index);
            self.entries.push(entry);

            true
        } else if self.entries.len() < self.k {
            self.entries.push(entry);

            true
        } else {
            false
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> Iter<'_, PeerEntry> {
        self.entries.iter()
    }

    fn contains(&self, id: &Id) -> bool {
        self.iter().any(|entry| entry.peer.id() == id)
    }
}
