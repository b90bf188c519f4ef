use std::sync::Arc;

use crate::common::{Connector, Id, MAX_BUCKET_SIZE_K, MAX_VALUES};

#[derive(Debug, Clone)]
/// Node Configurations
pub struct Config {
    /// Explicit identity for this node.
    ///
    /// Defaults to None, where the id is derived from the node's address
    /// with [Id::for_content].
    pub id: Option<Id>,
    /// Maximum number of peers kept per routing table bucket.
    ///
    /// Defaults to [MAX_BUCKET_SIZE_K]
    pub bucket_size: usize,
    /// Maximum number of stored entries before incoming stores are refused.
    ///
    /// Defaults to [MAX_VALUES]
    pub max_values: usize,
    /// Turns persisted peer records back into peers on [crate::Node::load].
    ///
    /// Defaults to None, in which case loading a file with peer records fails.
    pub connector: Option<Arc<dyn Connector>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            id: None,
            bucket_size: MAX_BUCKET_SIZE_K,
            max_values: MAX_VALUES,
            connector: None,
        }
    }
}
