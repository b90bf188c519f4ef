#![doc = include_str!("../README.md")]

mod common;
mod error;
mod node;
pub mod rpc;
mod testnet;

pub use crate::common::{
    Connector, Distance, Id, Key, Peer, PeerRecord, PeerRef, RoutingTable, Value, ValueStore,
    ID_SIZE, MAX_BUCKET_SIZE_K, MAX_VALUES,
};
pub use crate::error::{Error, PeerError};
pub use crate::node::{Config, Info, Lookup, LookupKind, Node};
pub use crate::testnet::Testnet;
pub use bytes::Bytes;

pub type Result<T> = std::result::Result<T, Error>;
