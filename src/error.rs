//! Main Crate Error

use crate::common::{Id, ID_SIZE};

#[derive(thiserror::Error, Debug)]
/// Dht node crate error enum.
pub enum Error {
    /// Raw identifier bytes of the wrong length.
    #[error("Invalid Id size, expected {ID_SIZE}, got {0}")]
    InvalidIdSize(usize),

    /// Identifier string that is not valid hex.
    #[error("Invalid Id encoding: {0}")]
    InvalidIdEncoding(String),

    #[error(transparent)]
    /// Transparent [std::io::Error]
    IO(#[from] std::io::Error),

    #[error("Failed to parse bencoded data: {0}")]
    BencodeError(#[from] serde_bencode::Error),

    /// Persisted state contains peer records, but the node was built without
    /// a [Connector](crate::Connector) to turn them back into peers.
    #[error("Can not restore {0} peer records without a connector")]
    MissingConnector(usize),
}

/// Failure of a single call to another peer.
///
/// Never fatal: lookups and stores skip the peer and carry on.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PeerError {
    /// The peer did not answer within the request timeout.
    #[error("Peer {0} did not respond in time")]
    Timeout(Id),

    /// Nothing is listening at the peer's address anymore.
    #[error("Peer {0} is disconnected")]
    Disconnected(Id),

    /// The peer answered with an error or an undecodable message.
    #[error("Protocol error: {0}")]
    Protocol(String),
}
