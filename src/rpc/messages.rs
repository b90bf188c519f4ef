//! Serialize and deserialize rpc frames.

use serde::{Deserialize, Serialize};

use crate::common::{Id, PeerRecord, Value};
use crate::{Error, Result};

/// Error code for requests that could not be decoded.
pub const PROTOCOL_ERROR: i32 = 203;
/// Error code for requests the node failed to handle.
pub const SERVER_ERROR: i32 = 202;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "q")]
pub enum Request {
    #[serde(rename = "ping")]
    Ping {
        #[serde(rename = "f")]
        from: PeerRecord,
    },

    #[serde(rename = "store")]
    Store {
        #[serde(rename = "k")]
        key: Id,
        #[serde(rename = "v")]
        value: Value,
    },

    #[serde(rename = "find_node")]
    FindNode {
        #[serde(rename = "k")]
        key: Id,
    },

    #[serde(rename = "get_values")]
    GetValues {
        #[serde(rename = "k")]
        key: Id,
    },
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "y")]
pub enum Response {
    #[serde(rename = "pong")]
    Pong {
        #[serde(rename = "a")]
        accepted: u8,
    },

    #[serde(rename = "stored")]
    Stored {
        #[serde(rename = "s")]
        stored: u8,
    },

    #[serde(rename = "nodes")]
    Nodes {
        #[serde(rename = "n")]
        nodes: Vec<PeerRecord>,
    },

    #[serde(rename = "values")]
    Values {
        #[serde(rename = "v")]
        values: Vec<Value>,
        #[serde(rename = "n")]
        nodes: Vec<PeerRecord>,
    },

    #[serde(rename = "e")]
    Error {
        #[serde(rename = "c")]
        code: i32,
        #[serde(rename = "m")]
        message: String,
    },
}

impl Request {
    pub fn from_bytes<T: AsRef<[u8]>>(bytes: T) -> Result<Request> {
        let obj = serde_bencode::from_bytes(bytes.as_ref())?;
        Ok(obj)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_bencode::to_bytes(self).map_err(Error::BencodeError)
    }
}

impl Response {
    pub fn from_bytes<T: AsRef<[u8]>>(bytes: T) -> Result<Response> {
        let obj = serde_bencode::from_bytes(bytes.as_ref())?;
        Ok(obj)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_bencode::to_bytes(self).map_err(Error::BencodeError)
    }
}
