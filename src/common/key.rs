//! Loosely typed keys accepted by the public [Node](crate::Node) API.

use bytes::Bytes;

use super::Id;
use crate::Result;

/// Either an already resolved [Id], or raw bytes waiting to be coerced into one.
///
/// Raw bytes are resolved in one of two ways:
/// - [Key::to_id] treats them as the identifier itself, so they must be exactly
///   [ID_SIZE](crate::common::ID_SIZE) bytes long.
/// - [Key::to_content_id] treats them as content, and hashes them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    Id(Id),
    Raw(Bytes),
}

impl Key {
    /// Strict coercion, fails with [Error::InvalidIdSize](crate::Error::InvalidIdSize)
    /// for raw bytes of the wrong length.
    pub fn to_id(&self) -> Result<Id> {
        match self {
            Key::Id(id) => Ok(*id),
            Key::Raw(bytes) => Id::from_bytes(bytes),
        }
    }

    /// Content addressed coercion, raw bytes are hashed with [Id::for_content].
    pub fn to_content_id(&self) -> Id {
        match self {
            Key::Id(id) => *id,
            Key::Raw(bytes) => Id::for_content(bytes),
        }
    }
}

impl From<Id> for Key {
    fn from(id: Id) -> Self {
        Key::Id(id)
    }
}

impl From<&Id> for Key {
    fn from(id: &Id) -> Self {
        Key::Id(*id)
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::Raw(Bytes::copy_from_slice(s.as_bytes()))
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key::Raw(Bytes::from(s))
    }
}

impl From<&[u8]> for Key {
    fn from(bytes: &[u8]) -> Self {
        Key::Raw(Bytes::copy_from_slice(bytes))
    }
}

impl From<Vec<u8>> for Key {
    fn from(bytes: Vec<u8>) -> Self {
        Key::Raw(Bytes::from(bytes))
    }
}

impl From<Bytes> for Key {
    fn from(bytes: Bytes) -> Self {
        Key::Raw(bytes)
    }
}
