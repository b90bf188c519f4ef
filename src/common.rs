//! Miscellaneous common structs used throughout the library.

mod id;
mod key;
pub(crate) mod peer;
mod routing_table;
mod value_store;

pub use id::*;
pub use key::*;
pub use peer::*;
pub use routing_table::*;
pub use value_store::*;
