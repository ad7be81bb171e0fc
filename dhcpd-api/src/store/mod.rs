//! Key/value override store.

mod error;
mod key;
mod memory;
mod sql;
mod traits;

pub use error::{Result, StoreError};
pub use key::{NAMESPACE_PREFIX, OverrideScope, storage_key};
pub use memory::MemoryKeyValueStore;
pub use sql::SqlKeyValueStore;
pub use traits::KeyValueStore;
