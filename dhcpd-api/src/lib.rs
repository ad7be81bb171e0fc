pub mod audit;
pub mod lease;
pub mod params;
pub mod rest;
pub mod server;
pub mod store;

pub use audit::AuditLogger;
pub use lease::{EngineError, LeaseEngine, MemoryLeaseEngine, NetworkStats};
pub use params::{MacAddr, ParamKind};
pub use rest::{AppState, Credentials, create_router};
pub use server::{ServerConfig, build_app};
pub use store::{KeyValueStore, MemoryKeyValueStore, SqlKeyValueStore, StoreError};
