//! `RemoteStore` implementations

pub mod http;
pub mod memory;

pub use http::HttpStore;
pub use memory::{EngineScript, MemoryStore, TRACK_DISTANCE};
