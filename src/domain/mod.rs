//! Domain Layer
//!
//! Capability traits and wire shapes shared by the group and its adapters.

pub mod ports;

pub use ports::{
    loader_fn, CacheRequest, CacheResponse, Loader, LoaderFn, NodeClient, NodeSelector,
};
