#![forbid(unsafe_code)]
//! faceoff-core library.
//!
//! The data layer of the faceoff ranking engine: item records, the ordered
//! record store, snapshot persistence, and the discovery collaborators.
//!
//! # Conventions
//!
//! - **Errors**: typed [`error::StoreError`] / [`discover::DiscoverError`]
//!   in library code; `anyhow::Result` only at application edges.
//! - **Logging**: `tracing` macros (`info!`, `warn!`, `debug!`).

pub mod config;
pub mod discover;
pub mod error;
pub mod record;
pub mod snapshot;
pub mod store;

pub use error::StoreError;
pub use record::ItemRecord;
pub use store::RecordStore;
