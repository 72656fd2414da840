//! Core types and traits for RecordBook storage backends.
//!
//! This crate provides the `RecordStore` trait and the record model shared by
//! the local directory backend, the remote HTTP backend and the record server.

pub mod codec;
pub mod collection;
pub mod keygen;
pub mod models;
pub mod storage;
pub mod timestamp;

// Re-export key types at crate root for convenience
pub use collection::Collection;
pub use models::{Record, keys::KeyMap};
pub use storage::{RecordStore, StoreError};
