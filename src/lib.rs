//! RecordBook: persistence for the bookkeeping app's records.
//!
//! The record server in this crate exposes every collection over HTTP and
//! keeps it in one JSON file per collection. The backends that application
//! code talks to live in the member crates and are re-exported here: a store
//! writing into a local directory and a store talking to this server.

pub mod api;
pub mod auth;
pub mod config;
pub mod logging;
pub mod server;
pub mod static_files;
pub mod storage;
pub mod trace;

pub use recordbook_core::{Collection, KeyMap, Record, RecordStore, StoreError};
pub use recordbook_local::{DeniedDirectory, DirectoryAccess, GrantedDirectory, LocalDirectoryStore};
pub use recordbook_remote::RemoteHttpStore;
