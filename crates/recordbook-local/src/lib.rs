//! Storage backend keeping one JSON array file per collection inside a
//! directory the user granted access to.

pub mod access;
pub mod store;

pub use access::{DeniedDirectory, DirectoryAccess, GrantedDirectory};
pub use store::LocalDirectoryStore;
