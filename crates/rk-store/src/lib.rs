//! Document storage for users and recipes.
//!
//! This crate provides:
//! - The `DocumentStore` port with versioned reads and atomic commits
//! - A Firestore REST backend (service account auth via gcp_auth, emulator support)
//! - An in-memory backend for local runs and tests

pub mod client;
pub mod codec;
pub mod error;
pub mod firestore_store;
pub mod memory;
pub mod metrics;
pub mod port;
pub mod retry;
pub mod token_cache;
pub mod types;

pub use client::{FirestoreClient, FirestoreConfig};
pub use error::{StoreError, StoreResult};
pub use firestore_store::FirestoreStore;
pub use memory::MemoryStore;
pub use port::{DocumentStore, StoreWrite, Version, Versioned};
