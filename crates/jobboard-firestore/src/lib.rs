//! Document store adapter for the job board.
//!
//! This crate provides:
//! - The [`DocumentStore`] capability the services are written against
//! - A Firestore REST implementation with service account auth, retries and metrics
//! - An in-memory implementation for tests and local runs
//! - Typed repositories for jobs and applications

pub mod client;
pub mod error;
pub mod memory;
pub mod metrics;
pub mod repos;
pub mod retry;
pub mod store;
pub mod token_cache;
pub mod types;

#[cfg(test)]
mod client_tests;

pub use client::{FirestoreClient, FirestoreConfig};
pub use error::{FirestoreError, FirestoreResult};
pub use memory::MemoryStore;
pub use repos::{ApplicationRepository, JobRepository, APPLICATIONS_COLLECTION, JOBS_COLLECTION};
pub use store::{DocumentStore, FieldFilter, StoredDocument};
pub use types::{Document, Value};
