//! Shared data models for the job board backend.
//!
//! This crate provides Serde-serializable types for:
//! - Job postings and their identifiers
//! - Applications and the string-form job reference they carry
//! - Store write results (inserts and partial updates)

pub mod application;
pub mod error;
pub mod job;
pub mod write;

// Re-export common types
pub use application::{
    Application, ApplicationId, NewApplication, APPLICANT_FIELD, JOB_ID_FIELD, STATUS_FIELD,
};
pub use error::{ModelError, ModelResult};
pub use job::{Job, JobId, JobRef, APPLICATIONS_COUNT_FIELD, POSTER_FIELD};
pub use write::{InsertResult, UpdateResult};
