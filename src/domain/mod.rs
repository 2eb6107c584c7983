//! Domain layer containing business entities and logic.
//!
//! It defines entities, the storage contract and the deletion pipeline,
//! independent of the concrete backends in [`crate::infrastructure`].
//!
//! # Architecture
//!
//! - [`entities`] - Core business data structures
//! - [`repositories`] - Data access trait definitions
//! - [`delete_task`] - Deletion request model
//! - [`deletion_pipeline`] - Bounded queue and batching delete workers
//!
//! # Delete Flow
//!
//! 1. HTTP handler accepts a list of short IDs
//! 2. A [`delete_task::DeleteTask`] is pushed into the bounded queue
//! 3. A worker batches tasks, coalesces them per owner and flushes
//! 4. Links are soft-deleted via [`repositories::LinkRepository::mark_deleted`]

pub mod delete_task;
pub mod deletion_pipeline;
pub mod entities;
pub mod repositories;
