//! Link store backends.
//!
//! # Repositories
//!
//! - [`MemoryLinkRepository`] - In-process indices with debounced JSON snapshots
//! - [`PgLinkRepository`] - PostgreSQL storage via SQLx
//!
//! Both implement [`crate::domain::repositories::LinkRepository`] and are
//! interchangeable at startup.

pub mod memory_link_repository;
pub mod pg_link_repository;
pub mod snapshot;

pub use memory_link_repository::MemoryLinkRepository;
pub use pg_link_repository::{LinkCounts, PgLinkRepository};
pub use snapshot::{SnapshotRecord, SnapshotWriter};
