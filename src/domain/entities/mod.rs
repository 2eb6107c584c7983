//! Core domain entities representing the business data model.
//!
//! # Entity Types
//!
//! - [`Link`] - A shortened URL with its owner and soft-delete flag
//! - [`CreatedLink`], [`Resolution`] - Store operation outcomes
//! - [`OwnerLink`], [`BatchItem`], [`BatchOutcome`] - Facade-level views

pub mod link;

pub use link::{BatchItem, BatchOutcome, CreatedLink, Link, OwnerLink, Resolution};
