//! Domain model for schemaless typed items.
//!
//! # Responsibility
//! - Define canonical data structures used by repository and service layers.
//! - Keep reserved system fields separate from user-supplied attributes.
//!
//! # Invariants
//! - Every item is identified by a stable `ItemId`.
//! - Deletion is a hard delete; no tombstones are kept.

pub mod item;
