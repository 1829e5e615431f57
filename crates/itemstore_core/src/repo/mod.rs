//! Repository layer abstractions and storage implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts.
//! - Keep collection traversal and locking inside the storage boundary.
//!
//! # Invariants
//! - Repository writes must enforce `Item::validate()` before mutating.
//! - Repository APIs return semantic errors (`NotFound`, `Conflict`,
//!   `Immutable`) rather than opaque failures.

pub mod item_repo;
