//! Core domain logic for itemstore.
//! This crate is the single source of truth for item invariants.

pub mod context;
pub mod logging;
pub mod model;
pub mod patch;
pub mod repo;
pub mod service;

pub use context::{ContextError, OperationContext};
pub use logging::{default_log_level, init_logging, logging_status, LogTarget};
pub use model::item::{
    is_reserved_field, is_valid_token, reserved_fields, Attributes, Item, ItemId,
    ItemValidationError, TOKEN_PATTERN,
};
pub use patch::{
    MergePatch, PatchError, PatchKind, PatchReconciler, PatchStrategy, ReconcileError,
    StructuralPatch, CONTENT_TYPE_JSON_PATCH, CONTENT_TYPE_MERGE_PATCH,
};
pub use repo::item_repo::{ItemLookup, ItemRepository, MemoryItemRepository, RepoError, RepoResult};
pub use service::item_service::{
    CreateItem, ErrorKind, ItemService, ServiceError, ServiceResult,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
