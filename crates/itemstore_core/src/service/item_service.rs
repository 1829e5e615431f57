//! Item use-case service.
//!
//! # Responsibility
//! - Provide `(type, name)`-addressed CRUD entry points for transport layers.
//! - Assign identifiers and timestamps on create.
//! - Route partial updates through the patch reconciler.
//!
//! # Invariants
//! - Full replace keeps `uuid`, `type`, `name` and `createdAt` of the stored
//!   item; only the attribute bag is swapped.
//! - Service APIs never bypass repository validation/uniqueness checks.
//! - Read-modify-write paths only store their result if the item is unchanged
//!   since it was read; a concurrent writer turns the call into `Conflict`.
//! - Every entry point rejects a malformed type before touching the repository.
//! - Every error maps to exactly one `ErrorKind`.

use crate::context::{ContextError, OperationContext};
use crate::model::item::{is_valid_token, Attributes, Item, ItemId, ItemValidationError};
use crate::patch::{PatchError, PatchKind, PatchReconciler, ReconcileError};
use crate::repo::item_repo::{ItemLookup, ItemRepository, RepoError};
use chrono::Utc;
use log::info;
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Request model for creating one item under a type.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateItem {
    pub name: String,
    pub attributes: Attributes,
}

/// Stable error categories exposed to transport layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    Immutable,
    Validation,
    Cancelled,
    Internal,
}

/// Service error for item use-cases.
#[derive(Debug)]
pub enum ServiceError {
    InvalidItem(ItemValidationError),
    Patch(PatchError),
    NotFound(ItemLookup),
    Conflict(ItemLookup),
    Immutable { expected: ItemId, actual: ItemId },
    /// Item changed between read and write.
    Stale(ItemId),
    Cancelled(ContextError),
    Internal(String),
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidItem(_) => ErrorKind::Validation,
            Self::Patch(PatchError::Serialization(_)) => ErrorKind::Internal,
            Self::Patch(_) => ErrorKind::Validation,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::Immutable { .. } => ErrorKind::Immutable,
            Self::Stale(_) => ErrorKind::Conflict,
            Self::Cancelled(_) => ErrorKind::Cancelled,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidItem(err) => write!(f, "{err}"),
            Self::Patch(err) => write!(f, "{err}"),
            Self::NotFound(lookup) => write!(f, "item with {lookup} not found"),
            Self::Conflict(lookup) => write!(f, "item with {lookup} already exists"),
            Self::Immutable { expected, actual } => write!(
                f,
                "field uuid is immutable: expected '{expected}', got '{actual}'"
            ),
            Self::Stale(id) => write!(f, "item with uuid '{id}' was modified concurrently"),
            Self::Cancelled(err) => write!(f, "{err}"),
            Self::Internal(message) => write!(f, "internal error: {message}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidItem(err) => Some(err),
            Self::Patch(err) => Some(err),
            Self::Cancelled(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::InvalidItem(err),
            RepoError::NotFound(lookup) => Self::NotFound(lookup),
            RepoError::Conflict(lookup) => Self::Conflict(lookup),
            RepoError::Immutable { expected, actual } => Self::Immutable { expected, actual },
            RepoError::Stale(id) => Self::Stale(id),
            RepoError::Cancelled(err) => Self::Cancelled(err),
            RepoError::Internal(message) => Self::Internal(message),
        }
    }
}

impl From<PatchError> for ServiceError {
    fn from(value: PatchError) -> Self {
        Self::Patch(value)
    }
}

impl From<ReconcileError> for ServiceError {
    fn from(value: ReconcileError) -> Self {
        match value {
            ReconcileError::Patch(err) => Self::Patch(err),
            ReconcileError::Repo(err) => err.into(),
        }
    }
}

impl From<ItemValidationError> for ServiceError {
    fn from(value: ItemValidationError) -> Self {
        Self::InvalidItem(value)
    }
}

/// Use-case service wrapper over an item repository.
pub struct ItemService<R: ItemRepository> {
    repo: R,
    reconciler: PatchReconciler,
}

impl<R: ItemRepository> ItemService<R> {
    /// Creates a service with both patch strategies registered.
    pub fn new(repo: R) -> Self {
        Self::with_reconciler(repo, PatchReconciler::default())
    }

    pub fn with_reconciler(repo: R, reconciler: PatchReconciler) -> Self {
        Self { repo, reconciler }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Creates an item with a fresh id and `createdAt == updatedAt`.
    ///
    /// # Contract
    /// - Returns `Conflict` when `(kind, name)` is already taken.
    /// - Returns the stored item.
    pub fn create(
        &self,
        ctx: &OperationContext,
        kind: &str,
        request: CreateItem,
    ) -> ServiceResult<Item> {
        let item = Item::new(kind, request.name, request.attributes);
        self.repo.insert(ctx, &item)?;

        info!(
            "event=item_create module=service status=ok type={} id={}",
            item.kind, item.id
        );
        Ok(item)
    }

    /// Lists items of one type in insertion order.
    pub fn list(&self, ctx: &OperationContext, kind: &str) -> ServiceResult<Vec<Item>> {
        ensure_type(kind)?;
        Ok(self.repo.list(ctx, Some(kind))?)
    }

    pub fn get(&self, ctx: &OperationContext, kind: &str, name: &str) -> ServiceResult<Item> {
        ensure_type(kind)?;
        Ok(self.repo.find_by_type_and_name(ctx, kind, name)?)
    }

    /// Replaces the attribute bag of one item wholesale.
    ///
    /// `kind` and `name` address the item and are never changed by this call.
    /// Returns `Stale` when another write lands between lookup and store.
    pub fn replace(
        &self,
        ctx: &OperationContext,
        kind: &str,
        name: &str,
        attributes: Attributes,
    ) -> ServiceResult<Item> {
        ensure_type(kind)?;
        let current = self.repo.find_by_type_and_name(ctx, kind, name)?;

        let mut replaced = current.clone();
        replaced.attributes = attributes;
        replaced.touch(Utc::now());
        self.repo.replace_if_unchanged(ctx, &current, &replaced)?;

        info!(
            "event=item_replace module=service status=ok type={} id={}",
            replaced.kind, replaced.id
        );
        Ok(replaced)
    }

    /// Applies a patch document whose format is named by `content_type`.
    ///
    /// An unsupported content type is rejected before the item is looked up.
    pub fn patch(
        &self,
        ctx: &OperationContext,
        kind: &str,
        name: &str,
        content_type: &str,
        document: &Value,
    ) -> ServiceResult<Item> {
        let patch_kind = PatchKind::from_content_type(content_type)?;
        self.patch_with_kind(ctx, kind, name, patch_kind, document)
    }

    pub fn patch_with_kind(
        &self,
        ctx: &OperationContext,
        kind: &str,
        name: &str,
        patch_kind: PatchKind,
        document: &Value,
    ) -> ServiceResult<Item> {
        ensure_type(kind)?;
        if !self.reconciler.supports(patch_kind) {
            return Err(PatchError::UnregisteredKind(patch_kind).into());
        }

        let current = self.repo.find_by_type_and_name(ctx, kind, name)?;
        Ok(self
            .reconciler
            .apply(&self.repo, ctx, &current, patch_kind, document)?)
    }

    pub fn delete(&self, ctx: &OperationContext, kind: &str, name: &str) -> ServiceResult<()> {
        ensure_type(kind)?;
        let current = self.repo.find_by_type_and_name(ctx, kind, name)?;
        self.repo.delete(ctx, current.id)?;

        info!(
            "event=item_delete module=service status=ok type={} id={}",
            current.kind, current.id
        );
        Ok(())
    }
}

fn ensure_type(kind: &str) -> Result<(), ItemValidationError> {
    if is_valid_token(kind) {
        Ok(())
    } else {
        Err(ItemValidationError::InvalidType(kind.to_string()))
    }
}
