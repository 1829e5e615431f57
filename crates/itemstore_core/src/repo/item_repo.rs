//! Item repository contracts and in-memory implementation.
//!
//! # Responsibility
//! - Provide stable CRUD APIs over the process-lifetime item collection.
//! - Enforce identity and `(type, name)` uniqueness on every write.
//!
//! # Invariants
//! - Write paths call `Item::validate()` before mutating the collection.
//! - One `RwLock` guards every traversal and mutation; duplicate scans and
//!   the following append/overwrite run under the same write guard.
//! - A failed write leaves the collection exactly as it was.
//! - `replace_if_unchanged` only overwrites a stored item equal to the
//!   snapshot the caller read.
//! - Readers receive clones, never references into the collection.

use crate::context::{ContextError, OperationContext};
use crate::model::item::{Item, ItemId, ItemValidationError};
use log::debug;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

pub type RepoResult<T> = Result<T, RepoError>;

/// Key used by a failed point lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemLookup {
    Id(ItemId),
    TypeAndName { kind: String, name: String },
    Name(String),
}

impl Display for ItemLookup {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Id(id) => write!(f, "uuid '{id}'"),
            Self::TypeAndName { kind, name } => write!(f, "type '{kind}' and name '{name}'"),
            Self::Name(name) => write!(f, "name '{name}'"),
        }
    }
}

/// Repository error for item storage and lookup operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(ItemValidationError),
    NotFound(ItemLookup),
    /// Identifier or `(type, name)` already taken by another item.
    Conflict(ItemLookup),
    /// Replace tried to change the identifier of the target item.
    Immutable { expected: ItemId, actual: ItemId },
    /// Stored item changed after the caller read it.
    Stale(ItemId),
    Cancelled(ContextError),
    Internal(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound(lookup) => write!(f, "item with {lookup} not found"),
            Self::Conflict(lookup) => write!(f, "item with {lookup} already exists"),
            Self::Immutable { expected, actual } => write!(
                f,
                "field uuid is immutable: expected '{expected}', got '{actual}'"
            ),
            Self::Stale(id) => write!(f, "item with uuid '{id}' was modified concurrently"),
            Self::Cancelled(err) => write!(f, "{err}"),
            Self::Internal(message) => write!(f, "internal repository error: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Cancelled(err) => Some(err),
            Self::NotFound(_)
            | Self::Conflict(_)
            | Self::Immutable { .. }
            | Self::Stale(_)
            | Self::Internal(_) => None,
        }
    }
}

impl From<ItemValidationError> for RepoError {
    fn from(value: ItemValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<ContextError> for RepoError {
    fn from(value: ContextError) -> Self {
        Self::Cancelled(value)
    }
}

/// Repository interface for item CRUD operations.
///
/// Implementations must be safe to share between request-handling threads.
pub trait ItemRepository: Send + Sync {
    /// Appends a new item and returns its id.
    fn insert(&self, ctx: &OperationContext, item: &Item) -> RepoResult<ItemId>;
    /// Lists items in insertion order, optionally filtered by type.
    fn list(&self, ctx: &OperationContext, kind: Option<&str>) -> RepoResult<Vec<Item>>;
    fn find(&self, ctx: &OperationContext, id: ItemId) -> RepoResult<Item>;
    fn find_by_type_and_name(
        &self,
        ctx: &OperationContext,
        kind: &str,
        name: &str,
    ) -> RepoResult<Item>;
    /// Returns the first item with `name` in insertion order, across types.
    fn find_by_name(&self, ctx: &OperationContext, name: &str) -> RepoResult<Item>;
    /// Overwrites the item stored under `id` in place.
    fn replace(&self, ctx: &OperationContext, id: ItemId, item: &Item) -> RepoResult<()>;
    /// Overwrites `current.id` with `item` only while the stored item still
    /// equals `current`; otherwise returns `Stale`.
    fn replace_if_unchanged(
        &self,
        ctx: &OperationContext,
        current: &Item,
        item: &Item,
    ) -> RepoResult<()>;
    fn delete(&self, ctx: &OperationContext, id: ItemId) -> RepoResult<()>;
    fn len(&self, ctx: &OperationContext) -> RepoResult<usize>;

    fn is_empty(&self, ctx: &OperationContext) -> RepoResult<bool> {
        Ok(self.len(ctx)? == 0)
    }
}

impl<R: ItemRepository + ?Sized> ItemRepository for Arc<R> {
    fn insert(&self, ctx: &OperationContext, item: &Item) -> RepoResult<ItemId> {
        (**self).insert(ctx, item)
    }

    fn list(&self, ctx: &OperationContext, kind: Option<&str>) -> RepoResult<Vec<Item>> {
        (**self).list(ctx, kind)
    }

    fn find(&self, ctx: &OperationContext, id: ItemId) -> RepoResult<Item> {
        (**self).find(ctx, id)
    }

    fn find_by_type_and_name(
        &self,
        ctx: &OperationContext,
        kind: &str,
        name: &str,
    ) -> RepoResult<Item> {
        (**self).find_by_type_and_name(ctx, kind, name)
    }

    fn find_by_name(&self, ctx: &OperationContext, name: &str) -> RepoResult<Item> {
        (**self).find_by_name(ctx, name)
    }

    fn replace(&self, ctx: &OperationContext, id: ItemId, item: &Item) -> RepoResult<()> {
        (**self).replace(ctx, id, item)
    }

    fn replace_if_unchanged(
        &self,
        ctx: &OperationContext,
        current: &Item,
        item: &Item,
    ) -> RepoResult<()> {
        (**self).replace_if_unchanged(ctx, current, item)
    }

    fn delete(&self, ctx: &OperationContext, id: ItemId) -> RepoResult<()> {
        (**self).delete(ctx, id)
    }

    fn len(&self, ctx: &OperationContext) -> RepoResult<usize> {
        (**self).len(ctx)
    }
}

/// In-memory item repository backed by an insertion-ordered `Vec`.
#[derive(Debug, Default)]
pub struct MemoryItemRepository {
    items: RwLock<Vec<Item>>,
}

impl MemoryItemRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RepoResult<RwLockReadGuard<'_, Vec<Item>>> {
        self.items
            .read()
            .map_err(|_| RepoError::Internal("item collection lock poisoned".to_string()))
    }

    fn write(&self) -> RepoResult<RwLockWriteGuard<'_, Vec<Item>>> {
        self.items
            .write()
            .map_err(|_| RepoError::Internal("item collection lock poisoned".to_string()))
    }

    /// Checks run in order: context, id immutability, validation, existence,
    /// snapshot match, `(type, name)` collision.
    fn overwrite(
        &self,
        ctx: &OperationContext,
        id: ItemId,
        item: &Item,
        expected: Option<&Item>,
    ) -> RepoResult<()> {
        ctx.check()?;
        if item.id != id {
            return Err(RepoError::Immutable {
                expected: id,
                actual: item.id,
            });
        }
        item.validate()?;

        let mut items = self.write()?;
        let Some(index) = items.iter().position(|existing| existing.id == id) else {
            return Err(RepoError::NotFound(ItemLookup::Id(id)));
        };
        if expected.is_some_and(|expected| items[index] != *expected) {
            return Err(RepoError::Stale(id));
        }
        let collides = items.iter().any(|existing| {
            existing.id != id && existing.kind == item.kind && existing.name == item.name
        });
        if collides {
            return Err(RepoError::Conflict(ItemLookup::TypeAndName {
                kind: item.kind.clone(),
                name: item.name.clone(),
            }));
        }
        items[index] = item.clone();

        debug!(
            "event=item_replace module=repo status=ok type={} id={} conditional={}",
            item.kind,
            id,
            expected.is_some()
        );
        Ok(())
    }
}

impl ItemRepository for MemoryItemRepository {
    fn insert(&self, ctx: &OperationContext, item: &Item) -> RepoResult<ItemId> {
        ctx.check()?;
        item.validate()?;

        let mut items = self.write()?;
        for existing in items.iter() {
            if existing.id == item.id {
                return Err(RepoError::Conflict(ItemLookup::Id(item.id)));
            }
            if existing.kind == item.kind && existing.name == item.name {
                return Err(RepoError::Conflict(ItemLookup::TypeAndName {
                    kind: item.kind.clone(),
                    name: item.name.clone(),
                }));
            }
        }
        items.push(item.clone());

        debug!(
            "event=item_insert module=repo status=ok type={} id={} size={}",
            item.kind,
            item.id,
            items.len()
        );
        Ok(item.id)
    }

    fn list(&self, ctx: &OperationContext, kind: Option<&str>) -> RepoResult<Vec<Item>> {
        ctx.check()?;

        let items = self.read()?;
        Ok(items
            .iter()
            .filter(|item| kind.map_or(true, |kind| item.kind == kind))
            .cloned()
            .collect())
    }

    fn find(&self, ctx: &OperationContext, id: ItemId) -> RepoResult<Item> {
        ctx.check()?;

        let items = self.read()?;
        items
            .iter()
            .find(|item| item.id == id)
            .cloned()
            .ok_or(RepoError::NotFound(ItemLookup::Id(id)))
    }

    fn find_by_type_and_name(
        &self,
        ctx: &OperationContext,
        kind: &str,
        name: &str,
    ) -> RepoResult<Item> {
        ctx.check()?;

        let items = self.read()?;
        items
            .iter()
            .find(|item| item.kind == kind && item.name == name)
            .cloned()
            .ok_or_else(|| {
                RepoError::NotFound(ItemLookup::TypeAndName {
                    kind: kind.to_string(),
                    name: name.to_string(),
                })
            })
    }

    fn find_by_name(&self, ctx: &OperationContext, name: &str) -> RepoResult<Item> {
        ctx.check()?;

        let items = self.read()?;
        items
            .iter()
            .find(|item| item.name == name)
            .cloned()
            .ok_or_else(|| RepoError::NotFound(ItemLookup::Name(name.to_string())))
    }

    fn replace(&self, ctx: &OperationContext, id: ItemId, item: &Item) -> RepoResult<()> {
        self.overwrite(ctx, id, item, None)
    }

    fn replace_if_unchanged(
        &self,
        ctx: &OperationContext,
        current: &Item,
        item: &Item,
    ) -> RepoResult<()> {
        self.overwrite(ctx, current.id, item, Some(current))
    }

    fn delete(&self, ctx: &OperationContext, id: ItemId) -> RepoResult<()> {
        ctx.check()?;

        let mut items = self.write()?;
        let Some(index) = items.iter().position(|existing| existing.id == id) else {
            return Err(RepoError::NotFound(ItemLookup::Id(id)));
        };
        let removed = items.remove(index);

        debug!(
            "event=item_delete module=repo status=ok type={} id={} size={}",
            removed.kind,
            id,
            items.len()
        );
        Ok(())
    }

    fn len(&self, ctx: &OperationContext) -> RepoResult<usize> {
        ctx.check()?;
        Ok(self.read()?.len())
    }
}
