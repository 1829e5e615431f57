//! Partial-update reconciliation for stored items.
//!
//! # Responsibility
//! - Map request content types to patch kinds.
//! - Hold one `PatchStrategy` per kind and apply it to the full wire
//!   representation of an item.
//! - Restore server-managed fields and hand the result to `ItemRepository::replace`.
//!
//! # Invariants
//! - Patches run against a copy; a failing patch never reaches the repository.
//! - `uuid`, `type`, `name` and `createdAt` always come from the pre-patch item.
//! - `updatedAt` advances on every successful patch.
//! - The result is stored only if the item still equals the copy the patch
//!   ran against, so `test` operations never pass against stale data.

mod merge;
mod structural;

pub use merge::MergePatch;
pub use structural::StructuralPatch;

use crate::context::OperationContext;
use crate::model::item::{Attributes, Item};
use crate::repo::item_repo::{ItemRepository, RepoError};
use chrono::{DateTime, Utc};
use log::debug;
use serde_json::Value;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Content type of RFC 6902 structural patches.
pub const CONTENT_TYPE_JSON_PATCH: &str = "application/json-patch+json";
/// Content type of RFC 7396 merge patches.
pub const CONTENT_TYPE_MERGE_PATCH: &str = "application/merge-patch+json";

/// Capability tag selecting a patch algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PatchKind {
    /// Ordered edit operations (RFC 6902).
    Structural,
    /// Recursive merge where `null` deletes (RFC 7396).
    Merge,
}

impl PatchKind {
    pub fn content_type(self) -> &'static str {
        match self {
            Self::Structural => CONTENT_TYPE_JSON_PATCH,
            Self::Merge => CONTENT_TYPE_MERGE_PATCH,
        }
    }

    /// Parses a `Content-Type` header value, ignoring media type parameters.
    pub fn from_content_type(value: &str) -> Result<Self, PatchError> {
        let media_type = value
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        match media_type.as_str() {
            CONTENT_TYPE_JSON_PATCH => Ok(Self::Structural),
            CONTENT_TYPE_MERGE_PATCH => Ok(Self::Merge),
            _ => Err(PatchError::UnsupportedContentType(value.trim().to_string())),
        }
    }
}

impl Display for PatchKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.content_type())
    }
}

/// One patch algorithm applied in place to a JSON document.
pub trait PatchStrategy: Send + Sync {
    fn kind(&self) -> PatchKind;
    fn apply(&self, target: &mut Value, document: &Value) -> Result<(), PatchError>;
}

/// Patch parsing and application errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchError {
    UnsupportedContentType(String),
    /// No strategy is registered for the requested kind.
    UnregisteredKind(PatchKind),
    MalformedDocument(String),
    OperationFailed(String),
    /// The patched document is no longer a JSON object.
    NotAnObject,
    Serialization(String),
}

impl Display for PatchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedContentType(value) => write!(
                f,
                "unsupported patch content type `{value}`; expected {CONTENT_TYPE_JSON_PATCH} or {CONTENT_TYPE_MERGE_PATCH}"
            ),
            Self::UnregisteredKind(kind) => write!(f, "no patch strategy registered for {kind}"),
            Self::MalformedDocument(message) => write!(f, "malformed patch document: {message}"),
            Self::OperationFailed(message) => write!(f, "patch operation failed: {message}"),
            Self::NotAnObject => write!(f, "patched item is not a JSON object"),
            Self::Serialization(message) => write!(f, "item serialization failed: {message}"),
        }
    }
}

impl Error for PatchError {}

/// Failure of a patch-then-replace round.
#[derive(Debug)]
pub enum ReconcileError {
    Patch(PatchError),
    Repo(RepoError),
}

impl Display for ReconcileError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Patch(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ReconcileError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Patch(err) => Some(err),
            Self::Repo(err) => Some(err),
        }
    }
}

impl From<PatchError> for ReconcileError {
    fn from(value: PatchError) -> Self {
        Self::Patch(value)
    }
}

impl From<RepoError> for ReconcileError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Registry of patch strategies keyed by `PatchKind`.
pub struct PatchReconciler {
    strategies: BTreeMap<PatchKind, Box<dyn PatchStrategy>>,
}

impl Default for PatchReconciler {
    /// Reconciler with the structural and merge strategies registered.
    fn default() -> Self {
        let mut reconciler = Self::empty();
        reconciler.register(Box::new(StructuralPatch));
        reconciler.register(Box::new(MergePatch));
        reconciler
    }
}

impl PatchReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reconciler without any strategy; every kind is rejected until registered.
    pub fn empty() -> Self {
        Self {
            strategies: BTreeMap::new(),
        }
    }

    /// Registers `strategy` under its own kind, returning the one it replaced.
    pub fn register(&mut self, strategy: Box<dyn PatchStrategy>) -> Option<Box<dyn PatchStrategy>> {
        self.strategies.insert(strategy.kind(), strategy)
    }

    pub fn supports(&self, kind: PatchKind) -> bool {
        self.strategies.contains_key(&kind)
    }

    /// Computes the post-patch state of `current` without touching storage.
    ///
    /// # Contract
    /// - The patch sees the full item, reserved fields included.
    /// - Reserved-field edits are discarded; attributes come from the patch result.
    /// - `updated_at` becomes `now` unless that would move it backwards.
    pub fn reconcile(
        &self,
        current: &Item,
        kind: PatchKind,
        document: &Value,
        now: DateTime<Utc>,
    ) -> Result<Item, PatchError> {
        let strategy = self
            .strategies
            .get(&kind)
            .ok_or(PatchError::UnregisteredKind(kind))?;

        let mut target = current
            .to_value()
            .map_err(|err| PatchError::Serialization(err.to_string()))?;
        strategy.apply(&mut target, document)?;

        let Value::Object(object) = target else {
            return Err(PatchError::NotAnObject);
        };

        let mut patched = current.clone();
        patched.attributes = Attributes::from_map(object);
        patched.touch(now);
        Ok(patched)
    }

    /// Reconciles `current` with `document` and stores the result.
    ///
    /// Returns the stored item. Patch failures are returned before the
    /// repository is called; a write that lands after `current` was read
    /// fails the round with `RepoError::Stale`.
    pub fn apply<R: ItemRepository + ?Sized>(
        &self,
        repo: &R,
        ctx: &OperationContext,
        current: &Item,
        kind: PatchKind,
        document: &Value,
    ) -> Result<Item, ReconcileError> {
        let patched = self.reconcile(current, kind, document, Utc::now())?;
        repo.replace_if_unchanged(ctx, current, &patched)?;

        debug!(
            "event=item_patch module=patch status=ok kind={} type={} id={}",
            kind, patched.kind, patched.id
        );
        Ok(patched)
    }
}
