//! RFC 7396 merge patch strategy.

use super::{PatchError, PatchKind, PatchStrategy};
use serde_json::Value;

/// Recursively merges a partial document; `null` values delete keys.
#[derive(Debug, Clone, Copy, Default)]
pub struct MergePatch;

impl PatchStrategy for MergePatch {
    fn kind(&self) -> PatchKind {
        PatchKind::Merge
    }

    fn apply(&self, target: &mut Value, document: &Value) -> Result<(), PatchError> {
        json_patch::merge(target, document);
        Ok(())
    }
}
