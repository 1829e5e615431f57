//! RFC 6902 structural patch strategy.

use super::{PatchError, PatchKind, PatchStrategy};
use json_patch::Patch;
use serde_json::Value;

/// Applies an ordered list of `add/remove/replace/move/copy/test` operations.
///
/// Any failing operation fails the whole patch.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuralPatch;

impl PatchStrategy for StructuralPatch {
    fn kind(&self) -> PatchKind {
        PatchKind::Structural
    }

    fn apply(&self, target: &mut Value, document: &Value) -> Result<(), PatchError> {
        let operations: Patch = serde_json::from_value(document.clone())
            .map_err(|err| PatchError::MalformedDocument(err.to_string()))?;

        json_patch::patch(target, &operations.0)
            .map_err(|err| PatchError::OperationFailed(err.to_string()))
    }
}
