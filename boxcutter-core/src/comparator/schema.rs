//! Discovery source the comparator consults to resolve list merge keys.
use kube::core::GroupVersionKind;

/// Supplies OpenAPI-schema-derived facts the comparator needs to walk
/// lists-by-key instead of treating them as opaque blobs.
///
/// Boxcutter ships [`NoSchema`], which always falls back to the "best
/// effort" structural diff described in spec.md §4.1's edge cases. A
/// consumer with access to a discovery client can implement this trait to
/// get fully granular per-list-item diffs.
pub trait SchemaSource: Send + Sync {
    /// The merge key for the list at `json_pointer` (a dotted path like
    /// `.spec.containers`) within `gvk`'s schema, if that list is merged by
    /// key rather than treated atomically.
    fn merge_key_for_list(&self, gvk: &GroupVersionKind, json_pointer: &str) -> Option<String>;

    /// Whether this source has authoritative schema data. `false` marks
    /// every [`super::CompareReport`] produced with it as `best_effort`.
    fn is_authoritative(&self) -> bool {
        true
    }
}

/// Default [`SchemaSource`]: no schema available, every list is atomic.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSchema;

impl SchemaSource for NoSchema {
    fn merge_key_for_list(&self, _gvk: &GroupVersionKind, _json_pointer: &str) -> Option<String> {
        None
    }

    fn is_authoritative(&self) -> bool {
        false
    }
}
