//! Revision-state annotations stamped onto every object boxcutter manages.
//!
//! Per the design note on the generic Revision/RevisionMetadata abstraction
//! (spec.md §9), annotation handling is exposed as a small capability trait
//! ([`RevisionMetadata`]) the engine holds, plus [`AnnotationRevisionMetadata`]
//! as the concrete default implementation.
use kube::core::DynamicObject;
use sha2::{Digest, Sha256};

/// Capability the engine uses to stamp and read back ownership state.
///
/// A consumer could swap this for a different scheme (e.g. labels instead of
/// annotations) without touching `ObjectEngine`.
pub trait RevisionMetadata: Send + Sync {
    /// Stamp `obj` with the owner/revision/hash markers for `owner_uid` and
    /// `revision_number`, computing the hash from `obj`'s current payload.
    fn stamp_ownership(&self, obj: &mut DynamicObject, owner_uid: &str, revision_number: i64);

    /// Read back the owner UID a live object was last stamped with, if any.
    fn read_owner_uid(&self, obj: &DynamicObject) -> Option<String>;

    /// Read back the revision number a live object was last stamped with.
    fn read_revision_number(&self, obj: &DynamicObject) -> Option<i64>;

    /// Whether `live` already carries `owner_uid`/`revision_number` and a
    /// hash matching `desired`'s current payload (i.e. nothing to apply).
    fn is_current(&self, desired: &DynamicObject, live: &DynamicObject, owner_uid: &str, revision_number: i64) -> bool;
}

/// Default [`RevisionMetadata`] using `<system_prefix>/owner|revision|hash` annotations.
#[derive(Debug, Clone)]
pub struct AnnotationRevisionMetadata {
    system_prefix: String,
}

impl AnnotationRevisionMetadata {
    /// `system_prefix` is used verbatim as the annotation key prefix, e.g.
    /// `boxcutter.package-operator.run` yields `boxcutter.package-operator.run/owner`.
    pub fn new(system_prefix: impl Into<String>) -> Self {
        Self {
            system_prefix: system_prefix.into(),
        }
    }

    fn owner_key(&self) -> String {
        format!("{}/owner", self.system_prefix)
    }

    fn revision_key(&self) -> String {
        format!("{}/revision", self.system_prefix)
    }

    fn hash_key(&self) -> String {
        format!("{}/hash", self.system_prefix)
    }
}

/// Hex-encoded SHA-256 of the canonicalized payload.
///
/// Canonicalization relies on `serde_json::Value::Object` being backed by a
/// `BTreeMap` (the `preserve_order` feature must stay disabled), which sorts
/// keys lexicographically on serialization regardless of insertion order.
pub fn hash_payload(value: &serde_json::Value) -> String {
    let canonical = serde_json::to_vec(value).expect("serde_json::Value always serializes");
    let digest = Sha256::digest(&canonical);
    hex_encode(&digest)
}

fn hex_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push_str(&format!("{b:02x}"));
    }
    out
}

impl RevisionMetadata for AnnotationRevisionMetadata {
    fn stamp_ownership(&self, obj: &mut DynamicObject, owner_uid: &str, revision_number: i64) {
        assert!(!owner_uid.is_empty(), "owner UID must not be empty");
        assert!(revision_number > 0, "revision number must be positive");
        let hash = hash_payload(&obj.data);
        let annotations = obj.metadata.annotations.get_or_insert_with(Default::default);
        annotations.insert(self.owner_key(), owner_uid.to_string());
        annotations.insert(self.revision_key(), revision_number.to_string());
        annotations.insert(self.hash_key(), hash);
    }

    fn read_owner_uid(&self, obj: &DynamicObject) -> Option<String> {
        obj.metadata.annotations.as_ref()?.get(&self.owner_key()).cloned()
    }

    fn read_revision_number(&self, obj: &DynamicObject) -> Option<i64> {
        obj.metadata
            .annotations
            .as_ref()?
            .get(&self.revision_key())?
            .parse()
            .ok()
    }

    fn is_current(&self, desired: &DynamicObject, live: &DynamicObject, owner_uid: &str, revision_number: i64) -> bool {
        let Some(annotations) = live.metadata.annotations.as_ref() else {
            return false;
        };
        let owner_matches = annotations.get(&self.owner_key()).map(String::as_str) == Some(owner_uid);
        let revision_matches = self.read_revision_number(live) == Some(revision_number);
        let hash_matches = annotations.get(&self.hash_key()).map(String::as_str)
            == Some(hash_payload(&desired.data).as_str());
        owner_matches && revision_matches && hash_matches
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::core::{DynamicObject, ObjectMeta};
    use serde_json::json;

    fn dummy(name: &str) -> DynamicObject {
        DynamicObject {
            types: None,
            metadata: ObjectMeta {
                name: Some(name.into()),
                ..Default::default()
            },
            data: json!({"spec": {"replicas": 3}}),
        }
    }

    #[test]
    fn hash_is_order_independent() {
        let a = json!({"a": 1, "b": 2});
        let b = json!({"b": 2, "a": 1});
        assert_eq!(hash_payload(&a), hash_payload(&b));
    }

    #[test]
    fn stamp_then_read_round_trips() {
        let meta = AnnotationRevisionMetadata::new("boxcutter.example.com");
        let mut obj = dummy("a");
        meta.stamp_ownership(&mut obj, "owner-1", 3);
        assert_eq!(meta.read_owner_uid(&obj).as_deref(), Some("owner-1"));
        assert_eq!(meta.read_revision_number(&obj), Some(3));
    }

    #[test]
    fn is_current_detects_payload_drift() {
        let meta = AnnotationRevisionMetadata::new("boxcutter.example.com");
        let mut desired = dummy("a");
        meta.stamp_ownership(&mut desired, "owner-1", 3);
        let live = desired.clone();
        assert!(meta.is_current(&desired, &live, "owner-1", 3));

        let mut drifted = desired.clone();
        drifted.data = json!({"spec": {"replicas": 4}});
        assert!(!meta.is_current(&drifted, &live, "owner-1", 3));
    }

    #[test]
    #[should_panic(expected = "owner UID")]
    fn stamp_rejects_empty_owner() {
        let meta = AnnotationRevisionMetadata::new("boxcutter.example.com");
        let mut obj = dummy("a");
        meta.stamp_ownership(&mut obj, "", 1);
    }
}
