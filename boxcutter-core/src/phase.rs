//! A named, ordered set of objects (spec.md §3 "Phase").
use std::collections::HashSet;

use crate::object::Object;
use crate::object_ref::ObjectRef;
use crate::options::PhaseOptions;

/// A named, ordered set of objects that must all reach `Progress=True`
/// before later phases start.
#[derive(Debug, Clone)]
pub struct Phase {
    /// Phase name; must be a DNS-1035 label when non-empty
    /// (see [`crate::naming::is_dns1035_label`]).
    pub name: String,
    /// Objects in application order. Reconcile walks this order forward,
    /// teardown walks it in reverse.
    pub objects: Vec<Object>,
    /// Options that apply to this phase and its objects unless overridden.
    pub options: PhaseOptions,
}

impl Phase {
    /// Construct an empty, unnamed phase.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            objects: Vec::new(),
            options: PhaseOptions::default(),
        }
    }

    /// Append an object in application order.
    pub fn with_object(mut self, object: Object) -> Self {
        self.objects.push(object);
        self
    }

    /// `ObjectRef`s that appear more than once in this phase.
    ///
    /// An empty result does not by itself prove the phase is valid: object
    /// names might still collide with GVKs that `object_ref()` panics to
    /// construct (missing apiVersion/kind), which `ObjectValidator` catches
    /// separately.
    pub fn duplicate_refs(&self) -> Vec<ObjectRef> {
        let mut seen = HashSet::new();
        let mut dupes = Vec::new();
        for obj in &self.objects {
            let obj_ref = obj.object_ref();
            if !seen.insert(obj_ref.clone()) && !dupes.contains(&obj_ref) {
                dupes.push(obj_ref);
            }
        }
        dupes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::core::{DynamicObject, ObjectMeta, TypeMeta};
    use serde_json::json;

    fn cm(name: &str) -> Object {
        Object::new(DynamicObject {
            types: Some(TypeMeta {
                api_version: "v1".into(),
                kind: "ConfigMap".into(),
            }),
            metadata: ObjectMeta {
                name: Some(name.into()),
                namespace: Some("ns".into()),
                ..Default::default()
            },
            data: json!({}),
        })
    }

    #[test]
    fn detects_duplicate_object_refs() {
        let phase = Phase::new("phase-1").with_object(cm("a")).with_object(cm("a")).with_object(cm("b"));
        let dupes = phase.duplicate_refs();
        assert_eq!(dupes.len(), 1);
        assert_eq!(dupes[0].name, "a");
    }

    #[test]
    fn unique_objects_report_no_duplicates() {
        let phase = Phase::new("phase-1").with_object(cm("a")).with_object(cm("b"));
        assert!(phase.duplicate_refs().is_empty());
    }
}
