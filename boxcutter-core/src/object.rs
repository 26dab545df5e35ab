//! The desired-object half of the data model (spec.md §3 "Object (desired)").
use kube::core::DynamicObject;

use crate::object_ref::ObjectRef;
use crate::options::ObjectOptions;

/// A single desired object: an untyped document plus the options that shape
/// how `ObjectEngine` reconciles it.
///
/// The payload stays string-keyed (a [`DynamicObject`]) all the way through
/// the engine; typing is only asserted at the Kubernetes schema boundary
/// (discovery), per the "Dynamic reflection on objects" design note.
#[derive(Debug, Clone)]
pub struct Object {
    /// The desired document, as it should be applied.
    pub dynamic: DynamicObject,
    /// Options registered for this object (probes, collision policy, ...).
    pub options: ObjectOptions,
}

impl Object {
    /// Wrap a bare [`DynamicObject`] with default options.
    pub fn new(dynamic: DynamicObject) -> Self {
        Self {
            dynamic,
            options: ObjectOptions::default(),
        }
    }

    /// Attach options, replacing any previously set.
    pub fn with_options(mut self, options: ObjectOptions) -> Self {
        self.options = options;
        self
    }

    /// This object's identity. Panics if `dynamic` lacks `apiVersion`/`kind`/`name`
    /// (see [`ObjectRef::from_dynamic`]).
    pub fn object_ref(&self) -> ObjectRef {
        ObjectRef::from_dynamic(&self.dynamic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::core::ObjectMeta;
    use kube::core::TypeMeta;
    use serde_json::json;

    #[test]
    fn object_ref_reflects_dynamic_identity() {
        let obj = Object::new(DynamicObject {
            types: Some(TypeMeta {
                api_version: "v1".into(),
                kind: "ConfigMap".into(),
            }),
            metadata: ObjectMeta {
                name: Some("cm".into()),
                namespace: Some("ns".into()),
                ..Default::default()
            },
            data: json!({}),
        });
        assert_eq!(obj.object_ref().to_string(), "ConfigMap.v1./ns/cm");
    }
}
