//! Stable identity for a Kubernetes object.
use std::fmt::{self, Display};

use kube::core::DynamicObject;
use serde::{Deserialize, Serialize};

/// Group/version/kind/namespace/name identity of an object.
///
/// `ObjectRef` is a plain value type: results reference the objects they
/// describe by `ObjectRef`, never by holding on to the live object itself,
/// so that results stay trivially serializable and cheap to diff.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectRef {
    /// API group, empty string for the core group.
    pub group: String,
    /// API version, e.g. `v1`.
    pub version: String,
    /// Kind, e.g. `ConfigMap`.
    pub kind: String,
    /// Namespace, `None` for cluster-scoped objects.
    pub namespace: Option<String>,
    /// Object name.
    pub name: String,
}

impl ObjectRef {
    /// Build a reference from explicit coordinates.
    pub fn new(group: &str, version: &str, kind: &str, namespace: Option<&str>, name: &str) -> Self {
        Self {
            group: group.to_string(),
            version: version.to_string(),
            kind: kind.to_string(),
            namespace: namespace.map(str::to_string),
            name: name.to_string(),
        }
    }

    /// Derive a reference from a `DynamicObject`'s `TypeMeta` and `ObjectMeta`.
    ///
    /// Panics if `obj` has no `name` or no `types`: both are invariants of
    /// objects that have been stamped by [`crate::annotations`] or read back
    /// from the apiserver.
    pub fn from_dynamic(obj: &DynamicObject) -> Self {
        let types = obj
            .types
            .as_ref()
            .expect("DynamicObject used with boxcutter must carry apiVersion/kind");
        let name = obj
            .metadata
            .name
            .clone()
            .expect("DynamicObject used with boxcutter must carry metadata.name");
        let (group, version) = split_api_version(&types.api_version);
        Self {
            group,
            version,
            kind: types.kind.clone(),
            namespace: obj.metadata.namespace.clone(),
            name,
        }
    }

    /// Derive a reference from a `DynamicObject`, returning `None` instead of
    /// panicking when `types` or `metadata.name` is missing.
    ///
    /// Validators run against objects that haven't yet been proven
    /// well-formed, so they use this instead of [`Self::from_dynamic`].
    pub fn try_from_dynamic(obj: &DynamicObject) -> Option<Self> {
        let types = obj.types.as_ref()?;
        if types.kind.is_empty() || types.api_version.is_empty() {
            return None;
        }
        let name = obj.metadata.name.clone()?;
        let (group, version) = split_api_version(&types.api_version);
        Some(Self {
            group,
            version,
            kind: types.kind.clone(),
            namespace: obj.metadata.namespace.clone(),
            name,
        })
    }

    /// The `group/version` string, e.g. `apps/v1` or `v1` for the core group.
    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }
}

fn split_api_version(api_version: &str) -> (String, String) {
    match api_version.split_once('/') {
        Some((group, version)) => (group.to_string(), version.to_string()),
        None => (String::new(), api_version.to_string()),
    }
}

impl Display for ObjectRef {
    /// Deterministic stringification: `<kind>.<version>.<group>/<namespace>/<name>`,
    /// with the namespace segment omitted for cluster-scoped objects.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.kind, self.version, self.group)?;
        match &self.namespace {
            Some(ns) => write!(f, "/{ns}/{}", self.name),
            None => write!(f, "/{}", self.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_deterministic_and_stable() {
        let r = ObjectRef::new("apps", "v1", "Deployment", Some("team-a"), "web");
        assert_eq!(r.to_string(), "Deployment.v1.apps/team-a/web");
        let cluster = ObjectRef::new("", "v1", "Namespace", None, "team-a");
        assert_eq!(cluster.to_string(), "Namespace.v1./team-a");
    }

    #[test]
    fn try_from_dynamic_returns_none_for_incomplete_objects() {
        let incomplete = kube::core::DynamicObject {
            types: None,
            metadata: Default::default(),
            data: serde_json::json!({}),
        };
        assert!(ObjectRef::try_from_dynamic(&incomplete).is_none());
    }

    #[test]
    fn api_version_roundtrips_core_group() {
        let r = ObjectRef::new("", "v1", "ConfigMap", Some("ns"), "cm");
        assert_eq!(r.api_version(), "v1");
        let r2 = ObjectRef::new("apps", "v1", "Deployment", Some("ns"), "d");
        assert_eq!(r2.api_version(), "apps/v1");
    }
}
