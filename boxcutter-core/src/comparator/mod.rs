//! Field-level diff of a desired object against the live object, driven by
//! the cluster's server-side-apply managed-fields metadata (spec.md §4.1).
mod report;
mod schema;

pub use report::{CompareReport, ConflictEntry, OtherEntry};
pub use schema::{NoSchema, SchemaSource};

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ManagedFieldsEntry;
use kube::core::{DynamicObject, GroupVersionKind};
use serde_json::Value;

/// Compares desired objects against live objects using the apiserver's
/// managed-fields table.
pub struct Comparator {
    field_manager: String,
    schema: Arc<dyn SchemaSource>,
}

impl Comparator {
    /// Build a comparator for `field_manager`, falling back to structural
    /// diff via [`NoSchema`] when no schema source is supplied.
    pub fn new(field_manager: impl Into<String>, schema: Arc<dyn SchemaSource>) -> Self {
        Self {
            field_manager: field_manager.into(),
            schema,
        }
    }

    /// Build a comparator with no schema access.
    pub fn without_schema(field_manager: impl Into<String>) -> Self {
        Self::new(field_manager, Arc::new(NoSchema))
    }

    /// Compare `desired` against `live`, both belonging to `gvk`.
    pub fn compare(&self, gvk: &GroupVersionKind, desired: &DynamicObject, live: &DynamicObject) -> CompareReport {
        let managed_fields = live.metadata.managed_fields.clone().unwrap_or_default();

        let our_owned_paths = self.owned_paths(&managed_fields, &self.field_manager);
        let other_ownership = self.other_ownership(&managed_fields, &self.field_manager);

        let desired_leaves = flatten_value(&desired.data, gvk, self.schema.as_ref());
        let live_leaves = flatten_value(&live.data, gvk, self.schema.as_ref());

        let mut added = Vec::new();
        let mut modified = Vec::new();
        let mut other = Vec::new();
        let mut conflicts = Vec::new();

        let mut desired_paths: Vec<&String> = desired_leaves.keys().collect();
        desired_paths.sort();

        for path in desired_paths {
            let desired_value = &desired_leaves[path];
            if let Some(manager) = other_ownership.get(path) {
                let live_value = live_leaves.get(path);
                if live_value != Some(desired_value) {
                    conflicts.push(ConflictEntry {
                        path: path.clone(),
                        manager: manager.clone(),
                    });
                } else {
                    other.push(OtherEntry {
                        path: path.clone(),
                        manager: manager.clone(),
                    });
                }
                continue;
            }

            if our_owned_paths.contains(path) {
                if live_leaves.get(path) != Some(desired_value) {
                    modified.push(path.clone());
                }
            } else {
                added.push(path.clone());
            }
        }

        let mut removed: Vec<String> = our_owned_paths
            .iter()
            .filter(|p| !desired_leaves.contains_key(*p))
            .cloned()
            .collect();
        removed.sort();
        added.sort();
        modified.sort();

        CompareReport {
            added,
            modified,
            removed,
            other,
            conflicts,
            best_effort: !self.schema.is_authoritative(),
        }
    }

    fn owned_paths(&self, managed_fields: &[ManagedFieldsEntry], manager: &str) -> HashSet<String> {
        let mut out = HashSet::new();
        for entry in managed_fields {
            if entry.manager.as_deref() != Some(manager) {
                continue;
            }
            if let Some(fields) = &entry.fields_v1 {
                flatten_fields_v1(&fields.0, "", &mut out);
            }
        }
        out
    }

    fn other_ownership(&self, managed_fields: &[ManagedFieldsEntry], our_manager: &str) -> HashMap<String, String> {
        let mut entries: Vec<&ManagedFieldsEntry> = managed_fields
            .iter()
            .filter(|e| e.manager.as_deref() != Some(our_manager) && e.manager.is_some())
            .collect();
        // Deterministic fold order so that a path claimed by two managers
        // (invalid in a real cluster, but not impossible in test fixtures)
        // always resolves to the alphabetically first manager.
        entries.sort_by(|a, b| a.manager.cmp(&b.manager));

        let mut out = HashMap::new();
        for entry in entries.into_iter().rev() {
            let manager = entry.manager.clone().unwrap_or_default();
            if let Some(fields) = &entry.fields_v1 {
                let mut paths = HashSet::new();
                flatten_fields_v1(&fields.0, "", &mut paths);
                for path in paths {
                    out.insert(path, manager.clone());
                }
            }
        }
        out
    }
}

/// Flatten a desired/live payload into leaf path -> value pairs.
///
/// Objects recurse key by key; arrays are treated atomically (a single leaf
/// at the array's own path) unless `schema` names a merge key for that
/// exact pointer, in which case each element is addressed by
/// `<path>[<key>=<value>]`. An array whose elements don't carry the merge
/// key falls back to atomic treatment.
fn flatten_value(value: &Value, gvk: &GroupVersionKind, schema: &dyn SchemaSource) -> HashMap<String, Value> {
    let mut out = HashMap::new();
    flatten_value_into(value, "", gvk, schema, &mut out);
    out
}

fn flatten_value_into(value: &Value, prefix: &str, gvk: &GroupVersionKind, schema: &dyn SchemaSource, out: &mut HashMap<String, Value>) {
    match value {
        Value::Object(map) if !map.is_empty() => {
            for (key, sub) in map {
                flatten_value_into(sub, &format!("{prefix}.{key}"), gvk, schema, out);
            }
        }
        Value::Array(items) => {
            if let Some(key) = schema.merge_key_for_list(gvk, prefix) {
                if items.iter().all(|item| item.get(&key).is_some()) {
                    for item in items {
                        let key_value = item.get(&key).expect("checked above");
                        let sub_prefix = format!("{prefix}[{key}={key_value}]");
                        flatten_value_into(item, &sub_prefix, gvk, schema, out);
                    }
                    return;
                }
            }
            out.insert(prefix.to_string(), value.clone());
        }
        _ => {
            out.insert(prefix.to_string(), value.clone());
        }
    }
}

/// Flatten a `FieldsV1` document into the paths it attributes ownership of,
/// using the same path format [`flatten_value`] produces.
///
/// List-element markers (`k:`/`v:`/`i:`) collapse to their enclosing array's
/// path: boxcutter does not currently reconstruct per-element ownership from
/// managed fields alone (that needs the same merge-key schema knowledge
/// `flatten_value` consults), so a keyed list is reported as a single
/// atomic path, consistent with the "best effort" fallback.
fn flatten_fields_v1(value: &Value, prefix: &str, out: &mut HashSet<String>) {
    let Value::Object(map) = value else {
        out.insert(prefix.to_string());
        return;
    };
    if map.is_empty() {
        out.insert(prefix.to_string());
        return;
    }
    for (key, sub) in map {
        if key == "." {
            out.insert(prefix.to_string());
        } else if let Some(rest) = key.strip_prefix("f:") {
            flatten_fields_v1(sub, &format!("{prefix}.{rest}"), out);
        } else if key.starts_with("k:") || key.starts_with("v:") || key.starts_with("i:") {
            out.insert(prefix.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::{FieldsV1, ObjectMeta};
    use kube::core::TypeMeta;
    use serde_json::json;

    fn gvk() -> GroupVersionKind {
        GroupVersionKind::gvk("apps", "v1", "Deployment")
    }

    fn obj(data: Value, managed_fields: Option<Vec<ManagedFieldsEntry>>) -> DynamicObject {
        DynamicObject {
            types: Some(TypeMeta {
                api_version: "apps/v1".into(),
                kind: "Deployment".into(),
            }),
            metadata: ObjectMeta {
                name: Some("web".into()),
                managed_fields,
                ..Default::default()
            },
            data,
        }
    }

    fn entry(manager: &str, fields: Value) -> ManagedFieldsEntry {
        ManagedFieldsEntry {
            manager: Some(manager.to_string()),
            operation: Some("Apply".into()),
            fields_v1: Some(FieldsV1(fields)),
            ..Default::default()
        }
    }

    #[test]
    fn missing_managed_fields_makes_everything_added() {
        let comparator = Comparator::without_schema("boxcutter");
        let desired = obj(json!({"spec": {"replicas": 3}}), None);
        let live = obj(json!({"spec": {"replicas": 1}}), None);
        let report = comparator.compare(&gvk(), &desired, &live);
        assert_eq!(report.added, vec![".spec.replicas".to_string()]);
        assert!(report.modified.is_empty());
        assert!(report.conflicts.is_empty());
    }

    #[test]
    fn detects_conflict_with_other_manager() {
        let comparator = Comparator::without_schema("boxcutter");
        let other_fields = entry("other-controller", json!({"f:spec": {"f:replicas": {}}}));
        let desired = obj(json!({"spec": {"replicas": 3}}), None);
        let live = obj(json!({"spec": {"replicas": 1}}), Some(vec![other_fields]));
        let report = comparator.compare(&gvk(), &desired, &live);
        assert_eq!(report.conflicts, vec![ConflictEntry {
            path: ".spec.replicas".into(),
            manager: "other-controller".into(),
        }]);
    }

    #[test]
    fn agreeing_other_manager_is_not_a_conflict() {
        let comparator = Comparator::without_schema("boxcutter");
        let other_fields = entry("other-controller", json!({"f:spec": {"f:replicas": {}}}));
        let desired = obj(json!({"spec": {"replicas": 3}}), None);
        let live = obj(json!({"spec": {"replicas": 3}}), Some(vec![other_fields]));
        let report = comparator.compare(&gvk(), &desired, &live);
        assert!(report.conflicts.is_empty());
        assert_eq!(report.other, vec![OtherEntry {
            path: ".spec.replicas".into(),
            manager: "other-controller".into(),
        }]);
    }

    #[test]
    fn detects_our_field_removed_from_desired() {
        let comparator = Comparator::without_schema("boxcutter");
        let ours = entry("boxcutter", json!({"f:spec": {"f:replicas": {}, "f:paused": {}}}));
        let desired = obj(json!({"spec": {"replicas": 3}}), None);
        let live = obj(json!({"spec": {"replicas": 3, "paused": true}}), Some(vec![ours]));
        let report = comparator.compare(&gvk(), &desired, &live);
        assert_eq!(report.removed, vec![".spec.paused".to_string()]);
        assert!(report.modified.is_empty());
    }

    #[test]
    fn report_is_deterministic_across_key_order() {
        let comparator = Comparator::without_schema("boxcutter");
        let desired_a = obj(json!({"spec": {"a": 1, "b": 2}}), None);
        let desired_b = obj(json!({"spec": {"b": 2, "a": 1}}), None);
        let live = obj(json!({}), None);
        let report_a = comparator.compare(&gvk(), &desired_a, &live).to_string();
        let report_b = comparator.compare(&gvk(), &desired_b, &live).to_string();
        assert_eq!(report_a, report_b);
    }

    #[test]
    fn best_effort_flag_reflects_schema_authority() {
        let comparator = Comparator::without_schema("boxcutter");
        let report = comparator.compare(&gvk(), &obj(json!({}), None), &obj(json!({}), None));
        assert!(report.best_effort);
    }
}
