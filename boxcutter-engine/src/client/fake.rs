//! In-memory `Reader`/`Writer` test double, the engine's equivalent of
//! `kube-runtime`'s `reflector::test_utils` fakes.
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use kube::core::{DynamicObject, GroupVersionKind};

use super::{Reader, Writer};

type Key = (GroupVersionKind, Option<String>, String);

fn key_of(gvk: &GroupVersionKind, namespace: Option<&str>, name: &str) -> Key {
    (gvk.clone(), namespace.map(str::to_string), name.to_string())
}

fn finalizers_empty(obj: &DynamicObject) -> bool {
    !obj.metadata.finalizers.as_ref().is_some_and(|f| !f.is_empty())
}

/// A `HashMap`-backed cluster stand-in. Not thread-contended in practice
/// (engine tests drive it from a single task), `Mutex` only to satisfy
/// `Sync` for the trait objects the engine holds it behind.
///
/// `pending_deletion` stands in for the apiserver's real `deletionTimestamp`
/// bookkeeping: `delete` on an object that still carries finalizers marks it
/// here instead of removing it, and `get` reaps a marked object once its
/// finalizers have been drained, the same two-step lifecycle spec.md §3
/// describes ("removed during teardown after finalizers drain").
#[derive(Default)]
pub struct FakeCluster {
    objects: Mutex<HashMap<Key, DynamicObject>>,
    pending_deletion: Mutex<HashSet<Key>>,
    pub apply_count: Mutex<u32>,
}

impl FakeCluster {
    /// Build an empty cluster.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the cluster with an object, bypassing apply semantics — used to
    /// set up fixtures for collision/adoption tests.
    pub fn seed(&self, gvk: GroupVersionKind, obj: DynamicObject) {
        let namespace = obj.metadata.namespace.clone();
        let name = obj.metadata.name.clone().expect("seeded object must carry metadata.name");
        self.objects.lock().unwrap().insert(key_of(&gvk, namespace.as_deref(), &name), obj);
    }

    /// Number of `apply` calls observed so far, for "no writes happened"
    /// idempotence assertions.
    pub fn apply_count(&self) -> u32 {
        *self.apply_count.lock().unwrap()
    }
}

#[async_trait]
impl Reader for FakeCluster {
    async fn get(&self, gvk: &GroupVersionKind, namespace: Option<&str>, name: &str) -> Result<Option<DynamicObject>, kube::Error> {
        let key = key_of(gvk, namespace, name);
        let mut objects = self.objects.lock().unwrap();
        let Some(obj) = objects.get(&key) else {
            return Ok(None);
        };

        let mut pending = self.pending_deletion.lock().unwrap();
        if pending.contains(&key) && finalizers_empty(obj) {
            pending.remove(&key);
            objects.remove(&key);
            return Ok(None);
        }

        Ok(objects.get(&key).cloned())
    }
}

#[async_trait]
impl Writer for FakeCluster {
    async fn apply(&self, gvk: &GroupVersionKind, field_manager: &str, desired: &DynamicObject) -> Result<DynamicObject, kube::Error> {
        *self.apply_count.lock().unwrap() += 1;
        let namespace = desired.metadata.namespace.clone();
        let name = desired.metadata.name.clone().expect("desired object must carry metadata.name");
        let mut applied = desired.clone();
        stamp_field_manager(&mut applied, field_manager);
        self.objects
            .lock()
            .unwrap()
            .insert(key_of(gvk, namespace.as_deref(), &name), applied.clone());
        Ok(applied)
    }

    async fn delete(&self, gvk: &GroupVersionKind, namespace: Option<&str>, name: &str) -> Result<(), kube::Error> {
        let key = key_of(gvk, namespace, name);
        let mut objects = self.objects.lock().unwrap();
        let Some(obj) = objects.get(&key) else {
            return Ok(());
        };

        if finalizers_empty(obj) {
            objects.remove(&key);
        } else {
            self.pending_deletion.lock().unwrap().insert(key);
        }
        Ok(())
    }
}

/// Record a managed-fields entry for `field_manager` covering every top-level
/// key in `obj.data`, the minimum needed for `Comparator` to treat the
/// applier as the owner of what it just wrote.
fn stamp_field_manager(obj: &mut DynamicObject, field_manager: &str) {
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::{FieldsV1, ManagedFieldsEntry};
    use serde_json::{json, Value};

    let mut fields = serde_json::Map::new();
    if let Value::Object(top) = &obj.data {
        for key in top.keys() {
            fields.insert(format!("f:{key}"), json!({}));
        }
    }

    let entry = ManagedFieldsEntry {
        manager: Some(field_manager.to_string()),
        operation: Some("Apply".to_string()),
        fields_v1: Some(FieldsV1(Value::Object(fields))),
        ..Default::default()
    };

    let managed_fields = obj.metadata.managed_fields.get_or_insert_with(Vec::new);
    managed_fields.retain(|e| e.manager.as_deref() != Some(field_manager));
    managed_fields.push(entry);
}
