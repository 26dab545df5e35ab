//! Per-object server-side apply with divergence detection, field-manager
//! collision analysis, and probe evaluation (spec.md §4.2).
use std::collections::BTreeMap;
use std::sync::Arc;

use boxcutter_core::comparator::{Comparator, NoSchema, SchemaSource};
use boxcutter_core::{
    Action, AnnotationRevisionMetadata, CollisionProtection, Object, ObjectRef, ObjectResult,
    Probe, ProbeOutcome, ResolvedOptions, RevisionMetadata,
};
use kube::core::GroupVersionKind;

use crate::client::{Reader, Writer};
use crate::error::Error;

/// Reconciles and tears down a single object for a given (owner, revision).
pub struct ObjectEngine {
    field_manager: String,
    metadata: Arc<dyn RevisionMetadata>,
    schema: Arc<dyn SchemaSource>,
}

impl ObjectEngine {
    /// Build an engine stamping ownership under `system_prefix` and
    /// attributing writes to `field_manager`, with no schema source (every
    /// comparison is best-effort).
    pub fn new(field_manager: impl Into<String>, system_prefix: impl Into<String>) -> Self {
        Self {
            field_manager: field_manager.into(),
            metadata: Arc::new(AnnotationRevisionMetadata::new(system_prefix)),
            schema: Arc::new(NoSchema),
        }
    }

    /// Build an engine with an explicit metadata scheme and schema source.
    pub fn with_capabilities(field_manager: impl Into<String>, metadata: Arc<dyn RevisionMetadata>, schema: Arc<dyn SchemaSource>) -> Self {
        Self {
            field_manager: field_manager.into(),
            metadata,
            schema,
        }
    }

    /// Reconcile `object` on behalf of `(owner_uid, revision_number)`
    /// against the cluster reached through `reader`/`writer`.
    #[tracing::instrument(level = "debug", skip_all, fields(object.ref = %object.object_ref(), owner = owner_uid, revision = revision_number))]
    pub async fn reconcile(
        &self,
        reader: &dyn Reader,
        writer: &dyn Writer,
        owner_uid: &str,
        revision_number: i64,
        object: &Object,
        options: &ResolvedOptions,
    ) -> Result<ObjectResult, Error> {
        let object_ref = object.object_ref();
        let gvk = gvk_of(&object_ref);

        let mut desired = object.dynamic.clone();
        self.metadata.stamp_ownership(&mut desired, owner_uid, revision_number);

        let live = reader.get(&gvk, object_ref.namespace.as_deref(), &object_ref.name).await?;

        let Some(live) = live else {
            if options.paused {
                tracing::info!(target: "boxcutter::object", "paused: would create");
                return Ok(ObjectResult {
                    object_ref,
                    action: Action::Created,
                    probes: BTreeMap::new(),
                    compare: Default::default(),
                    paused: true,
                });
            }
            let applied = writer.apply(&gvk, &self.field_manager, &desired).await?;
            tracing::info!(target: "boxcutter::object", "created");
            let probes = self.run_probes(&object.options.probes, &applied);
            return Ok(ObjectResult {
                object_ref,
                action: Action::Created,
                probes,
                compare: Default::default(),
                paused: false,
            });
        };

        let foreign_owner = self.metadata.read_owner_uid(&live).filter(|owner| owner != owner_uid);
        if let Some(foreign_owner) = foreign_owner {
            let adopted = options.previous_owners.iter().any(|p| p == &foreign_owner);
            if !adopted {
                match options.collision_protection {
                    CollisionProtection::Prevent => {
                        tracing::info!(target: "boxcutter::object", foreign_owner, "collision: refusing to touch foreign object");
                        return Ok(ObjectResult {
                            object_ref,
                            action: Action::Collision,
                            probes: BTreeMap::new(),
                            compare: Default::default(),
                            paused: options.paused,
                        });
                    }
                    CollisionProtection::IfNoController => {
                        if has_controller_owner(&live) {
                            tracing::info!(target: "boxcutter::object", foreign_owner, "collision: foreign controller owner present");
                            return Ok(ObjectResult {
                                object_ref,
                                action: Action::Collision,
                                probes: BTreeMap::new(),
                                compare: Default::default(),
                                paused: options.paused,
                            });
                        }
                    }
                    CollisionProtection::None => {}
                }
            }
        }

        let comparator = Comparator::new(self.field_manager.clone(), self.schema.clone());
        let compare = comparator.compare(&gvk, &desired, &live);

        if compare.is_noop() && compare.conflicts.is_empty() {
            tracing::debug!(target: "boxcutter::object", "idle");
            let probes = self.run_probes(&object.options.probes, &live);
            return Ok(ObjectResult {
                object_ref,
                action: Action::Idle,
                probes,
                compare,
                paused: options.paused,
            });
        }

        if options.paused {
            tracing::info!(target: "boxcutter::object", "paused: would update");
            let probes = self.run_probes(&object.options.probes, &live);
            return Ok(ObjectResult {
                object_ref,
                action: Action::Updated,
                probes,
                compare,
                paused: true,
            });
        }

        let applied = writer.apply(&gvk, &self.field_manager, &desired).await?;
        tracing::info!(target: "boxcutter::object", "updated");
        let probes = self.run_probes(&object.options.probes, &applied);
        Ok(ObjectResult {
            object_ref,
            action: Action::Updated,
            probes,
            compare,
            paused: false,
        })
    }

    /// Tear down `object` on behalf of `(owner_uid, revision_number)`.
    /// Returns `true` once the object is confirmed gone (or never belonged
    /// to this owner to begin with).
    #[tracing::instrument(level = "debug", skip_all, fields(object.ref = %object.object_ref(), owner = owner_uid))]
    pub async fn teardown(
        &self,
        reader: &dyn Reader,
        writer: &dyn Writer,
        owner_uid: &str,
        object: &Object,
    ) -> Result<bool, Error> {
        let object_ref = object.object_ref();
        let gvk = gvk_of(&object_ref);

        let Some(live) = reader.get(&gvk, object_ref.namespace.as_deref(), &object_ref.name).await? else {
            return Ok(true);
        };

        let owned_by_us = self.metadata.read_owner_uid(&live).as_deref() == Some(owner_uid);
        if !owned_by_us {
            tracing::debug!(target: "boxcutter::object", "teardown no-op: not owned by this revision");
            return Ok(true);
        }

        writer.delete(&gvk, object_ref.namespace.as_deref(), &object_ref.name).await?;
        tracing::info!(target: "boxcutter::object", "delete issued");
        Ok(false)
    }

    fn run_probes(&self, probes: &[Arc<dyn Probe>], live: &kube::core::DynamicObject) -> BTreeMap<String, ProbeOutcome> {
        probes
            .iter()
            .map(|probe| {
                let kind = probe.kind().to_string();
                let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| probe.evaluate(live)))
                    .unwrap_or_else(|panic| {
                        let message = panic_message(&panic);
                        tracing::warn!(target: "boxcutter::object", probe = kind, message, "probe panicked, downgrading to Unknown");
                        ProbeOutcome::unknown(message)
                    });
                (kind, outcome)
            })
            .collect()
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "probe panicked with a non-string payload".to_string()
    }
}

fn gvk_of(object_ref: &ObjectRef) -> GroupVersionKind {
    GroupVersionKind::gvk(&object_ref.group, &object_ref.version, &object_ref.kind)
}

fn has_controller_owner(live: &kube::core::DynamicObject) -> bool {
    live.metadata
        .owner_references
        .as_ref()
        .is_some_and(|refs| refs.iter().any(|r| r.controller == Some(true)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::fake::FakeCluster;
    use boxcutter_core::{ObjectOptions, PROGRESS_PROBE};
    use kube::core::{DynamicObject, ObjectMeta, TypeMeta};
    use serde_json::json;

    fn cm(name: &str, data: serde_json::Value) -> Object {
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
            data,
        })
    }

    struct ReadyWhenFlagged;
    impl Probe for ReadyWhenFlagged {
        fn kind(&self) -> &str {
            PROGRESS_PROBE
        }
        fn evaluate(&self, live: &DynamicObject) -> ProbeOutcome {
            if live.data.get("data").and_then(|d| d.get("ready")).and_then(|v| v.as_str()) == Some("yes") {
                ProbeOutcome::ready()
            } else {
                ProbeOutcome::not_ready("waiting")
            }
        }
    }

    #[tokio::test]
    async fn creates_absent_object() {
        let engine = ObjectEngine::new("boxcutter", "boxcutter.example.com");
        let cluster = FakeCluster::new();
        let object = cm("a", json!({"data": {}}));
        let result = engine
            .reconcile(&cluster, &cluster, "owner-1", 1, &object, &ResolvedOptions::default())
            .await
            .unwrap();
        assert_eq!(result.action, Action::Created);
        assert_eq!(cluster.apply_count(), 1);
    }

    #[tokio::test]
    async fn second_reconcile_with_no_changes_is_idle_and_does_not_write() {
        let engine = ObjectEngine::new("boxcutter", "boxcutter.example.com");
        let cluster = FakeCluster::new();
        let object = cm("a", json!({"data": {}}));
        engine
            .reconcile(&cluster, &cluster, "owner-1", 1, &object, &ResolvedOptions::default())
            .await
            .unwrap();
        let result = engine
            .reconcile(&cluster, &cluster, "owner-1", 1, &object, &ResolvedOptions::default())
            .await
            .unwrap();
        assert_eq!(result.action, Action::Idle);
        assert_eq!(cluster.apply_count(), 1);
    }

    #[tokio::test]
    async fn collision_with_foreign_owner_is_prevented_by_default() {
        let engine = ObjectEngine::new("boxcutter", "boxcutter.example.com");
        let cluster = FakeCluster::new();
        let gvk = GroupVersionKind::gvk("", "v1", "ConfigMap");
        let mut foreign = cm("x", json!({})).dynamic;
        AnnotationRevisionMetadata::new("boxcutter.example.com").stamp_ownership(&mut foreign, "other", 1);
        cluster.seed(gvk, foreign);

        let object = cm("x", json!({"data": {"k": "v"}}));
        let result = engine
            .reconcile(&cluster, &cluster, "owner-1", 1, &object, &ResolvedOptions::default())
            .await
            .unwrap();
        assert_eq!(result.action, Action::Collision);
        assert_eq!(cluster.apply_count(), 0);
    }

    #[tokio::test]
    async fn previous_owners_adopts_without_collision() {
        let engine = ObjectEngine::new("boxcutter", "boxcutter.example.com");
        let cluster = FakeCluster::new();
        let gvk = GroupVersionKind::gvk("", "v1", "ConfigMap");
        let mut foreign = cm("x", json!({})).dynamic;
        AnnotationRevisionMetadata::new("boxcutter.example.com").stamp_ownership(&mut foreign, "other", 1);
        cluster.seed(gvk, foreign);

        let object = cm("x", json!({"data": {"k": "v"}}));
        let options = ResolvedOptions {
            previous_owners: vec!["other".to_string()],
            ..Default::default()
        };
        let result = engine.reconcile(&cluster, &cluster, "owner-1", 1, &object, &options).await.unwrap();
        assert_eq!(result.action, Action::Updated);
    }

    #[tokio::test]
    async fn progress_probe_gates_completeness() {
        let engine = ObjectEngine::new("boxcutter", "boxcutter.example.com");
        let cluster = FakeCluster::new();
        let object = cm("a", json!({"data": {}})).with_options(ObjectOptions::default().with_probe(Arc::new(ReadyWhenFlagged)));
        let result = engine
            .reconcile(&cluster, &cluster, "owner-1", 1, &object, &ResolvedOptions::default())
            .await
            .unwrap();
        assert!(!result.is_progressed());
    }

    #[tokio::test]
    async fn teardown_is_idempotent_without_finalizers() {
        let engine = ObjectEngine::new("boxcutter", "boxcutter.example.com");
        let cluster = FakeCluster::new();
        let object = cm("a", json!({"data": {}}));
        engine
            .reconcile(&cluster, &cluster, "owner-1", 1, &object, &ResolvedOptions::default())
            .await
            .unwrap();
        assert!(!engine.teardown(&cluster, &cluster, "owner-1", &object).await.unwrap());
        assert!(engine.teardown(&cluster, &cluster, "owner-1", &object).await.unwrap());
    }
}
