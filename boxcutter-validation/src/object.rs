//! Static and dry-run preflight checks for a single desired object
//! (spec.md §4.3 "ObjectValidator").
use boxcutter_core::{ObjectRef, PreflightReason, PreflightViolation};
use kube::core::{DynamicObject, GroupVersionKind};

use crate::classify::classify;
use crate::dry_run::DryRunApply;
use crate::scope::{NamespaceScopeResolver, NoOpScopeResolver};

/// Validates a single desired object before it is ever written.
pub struct ObjectValidator<S: NamespaceScopeResolver = NoOpScopeResolver> {
    scope_resolver: S,
}

impl Default for ObjectValidator<NoOpScopeResolver> {
    fn default() -> Self {
        Self {
            scope_resolver: NoOpScopeResolver,
        }
    }
}

impl<S: NamespaceScopeResolver> ObjectValidator<S> {
    /// Build a validator that consults `scope_resolver` for the
    /// namespace-scope check.
    pub fn new(scope_resolver: S) -> Self {
        Self { scope_resolver }
    }

    /// Cheap, local checks: required type fields, forbidden metadata fields,
    /// namespace-scope match.
    pub fn validate_static(&self, desired: &DynamicObject) -> Vec<PreflightViolation> {
        let mut violations = Vec::new();
        let object_ref = ObjectRef::try_from_dynamic(desired);

        let types = desired.types.as_ref();
        let kind_present = types.is_some_and(|t| !t.kind.is_empty());
        let api_version_present = types.is_some_and(|t| !t.api_version.is_empty());

        if !kind_present {
            violations.push(missing_field(object_ref.clone(), "kind"));
        }
        if !api_version_present {
            violations.push(missing_field(object_ref.clone(), "apiVersion"));
        }

        for (field, present) in forbidden_field_checks(desired) {
            if present {
                violations.push(PreflightViolation {
                    object_ref: object_ref.clone(),
                    phase_name: None,
                    reason: PreflightReason::ForbiddenField(field.to_string()),
                });
            }
        }

        if kind_present && api_version_present {
            if let Some(gvk) = gvk_of(desired) {
                let namespaced = self.scope_resolver.is_namespaced(&gvk);
                let has_namespace = desired.metadata.namespace.is_some();
                if let Some(expected) = namespaced {
                    if expected != has_namespace {
                        violations.push(PreflightViolation {
                            object_ref: object_ref.clone(),
                            phase_name: None,
                            reason: PreflightReason::NamespaceScopeMismatch,
                        });
                    }
                }
            }
        }

        violations
    }

    /// Dry-run, force-ownership server-side apply to catch schema/admission
    /// rejections before any real write.
    ///
    /// Only apiserver errors classified by [`classify`] are reported as
    /// violations; everything else is returned as a transient `kube::Error`
    /// for the caller to bubble up.
    pub async fn validate_dry_run(
        &self,
        field_manager: &str,
        desired: &DynamicObject,
        applier: &dyn DryRunApply,
    ) -> Result<Vec<PreflightViolation>, kube::Error> {
        match applier.dry_run_apply(field_manager, desired).await {
            Ok(()) => Ok(Vec::new()),
            Err(err) => match classify(&err) {
                Some(reason) => Ok(vec![PreflightViolation {
                    object_ref: ObjectRef::try_from_dynamic(desired),
                    phase_name: None,
                    reason,
                }]),
                None => {
                    tracing::debug!(target: "boxcutter::validation", error = %err, "dry-run apply failed with unclassified error");
                    Err(err)
                }
            },
        }
    }
}

fn missing_field(object_ref: Option<ObjectRef>, field: &str) -> PreflightViolation {
    PreflightViolation {
        object_ref,
        phase_name: None,
        reason: PreflightReason::MissingField(field.to_string()),
    }
}

fn gvk_of(obj: &DynamicObject) -> Option<GroupVersionKind> {
    let types = obj.types.as_ref()?;
    Some(GroupVersionKind::try_from(types).ok()?)
}

fn forbidden_field_checks(obj: &DynamicObject) -> [(&'static str, bool); 6] {
    let meta = &obj.metadata;
    [
        ("uid", meta.uid.is_some()),
        ("generation", meta.generation.is_some()),
        ("generateName", meta.generate_name.is_some()),
        ("finalizers", meta.finalizers.as_ref().is_some_and(|f| !f.is_empty())),
        ("ownerReferences", meta.owner_references.as_ref().is_some_and(|o| !o.is_empty())),
        ("resourceVersion", meta.resource_version.is_some()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use kube::core::{ErrorResponse, TypeMeta};
    use serde_json::json;

    fn cm(name: &str) -> DynamicObject {
        DynamicObject {
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
        }
    }

    #[test]
    fn clean_object_has_no_violations() {
        let validator = ObjectValidator::default();
        assert!(validator.validate_static(&cm("a")).is_empty());
    }

    #[test]
    fn missing_type_meta_is_flagged() {
        let validator = ObjectValidator::default();
        let mut obj = cm("a");
        obj.types = None;
        let violations = validator.validate_static(&obj);
        assert_eq!(violations.len(), 2);
    }

    #[test]
    fn forbidden_fields_are_flagged() {
        let validator = ObjectValidator::default();
        let mut obj = cm("a");
        obj.metadata.uid = Some("some-uid".into());
        obj.metadata.resource_version = Some("123".into());
        let violations = validator.validate_static(&obj);
        assert_eq!(violations.len(), 2);
        assert!(violations
            .iter()
            .any(|v| matches!(&v.reason, PreflightReason::ForbiddenField(f) if f == "uid")));
    }

    struct FakeApplier {
        result: Result<(), kube::Error>,
    }

    #[async_trait]
    impl DryRunApply for FakeApplier {
        async fn dry_run_apply(&self, _field_manager: &str, _desired: &DynamicObject) -> Result<(), kube::Error> {
            match &self.result {
                Ok(()) => Ok(()),
                Err(kube::Error::Api(resp)) => Err(kube::Error::Api(resp.clone())),
                Err(_) => unreachable!("test only constructs Api errors"),
            }
        }
    }

    #[tokio::test]
    async fn dry_run_classifies_conflict_as_violation() {
        let validator = ObjectValidator::default();
        let applier = FakeApplier {
            result: Err(kube::Error::Api(ErrorResponse {
                status: "Failure".into(),
                message: "conflict".into(),
                reason: "Conflict".into(),
                code: 409,
            })),
        };
        let violations = validator.validate_dry_run("boxcutter", &cm("a"), &applier).await.unwrap();
        assert_eq!(violations.len(), 1);
    }

    #[tokio::test]
    async fn dry_run_bubbles_up_unclassified_error() {
        let validator = ObjectValidator::default();
        let applier = FakeApplier {
            result: Err(kube::Error::Api(ErrorResponse {
                status: "Failure".into(),
                message: "etcd timeout".into(),
                reason: "InternalError".into(),
                code: 500,
            })),
        };
        let result = validator.validate_dry_run("boxcutter", &cm("a"), &applier).await;
        assert!(result.is_err());
    }
}
