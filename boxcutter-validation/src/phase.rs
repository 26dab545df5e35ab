//! Phase-scoped preflight: per-object validation plus duplicate detection
//! and name validation (spec.md §4.3 "PhaseValidator").
use boxcutter_core::{is_dns1035_label, Phase, PreflightReason, PreflightViolation};

use crate::object::ObjectValidator;
use crate::scope::{NamespaceScopeResolver, NoOpScopeResolver};

/// Validates a phase: its name, and every object it contains.
pub struct PhaseValidator<S: NamespaceScopeResolver = NoOpScopeResolver> {
    object_validator: ObjectValidator<S>,
}

impl Default for PhaseValidator<NoOpScopeResolver> {
    fn default() -> Self {
        Self {
            object_validator: ObjectValidator::default(),
        }
    }
}

impl<S: NamespaceScopeResolver> PhaseValidator<S> {
    /// Build a validator delegating object-level checks to `object_validator`.
    pub fn new(object_validator: ObjectValidator<S>) -> Self {
        Self { object_validator }
    }

    /// Static checks only: phase name, per-object forbidden fields, and
    /// duplicate `ObjectRef`s within the phase.
    pub fn validate_static(&self, phase: &Phase) -> Vec<PreflightViolation> {
        let mut violations = Vec::new();

        if !phase.name.is_empty() && !is_dns1035_label(&phase.name) {
            violations.push(PreflightViolation {
                object_ref: None,
                phase_name: Some(phase.name.clone()),
                reason: PreflightReason::InvalidName(phase.name.clone()),
            });
        }

        for object in &phase.objects {
            for mut violation in self.object_validator.validate_static(&object.dynamic) {
                violation.phase_name = Some(phase.name.clone());
                violations.push(violation);
            }
        }

        for duplicate in phase.duplicate_refs() {
            violations.push(PreflightViolation {
                object_ref: Some(duplicate),
                phase_name: Some(phase.name.clone()),
                reason: PreflightReason::DuplicateObject,
            });
        }

        violations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use boxcutter_core::Object;
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
    fn rejects_non_dns1035_phase_names() {
        let validator = PhaseValidator::default();
        let phase = Phase::new("Not_Valid").with_object(cm("a"));
        let violations = validator.validate_static(&phase);
        assert!(violations.iter().any(|v| matches!(v.reason, PreflightReason::InvalidName(_))));
    }

    #[test]
    fn flags_duplicate_objects_within_phase() {
        let validator = PhaseValidator::default();
        let phase = Phase::new("phase-1").with_object(cm("a")).with_object(cm("a"));
        let violations = validator.validate_static(&phase);
        assert!(violations.iter().any(|v| matches!(v.reason, PreflightReason::DuplicateObject)));
    }

    #[test]
    fn empty_phase_name_is_allowed() {
        let validator = PhaseValidator::default();
        let phase = Phase::new("").with_object(cm("a"));
        let violations = validator.validate_static(&phase);
        assert!(violations.is_empty());
    }
}
