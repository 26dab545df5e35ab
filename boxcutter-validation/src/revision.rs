//! Revision-scoped preflight: cheap static checks only, no dry-run
//! (spec.md §4.3 "RevisionValidator").
use boxcutter_core::{PreflightReason, PreflightViolation, Revision};

use crate::phase::PhaseValidator;
use crate::scope::{NamespaceScopeResolver, NoOpScopeResolver};

/// Validates a whole revision: every phase's static checks, plus
/// cross-phase duplicate detection.
pub struct RevisionValidator<S: NamespaceScopeResolver = NoOpScopeResolver> {
    phase_validator: PhaseValidator<S>,
}

impl Default for RevisionValidator<NoOpScopeResolver> {
    fn default() -> Self {
        Self {
            phase_validator: PhaseValidator::default(),
        }
    }
}

impl<S: NamespaceScopeResolver> RevisionValidator<S> {
    /// Build a validator delegating phase-level checks to `phase_validator`.
    pub fn new(phase_validator: PhaseValidator<S>) -> Self {
        Self { phase_validator }
    }

    /// Static-only checks: every phase's own violations, plus one
    /// `DuplicateObject` violation per participating phase for any
    /// `ObjectRef` shared across phases.
    pub fn validate_static(&self, revision: &Revision) -> Vec<PreflightViolation> {
        let mut violations = Vec::new();

        for phase in &revision.phases {
            violations.extend(self.phase_validator.validate_static(phase));
        }

        for (object_ref, phase_names) in revision.cross_phase_duplicates() {
            for phase_name in phase_names {
                violations.push(PreflightViolation {
                    object_ref: Some(object_ref.clone()),
                    phase_name: Some(phase_name),
                    reason: PreflightReason::DuplicateObject,
                });
            }
        }

        violations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use boxcutter_core::{Object, OwnerRef, Phase};
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
    fn flags_object_shared_across_phases_once_per_phase() {
        let validator = RevisionValidator::default();
        let revision = Revision::new("rev-1", 1, OwnerRef::new("owner-1"))
            .with_phase(Phase::new("phase-1").with_object(cm("shared")))
            .with_phase(Phase::new("phase-2").with_object(cm("shared")));
        let violations = validator.validate_static(&revision);
        let duplicate_violations: Vec<_> = violations
            .iter()
            .filter(|v| matches!(v.reason, PreflightReason::DuplicateObject))
            .collect();
        assert_eq!(duplicate_violations.len(), 2);
    }

    #[test]
    fn clean_revision_has_no_violations() {
        let validator = RevisionValidator::default();
        let revision = Revision::new("rev-1", 1, OwnerRef::new("owner-1"))
            .with_phase(Phase::new("phase-1").with_object(cm("a")));
        assert!(validator.validate_static(&revision).is_empty());
    }
}
