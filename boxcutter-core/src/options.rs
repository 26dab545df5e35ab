//! Options that shape reconcile/teardown behavior at the object, phase and
//! revision scope (spec.md §6's option table).
use std::collections::HashMap;
use std::sync::Arc;

use crate::object_ref::ObjectRef;
use crate::probe::Probe;

/// Governs how the engine treats a live object owned by another controller.
///
/// Default is [`CollisionProtection::Prevent`], the conservative choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CollisionProtection {
    /// Refuse to touch objects not owned by us.
    #[default]
    Prevent,
    /// Allow adoption if the live object has no other *controller*
    /// owner-reference.
    IfNoController,
    /// Overwrite regardless of other field managers.
    None,
}

/// Settings common to every scope (object/phase/revision), with later
/// (more specific) scopes overriding earlier ones.
#[derive(Debug, Clone, Default)]
pub struct CommonOptions {
    /// Collision handling policy. `None` means "inherit from the enclosing scope".
    pub collision_protection: Option<CollisionProtection>,
    /// Owner UIDs/refs treated as adoptable without a collision check.
    /// Always additive across scopes (never overridden, only extended).
    pub previous_owners: Vec<String>,
    /// Dry-run mode: compute and report, never write. `None` means "inherit".
    pub paused: Option<bool>,
}

impl CommonOptions {
    /// Merge `more_specific` on top of `self`, the less specific scope.
    pub fn merged_with(&self, more_specific: &CommonOptions) -> CommonOptions {
        CommonOptions {
            collision_protection: more_specific.collision_protection.or(self.collision_protection),
            previous_owners: self
                .previous_owners
                .iter()
                .chain(more_specific.previous_owners.iter())
                .cloned()
                .collect(),
            paused: more_specific.paused.or(self.paused),
        }
    }

    /// Resolve to concrete values, applying engine-wide defaults for any
    /// field that was never set at any scope.
    pub fn resolve(&self) -> ResolvedOptions {
        ResolvedOptions {
            collision_protection: self.collision_protection.unwrap_or_default(),
            previous_owners: self.previous_owners.clone(),
            paused: self.paused.unwrap_or(false),
        }
    }
}

/// Fully resolved options with every field defaulted, ready for the engine
/// to act on.
#[derive(Debug, Clone, Default)]
pub struct ResolvedOptions {
    /// Collision handling policy.
    pub collision_protection: CollisionProtection,
    /// Owner UIDs/refs treated as adoptable without a collision check.
    pub previous_owners: Vec<String>,
    /// Dry-run mode.
    pub paused: bool,
}

/// Per-object overrides, plus probe registrations.
#[derive(Debug, Clone, Default)]
pub struct ObjectOptions {
    /// Common settings, overriding the enclosing phase/revision scope.
    pub common: CommonOptions,
    /// Probes registered for this object, keyed by [`Probe::kind`].
    pub probes: Vec<Arc<dyn Probe>>,
}

impl ObjectOptions {
    /// Register a probe; the kind [`crate::probe::PROGRESS_PROBE`] is
    /// well-known and gates phase progression.
    pub fn with_probe(mut self, probe: Arc<dyn Probe>) -> Self {
        self.probes.push(probe);
        self
    }

    /// Look up the registered `Progress` probe, if any.
    pub fn progress_probe(&self) -> Option<&Arc<dyn Probe>> {
        self.probes.iter().find(|p| p.kind() == crate::probe::PROGRESS_PROBE)
    }
}

/// Per-phase overrides: common settings plus per-object overrides.
#[derive(Debug, Clone, Default)]
pub struct PhaseOptions {
    /// Common settings, overriding the enclosing revision scope.
    pub common: CommonOptions,
    /// Overrides keyed by the object they apply to.
    pub object_overrides: HashMap<ObjectRef, ObjectOptions>,
}

/// Revision-wide options: common settings plus per-phase overrides.
#[derive(Debug, Clone, Default)]
pub struct RevisionOptions {
    /// Common settings, the outermost scope.
    pub common: CommonOptions,
    /// Overrides keyed by phase name.
    pub phase_overrides: HashMap<String, PhaseOptions>,
}

impl RevisionOptions {
    /// Resolve the [`PhaseOptions`] (common settings only, object overrides
    /// are resolved separately) that apply within `phase_name`.
    pub fn phase_common(&self, phase_name: &str) -> CommonOptions {
        match self.phase_overrides.get(phase_name) {
            Some(over) => self.common.merged_with(&over.common),
            None => self.common.clone(),
        }
    }

    /// Resolve the [`ObjectOptions`] that apply to `object_ref` within
    /// `phase_name`, given the phase-scoped defaults already merged in
    /// `phase_common`.
    pub fn object_options(&self, phase_name: &str, object_ref: &ObjectRef, phase_common: &CommonOptions) -> ObjectOptions {
        let phase = self.phase_overrides.get(phase_name);
        let object_override = phase.and_then(|p| p.object_overrides.get(object_ref));
        match object_override {
            Some(obj) => ObjectOptions {
                common: phase_common.merged_with(&obj.common),
                probes: obj.probes.clone(),
            },
            None => ObjectOptions {
                common: phase_common.clone(),
                probes: Vec::new(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn more_specific_scope_wins_but_previous_owners_accumulate() {
        let revision = CommonOptions {
            collision_protection: Some(CollisionProtection::Prevent),
            previous_owners: vec!["a".into()],
            paused: Some(false),
        };
        let phase = CommonOptions {
            collision_protection: Some(CollisionProtection::None),
            previous_owners: vec!["b".into()],
            paused: None,
        };
        let merged = revision.merged_with(&phase);
        assert_eq!(merged.collision_protection, Some(CollisionProtection::None));
        assert_eq!(merged.previous_owners, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(merged.paused, Some(false));
    }

    #[test]
    fn resolve_defaults_unset_fields() {
        let resolved = CommonOptions::default().resolve();
        assert_eq!(resolved.collision_protection, CollisionProtection::Prevent);
        assert!(!resolved.paused);
    }
}
