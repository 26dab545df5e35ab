//! An ordered sequence of phases representing one deployable version of a
//! bundle (spec.md §3 "Revision").
use std::collections::HashMap;

use crate::object_ref::ObjectRef;
use crate::options::RevisionOptions;
use crate::owner::OwnerRef;
use crate::phase::Phase;

/// An ordered sequence of phases, reconciled forward and torn down in
/// reverse on behalf of `owner`.
#[derive(Debug, Clone)]
pub struct Revision {
    /// Human-readable revision name.
    pub name: String,
    /// Monotonically increasing per-owner revision number. Must be `> 0`.
    pub revision_number: i64,
    /// The resource this revision is reconciled on behalf of.
    pub owner: OwnerRef,
    /// Phases in application order.
    pub phases: Vec<Phase>,
    /// Revision-wide options and per-phase overrides.
    pub options: RevisionOptions,
}

impl Revision {
    /// Construct a revision. Panics if `revision_number <= 0` (a programmer
    /// contract violation per spec.md §7.5).
    pub fn new(name: impl Into<String>, revision_number: i64, owner: OwnerRef) -> Self {
        assert!(revision_number > 0, "revision number must be positive, got {revision_number}");
        Self {
            name: name.into(),
            revision_number,
            owner,
            phases: Vec::new(),
            options: RevisionOptions::default(),
        }
    }

    /// Append a phase in application order.
    pub fn with_phase(mut self, phase: Phase) -> Self {
        self.phases.push(phase);
        self
    }

    /// `ObjectRef`s that appear in more than one phase, mapped to every
    /// phase name that contains them.
    ///
    /// Per spec.md §8, "for any revision containing the same `ObjectRef` in
    /// phases `{P_a, P_b}`, `RevisionValidator` reports violations on both
    /// `P_a` and `P_b`" — this is the data this rule is checked against.
    pub fn cross_phase_duplicates(&self) -> HashMap<ObjectRef, Vec<String>> {
        let mut seen: HashMap<ObjectRef, Vec<String>> = HashMap::new();
        for phase in &self.phases {
            for object in &phase.objects {
                seen.entry(object.object_ref()).or_default().push(phase.name.clone());
            }
        }
        seen.into_iter().filter(|(_, phases)| phases.len() > 1).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::Object;
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
    fn detects_object_shared_across_phases() {
        let revision = Revision::new("rev-1", 1, OwnerRef::new("owner-1"))
            .with_phase(Phase::new("phase-1").with_object(cm("shared")))
            .with_phase(Phase::new("phase-2").with_object(cm("shared")));
        let dupes = revision.cross_phase_duplicates();
        assert_eq!(dupes.len(), 1);
        let (_, phases) = dupes.into_iter().next().unwrap();
        assert_eq!(phases, vec!["phase-1".to_string(), "phase-2".to_string()]);
    }

    #[test]
    #[should_panic(expected = "revision number")]
    fn rejects_non_positive_revision_number() {
        Revision::new("rev-1", 0, OwnerRef::new("owner-1"));
    }
}
