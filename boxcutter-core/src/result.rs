//! Result types returned by the three engine levels (spec.md §3).
use std::collections::BTreeMap;

use crate::comparator::CompareReport;
use crate::object_ref::ObjectRef;
use crate::probe::ProbeOutcome;

/// What `ObjectEngine::reconcile` did with a single object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// The object did not exist and was created.
    Created,
    /// The object existed and was patched.
    Updated,
    /// The object existed and already matched the desired state; no write.
    Idle,
    /// The object had been deleted out-of-band and was re-created.
    Recreated,
    /// The live object is owned by someone else and `CollisionProtection`
    /// forbade touching it; no write.
    Collision,
    /// A write occurred previously; this call only re-evaluated probes.
    ProgressReport,
}

/// Outcome of reconciling (or tearing down) a single object.
#[derive(Debug, Clone)]
pub struct ObjectResult {
    /// Identity of the object this result describes.
    pub object_ref: ObjectRef,
    /// What the engine did.
    pub action: Action,
    /// Results of every probe registered for this object, keyed by
    /// [`crate::probe::Probe::kind`].
    pub probes: BTreeMap<String, ProbeOutcome>,
    /// The comparator's report for this reconcile attempt.
    pub compare: CompareReport,
    /// Whether the object is `Paused` (computed but not written).
    pub paused: bool,
}

impl ObjectResult {
    /// Whether this object's `Progress` probe is `True`, or it registers no
    /// `Progress` probe and its action indicates a successful, conflict-free
    /// write (`Idle` or `Updated`), per spec.md §8's phase-completeness law.
    pub fn is_progressed(&self) -> bool {
        match self.probes.get(crate::probe::PROGRESS_PROBE) {
            Some(outcome) => outcome.status == crate::probe::ProbeStatus::True,
            None => {
                matches!(self.action, Action::Idle | Action::Updated | Action::Created)
                    && self.compare.conflicts.is_empty()
            }
        }
    }
}

/// Outcome of reconciling one phase.
#[derive(Debug, Clone)]
pub struct PhaseResult {
    /// The phase's name.
    pub name: String,
    /// Per-object results, in phase order.
    pub objects: Vec<ObjectResult>,
    /// Set when preflight validation rejected the phase before any write.
    pub preflight_error: Option<crate::error::PreflightViolations>,
    /// `true` iff every object is progressed (see [`ObjectResult::is_progressed`]).
    pub is_complete: bool,
    /// `true` iff any object is not yet created and progressed.
    pub in_transition: bool,
}

impl PhaseResult {
    fn from_objects(name: String, objects: Vec<ObjectResult>) -> Self {
        let is_complete = objects.iter().all(ObjectResult::is_progressed);
        let in_transition = !is_complete;
        Self {
            name,
            objects,
            preflight_error: None,
            is_complete,
            in_transition,
        }
    }

    /// Build a result for a phase that was fully evaluated.
    pub fn complete(name: impl Into<String>, objects: Vec<ObjectResult>) -> Self {
        Self::from_objects(name.into(), objects)
    }

    /// Build a result for a phase that failed preflight before any object
    /// was touched.
    pub fn preflight_failed(name: impl Into<String>, violations: crate::error::PreflightViolations) -> Self {
        Self {
            name: name.into(),
            objects: Vec::new(),
            preflight_error: Some(violations),
            is_complete: false,
            in_transition: false,
        }
    }
}

/// Outcome of reconciling a whole revision.
#[derive(Debug, Clone)]
pub struct RevisionResult {
    /// Per-phase results for every phase that was evaluated. Phases after
    /// the first incomplete one are never touched, and so are absent here.
    pub phases: Vec<PhaseResult>,
    /// Set when revision-wide preflight validation rejected the revision.
    pub preflight_error: Option<crate::error::PreflightViolations>,
    /// `true` iff every phase in the revision completed.
    pub is_complete: bool,
    /// `true` iff reconciliation stopped partway through the revision.
    pub in_transition: bool,
    /// The name of the first incomplete phase, if any.
    pub active_phase_name: Option<String>,
}

impl RevisionResult {
    /// Build a result from the sequence of phase results actually evaluated.
    pub fn from_phases(phases: Vec<PhaseResult>) -> Self {
        let active_phase_name = phases.iter().find(|p| !p.is_complete).map(|p| p.name.clone());
        let is_complete = active_phase_name.is_none();
        Self {
            in_transition: !is_complete,
            active_phase_name,
            is_complete,
            phases,
            preflight_error: None,
        }
    }

    /// Build a result for a revision that failed preflight before any phase
    /// was touched.
    pub fn preflight_failed(violations: crate::error::PreflightViolations) -> Self {
        Self {
            phases: Vec::new(),
            preflight_error: Some(violations),
            is_complete: false,
            in_transition: false,
            active_phase_name: None,
        }
    }
}

/// Outcome of tearing down one phase.
#[derive(Debug, Clone)]
pub struct PhaseTeardownResult {
    /// The phase's name.
    pub name: String,
    /// Per-object "is gone" flags, in reverse (teardown) order.
    pub objects: Vec<(ObjectRef, bool)>,
    /// `true` iff every object in the phase is confirmed gone.
    pub is_complete: bool,
}

impl PhaseTeardownResult {
    /// Build a result from the objects actually visited.
    pub fn from_objects(name: impl Into<String>, objects: Vec<(ObjectRef, bool)>) -> Self {
        let is_complete = objects.iter().all(|(_, gone)| *gone);
        Self {
            name: name.into(),
            objects,
            is_complete,
        }
    }
}

/// Outcome of tearing down a whole revision.
#[derive(Debug, Clone)]
pub struct RevisionTeardownResult {
    /// Per-phase teardown results, in reverse (teardown) order, up to and
    /// including the first phase not yet fully gone.
    pub phases: Vec<PhaseTeardownResult>,
    /// `true` iff every phase reported gone.
    pub is_complete: bool,
    /// The name of the first (in teardown order) not-yet-gone phase.
    pub active_phase_name: Option<String>,
}

impl RevisionTeardownResult {
    /// Build a result from the phases actually visited, in reverse order.
    pub fn from_phases(phases: Vec<PhaseTeardownResult>) -> Self {
        let active_phase_name = phases.iter().find(|p| !p.is_complete).map(|p| p.name.clone());
        let is_complete = active_phase_name.is_none();
        Self {
            phases,
            is_complete,
            active_phase_name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(action: Action, progress_true: Option<bool>) -> ObjectResult {
        let mut probes = BTreeMap::new();
        if let Some(v) = progress_true {
            probes.insert(
                crate::probe::PROGRESS_PROBE.to_string(),
                if v { ProbeOutcome::ready() } else { ProbeOutcome::not_ready("waiting") },
            );
        }
        ObjectResult {
            object_ref: ObjectRef::new("", "v1", "ConfigMap", Some("ns"), "a"),
            action,
            probes,
            compare: CompareReport::default(),
            paused: false,
        }
    }

    #[test]
    fn phase_completeness_matches_spec_law() {
        let complete = PhaseResult::complete("phase-1", vec![result(Action::Created, Some(true))]);
        assert!(complete.is_complete);

        let incomplete = PhaseResult::complete("phase-1", vec![result(Action::Created, Some(false))]);
        assert!(!incomplete.is_complete);

        let no_probe_idle = PhaseResult::complete("phase-1", vec![result(Action::Idle, None)]);
        assert!(no_probe_idle.is_complete);
    }

    #[test]
    fn revision_stops_at_first_incomplete_phase() {
        let p1 = PhaseResult::complete("phase-1", vec![result(Action::Created, Some(true))]);
        let p2 = PhaseResult::complete("phase-2", vec![result(Action::Created, Some(false))]);
        let result = RevisionResult::from_phases(vec![p1, p2]);
        assert!(!result.is_complete);
        assert_eq!(result.active_phase_name.as_deref(), Some("phase-2"));
    }
}
