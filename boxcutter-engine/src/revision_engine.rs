//! Sequences phases forward for reconcile and in reverse for teardown
//! (spec.md §4.5).
use boxcutter_core::{PreflightViolations, Revision, RevisionResult, RevisionTeardownResult};
use boxcutter_validation::RevisionValidator;
use tokio_util::sync::CancellationToken;

use crate::client::{Reader, Writer};
use crate::error::Error;
use crate::phase_engine::PhaseEngine;

/// Reconciles and tears down a whole revision.
pub struct RevisionEngine {
    phase_engine: PhaseEngine,
    validator: RevisionValidator,
}

impl RevisionEngine {
    /// Build a revision engine delegating phase work to `phase_engine` and
    /// preflight to the default [`RevisionValidator`].
    pub fn new(phase_engine: PhaseEngine) -> Self {
        Self {
            phase_engine,
            validator: RevisionValidator::default(),
        }
    }

    /// Reconcile `revision`, walking phases in order and stopping at the
    /// first incomplete one. Later phases are never touched.
    ///
    /// Honors `cancel`: checked between phases, so a cancellation request
    /// never interrupts a phase partway through, matching the
    /// "no write to phase[i-1] precedes `gone` on phase[i]" ordering
    /// guarantee teardown makes (reconcile makes the forward-order analogue).
    pub async fn reconcile(&self, reader: &dyn Reader, writer: &dyn Writer, revision: &Revision, cancel: &CancellationToken) -> Result<RevisionResult, Error> {
        let violations = self.validator.validate_static(revision);
        if !violations.is_empty() {
            tracing::info!(target: "boxcutter::revision", violation_count = violations.len(), "preflight failed");
            return Ok(RevisionResult::preflight_failed(PreflightViolations(violations)));
        }

        let mut phase_results = Vec::with_capacity(revision.phases.len());
        for phase in &revision.phases {
            if cancel.is_cancelled() {
                break;
            }
            let result = self
                .phase_engine
                .reconcile(reader, writer, revision.owner.uid(), revision.revision_number, phase, &revision.options)
                .await?;
            let complete = result.is_complete;
            phase_results.push(result);
            if !complete {
                break;
            }
        }

        Ok(RevisionResult::from_phases(phase_results))
    }

    /// Tear down `revision`, walking phases in reverse order and stopping at
    /// the first phase not fully gone.
    pub async fn teardown(&self, reader: &dyn Reader, writer: &dyn Writer, revision: &Revision, cancel: &CancellationToken) -> Result<RevisionTeardownResult, Error> {
        let mut phase_results = Vec::with_capacity(revision.phases.len());
        for phase in revision.phases.iter().rev() {
            if cancel.is_cancelled() {
                break;
            }
            let result = self.phase_engine.teardown(reader, writer, revision.owner.uid(), phase).await?;
            let complete = result.is_complete;
            phase_results.push(result);
            if !complete {
                break;
            }
        }

        Ok(RevisionTeardownResult::from_phases(phase_results))
    }
}
