//! Sequences objects inside a phase and decides whether it has progressed
//! enough to advance (spec.md §4.4).
use boxcutter_core::{Phase, PhaseResult, PhaseTeardownResult, ResolvedOptions, RevisionOptions};
use boxcutter_validation::PhaseValidator;

use crate::client::{Reader, Writer};
use crate::error::Error;
use crate::object_engine::ObjectEngine;

/// Reconciles and tears down a single phase.
pub struct PhaseEngine {
    object_engine: ObjectEngine,
    validator: PhaseValidator,
}

impl PhaseEngine {
    /// Build a phase engine delegating object work to `object_engine` and
    /// preflight to the default [`PhaseValidator`].
    pub fn new(object_engine: ObjectEngine) -> Self {
        Self {
            object_engine,
            validator: PhaseValidator::default(),
        }
    }

    /// Reconcile `phase` on behalf of `(owner_uid, revision_number)`.
    ///
    /// Runs preflight first; on violations, returns without touching any
    /// object. Otherwise reconciles every object in phase order.
    #[tracing::instrument(level = "debug", skip_all, fields(phase = %phase.name, owner = owner_uid, revision = revision_number))]
    pub async fn reconcile(
        &self,
        reader: &dyn Reader,
        writer: &dyn Writer,
        owner_uid: &str,
        revision_number: i64,
        phase: &Phase,
        revision_options: &RevisionOptions,
    ) -> Result<PhaseResult, Error> {
        let violations = self.validator.validate_static(phase);
        if !violations.is_empty() {
            tracing::info!(target: "boxcutter::phase", violation_count = violations.len(), "preflight failed");
            return Ok(PhaseResult::preflight_failed(phase.name.clone(), boxcutter_core::PreflightViolations(violations)));
        }

        let phase_common = revision_options.phase_common(&phase.name);
        let mut object_results = Vec::with_capacity(phase.objects.len());
        for object in &phase.objects {
            let object_ref = object.object_ref();
            let object_options = revision_options.object_options(&phase.name, &object_ref, &phase_common);
            let merged: ResolvedOptions = object_options.common.resolve();
            let mut merged_object = object.clone();
            merged_object.options = object_options;
            let result = self
                .object_engine
                .reconcile(reader, writer, owner_uid, revision_number, &merged_object, &merged)
                .await?;
            object_results.push(result);
        }

        Ok(PhaseResult::complete(phase.name.clone(), object_results))
    }

    /// Tear down `phase`, visiting objects in reverse order.
    #[tracing::instrument(level = "debug", skip_all, fields(phase = %phase.name, owner = owner_uid))]
    pub async fn teardown(&self, reader: &dyn Reader, writer: &dyn Writer, owner_uid: &str, phase: &Phase) -> Result<PhaseTeardownResult, Error> {
        let mut results = Vec::with_capacity(phase.objects.len());
        for object in phase.objects.iter().rev() {
            let gone = self.object_engine.teardown(reader, writer, owner_uid, object).await?;
            results.push((object.object_ref(), gone));
        }
        Ok(PhaseTeardownResult::from_objects(phase.name.clone(), results))
    }
}
