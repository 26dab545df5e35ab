//! Boxcutter rolls out, probes, and tears down a versioned, multi-phase
//! bundle of arbitrary cluster objects on behalf of some owner resource
//! (spec.md §1).
//!
//! This crate is a thin facade over the dependency-ordered workspace:
//! [`boxcutter_core`] (data model, Comparator), [`boxcutter_validation`]
//! (preflight), [`boxcutter_engine`] (the three-level reconciliation
//! engine) and [`boxcutter_access`] (the informer cache). Most consumers
//! only need [`Boxcutter`] and the [`prelude`].
mod config;

pub use boxcutter_access::{AccessError, AccessManager, AccessMetrics};
pub use boxcutter_core::*;
pub use boxcutter_engine::client::{KubeReaderWriter, Reader, Writer};
pub use boxcutter_engine::{Error as EngineError, ObjectEngine, PhaseEngine, RevisionEngine};
pub use boxcutter_validation::{ObjectValidator, PhaseValidator, RevisionValidator};
pub use config::{ConfigError, RevisionEngineOptionsBuilder};

use tokio_util::sync::CancellationToken;

/// A fully wired engine stack over a single Kubernetes client.
///
/// Build one with [`RevisionEngineOptionsBuilder`].
pub struct Boxcutter {
    engine: RevisionEngine,
    client: KubeReaderWriter,
}

impl Boxcutter {
    /// Reconcile `revision` once. Call repeatedly (e.g. from a controller's
    /// work queue) until the result reports `is_complete`.
    pub async fn reconcile(&self, revision: &Revision, cancel: &CancellationToken) -> Result<RevisionResult, EngineError> {
        self.engine.reconcile(&self.client, &self.client, revision, cancel).await
    }

    /// Tear down `revision` once. Call repeatedly until the result reports
    /// `is_complete`.
    pub async fn teardown(&self, revision: &Revision, cancel: &CancellationToken) -> Result<RevisionTeardownResult, EngineError> {
        self.engine.teardown(&self.client, &self.client, revision, cancel).await
    }
}

/// The common imports for working with Boxcutter: re-exports
/// [`boxcutter_core::prelude`] plus the facade types.
pub mod prelude {
    pub use boxcutter_core::prelude::*;
    pub use crate::{Boxcutter, RevisionEngineOptionsBuilder};
}
