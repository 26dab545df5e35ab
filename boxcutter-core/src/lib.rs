//! Data model, annotations and field-manager comparator shared by every
//! boxcutter crate.
//!
//! This crate has no dependency on any particular reconciliation strategy:
//! it defines the `Object`/`Phase`/`Revision` tree, the annotations that
//! stamp ownership onto live objects, probe contracts, and the comparator
//! that classifies a desired-vs-live diff against server-side-apply
//! managed fields.

mod annotations;
pub mod comparator;
mod error;
mod naming;
mod object;
mod object_ref;
mod options;
mod owner;
mod phase;
mod probe;
mod result;
mod revision;

pub use annotations::{AnnotationRevisionMetadata, RevisionMetadata};
pub use error::{Error, PreflightReason, PreflightViolation, PreflightViolations};
pub use naming::is_dns1035_label;
pub use object::Object;
pub use object_ref::ObjectRef;
pub use options::{
    CollisionProtection, CommonOptions, ObjectOptions, PhaseOptions, ResolvedOptions, RevisionOptions,
};
pub use owner::OwnerRef;
pub use phase::Phase;
pub use probe::{Probe, ProbeOutcome, ProbeStatus, PROGRESS_PROBE};
pub use result::{
    Action, ObjectResult, PhaseResult, PhaseTeardownResult, RevisionResult, RevisionTeardownResult,
};
pub use revision::Revision;

/// Convenience re-exports of the most common imports.
pub mod prelude {
    pub use crate::comparator::{Comparator, CompareReport, NoSchema, SchemaSource};
    pub use crate::{
        Action, AnnotationRevisionMetadata, CollisionProtection, CommonOptions, Error, Object,
        ObjectOptions, ObjectRef, ObjectResult, OwnerRef, Phase, PhaseOptions, PhaseResult, Probe,
        ProbeOutcome, ProbeStatus, Revision, RevisionMetadata, RevisionOptions, RevisionResult,
        PROGRESS_PROBE,
    };
}
