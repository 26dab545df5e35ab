//! Error taxonomy (spec.md §7).
use thiserror::Error;

use crate::object_ref::ObjectRef;

/// Why a single object (or phase) was rejected during preflight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreflightReason {
    /// A field that must be empty on a desired object carried a value
    /// (`uid`, `generation`, `generateName`, `finalizers`, `ownerReferences`,
    /// `resourceVersion`).
    ForbiddenField(String),
    /// A required field (apiVersion/kind) was empty.
    MissingField(String),
    /// The same `ObjectRef` appeared more than once within the checked scope.
    DuplicateObject,
    /// A phase name was not a valid DNS-1035 label.
    InvalidName(String),
    /// The object's namespace scope did not match the RESTMapper's view of
    /// the GVK (namespaced object with no namespace, or vice versa).
    NamespaceScopeMismatch,
    /// A dry-run server-side apply was rejected by the apiserver with a
    /// classified error reason (spec.md §4.3's reason table).
    AdmissionRejected(String),
}

impl std::fmt::Display for PreflightReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PreflightReason::ForbiddenField(field) => write!(f, "forbidden field set: {field}"),
            PreflightReason::MissingField(field) => write!(f, "required field missing: {field}"),
            PreflightReason::DuplicateObject => write!(f, "duplicate object"),
            PreflightReason::InvalidName(name) => write!(f, "invalid DNS-1035 name: {name}"),
            PreflightReason::NamespaceScopeMismatch => write!(f, "namespace scope mismatch"),
            PreflightReason::AdmissionRejected(reason) => write!(f, "admission rejected: {reason}"),
        }
    }
}

/// One preflight failure, attributable to an object and, when relevant, a phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreflightViolation {
    /// The offending object, when the violation is object-scoped.
    pub object_ref: Option<ObjectRef>,
    /// The phase the violation was found in, when the violation is phase-scoped.
    pub phase_name: Option<String>,
    /// Why the violation was raised.
    pub reason: PreflightReason,
}

impl std::fmt::Display for PreflightViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.phase_name, &self.object_ref) {
            (Some(phase), Some(obj)) => write!(f, "[{phase}] {obj}: {}", self.reason),
            (Some(phase), None) => write!(f, "[{phase}]: {}", self.reason),
            (None, Some(obj)) => write!(f, "{obj}: {}", self.reason),
            (None, None) => write!(f, "{}", self.reason),
        }
    }
}

/// A non-empty set of preflight violations, attached to a `PhaseResult` or
/// `RevisionResult` instead of being thrown as an error (spec.md §7.1).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("preflight validation failed with {} violation(s)", .0.len())]
pub struct PreflightViolations(pub Vec<PreflightViolation>);

impl PreflightViolations {
    /// Violations scoped to `phase_name`, preserving the original order.
    pub fn for_phase<'a>(&'a self, phase_name: &'a str) -> impl Iterator<Item = &'a PreflightViolation> {
        self.0.iter().filter(move |v| v.phase_name.as_deref() == Some(phase_name))
    }
}

/// Crate-wide error type.
///
/// Validation and collision outcomes are *not* represented here: per
/// spec.md §7 they are reported in results ([`PreflightViolations`],
/// `Action::Collision`), not returned as errors. This enum only covers the
/// cases that genuinely abort an operation.
#[derive(Debug, Error)]
pub enum Error {
    /// A transient apiserver error; the consumer's reconciler should retry.
    #[error("apiserver request failed: {0}")]
    Transient(#[from] kube::Error),

    /// A programmer contract violation (nil/empty owner, missing probe
    /// handler, and similar). Per spec.md §7.5 these should "fail loudly" —
    /// represented here for the rare cases that can be caught without
    /// unwinding; most contract violations instead `panic!`/`assert!` at
    /// the call boundary (see `OwnerRef::new`, `Revision::new`).
    #[error("programmer contract violation: {0}")]
    Contract(String),
}
