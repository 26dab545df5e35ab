//! Errors the engine crate can return. Validation/collision/probe outcomes
//! are never represented here; see spec.md §7 and `boxcutter_core::error`.
use thiserror::Error;

/// Errors `ObjectEngine`/`PhaseEngine`/`RevisionEngine` can return.
#[derive(Debug, Error)]
pub enum Error {
    /// A transient apiserver error; the consumer's reconciler should retry.
    #[error("apiserver request failed: {0}")]
    Transient(#[from] kube::Error),
}
