//! Cache-layer failures (spec.md §7.6: "surfaced via the AccessManager's
//! terminal error").
use thiserror::Error;

/// A failure that terminates an accessor (or the whole manager).
#[derive(Debug, Error, Clone)]
pub enum AccessError {
    /// The dispatcher task is gone; the manager must be rebuilt.
    #[error("access manager dispatcher is no longer running")]
    DispatcherGone,
    /// An informer's watch stream ended with an unrecoverable error.
    #[error("watch failed for {gvk:?}: {message}")]
    WatchFailed {
        /// The GVK whose watch failed.
        gvk: kube::core::GroupVersionKind,
        /// The underlying error, rendered (kube::Error isn't Clone).
        message: String,
    },
}
