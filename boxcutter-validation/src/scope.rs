//! Namespace-scope resolution for the "object's scope matches its GVK"
//! preflight check (spec.md §4.3).
use kube::core::GroupVersionKind;

/// Tells a [`crate::object::ObjectValidator`] whether a GVK is namespaced.
///
/// Mirrors a Kubernetes RESTMapper lookup. [`NoOpScopeResolver`] skips the
/// check entirely, the same best-effort posture `boxcutter_core::comparator::NoSchema`
/// takes when no schema is available.
pub trait NamespaceScopeResolver: Send + Sync {
    /// `Some(true)` if `gvk` is namespaced, `Some(false)` if cluster-scoped,
    /// `None` if the resolver has no opinion (skip the check).
    fn is_namespaced(&self, gvk: &GroupVersionKind) -> Option<bool>;
}

/// Default resolver: never checks namespace scope.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpScopeResolver;

impl NamespaceScopeResolver for NoOpScopeResolver {
    fn is_namespaced(&self, _gvk: &GroupVersionKind) -> Option<bool> {
        None
    }
}
