//! The `Reader`/`Writer` capability boundary `ObjectEngine` reconciles
//! through (spec.md §1: "Kubernetes API transport... assumed provided as
//! `Reader`/`Writer` with server-side apply").
pub mod fake;
mod kube_adapter;

pub use kube_adapter::KubeReaderWriter;

use async_trait::async_trait;
use kube::core::{DynamicObject, GroupVersionKind};

/// Reads a single object by coordinates.
#[async_trait]
pub trait Reader: Send + Sync {
    /// Fetch the live object, or `None` if it doesn't exist.
    async fn get(
        &self,
        gvk: &GroupVersionKind,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<Option<DynamicObject>, kube::Error>;
}

/// Writes a single object via server-side apply, and deletes it.
#[async_trait]
pub trait Writer: Send + Sync {
    /// Server-side apply `desired` under `field_manager`, forcing ownership
    /// of the fields it claims. Returns the object as the apiserver applied it.
    async fn apply(&self, gvk: &GroupVersionKind, field_manager: &str, desired: &DynamicObject) -> Result<DynamicObject, kube::Error>;

    /// Delete the object, respecting finalizers (a non-blocking delete;
    /// the object may still exist with a deletion timestamp afterward).
    async fn delete(&self, gvk: &GroupVersionKind, namespace: Option<&str>, name: &str) -> Result<(), kube::Error>;
}
