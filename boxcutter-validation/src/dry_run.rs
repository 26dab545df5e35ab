//! The dry-run server-side-apply capability `ObjectValidator` uses to catch
//! schema/admission errors before any real write (spec.md §4.3).
use async_trait::async_trait;
use kube::core::DynamicObject;

/// Performs a dry-run, force-ownership server-side apply and reports
/// whether the apiserver would accept it.
///
/// `boxcutter-engine`'s `KubeReaderWriter` implements this over the same
/// `kube::Api<DynamicObject>` it uses for real writes; tests use a fake
/// that records calls and returns canned responses.
#[async_trait]
pub trait DryRunApply: Send + Sync {
    /// Attempt a dry-run apply of `desired` under `field_manager`. Returns
    /// the raw `kube::Error` on rejection so the caller can classify it.
    async fn dry_run_apply(&self, field_manager: &str, desired: &DynamicObject) -> Result<(), kube::Error>;
}
