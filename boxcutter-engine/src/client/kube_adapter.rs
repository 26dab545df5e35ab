//! The concrete `Reader`/`Writer` over a real apiserver connection.
use async_trait::async_trait;
use kube::api::{Api, Patch, PatchParams};
use kube::core::{ApiResource, DynamicObject, GroupVersionKind};
use kube::Client;

use super::{Reader, Writer};
use boxcutter_validation::DryRunApply;

/// Adapts a `kube::Client` into boxcutter's `Reader`/`Writer`/`DryRunApply`
/// traits, resolving a fresh `Api<DynamicObject>` per call from the GVK
/// boxcutter already carries on every `ObjectRef`.
///
/// Plurals are inferred the same way `kube::core::ApiResource::from_gvk`
/// does for any other dynamic client: lower-cased, naively pluralized. A
/// consumer whose GVKs need irregular plurals should resolve the
/// `ApiResource` via `kube::Discovery` and build their own adapter; this one
/// covers the common case without requiring a discovery round-trip per call.
#[derive(Clone)]
pub struct KubeReaderWriter {
    client: Client,
}

impl KubeReaderWriter {
    /// Build an adapter over `client`.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api(&self, gvk: &GroupVersionKind, namespace: Option<&str>) -> Api<DynamicObject> {
        let resource = ApiResource::from_gvk(gvk);
        match namespace {
            Some(ns) => Api::namespaced_with(self.client.clone(), ns, &resource),
            None => Api::all_with(self.client.clone(), &resource),
        }
    }
}

#[async_trait]
impl Reader for KubeReaderWriter {
    async fn get(&self, gvk: &GroupVersionKind, namespace: Option<&str>, name: &str) -> Result<Option<DynamicObject>, kube::Error> {
        match self.api(gvk, namespace).get(name).await {
            Ok(obj) => Ok(Some(obj)),
            Err(kube::Error::Api(resp)) if resp.code == 404 => Ok(None),
            Err(err) => Err(err),
        }
    }
}

#[async_trait]
impl Writer for KubeReaderWriter {
    async fn apply(&self, gvk: &GroupVersionKind, field_manager: &str, desired: &DynamicObject) -> Result<DynamicObject, kube::Error> {
        let namespace = desired.metadata.namespace.as_deref();
        let name = desired.metadata.name.as_deref().expect("desired object must carry metadata.name");
        let params = PatchParams::apply(field_manager).force();
        self.api(gvk, namespace).patch(name, &params, &Patch::Apply(desired)).await
    }

    async fn delete(&self, gvk: &GroupVersionKind, namespace: Option<&str>, name: &str) -> Result<(), kube::Error> {
        match self.api(gvk, namespace).delete(name, &Default::default()).await {
            Ok(_) => Ok(()),
            Err(kube::Error::Api(resp)) if resp.code == 404 => Ok(()),
            Err(err) => Err(err),
        }
    }
}

#[async_trait]
impl DryRunApply for KubeReaderWriter {
    async fn dry_run_apply(&self, field_manager: &str, desired: &DynamicObject) -> Result<(), kube::Error> {
        let types = desired.types.as_ref().expect("dry-run target must carry apiVersion/kind");
        let gvk = GroupVersionKind::try_from(types).expect("apiVersion/kind must be parseable");
        let namespace = desired.metadata.namespace.as_deref();
        let name = desired.metadata.name.as_deref().expect("desired object must carry metadata.name");
        let params = PatchParams::apply(field_manager).force().dry_run();
        self.api(&gvk, namespace).patch(name, &params, &Patch::Apply(desired)).await?;
        Ok(())
    }
}

