//! Prometheus gauges describing the state of an `AccessManager`'s caches
//! (spec.md §4.7 "Metrics").
use prometheus::{IntGaugeVec, Opts, Registry};

use crate::access_manager::AccessManager;
use crate::error::AccessError;

/// Gauges tracking informer and object counts per owner.
pub struct AccessMetrics {
    informers: IntGaugeVec,
    objects: IntGaugeVec,
}

impl AccessMetrics {
    /// Build and register the gauges under `prefix` (e.g. `"boxcutter"`
    /// yields `boxcutter_managed_cache_informers` /
    /// `boxcutter_managed_cache_objects`).
    pub fn register(prefix: &str, registry: &Registry) -> Result<Self, prometheus::Error> {
        let informers = IntGaugeVec::new(
            Opts::new(format!("{prefix}_managed_cache_informers"), "Number of active informers per owner"),
            &["owner"],
        )?;
        let objects = IntGaugeVec::new(
            Opts::new(format!("{prefix}_managed_cache_objects"), "Number of cached objects per owner and GVK"),
            &["owner", "gvk"],
        )?;
        registry.register(Box::new(informers.clone()))?;
        registry.register(Box::new(objects.clone()))?;
        Ok(Self { informers, objects })
    }

    /// Refresh every gauge from a snapshot of `manager`'s current state.
    ///
    /// Stale series (an owner or GVK that no longer exists) are left behind
    /// by design; `prometheus::IntGaugeVec` has no "reset and repopulate"
    /// primitive, and owners/GVKs churn slowly enough that this is a
    /// best-effort reading, not an authoritative one.
    pub async fn refresh(&self, manager: &AccessManager) -> Result<(), AccessError> {
        let snapshot = manager.snapshot().await?;
        for (owner, counts) in snapshot {
            self.informers.with_label_values(&[&owner]).set(counts.len() as i64);
            for (gvk, count) in counts {
                let gvk_label = format!("{}/{}/{}", gvk.group, gvk.version, gvk.kind);
                self.objects.with_label_values(&[&owner, &gvk_label]).set(count as i64);
            }
        }
        Ok(())
    }
}
