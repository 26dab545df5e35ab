//! Process-wide, owner-scoped cache of Kubernetes informers with
//! reference-counted GVK tracking and Prometheus metrics (spec.md §4.6,
//! §4.7).
mod access_manager;
mod error;
mod metrics;
mod tracking_cache;

pub use access_manager::AccessManager;
pub use error::AccessError;
pub use metrics::AccessMetrics;
pub use tracking_cache::TrackingCache;
