//! A per-owner informer cache that can add/remove informers for individual
//! GVKs at runtime (spec.md §4.6 "TrackingCache").
use std::collections::HashMap;

use futures::StreamExt;
use kube::core::{ApiResource, DynamicObject, GroupVersionKind};
use kube::runtime::{reflector, watcher, WatchStreamExt};
use kube::{Api, Client};
use tokio::sync::{watch, RwLock};
use tokio_util::sync::CancellationToken;

use crate::error::AccessError;

struct TrackedInformer {
    store: reflector::Store<DynamicObject>,
    synced: watch::Receiver<bool>,
    cancel: CancellationToken,
    task: tokio::task::JoinHandle<()>,
}

/// Per-owner cache of GVK -> informer. Reads (`ensure_synced`, `store`,
/// `object_count`, `gvks`) take the reader side of an `RwLock`;
/// `remove_informer`/`remove_other_informers` take the writer side, so they
/// never run concurrently with a Get/List (spec.md §4.6's "Read/write
/// serialization").
pub struct TrackingCache {
    client: Client,
    informers: RwLock<HashMap<GroupVersionKind, TrackedInformer>>,
    done: tokio::sync::mpsc::UnboundedSender<(GroupVersionKind, AccessError)>,
}

impl TrackingCache {
    /// Build a cache over `client`, reporting unrecoverable per-GVK watch
    /// failures onto `done`.
    pub fn new(client: Client, done: tokio::sync::mpsc::UnboundedSender<(GroupVersionKind, AccessError)>) -> Self {
        Self {
            client,
            informers: RwLock::new(HashMap::new()),
            done,
        }
    }

    /// Ensure an informer exists for `gvk` and wait for its initial sync.
    ///
    /// If another caller is already waiting on the same GVK's first sync,
    /// this naturally queues behind it: both callers await the same
    /// `watch::Receiver`, so no duplicate informer is created.
    pub async fn ensure_synced(&self, gvk: &GroupVersionKind) -> Result<(), AccessError> {
        let mut synced_rx = {
            let informers = self.informers.read().await;
            informers.get(gvk).map(|i| i.synced.clone())
        };

        if synced_rx.is_none() {
            let mut informers = self.informers.write().await;
            synced_rx = Some(
                informers
                    .entry(gvk.clone())
                    .or_insert_with(|| self.spawn_informer(gvk.clone()))
                    .synced
                    .clone(),
            );
        }

        let mut rx = synced_rx.expect("inserted above if missing");
        while !*rx.borrow() {
            if rx.changed().await.is_err() {
                return Err(AccessError::WatchFailed {
                    gvk: gvk.clone(),
                    message: "informer task exited before first sync".to_string(),
                });
            }
        }
        Ok(())
    }

    /// The reflector store for `gvk`, if an informer has been created for it.
    pub async fn store(&self, gvk: &GroupVersionKind) -> Option<reflector::Store<DynamicObject>> {
        self.informers.read().await.get(gvk).map(|i| i.store.clone())
    }

    /// Number of objects currently cached for `gvk`.
    pub async fn object_count(&self, gvk: &GroupVersionKind) -> usize {
        match self.store(gvk).await {
            Some(store) => store.state().len(),
            None => 0,
        }
    }

    /// Every GVK this cache currently has an informer for.
    pub async fn gvks(&self) -> Vec<GroupVersionKind> {
        self.informers.read().await.keys().cloned().collect()
    }

    /// Stop and remove the informer for `gvk`, if any, unblocking anyone
    /// waiting on its sync.
    pub async fn remove_informer(&self, gvk: &GroupVersionKind) {
        let removed = self.informers.write().await.remove(gvk);
        if let Some(informer) = removed {
            informer.cancel.cancel();
            informer.task.abort();
        }
    }

    /// Stop every informer whose GVK is not in `keep`.
    pub async fn remove_other_informers(&self, keep: &std::collections::HashSet<GroupVersionKind>) {
        let to_remove: Vec<GroupVersionKind> = {
            let informers = self.informers.read().await;
            informers.keys().filter(|gvk| !keep.contains(gvk)).cloned().collect()
        };
        for gvk in to_remove {
            self.remove_informer(&gvk).await;
        }
    }

    /// Stop every informer; called when the owning accessor is torn down.
    pub async fn shutdown(&self) {
        let mut informers = self.informers.write().await;
        for (_, informer) in informers.drain() {
            informer.cancel.cancel();
            informer.task.abort();
        }
    }

    fn spawn_informer(&self, gvk: GroupVersionKind) -> TrackedInformer {
        let resource = ApiResource::from_gvk(&gvk);
        let api: Api<DynamicObject> = Api::all_with(self.client.clone(), &resource);
        let writer = reflector::store::Writer::<DynamicObject>::new(resource.clone());
        let reader = writer.as_reader();
        let (synced_tx, synced_rx) = watch::channel(false);
        let cancel = CancellationToken::new();

        let task_cancel = cancel.clone();
        let task_gvk = gvk.clone();
        let done = self.done.clone();
        let task = tokio::spawn(async move {
            let stream = watcher(api, watcher::Config::default())
                .default_backoff()
                .reflect(writer)
                .applied_objects();
            tokio::pin!(stream);
            let mut marked_synced = false;
            loop {
                tokio::select! {
                    _ = task_cancel.cancelled() => break,
                    next = stream.next() => {
                        match next {
                            Some(Ok(_)) => {
                                if !marked_synced {
                                    marked_synced = true;
                                    let _ = synced_tx.send(true);
                                }
                            }
                            Some(Err(err)) => {
                                let _ = done.send((task_gvk.clone(), AccessError::WatchFailed {
                                    gvk: task_gvk.clone(),
                                    message: err.to_string(),
                                }));
                            }
                            None => break,
                        }
                    }
                }
            }
        });

        TrackedInformer {
            store: reader,
            synced: synced_rx,
            cancel,
            task,
        }
    }
}
