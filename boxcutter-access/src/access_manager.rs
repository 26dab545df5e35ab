//! Process-wide, owner-scoped informer access with reference-counted
//! informers and a single dispatcher task per manager (spec.md §4.6).
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use kube::core::GroupVersionKind;
use kube::Client;
use tokio::sync::{mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;

use crate::error::AccessError;
use crate::tracking_cache::TrackingCache;

struct Accessor {
    cache: Arc<TrackingCache>,
    users: HashMap<String, HashSet<GroupVersionKind>>,
    cancel: CancellationToken,
}

impl Accessor {
    fn referenced_gvks(&self) -> HashSet<GroupVersionKind> {
        self.users.values().flat_map(|gvks| gvks.iter().cloned()).collect()
    }
}

enum Request {
    GetWithUser {
        owner_uid: String,
        user_uid: String,
        gvks: HashSet<GroupVersionKind>,
        client: Client,
        reply: oneshot::Sender<Result<(), AccessError>>,
    },
    FreeWithUser {
        owner_uid: String,
        user_uid: String,
        reply: oneshot::Sender<()>,
    },
    Free {
        owner_uid: String,
        reply: oneshot::Sender<()>,
    },
    Snapshot {
        reply: oneshot::Sender<Vec<(String, Vec<(GroupVersionKind, usize)>)>>,
    },
}

/// Per-owner, dynamically scoped informer cache with reference-counted
/// informers.
///
/// All mutations to the owner map flow through a single dispatcher task, so
/// `GetWithUser`/`FreeWithUser`/`Free` never race each other even when
/// called concurrently from many reconcile loops (spec.md §4.6's
/// "Concurrency model").
pub struct AccessManager {
    requests: mpsc::Sender<Request>,
    terminal_error: watch::Receiver<Option<Arc<AccessError>>>,
}

impl AccessManager {
    /// Spawn the dispatcher task and return a handle to it.
    pub fn spawn() -> Self {
        let (tx, rx) = mpsc::channel(64);
        let (terminal_tx, terminal_rx) = watch::channel(None);
        tokio::spawn(dispatcher_loop(rx, terminal_tx));
        Self {
            requests: tx,
            terminal_error: terminal_rx,
        }
    }

    /// Ensure an accessor exists for `owner_uid` (built from `client`),
    /// register `user_uid` as needing `gvks`, wait for all of them to sync,
    /// and garbage-collect any GVK no longer referenced by any user of this
    /// accessor.
    pub async fn get_with_user(&self, owner_uid: &str, user_uid: &str, gvks: HashSet<GroupVersionKind>, client: Client) -> Result<(), AccessError> {
        let (reply, rx) = oneshot::channel();
        self.requests
            .send(Request::GetWithUser {
                owner_uid: owner_uid.to_string(),
                user_uid: user_uid.to_string(),
                gvks,
                client,
                reply,
            })
            .await
            .map_err(|_| AccessError::DispatcherGone)?;
        rx.await.map_err(|_| AccessError::DispatcherGone)?
    }

    /// Drop `user_uid`'s registration against `owner_uid`'s accessor. If no
    /// user remains, the accessor itself is cancelled and dropped.
    pub async fn free_with_user(&self, owner_uid: &str, user_uid: &str) -> Result<(), AccessError> {
        let (reply, rx) = oneshot::channel();
        self.requests
            .send(Request::FreeWithUser {
                owner_uid: owner_uid.to_string(),
                user_uid: user_uid.to_string(),
                reply,
            })
            .await
            .map_err(|_| AccessError::DispatcherGone)?;
        rx.await.map_err(|_| AccessError::DispatcherGone)
    }

    /// Unconditionally tear down `owner_uid`'s accessor.
    pub async fn free(&self, owner_uid: &str) -> Result<(), AccessError> {
        let (reply, rx) = oneshot::channel();
        self.requests
            .send(Request::Free {
                owner_uid: owner_uid.to_string(),
                reply,
            })
            .await
            .map_err(|_| AccessError::DispatcherGone)?;
        rx.await.map_err(|_| AccessError::DispatcherGone)
    }

    /// A `(owner_uid, [(gvk, object_count)])` snapshot for the metrics
    /// collector.
    pub(crate) async fn snapshot(&self) -> Result<Vec<(String, Vec<(GroupVersionKind, usize)>)>, AccessError> {
        let (reply, rx) = oneshot::channel();
        self.requests.send(Request::Snapshot { reply }).await.map_err(|_| AccessError::DispatcherGone)?;
        rx.await.map_err(|_| AccessError::DispatcherGone)
    }

    /// The manager's terminal error, if a per-owner cache has crashed with
    /// a non-cancellation failure. The process should rebuild the manager.
    pub fn take_terminal_error(&self) -> Option<Arc<AccessError>> {
        self.terminal_error.borrow().clone()
    }
}

async fn dispatcher_loop(mut requests: mpsc::Receiver<Request>, terminal_tx: watch::Sender<Option<Arc<AccessError>>>) {
    let mut accessors: HashMap<String, Accessor> = HashMap::new();
    let (done_tx, mut done_rx) = mpsc::unbounded_channel::<(String, GroupVersionKind, AccessError)>();

    loop {
        tokio::select! {
            request = requests.recv() => {
                let Some(request) = request else { break };
                handle_request(&mut accessors, request, done_tx.clone()).await;
            }
            done = done_rx.recv() => {
                let Some((owner_uid, gvk, error)) = done else { continue };
                tracing::warn!(target: "boxcutter::access", owner = owner_uid, ?gvk, %error, "informer failed, tearing down accessor");
                if let Some(accessor) = accessors.remove(&owner_uid) {
                    accessor.cancel.cancel();
                    accessor.cache.shutdown().await;
                }
                let _ = terminal_tx.send(Some(Arc::new(error)));
            }
        }
    }
}

async fn handle_request(
    accessors: &mut HashMap<String, Accessor>,
    request: Request,
    done_tx: mpsc::UnboundedSender<(String, GroupVersionKind, AccessError)>,
) {
    match request {
        Request::GetWithUser {
            owner_uid,
            user_uid,
            gvks,
            client,
            reply,
        } => {
            let accessor = accessors.entry(owner_uid.clone()).or_insert_with(|| {
                let (gvk_done_tx, mut gvk_done_rx) = mpsc::unbounded_channel();
                let cache = Arc::new(TrackingCache::new(client, gvk_done_tx));
                let owner_for_task = owner_uid.clone();
                let forward_done_tx = done_tx.clone();
                tokio::spawn(async move {
                    while let Some((gvk, err)) = gvk_done_rx.recv().await {
                        let _ = forward_done_tx.send((owner_for_task.clone(), gvk, err));
                    }
                });
                Accessor {
                    cache,
                    users: HashMap::new(),
                    cancel: CancellationToken::new(),
                }
            });

            let cache = accessor.cache.clone();
            let mut sync_error = None;
            for gvk in &gvks {
                if let Err(err) = cache.ensure_synced(gvk).await {
                    sync_error = Some(err);
                    break;
                }
            }

            if let Some(err) = sync_error {
                let _ = reply.send(Err(err));
                return;
            }

            accessor.users.insert(user_uid, gvks);
            let referenced = accessor.referenced_gvks();
            cache.remove_other_informers(&referenced).await;

            let _ = reply.send(Ok(()));
        }
        Request::FreeWithUser { owner_uid, user_uid, reply } => {
            if let Some(accessor) = accessors.get_mut(&owner_uid) {
                accessor.users.remove(&user_uid);
                if accessor.users.is_empty() {
                    let accessor = accessors.remove(&owner_uid).expect("just looked up");
                    accessor.cancel.cancel();
                    accessor.cache.shutdown().await;
                } else {
                    let referenced = accessor.referenced_gvks();
                    accessor.cache.remove_other_informers(&referenced).await;
                }
            }
            let _ = reply.send(());
        }
        Request::Free { owner_uid, reply } => {
            if let Some(accessor) = accessors.remove(&owner_uid) {
                accessor.cancel.cancel();
                accessor.cache.shutdown().await;
            }
            let _ = reply.send(());
        }
        Request::Snapshot { reply } => {
            let mut snapshot = Vec::with_capacity(accessors.len());
            for (owner_uid, accessor) in accessors.iter() {
                let mut counts = Vec::new();
                for gvk in accessor.cache.gvks().await {
                    let count = accessor.cache.object_count(&gvk).await;
                    counts.push((gvk, count));
                }
                snapshot.push((owner_uid.clone(), counts));
            }
            let _ = reply.send(snapshot);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn free_of_unknown_owner_is_a_no_op() {
        let manager = AccessManager::spawn();
        assert!(manager.free("never-seen").await.is_ok());
    }

    #[tokio::test]
    async fn terminal_error_starts_empty() {
        let manager = AccessManager::spawn();
        assert!(manager.take_terminal_error().is_none());
    }

    #[tokio::test]
    async fn snapshot_of_empty_manager_is_empty() {
        let manager = AccessManager::spawn();
        assert_eq!(manager.snapshot().await.unwrap(), Vec::new());
    }
}
