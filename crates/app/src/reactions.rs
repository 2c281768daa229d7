use std::{
    collections::BTreeMap,
    convert::Infallible,
    pin::Pin,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    task::{Context, Poll},
};

use axum::response::sse::Event;
use chrono::{DateTime, Utc};
use metrics::{counter, gauge};
use serde::Serialize;
use tokio::sync::{broadcast, Mutex};
use tokio_stream::{
    wrappers::{errors::BroadcastStreamRecvError, BroadcastStream},
    Stream, StreamExt,
};
use tracing::{info, warn};

use jobboard_core::reactions::{ReactionChange, RestoreOutcome};
use jobboard_core::{JobId, Reaction, ReactionStore, STORAGE_KEY};
use jobboard_storage::KeyValueRepository;

const BROADCAST_BUFFER: usize = 256;
const SNAPSHOT_EVENT: &str = "reactions.snapshot";
const CHANGE_EVENT: &str = "reaction.changed";

pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Change notification delivered to subscribers.
#[derive(Debug, Clone, Serialize)]
pub struct ReactionEvent {
    pub version: u64,
    pub at: DateTime<Utc>,
    #[serde(flatten)]
    pub change: ReactionChange,
}

/// Full mapping at a given version.
#[derive(Debug, Clone, Serialize)]
pub struct ReactionSnapshot {
    pub version: u64,
    pub reactions: BTreeMap<JobId, Reaction>,
}

struct HubState {
    store: ReactionStore,
    version: u64,
}

struct HubInner {
    state: Mutex<HubState>,
    kv: KeyValueRepository,
    sender: broadcast::Sender<Arc<ReactionEvent>>,
    clock: Clock,
    subscribers: AtomicUsize,
}

/// Process-wide reaction store: read, mutate and subscribe.
///
/// Every mutation writes the whole mapping to the key-value table before it
/// returns. Write failures are logged and the in-memory mapping stays
/// authoritative. Mutations are serialized by one lock, which is also held
/// while persisting so stored values follow mutation order.
#[derive(Clone)]
pub struct ReactionHub {
    inner: Arc<HubInner>,
}

impl ReactionHub {
    /// Rehydrates the store from the key-value table. Unreadable values start
    /// an empty store and are dropped from storage.
    pub async fn load(kv: KeyValueRepository, clock: Clock) -> Self {
        let raw = match kv.get(STORAGE_KEY).await {
            Ok(value) => value,
            Err(err) => {
                warn!(stage = "reactions", error = %err, "failed to read stored reactions; starting empty");
                None
            }
        };

        let (store, outcome) = ReactionStore::restore(raw.as_deref());
        match outcome {
            RestoreOutcome::Empty => {
                info!(stage = "reactions", "no stored reactions");
            }
            RestoreOutcome::Restored(entries) => {
                info!(stage = "reactions", entries, "reactions restored");
            }
            RestoreOutcome::Corrupt(reason) => {
                warn!(stage = "reactions", %reason, "stored reactions are malformed; discarding");
                if let Err(err) = kv.remove(STORAGE_KEY).await {
                    warn!(stage = "reactions", error = %err, "failed to drop malformed reactions");
                }
            }
        }

        let (sender, _) = broadcast::channel(BROADCAST_BUFFER);
        Self {
            inner: Arc::new(HubInner {
                state: Mutex::new(HubState { store, version: 0 }),
                kv,
                sender,
                clock,
                subscribers: AtomicUsize::new(0),
            }),
        }
    }

    pub async fn get(&self, job_id: &JobId) -> Option<Reaction> {
        self.inner.state.lock().await.store.get(job_id)
    }

    /// Copy of the current store, for deriving views.
    pub async fn store(&self) -> ReactionStore {
        self.inner.state.lock().await.store.clone()
    }

    pub async fn snapshot(&self) -> ReactionSnapshot {
        snapshot_of(&self.inner).await
    }

    pub async fn toggle_like(&self, job_id: &JobId) -> ReactionChange {
        self.apply(|store| store.toggle_like(job_id)).await
    }

    pub async fn toggle_dislike(&self, job_id: &JobId) -> ReactionChange {
        self.apply(|store| store.toggle_dislike(job_id)).await
    }

    pub async fn clear(&self, job_id: &JobId) -> ReactionChange {
        self.apply(|store| store.clear(job_id)).await
    }

    pub async fn clear_all(&self) -> ReactionChange {
        self.apply(ReactionStore::clear_all).await
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<ReactionEvent>> {
        self.inner.sender.subscribe()
    }

    /// SSE stream that opens with a snapshot and then follows every change.
    /// A subscriber that falls behind the broadcast buffer gets a fresh
    /// snapshot in place of the changes it missed.
    pub async fn stream(&self) -> Result<ReactionStream, serde_json::Error> {
        let (receiver, snapshot) = {
            let state = self.inner.state.lock().await;
            let receiver = self.subscribe();
            let snapshot = ReactionSnapshot {
                version: state.version,
                reactions: state.store.entries().clone(),
            };
            (receiver, snapshot)
        };

        let initial = snapshot_event(&snapshot)?;

        let hub = self.inner.clone();
        let live = BroadcastStream::new(receiver)
            .then(move |result| {
                let hub = hub.clone();
                async move {
                    match result {
                        Ok(event) => change_event(&event),
                        Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                            warn!(stage = "reactions", skipped, "reaction subscriber lagged; resending snapshot");
                            snapshot_event(&snapshot_of(&hub).await)
                        }
                    }
                }
            })
            .filter_map(|result| match result {
                Ok(sse) => Some(Ok(sse)),
                Err(err) => {
                    warn!(stage = "reactions", error = %err, "failed to serialize reaction event");
                    None
                }
            });

        let stream = tokio_stream::iter(vec![Ok::<_, Infallible>(initial)]).chain(live);
        Ok(ReactionStream {
            inner: Box::pin(stream),
            _guard: SubscriberGuard::new(self.inner.clone()),
        })
    }

    async fn apply<F>(&self, mutate: F) -> ReactionChange
    where
        F: FnOnce(&mut ReactionStore) -> ReactionChange,
    {
        let mut state = self.inner.state.lock().await;
        let change = mutate(&mut state.store);
        self.persist(&state.store).await;
        counter!("reaction_mutations_total", "action" => change.action.as_str()).increment(1);

        let changed = change.changed();
        if changed {
            state.version += 1;
            let event = Arc::new(ReactionEvent {
                version: state.version,
                at: (self.inner.clock)(),
                change: change.clone(),
            });
            // No receivers is not an error.
            let _ = self.inner.sender.send(event);
        }
        drop(state);

        info!(
            stage = "reactions",
            action = change.action.as_str(),
            job_id = change.job_id.as_ref().map(JobId::as_str).unwrap_or("*"),
            current = change.current.map(Reaction::as_str).unwrap_or("none"),
            changed,
            "reaction updated"
        );
        change
    }

    async fn persist(&self, store: &ReactionStore) {
        let encoded = match store.to_json() {
            Ok(value) => value,
            Err(err) => {
                counter!("reaction_persist_failures_total").increment(1);
                warn!(stage = "reactions", error = %err, "failed to encode reactions");
                return;
            }
        };

        if let Err(err) = self
            .inner
            .kv
            .put(STORAGE_KEY, &encoded, (self.inner.clock)())
            .await
        {
            counter!("reaction_persist_failures_total").increment(1);
            warn!(stage = "reactions", error = %err, "failed to persist reactions; keeping in-memory state");
        }
    }
}

async fn snapshot_of(inner: &HubInner) -> ReactionSnapshot {
    let state = inner.state.lock().await;
    ReactionSnapshot {
        version: state.version,
        reactions: state.store.entries().clone(),
    }
}

fn snapshot_event(snapshot: &ReactionSnapshot) -> Result<Event, serde_json::Error> {
    Ok(Event::default()
        .id(snapshot.version.to_string())
        .event(SNAPSHOT_EVENT)
        .data(serde_json::to_string(snapshot)?))
}

fn change_event(event: &ReactionEvent) -> Result<Event, serde_json::Error> {
    Ok(Event::default()
        .id(event.version.to_string())
        .event(CHANGE_EVENT)
        .data(serde_json::to_string(event)?))
}

pub struct ReactionStream {
    inner: Pin<Box<dyn Stream<Item = Result<Event, Infallible>> + Send>>,
    _guard: SubscriberGuard,
}

impl Stream for ReactionStream {
    type Item = Result<Event, Infallible>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        this.inner.as_mut().poll_next(cx)
    }
}

struct SubscriberGuard {
    hub: Arc<HubInner>,
}

impl SubscriberGuard {
    fn new(hub: Arc<HubInner>) -> Self {
        let value = hub.subscribers.fetch_add(1, Ordering::SeqCst) + 1;
        gauge!("reaction_subscribers").set(value as f64);
        Self { hub }
    }
}

impl Drop for SubscriberGuard {
    fn drop(&mut self) {
        let value = self
            .hub
            .subscribers
            .fetch_sub(1, Ordering::SeqCst)
            .saturating_sub(1);
        gauge!("reaction_subscribers").set(value as f64);
    }
}
