use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::{CachedFetcher, DataSource, FetchRequest, Fetched};
use crate::api::FetchError;

/// Observable state of a `UseFetch`.
#[derive(Debug, Clone)]
pub struct FetchState<T> {
    /// Last successfully loaded value. Kept across failed refetches.
    pub data: Option<T>,
    pub is_loading: bool,
    pub error: Option<Arc<FetchError>>,
    pub source: Option<DataSource>,
    pub cached_at: Option<DateTime<Utc>>,
}

impl<T> Default for FetchState<T> {
    fn default() -> Self {
        Self {
            data: None,
            is_loading: false,
            error: None,
            source: None,
            cached_at: None,
        }
    }
}

/// Reactive wrapper around `CachedFetcher` for one consumer.
///
/// Each activation is tagged with a generation number. A result is applied
/// only when its generation is still current, so a slow response for an
/// earlier request never overwrites state for a newer one.
pub struct UseFetch<T> {
    fetcher: CachedFetcher,
    state: Arc<watch::Sender<FetchState<T>>>,
    generation: Arc<AtomicU64>,
    request: Option<FetchRequest>,
    task: Option<JoinHandle<()>>,
}

impl<T> UseFetch<T>
where
    T: DeserializeOwned + Serialize + Clone + Send + Sync + 'static,
{
    pub fn new(fetcher: CachedFetcher) -> Self {
        let (tx, _rx) = watch::channel(FetchState::default());
        Self {
            fetcher,
            state: Arc::new(tx),
            generation: Arc::new(AtomicU64::new(0)),
            request: None,
            task: None,
        }
    }

    /// Point this consumer at `request`. Setting a request equal to the
    /// current one does nothing; returns whether a fetch was started.
    pub fn set_request(&mut self, request: FetchRequest) -> bool {
        if self.request.as_ref() == Some(&request) {
            return false;
        }
        self.request = Some(request);
        self.activate();
        true
    }

    pub fn request(&self) -> Option<&FetchRequest> {
        self.request.as_ref()
    }

    /// Re-run the current request. With `invalidate`, its cache entry is
    /// removed first so the network is consulted.
    pub fn refetch(&mut self, invalidate: bool) {
        let Some(request) = self.request.as_ref() else {
            return;
        };
        if invalidate {
            if let Some(key) = request.cache_key() {
                if let Err(e) = self.fetcher.invalidate(key) {
                    warn!(key = key, error = %e, "Failed to invalidate cache entry");
                }
            }
        }
        self.activate();
    }

    pub fn state(&self) -> FetchState<T> {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<FetchState<T>> {
        self.state.subscribe()
    }

    /// Wait until the current activation has finished loading.
    pub async fn settled(&self) -> FetchState<T> {
        let mut rx = self.state.subscribe();
        let settled = match rx.wait_for(|s| !s.is_loading).await {
            Ok(state) => state.clone(),
            Err(_) => self.state(),
        };
        settled
    }

    fn activate(&mut self) {
        let Some(request) = self.request.clone() else {
            return;
        };

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(task) = self.task.take() {
            task.abort();
        }

        self.state.send_modify(|s| {
            s.is_loading = true;
            s.error = None;
        });

        let fetcher = self.fetcher.clone();
        let state = Arc::clone(&self.state);
        let current = Arc::clone(&self.generation);

        self.task = Some(tokio::spawn(async move {
            let result = fetcher.fetch::<T>(&request).await;
            if !apply_result(&state, &current, generation, &request, result) {
                debug!(url = %request.url, generation, "Discarding result for superseded request");
            }
        }));
    }
}

/// Publish `result` into `state` if `generation` is still the current one.
/// Returns whether the state was updated.
fn apply_result<T>(
    state: &watch::Sender<FetchState<T>>,
    current: &AtomicU64,
    generation: u64,
    request: &FetchRequest,
    result: Result<Option<Fetched<T>>, FetchError>,
) -> bool {
    // Checked under the channel's write lock so a concurrent activation
    // cannot slip in between check and write.
    state.send_if_modified(|s| {
        if current.load(Ordering::SeqCst) != generation {
            return false;
        }
        match result {
            Ok(Some(fetched)) => {
                s.data = Some(fetched.data);
                s.source = Some(fetched.source);
                s.cached_at = fetched.cached_at;
            }
            Ok(None) => {}
            Err(e) => {
                warn!(url = %request.url, error = %e, "Fetch failed");
                s.error = Some(Arc::new(e));
            }
        }
        s.is_loading = false;
        true
    })
}

impl<T> Drop for UseFetch<T> {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
