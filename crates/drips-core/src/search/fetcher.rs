//! Search fetcher trait and cancellable fetch tasks.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::FetchError;
use crate::search::{SearchQuery, SearchResultItem};

/// Outcome of one page fetch.
pub type FetchOutcome = std::result::Result<Vec<SearchResultItem>, FetchError>;

/// Performs one page of a paginated text search against a remote API.
#[async_trait]
pub trait SearchFetcher: Send + Sync {
    /// Fetches the page described by `query`.
    ///
    /// Items that cannot be parsed are dropped rather than failing the whole
    /// page, so a successful result may be shorter than the page size even
    /// when more results exist.
    async fn fetch(&self, query: &SearchQuery) -> FetchOutcome;
}

/// Handle to a fetch started with [`spawn_fetch`].
#[derive(Debug, Clone)]
pub struct FetchHandle {
    token: CancellationToken,
}

impl FetchHandle {
    /// Requests cancellation. The completion callback then receives
    /// [`FetchError::Cancelled`]; the HTTP request itself is dropped at its
    /// next await point.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Runs `fetcher.fetch(query)` on a tokio task and hands the outcome to
/// `on_complete` on that task.
///
/// `on_complete` is always called exactly once. If [`FetchHandle::cancel`]
/// was called before the outcome is delivered, the outcome is
/// `Err(FetchError::Cancelled)` regardless of what the fetcher returned.
pub fn spawn_fetch<F>(
    fetcher: Arc<dyn SearchFetcher>,
    query: SearchQuery,
    on_complete: F,
) -> FetchHandle
where
    F: FnOnce(SearchQuery, FetchOutcome) + Send + 'static,
{
    let token = CancellationToken::new();
    let guard = token.clone();

    tokio::spawn(async move {
        let outcome = tokio::select! {
            biased;
            _ = guard.cancelled() => Err(FetchError::Cancelled),
            result = fetcher.fetch(&query) => result,
        };

        let outcome = if guard.is_cancelled() {
            tracing::debug!(
                "[SearchFetcher] Fetch for '{}' page {} cancelled",
                query.text,
                query.page
            );
            Err(FetchError::Cancelled)
        } else {
            outcome
        };

        on_complete(query, outcome);
    });

    FetchHandle { token }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::Mutex;
    use tokio::sync::oneshot;

    struct StaticFetcher {
        calls: Mutex<Vec<SearchQuery>>,
    }

    impl StaticFetcher {
        fn new() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl SearchFetcher for StaticFetcher {
        async fn fetch(&self, query: &SearchQuery) -> FetchOutcome {
            self.calls.lock().unwrap().push(query.clone());
            Ok(vec![SearchResultItem::new(
                format!("{} result", query.text),
                Utc::now(),
            )])
        }
    }

    #[tokio::test]
    async fn test_spawn_fetch_delivers_outcome() {
        let fetcher = Arc::new(StaticFetcher::new());
        let (tx, rx) = oneshot::channel();

        let handle = spawn_fetch(fetcher.clone(), SearchQuery::new("cat", 2), move |q, o| {
            let _ = tx.send((q, o));
        });

        let (query, outcome) = rx.await.unwrap();
        assert_eq!(query, SearchQuery::new("cat", 2));
        assert_eq!(outcome.unwrap()[0].title, "cat result");
        assert!(!handle.is_cancelled());
        assert_eq!(fetcher.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_cancel_before_start_reports_cancelled() {
        let fetcher = Arc::new(StaticFetcher::new());
        let (tx, rx) = oneshot::channel();

        let handle = spawn_fetch(fetcher.clone(), SearchQuery::first_page("dog"), move |_, o| {
            let _ = tx.send(o);
        });
        // The current-thread test runtime has not polled the task yet.
        handle.cancel();

        let outcome = rx.await.unwrap();
        assert_eq!(outcome, Err(FetchError::Cancelled));
        assert!(handle.is_cancelled());
        assert!(fetcher.calls.lock().unwrap().is_empty());
    }
}
