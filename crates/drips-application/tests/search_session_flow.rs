use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use drips_application::SearchSession;
use drips_core::avatar::{AvatarImage, BadgeRenderer, BadgeSize};
use drips_core::config::DripsConfig;
use drips_core::observer::{ChannelObserver, SessionEvent};
use drips_core::search::{FetchOutcome, SearchFetcher, SearchQuery, SearchResultItem};

/// Serves fixed page sizes per (text, page).
struct PagedFetcher {
    pages: HashMap<(String, usize), usize>,
    calls: Mutex<Vec<SearchQuery>>,
}

impl PagedFetcher {
    fn new(pages: &[(&str, usize, usize)]) -> Arc<Self> {
        Arc::new(Self {
            pages: pages
                .iter()
                .map(|(text, page, count)| ((text.to_string(), *page), *count))
                .collect(),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<SearchQuery> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SearchFetcher for PagedFetcher {
    async fn fetch(&self, query: &SearchQuery) -> FetchOutcome {
        self.calls.lock().unwrap().push(query.clone());
        let count = self
            .pages
            .get(&(query.text.clone(), query.page))
            .copied()
            .unwrap_or(0);
        Ok((0..count)
            .map(|i| {
                let title = format!("{} page {} item {}", query.text, query.page, i);
                SearchResultItem::new(title, Utc::now())
            })
            .collect())
    }
}

struct TextRenderer;

impl BadgeRenderer for TextRenderer {
    fn render(&self, text: &str, size: BadgeSize) -> AvatarImage {
        AvatarImage::new(text, size, "text/plain", text.as_bytes().to_vec())
    }
}

async fn settle(session: &mut SearchSession) {
    while let Ok(true) = tokio::time::timeout(Duration::from_secs(1), session.tick()).await {}
}

#[tokio::test(start_paused = true)]
async fn test_cat_scrolls_to_the_end_of_results() {
    let fetcher = PagedFetcher::new(&[("cat", 0, 100), ("cat", 1, 40)]);
    let (observer, mut events) = ChannelObserver::channel();
    let mut session = SearchSession::new(
        DripsConfig::default(),
        fetcher.clone(),
        Arc::new(TextRenderer),
        Arc::new(observer),
    );
    let handle = session.handle();

    handle.query_text_changed("cat").unwrap();
    settle(&mut session).await;

    match events.try_recv().unwrap() {
        SessionEvent::ItemsReset { items } => assert_eq!(items.len(), 100),
        other => panic!("Expected ItemsReset, got {other:?}"),
    }
    assert_eq!(session.state().current_page(), 0);

    handle.near_end_of_visible_range(95).unwrap();
    settle(&mut session).await;

    match events.try_recv().unwrap() {
        SessionEvent::ItemsAppended { start_index, items } => {
            assert_eq!(start_index, 100);
            assert_eq!(items.len(), 40);
            assert_eq!(items[0].title, "cat page 1 item 0");
        }
        other => panic!("Expected ItemsAppended, got {other:?}"),
    }

    // 140 rows is short of two full pages, so the end has been reached.
    handle.near_end_of_visible_range(135).unwrap();
    settle(&mut session).await;

    assert!(events.try_recv().is_err());
    assert_eq!(
        fetcher.calls(),
        vec![SearchQuery::new("cat", 0), SearchQuery::new("cat", 1)]
    );
    assert_eq!(session.state().items().len(), 140);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_running_session_reports_results_and_avatars() {
    let fetcher = PagedFetcher::new(&[("rust lang", 0, 2)]);
    let (observer, mut events) = ChannelObserver::channel();
    let mut config = DripsConfig::default();
    config.session.debounce_ms = 20;

    let session = SearchSession::new(config, fetcher, Arc::new(TextRenderer), Arc::new(observer));
    let handle = session.handle();
    let task = tokio::spawn(session.run());

    handle.query_text_changed("rust lang").unwrap();
    let reset = tokio::time::timeout(Duration::from_secs(5), events.recv())
        .await
        .expect("Session should answer")
        .unwrap();
    assert!(matches!(reset, SessionEvent::ItemsReset { ref items } if items.len() == 2));

    handle.rows_visible(vec![0, 1]).unwrap();
    let mut ready = Vec::new();
    while ready.len() < 2 {
        let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .expect("Avatars should be rendered")
            .unwrap();
        if let SessionEvent::AvatarReady { index, image } = event {
            assert_eq!(image.initials(), format!("R{index}"));
            ready.push(index);
        }
    }
    ready.sort_unstable();
    assert_eq!(ready, vec![0, 1]);

    handle.shutdown().unwrap();
    task.await.unwrap();
    assert!(handle.retry().is_err());
}
