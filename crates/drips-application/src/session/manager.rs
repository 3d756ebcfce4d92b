use std::collections::HashMap;
use std::sync::Arc;

use drips_core::avatar::BadgeRenderer;
use drips_core::config::DripsConfig;
use drips_core::error::{DripsError, FetchError, Result};
use drips_core::observer::SessionObserver;
use drips_core::search::{
    FetchHandle, FetchOutcome, SearchFetcher, SearchQuery, SearchResultItem, spawn_fetch,
};
use drips_execution::{AvatarHandle, AvatarRender, AvatarTaskPool};
use tokio::sync::mpsc;
use tokio::time::Instant;
use uuid::Uuid;

use super::cache::AvatarCache;
use super::state::SessionState;

/// Work item for the session task.
///
/// UI events arrive through [`SearchSessionHandle`]; fetch and render
/// completions are sent back by the tasks that produced them.
#[derive(Debug)]
pub(crate) enum SessionCommand {
    QueryTextChanged(String),
    NearEndOfVisibleRange(usize),
    RowsVisible(Vec<usize>),
    RowsHidden(Vec<usize>),
    CancelRequested,
    RetryRequested,
    Shutdown,
    FetchCompleted {
        ticket: u64,
        query: SearchQuery,
        outcome: FetchOutcome,
    },
    AvatarRendered(AvatarRender),
}

/// Cloneable sender side of a [`SearchSession`].
///
/// Every method only enqueues; the session applies commands one at a time in
/// the order they were sent. Fails once the session has been dropped.
#[derive(Debug, Clone)]
pub struct SearchSessionHandle {
    sender: mpsc::UnboundedSender<SessionCommand>,
}

impl SearchSessionHandle {
    pub fn query_text_changed(&self, text: impl Into<String>) -> Result<()> {
        self.send(SessionCommand::QueryTextChanged(text.into()))
    }

    pub fn near_end_of_visible_range(&self, index: usize) -> Result<()> {
        self.send(SessionCommand::NearEndOfVisibleRange(index))
    }

    pub fn rows_visible(&self, rows: Vec<usize>) -> Result<()> {
        self.send(SessionCommand::RowsVisible(rows))
    }

    pub fn rows_hidden(&self, rows: Vec<usize>) -> Result<()> {
        self.send(SessionCommand::RowsHidden(rows))
    }

    pub fn cancel(&self) -> Result<()> {
        self.send(SessionCommand::CancelRequested)
    }

    pub fn retry(&self) -> Result<()> {
        self.send(SessionCommand::RetryRequested)
    }

    pub fn shutdown(&self) -> Result<()> {
        self.send(SessionCommand::Shutdown)
    }

    fn send(&self, command: SessionCommand) -> Result<()> {
        self.sender
            .send(command)
            .map_err(|_| DripsError::internal("search session is no longer running"))
    }
}

struct PendingFetch {
    ticket: u64,
    query: SearchQuery,
    handle: FetchHandle,
}

struct AvatarJob {
    initials: String,
    handle: AvatarHandle,
}

enum Wake {
    Command(Option<SessionCommand>),
    DebounceElapsed,
}

/// Debounced, paginated search over a [`SearchFetcher`] with lazily
/// rendered avatars.
///
/// All state lives on the task that drives the session, either through
/// [`SearchSession::run`] or by calling [`SearchSession::tick`] in a loop.
/// Fetches and renders run on other tasks and report back over the command
/// queue, so observer callbacks are always delivered from the driving task.
///
/// Results are matched to the fetch that is currently pending by ticket and
/// by query text. Anything else is stale and dropped without touching state.
pub struct SearchSession {
    id: Uuid,
    config: DripsConfig,
    state: SessionState,
    fetcher: Arc<dyn SearchFetcher>,
    observer: Arc<dyn SessionObserver>,
    avatars: AvatarTaskPool,
    cache: Arc<AvatarCache>,
    pending_fetch: Option<PendingFetch>,
    debounce_deadline: Option<Instant>,
    /// In-flight renders keyed by row index
    avatar_jobs: HashMap<usize, AvatarJob>,
    next_ticket: u64,
    sender: mpsc::UnboundedSender<SessionCommand>,
    inbox: mpsc::UnboundedReceiver<SessionCommand>,
}

impl SearchSession {
    pub fn new(
        config: DripsConfig,
        fetcher: Arc<dyn SearchFetcher>,
        renderer: Arc<dyn BadgeRenderer>,
        observer: Arc<dyn SessionObserver>,
    ) -> Self {
        let (sender, inbox) = mpsc::unbounded_channel();
        let avatars = AvatarTaskPool::new(
            renderer,
            config.avatar.workers,
            config.avatar.badge_size(),
        );
        let cache = Arc::new(AvatarCache::new(config.avatar.cache_capacity));

        Self {
            id: Uuid::new_v4(),
            config,
            state: SessionState::new(),
            fetcher,
            observer,
            avatars,
            cache,
            pending_fetch: None,
            debounce_deadline: None,
            avatar_jobs: HashMap::new(),
            next_ticket: 0,
            sender,
            inbox,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn cache(&self) -> &Arc<AvatarCache> {
        &self.cache
    }

    pub fn is_debounce_armed(&self) -> bool {
        self.debounce_deadline.is_some()
    }

    pub fn handle(&self) -> SearchSessionHandle {
        SearchSessionHandle {
            sender: self.sender.clone(),
        }
    }

    /// Drives the session until a shutdown command arrives.
    pub async fn run(mut self) {
        tracing::info!("[SearchSession] Session {} started", self.id);
        while self.tick().await {}
        tracing::info!("[SearchSession] Session {} stopped", self.id);
    }

    /// Waits for and applies exactly one command or debounce expiry.
    ///
    /// Returns `false` once the session has shut down.
    pub async fn tick(&mut self) -> bool {
        let wake = match self.debounce_deadline {
            Some(deadline) => tokio::select! {
                biased;
                command = self.inbox.recv() => Wake::Command(command),
                _ = tokio::time::sleep_until(deadline) => Wake::DebounceElapsed,
            },
            None => Wake::Command(self.inbox.recv().await),
        };

        match wake {
            Wake::Command(Some(command)) => self.dispatch(command),
            Wake::Command(None) => false,
            Wake::DebounceElapsed => {
                self.on_debounce_elapsed();
                true
            }
        }
    }

    fn dispatch(&mut self, command: SessionCommand) -> bool {
        match command {
            SessionCommand::QueryTextChanged(text) => self.on_query_text_changed(text),
            SessionCommand::NearEndOfVisibleRange(index) => {
                self.on_near_end_of_visible_range(index)
            }
            SessionCommand::RowsVisible(rows) => self.on_rows_visible(&rows),
            SessionCommand::RowsHidden(rows) => self.on_rows_hidden(&rows),
            SessionCommand::CancelRequested => self.on_cancel_requested(),
            SessionCommand::RetryRequested => self.on_retry_requested(),
            SessionCommand::FetchCompleted {
                ticket,
                query,
                outcome,
            } => self.on_fetch_completed(ticket, query, outcome),
            SessionCommand::AvatarRendered(render) => self.on_avatar_rendered(render),
            SessionCommand::Shutdown => {
                self.shutdown();
                return false;
            }
        }
        true
    }

    /// Switches to `text`, dropping everything tied to the previous query,
    /// and restarts the debounce timer.
    ///
    /// Text shorter than `session.min_query_chars` (after trimming) clears
    /// the list but never reaches the fetcher.
    pub fn on_query_text_changed(&mut self, text: impl Into<String>) {
        let text = text.into();

        self.cancel_pending_fetch();
        self.cancel_avatar_jobs();
        if self.config.session.clear_avatar_cache_on_query_change {
            self.cache.clear();
        }

        if self.state.begin_query(text.clone()) {
            self.observer.on_items_reset(&[]);
        }

        let min_chars = self.config.session.min_query_chars.max(1);
        if text.trim().chars().count() < min_chars {
            tracing::trace!("[SearchSession] Query '{}' too short, not searching", text);
            self.debounce_deadline = None;
            return;
        }

        self.debounce_deadline = Some(Instant::now() + self.config.session.debounce());
    }

    fn on_debounce_elapsed(&mut self) {
        self.debounce_deadline = None;
        let Some(text) = self.state.active_query().map(str::to_string) else {
            return;
        };
        let page = self.state.current_page();
        self.start_fetch(text, page);
    }

    /// Loads the next page when `index` is close enough to the end.
    pub fn on_near_end_of_visible_range(&mut self, index: usize) {
        let limit = self.config.search.limit;
        if !self.state.should_fetch_next_page(index, limit) {
            return;
        }
        let Some(text) = self.state.active_query().map(str::to_string) else {
            return;
        };

        let page = self.state.advance_page();
        tracing::debug!(
            "[SearchSession] Row {} near end of {} rows, fetching page {}",
            index,
            self.state.items().len(),
            page
        );
        self.start_fetch(text, page);
    }

    /// Stops whatever the session is waiting for. Rows stay as they are.
    pub fn on_cancel_requested(&mut self) {
        let debounce_was_armed = self.debounce_deadline.take().is_some();
        let fetch_was_pending = self.cancel_pending_fetch();
        self.cancel_avatar_jobs();

        if debounce_was_armed || fetch_was_pending {
            self.state.mark_page_interrupted();
            tracing::debug!(
                "[SearchSession] Cancelled page {}",
                self.state.current_page()
            );
        }
    }

    /// Re-issues the page that last failed or was cancelled, without debounce.
    pub fn on_retry_requested(&mut self) {
        let Some(page) = self.state.interrupted_page() else {
            tracing::debug!("[SearchSession] Nothing to retry");
            return;
        };
        let Some(text) = self.state.active_query().map(str::to_string) else {
            return;
        };

        tracing::info!("[SearchSession] Retrying '{}' page {}", text, page);
        self.debounce_deadline = None;
        self.start_fetch(text, page);
    }

    /// Ensures a badge is shown or being rendered for each row.
    pub fn on_rows_visible(&mut self, rows: &[usize]) {
        for &index in rows {
            self.request_avatar(index);
        }
    }

    /// Cancels renders for rows that scrolled away.
    pub fn on_rows_hidden(&mut self, rows: &[usize]) {
        for index in rows {
            if let Some(job) = self.avatar_jobs.remove(index) {
                self.avatars.cancel(&job.handle);
            }
        }
    }

    pub fn on_fetch_succeeded(&mut self, query: SearchQuery, items: Vec<SearchResultItem>) {
        if !self.is_current(&query) {
            tracing::debug!(
                "[SearchSession] Discarding stale results for '{}' page {}",
                query.text,
                query.page
            );
            return;
        }
        self.finish_fetch(&query);

        if query.page == 0 {
            tracing::debug!(
                "[SearchSession] '{}' returned {} results",
                query.text,
                items.len()
            );
            self.state.replace_items(items);
            self.observer.on_items_reset(self.state.items());
            return;
        }

        if items.is_empty() {
            tracing::debug!(
                "[SearchSession] '{}' reached the end at page {}",
                query.text,
                query.page
            );
            return;
        }

        let start = self.state.append_items(items);
        self.observer
            .on_items_appended(start, &self.state.items()[start..]);
    }

    pub fn on_fetch_failed(&mut self, query: SearchQuery, error: FetchError) {
        if error.is_cancelled() {
            tracing::trace!(
                "[SearchSession] Ignoring cancelled fetch for '{}' page {}",
                query.text,
                query.page
            );
            return;
        }
        if !self.is_current(&query) {
            tracing::debug!(
                "[SearchSession] Discarding stale error for '{}' page {}: {}",
                query.text,
                query.page,
                error
            );
            return;
        }
        self.finish_fetch(&query);
        self.state.mark_page_interrupted();

        tracing::warn!(
            "[SearchSession] Fetch for '{}' page {} failed: {}",
            query.text,
            query.page,
            error
        );
        self.observer.on_error(&error.to_string());
    }

    fn on_fetch_completed(&mut self, ticket: u64, query: SearchQuery, outcome: FetchOutcome) {
        let is_pending = self
            .pending_fetch
            .as_ref()
            .is_some_and(|pending| pending.ticket == ticket);
        if !is_pending {
            tracing::trace!(
                "[SearchSession] Ignoring superseded fetch #{} for '{}'",
                ticket,
                query.text
            );
            return;
        }

        match outcome {
            Ok(items) => self.on_fetch_succeeded(query, items),
            Err(error) => self.on_fetch_failed(query, error),
        }
    }

    fn start_fetch(&mut self, text: String, page: usize) {
        self.cancel_pending_fetch();

        self.next_ticket += 1;
        let ticket = self.next_ticket;
        let query = SearchQuery::new(text, page);
        tracing::debug!(
            "[SearchSession] Fetch #{} for '{}' page {}",
            ticket,
            query.text,
            page
        );

        let sender = self.sender.clone();
        let handle = spawn_fetch(
            Arc::clone(&self.fetcher),
            query.clone(),
            move |query, outcome| {
                let _ = sender.send(SessionCommand::FetchCompleted {
                    ticket,
                    query,
                    outcome,
                });
            },
        );

        self.state.mark_fetch_started();
        self.pending_fetch = Some(PendingFetch {
            ticket,
            query,
            handle,
        });
    }

    /// True when `query` is for the active text and the current page.
    fn is_current(&self, query: &SearchQuery) -> bool {
        self.state.is_active(&query.text) && query.page == self.state.current_page()
    }

    fn finish_fetch(&mut self, query: &SearchQuery) {
        if self
            .pending_fetch
            .as_ref()
            .is_some_and(|pending| &pending.query == query)
        {
            self.pending_fetch = None;
        }
        self.state.mark_fetch_finished();
    }

    /// Returns whether a fetch was actually pending.
    fn cancel_pending_fetch(&mut self) -> bool {
        match self.pending_fetch.take() {
            Some(pending) => {
                pending.handle.cancel();
                self.state.mark_fetch_finished();
                true
            }
            None => false,
        }
    }

    fn request_avatar(&mut self, index: usize) {
        let Some(initials) = self.state.initials_at(index) else {
            return;
        };
        if initials.is_empty() {
            return;
        }

        if let Some(image) = self.cache.get(&initials) {
            self.observer.on_avatar_ready(index, image);
            return;
        }

        if let Some(job) = self.avatar_jobs.get(&index) {
            if job.initials == initials && !job.handle.is_cancelled() {
                return;
            }
            job.handle.cancel();
        }

        let sender = self.sender.clone();
        let handle = self.avatars.submit(index, initials.clone(), move |render| {
            let _ = sender.send(SessionCommand::AvatarRendered(render));
        });
        self.avatar_jobs.insert(index, AvatarJob { initials, handle });
    }

    fn on_avatar_rendered(&mut self, render: AvatarRender) {
        let index = render.handle.key();
        if self
            .avatar_jobs
            .get(&index)
            .is_some_and(|job| job.handle.id() == render.handle.id())
        {
            self.avatar_jobs.remove(&index);
        }

        if render.is_cancelled() {
            tracing::trace!(
                "[SearchSession] Dropping cancelled avatar '{}' for row {}",
                render.initials,
                index
            );
            return;
        }

        // The job is already forgotten, so showing the row again resubmits.
        let Some(image) = render.image else {
            tracing::debug!(
                "[SearchSession] No avatar '{}' for row {}, render failed",
                render.initials,
                index
            );
            return;
        };

        self.cache.put(render.initials.clone(), image.clone());

        if self.state.initials_at(index).as_deref() == Some(render.initials.as_str()) {
            self.observer.on_avatar_ready(index, image);
        } else {
            tracing::trace!(
                "[SearchSession] Row {} no longer shows '{}', avatar cached only",
                index,
                render.initials
            );
        }
    }

    fn cancel_avatar_jobs(&mut self) {
        self.avatars.cancel_all();
        self.avatar_jobs.clear();
    }

    fn shutdown(&mut self) {
        self.debounce_deadline = None;
        self.cancel_pending_fetch();
        self.cancel_avatar_jobs();
        tracing::debug!("[SearchSession] Session {} shutting down", self.id);
    }
}
