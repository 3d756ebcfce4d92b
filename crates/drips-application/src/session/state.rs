use drips_core::search::SearchResultItem;

/// Display state of one search session.
///
/// Owned by [`super::SearchSession`] and only mutated on its task. For a
/// given active query the item list only grows at the tail; switching to a
/// new query empties it first.
#[derive(Debug, Default, Clone)]
pub struct SessionState {
    active_query: Option<String>,
    current_page: usize,
    items: Vec<SearchResultItem>,
    page_fetch_in_flight: bool,
    /// Page whose fetch failed or was cancelled and can be retried.
    interrupted_page: Option<usize>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_query(&self) -> Option<&str> {
        self.active_query.as_deref()
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn items(&self) -> &[SearchResultItem] {
        &self.items
    }

    pub fn is_page_fetch_in_flight(&self) -> bool {
        self.page_fetch_in_flight
    }

    pub fn interrupted_page(&self) -> Option<usize> {
        self.interrupted_page
    }

    /// True when `text` is the query currently being displayed.
    pub fn is_active(&self, text: &str) -> bool {
        self.active_query.as_deref() == Some(text)
    }

    /// Initials of the row at `index`, or `None` past the end.
    pub fn initials_at(&self, index: usize) -> Option<String> {
        self.items.get(index).map(SearchResultItem::initials)
    }

    /// Switches to a new query and empties the list.
    ///
    /// Returns whether any rows were showing before.
    pub fn begin_query(&mut self, text: impl Into<String>) -> bool {
        let had_rows = !self.items.is_empty();
        self.active_query = Some(text.into());
        self.current_page = 0;
        self.items.clear();
        self.page_fetch_in_flight = false;
        self.interrupted_page = None;
        had_rows
    }

    pub fn mark_fetch_started(&mut self) {
        self.page_fetch_in_flight = true;
        self.interrupted_page = None;
    }

    pub fn mark_fetch_finished(&mut self) {
        self.page_fetch_in_flight = false;
    }

    /// Records that the fetch for the current page did not complete.
    pub fn mark_page_interrupted(&mut self) {
        self.page_fetch_in_flight = false;
        self.interrupted_page = Some(self.current_page);
    }

    /// Replaces all rows with the first page of results.
    pub fn replace_items(&mut self, items: Vec<SearchResultItem>) {
        self.items = items;
    }

    /// Appends a page at the tail and returns the index of its first row.
    pub fn append_items(&mut self, items: Vec<SearchResultItem>) -> usize {
        let start = self.items.len();
        self.items.extend(items);
        start
    }

    /// Moves to the next page and returns its number.
    pub fn advance_page(&mut self) -> usize {
        self.current_page += 1;
        self.current_page
    }

    /// Decides whether showing row `index` should pull in the next page.
    ///
    /// True exactly when no page fetch is pending, the last page came back
    /// full (`items == limit * (current_page + 1)`, so more may exist), and
    /// `index` lies within the last `limit / 2` rows. A result count that is
    /// an exact multiple of `limit` therefore costs one extra, empty fetch.
    /// A `limit` below 2 never paginates.
    pub fn should_fetch_next_page(&self, index: usize, limit: usize) -> bool {
        if self.page_fetch_in_flight || self.active_query.is_none() || limit == 0 {
            return false;
        }

        let count = self.items.len();
        let full = self
            .current_page
            .checked_add(1)
            .and_then(|pages| limit.checked_mul(pages));
        if full != Some(count) {
            return false;
        }

        index >= count - limit / 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    const LIMIT: usize = 100;

    fn rows(count: usize) -> Vec<SearchResultItem> {
        (0..count)
            .map(|i| SearchResultItem::new(format!("Row {i}"), Utc::now()))
            .collect()
    }

    fn state_with(count: usize, page: usize) -> SessionState {
        let mut state = SessionState::new();
        state.begin_query("cat");
        for _ in 0..page {
            state.advance_page();
        }
        state.replace_items(rows(count));
        state
    }

    #[test]
    fn test_begin_query_resets_everything() {
        let mut state = state_with(100, 1);
        state.mark_fetch_started();

        assert!(state.begin_query("dog"));
        assert_eq!(state.active_query(), Some("dog"));
        assert_eq!(state.current_page(), 0);
        assert!(state.items().is_empty());
        assert!(!state.is_page_fetch_in_flight());
        assert!(!state.begin_query("dogs"));
    }

    #[test]
    fn test_append_returns_start_index() {
        let mut state = state_with(100, 0);
        let start = state.append_items(rows(40));
        assert_eq!(start, 100);
        assert_eq!(state.items().len(), 140);
    }

    #[test]
    fn test_pagination_threshold_boundary() {
        let state = state_with(100, 0);
        // Last limit/2 rows are 50..=99
        assert!(!state.should_fetch_next_page(49, LIMIT));
        assert!(state.should_fetch_next_page(50, LIMIT));
        assert!(state.should_fetch_next_page(99, LIMIT));
    }

    #[test]
    fn test_pagination_threshold_on_later_page() {
        let state = state_with(200, 1);
        assert!(!state.should_fetch_next_page(149, LIMIT));
        assert!(state.should_fetch_next_page(150, LIMIT));
    }

    #[test]
    fn test_no_pagination_after_short_page() {
        let state = state_with(140, 1);
        assert!(!state.should_fetch_next_page(135, LIMIT));
        assert!(!state.should_fetch_next_page(139, LIMIT));
    }

    #[test]
    fn test_no_pagination_while_fetch_in_flight() {
        let mut state = state_with(100, 0);
        state.mark_fetch_started();
        assert!(!state.should_fetch_next_page(95, LIMIT));
        state.mark_fetch_finished();
        assert!(state.should_fetch_next_page(95, LIMIT));
    }

    #[test]
    fn test_no_pagination_without_query() {
        let mut state = SessionState::new();
        state.replace_items(rows(100));
        assert!(!state.should_fetch_next_page(99, LIMIT));
    }

    #[test]
    fn test_full_page_heuristic_allows_one_extra_fetch() {
        // Exactly 100 results exist: the second page is still requested.
        let state = state_with(100, 0);
        assert!(state.should_fetch_next_page(99, LIMIT));
    }

    #[test]
    fn test_huge_limit_does_not_overflow() {
        let mut state = state_with(0, 0);
        state.advance_page();
        assert!(!state.should_fetch_next_page(0, usize::MAX / 2 + 1));
        assert!(!state.should_fetch_next_page(0, usize::MAX));
    }

    #[test]
    fn test_limit_of_one_never_paginates() {
        let state = state_with(1, 0);
        assert!(!state.should_fetch_next_page(0, 1));
    }

    #[test]
    fn test_interrupted_page_is_cleared_by_next_fetch() {
        let mut state = state_with(100, 0);
        state.advance_page();
        state.mark_fetch_started();
        state.mark_page_interrupted();

        assert_eq!(state.interrupted_page(), Some(1));
        assert!(!state.is_page_fetch_in_flight());

        state.mark_fetch_started();
        assert_eq!(state.interrupted_page(), None);
    }

    #[test]
    fn test_initials_at() {
        let mut state = SessionState::new();
        state.begin_query("x");
        state.replace_items(vec![SearchResultItem::new("My New Title", Utc::now())]);
        assert_eq!(state.initials_at(0).as_deref(), Some("MT"));
        assert_eq!(state.initials_at(1), None);
    }
}
