//! Search domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One page of a text search. This is the unit a fetcher works on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Free text exactly as the user typed it
    pub text: String,

    /// Zero-based page number
    pub page: usize,
}

impl SearchQuery {
    /// Creates a query for the given page.
    pub fn new(text: impl Into<String>, page: usize) -> Self {
        Self {
            text: text.into(),
            page,
        }
    }

    /// Creates a query for the first page.
    pub fn first_page(text: impl Into<String>) -> Self {
        Self::new(text, 0)
    }

    /// Result offset of this page for a given page size. Saturates instead
    /// of overflowing.
    pub fn offset(&self, limit: usize) -> usize {
        self.page.saturating_mul(limit)
    }
}

/// A single search hit.
///
/// Two items with the same title are still distinct rows; the title only
/// matters for deriving the avatar key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResultItem {
    /// Article title, never empty
    pub title: String,

    /// Last edit time of the article
    pub timestamp: DateTime<Utc>,
}

impl SearchResultItem {
    pub fn new(title: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            title: title.into(),
            timestamp,
        }
    }

    /// Avatar key for this item. See [`initials`].
    pub fn initials(&self) -> String {
        initials(&self.title)
    }

    /// Edit time formatted for display, e.g. `3:04 PM, Saturday, April 01, 2017`.
    pub fn edited_label(&self) -> String {
        self.timestamp.format("%-I:%M %p, %A, %B %d, %Y").to_string()
    }
}

/// Derives badge initials from a title.
///
/// Takes the first letter of the first whitespace-separated word and, when
/// there is more than one word, the first letter of the last word, both
/// uppercased. A blank title yields an empty string, meaning "no avatar".
pub fn initials(title: &str) -> String {
    let mut words = title.split_whitespace();
    let Some(first) = words.next() else {
        return String::new();
    };

    let mut out = String::new();
    push_upper_initial(&mut out, first);
    if let Some(last) = words.last() {
        push_upper_initial(&mut out, last);
    }
    out
}

fn push_upper_initial(out: &mut String, word: &str) {
    if let Some(c) = word.chars().next() {
        out.extend(c.to_uppercase());
    }
}
