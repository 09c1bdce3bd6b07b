//! In-memory session of answered questions, shown as a strip of tabs.
//!
//! Tabs are kept in creation order. The strip fits a whole number of fixed-width tabs; the rest
//! overflow into a menu that can be searched and paged. Nothing here performs I/O.

use std::fmt;
use std::str::FromStr;

use serde_json::{Map, Value};
use time::{OffsetDateTime, macros::format_description};

use crate::processing::QueryAnswer;

/// Width of one tab in the strip.
pub const TAB_WIDTH: u32 = 180;
/// Strip width reserved for the overflow button.
pub const STRIP_RESERVED_WIDTH: u32 = 50;
/// Entries shown per overflow menu page.
pub const OVERFLOW_PAGE_SIZE: usize = 5;

/// Identifier of a tab, unique and increasing within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TabId(u64);

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl FromStr for TabId {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let digits = input.trim().trim_start_matches('#');
        digits
            .parse()
            .map(TabId)
            .map_err(|_| format!("'{input}' is not a tab id"))
    }
}

/// One answered question.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryTab {
    /// Session-unique identifier.
    pub id: TabId,
    /// Question as the user typed it.
    pub query: String,
    /// Answer returned by the service.
    pub answer: String,
    /// Metadata of the chunks the answer was grounded on.
    pub sources: Vec<Map<String, Value>>,
    /// Local wall-clock time the answer arrived, `HH:MM:SS`.
    pub timestamp: String,
}

/// Split of the tab list into the strip and the overflow menu.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TabLayout<'a> {
    /// Tabs drawn in the strip.
    pub visible: &'a [QueryTab],
    /// Tabs reachable only through the overflow menu.
    pub overflow: &'a [QueryTab],
}

/// One page of the filtered overflow menu.
#[derive(Debug, Clone, PartialEq)]
pub struct OverflowPage<'a> {
    /// Tabs on the current page.
    pub entries: Vec<&'a QueryTab>,
    /// Zero-based page index.
    pub page: usize,
    /// Number of pages for the current filter; zero when nothing matches.
    pub total_pages: usize,
    /// Number of overflow tabs matching the filter.
    pub matches: usize,
}

/// Client session: tabs, the active selection and overflow menu state.
#[derive(Debug, Clone)]
pub struct TabSession {
    tabs: Vec<QueryTab>,
    active: Option<TabId>,
    next_id: u64,
    strip_width: u32,
    overflow_search: String,
    overflow_page: usize,
}

/// Number of tabs that fit in a strip of `strip_width`.
pub fn max_visible_tabs(strip_width: u32) -> usize {
    (strip_width.saturating_sub(STRIP_RESERVED_WIDTH) / TAB_WIDTH) as usize
}

impl TabSession {
    /// Start an empty session for a strip of `strip_width`.
    pub fn new(strip_width: u32) -> Self {
        Self {
            tabs: Vec::new(),
            active: None,
            next_id: 1,
            strip_width,
            overflow_search: String::new(),
            overflow_page: 0,
        }
    }

    /// Record the outcome of a query.
    ///
    /// Only a successful answer creates a tab; it becomes active and the overflow menu returns to
    /// its first page. A failure is handed back and leaves the session untouched.
    pub fn record_response<E>(
        &mut self,
        query: &str,
        response: Result<QueryAnswer, E>,
    ) -> Result<TabId, E> {
        let answer = response?;
        let id = TabId(self.next_id);
        self.next_id += 1;
        self.tabs.push(QueryTab {
            id,
            query: query.to_string(),
            answer: answer.answer,
            sources: answer.sources,
            timestamp: local_time_label(),
        });
        self.active = Some(id);
        self.overflow_page = 0;
        Ok(id)
    }

    /// Close a tab. When it was active, the newest remaining tab takes over.
    ///
    /// Returns `false` when no tab has `id`.
    pub fn close_tab(&mut self, id: TabId) -> bool {
        let before = self.tabs.len();
        self.tabs.retain(|tab| tab.id != id);
        if self.tabs.len() == before {
            return false;
        }
        if self.active == Some(id) {
            self.active = self.tabs.last().map(|tab| tab.id);
        }
        self.clamp_overflow_page();
        true
    }

    /// Make `id` the active tab. Unknown ids are ignored.
    pub fn select(&mut self, id: TabId) -> bool {
        if self.tabs.iter().any(|tab| tab.id == id) {
            self.active = Some(id);
            true
        } else {
            false
        }
    }

    /// Currently selected tab.
    pub fn active(&self) -> Option<&QueryTab> {
        let id = self.active?;
        self.tabs.iter().find(|tab| tab.id == id)
    }

    /// All tabs, oldest first.
    pub fn tabs(&self) -> &[QueryTab] {
        &self.tabs
    }

    /// Change the strip width.
    pub fn resize(&mut self, strip_width: u32) {
        self.strip_width = strip_width;
        self.clamp_overflow_page();
    }

    /// Current strip width.
    pub fn strip_width(&self) -> u32 {
        self.strip_width
    }

    /// Split tabs between the strip and the overflow menu for the current width.
    pub fn layout(&self) -> TabLayout<'_> {
        let fit = max_visible_tabs(self.strip_width);
        if fit >= self.tabs.len() {
            TabLayout {
                visible: &self.tabs,
                overflow: &[],
            }
        } else {
            let (visible, overflow) = self.tabs.split_at(fit);
            TabLayout { visible, overflow }
        }
    }

    /// Filter the overflow menu by a case-insensitive substring of the question.
    pub fn set_overflow_search(&mut self, search: &str) {
        self.overflow_search = search.to_string();
        self.overflow_page = 0;
    }

    /// Current overflow filter text.
    pub fn overflow_search(&self) -> &str {
        &self.overflow_search
    }

    /// Advance the overflow menu one page, stopping at the last page.
    pub fn next_overflow_page(&mut self) {
        self.overflow_page += 1;
        self.clamp_overflow_page();
    }

    /// Go back one overflow menu page, stopping at the first page.
    pub fn prev_overflow_page(&mut self) {
        self.overflow_page = self.overflow_page.saturating_sub(1);
    }

    /// Current page of the filtered overflow menu.
    pub fn overflow_menu(&self) -> OverflowPage<'_> {
        let filtered = self.filtered_overflow();
        let matches = filtered.len();
        let entries = filtered
            .into_iter()
            .skip(self.overflow_page * OVERFLOW_PAGE_SIZE)
            .take(OVERFLOW_PAGE_SIZE)
            .collect();
        OverflowPage {
            entries,
            page: self.overflow_page,
            total_pages: matches.div_ceil(OVERFLOW_PAGE_SIZE),
            matches,
        }
    }

    fn filtered_overflow(&self) -> Vec<&QueryTab> {
        let needle = self.overflow_search.to_lowercase();
        self.layout()
            .overflow
            .iter()
            .filter(|tab| tab.query.to_lowercase().contains(&needle))
            .collect()
    }

    fn clamp_overflow_page(&mut self) {
        let pages = self.filtered_overflow().len().div_ceil(OVERFLOW_PAGE_SIZE);
        self.overflow_page = self.overflow_page.min(pages.saturating_sub(1));
    }
}

fn local_time_label() -> String {
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    now.format(format_description!("[hour]:[minute]:[second]"))
        .unwrap_or_default()
}
