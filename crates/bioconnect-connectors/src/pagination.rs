//! Multi-page result traversal.
//!
//! A [`PaginationState`] moves through
//! `Initialized → Fetching → {HasMore | Exhausted | Capped}`; `HasMore` loops
//! back to `Fetching`. Exhausted and capped states are terminal and produce no
//! further requests.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::spec::{PaginationSpec, PaginationStyle};

/// Hard page cap when a specification does not set one.
pub const DEFAULT_MAX_PAGES: u32 = 50;
pub const DEFAULT_PAGE_SIZE: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaginationPhase {
    Initialized,
    Fetching,
    HasMore,
    /// The source ran dry or the caller's limit was reached.
    Exhausted,
    /// Stopped by the page cap with results possibly remaining.
    Capped,
}

impl PaginationPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, PaginationPhase::Exhausted | PaginationPhase::Capped)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaginationState {
    pub query: String,
    /// Next page to request, 1-based.
    pub page: u32,
    pub page_size: usize,
    pub total_pages: Option<u64>,
    pub total_results: Option<u64>,
    /// Cursor for cursor-style APIs.
    pub last_id: Option<String>,
    pub has_more: bool,
    pub metadata: serde_json::Map<String, Value>,
    /// Items accepted so far, never more than `limit`.
    pub fetched: usize,
    pub limit: usize,
    pub phase: PaginationPhase,
}

/// Parameters for the next page request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub offset: usize,
    pub page_size: usize,
    pub cursor: Option<String>,
}

/// What a fetched page reported.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageResponse {
    pub returned: usize,
    pub total_results: Option<u64>,
    pub total_pages: Option<u64>,
    pub next_cursor: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaginationStrategy {
    style: PaginationStyle,
    page_size: usize,
    max_pages: u32,
    initial_cursor: Option<String>,
}

impl Default for PaginationStrategy {
    fn default() -> Self {
        Self {
            style: PaginationStyle::Page,
            page_size: DEFAULT_PAGE_SIZE,
            max_pages: DEFAULT_MAX_PAGES,
            initial_cursor: None,
        }
    }
}

impl From<&PaginationSpec> for PaginationStrategy {
    fn from(spec: &PaginationSpec) -> Self {
        Self {
            style: spec.style,
            page_size: spec.page_size.max(1),
            max_pages: spec.max_pages,
            initial_cursor: spec.initial_cursor.clone(),
        }
    }
}

impl PaginationStrategy {
    pub fn new(style: PaginationStyle, page_size: usize, max_pages: u32) -> Self {
        Self { style, page_size: page_size.max(1), max_pages, initial_cursor: None }
    }

    pub fn with_initial_cursor(mut self, cursor: impl Into<String>) -> Self {
        self.initial_cursor = Some(cursor.into());
        self
    }

    pub fn style(&self) -> PaginationStyle {
        self.style
    }

    pub fn max_pages(&self) -> u32 {
        self.max_pages
    }

    pub fn initialize(&self, query: &str, limit: usize) -> PaginationState {
        let done = limit == 0 || self.max_pages == 0;
        PaginationState {
            query: query.to_string(),
            page: 1,
            page_size: self.page_size,
            total_pages: None,
            total_results: None,
            last_id: self.initial_cursor.clone(),
            has_more: !done,
            metadata: serde_json::Map::new(),
            fetched: 0,
            limit,
            phase: if done { PaginationPhase::Exhausted } else { PaginationPhase::Initialized },
        }
    }

    /// Request for the next page, or `None` once the state is terminal.
    pub fn next_page(&self, state: &mut PaginationState) -> Option<PageRequest> {
        if !state.has_more || state.phase.is_terminal() {
            return None;
        }
        let remaining = state.limit.saturating_sub(state.fetched);
        // A page number only addresses the right items at a fixed page size;
        // the caller trims the surplus instead.
        let page_size = match self.style {
            PaginationStyle::Page => self.page_size,
            PaginationStyle::Offset | PaginationStyle::Cursor => self.page_size.min(remaining),
        };
        state.phase = PaginationPhase::Fetching;
        Some(PageRequest {
            page: state.page,
            offset: state.fetched,
            page_size,
            cursor: state.last_id.clone(),
        })
    }

    /// Fold a fetched page into `state`.
    pub fn update_state(&self, state: &mut PaginationState, response: PageResponse) {
        state.page += 1;
        if response.total_results.is_some() {
            state.total_results = response.total_results;
        }
        if response.total_pages.is_some() {
            state.total_pages = response.total_pages;
        }

        let cursor_stalled = self.style == PaginationStyle::Cursor
            && match &response.next_cursor {
                None => true,
                Some(next) => state.last_id.as_deref() == Some(next.as_str()),
            };
        if response.next_cursor.is_some() {
            state.last_id = response.next_cursor;
        }

        let remaining = state.limit.saturating_sub(state.fetched);
        state.fetched += response.returned.min(remaining);

        state.phase = if response.returned == 0 || cursor_stalled {
            debug!(query = state.query.as_str(), fetched = state.fetched, "Source exhausted");
            PaginationPhase::Exhausted
        } else if state.fetched >= state.limit {
            debug!(query = state.query.as_str(), limit = state.limit, "Result limit reached");
            PaginationPhase::Exhausted
        } else if state.page > self.max_pages {
            warn!(
                query = state.query.as_str(),
                max_pages = self.max_pages,
                fetched = state.fetched,
                "Page cap reached, stopping pagination"
            );
            PaginationPhase::Capped
        } else {
            PaginationPhase::HasMore
        };
        state.has_more = state.phase == PaginationPhase::HasMore;
    }
}
