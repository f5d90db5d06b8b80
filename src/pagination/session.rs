//! Per-message pagination state.
//!
//! A session owns a sorted snapshot of the rows taken when the table command
//! ran. Navigation only moves the page within that snapshot; the store is never
//! consulted again, so a user pages through a frozen view even while writes land.

use std::time::{Duration, Instant};

use crate::error::{BotError, Result};
use crate::models::{Row, RowSetSnapshot, SortColumn};
use crate::table::{
    page_count, paginate, render_clipped_page, render_compact_page, render_page, sort_rows,
    MESSAGE_LIMIT,
};

/// Shown under the header when the table has no rows at all
pub const EMPTY_TABLE_NOTE: &str = "ℹ️ No entries yet.";

/// Discord interaction tokens live 15 minutes; stop editing before that.
pub const MAX_LIFETIME: Duration = Duration::from_secs(14 * 60);

/// Button press on a table view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavEvent {
    Prev,
    Next,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Active { page: usize },
    /// Terminal; keeps the page that was last shown
    Expired { page: usize },
}

impl SessionState {
    pub fn page(&self) -> usize {
        match *self {
            SessionState::Active { page } | SessionState::Expired { page } => page,
        }
    }
}

/// Apply one navigation event.
///
/// Moves are only possible inside `[1, max_page]`; a press on a boundary
/// (where the button is disabled anyway) leaves the state unchanged.
pub fn transition(state: SessionState, event: NavEvent, max_page: usize) -> SessionState {
    match (state, event) {
        (SessionState::Active { page }, NavEvent::Prev) if page > 1 => {
            SessionState::Active { page: page - 1 }
        }
        (SessionState::Active { page }, NavEvent::Next) if page < max_page => {
            SessionState::Active { page: page + 1 }
        }
        (state, _) => state,
    }
}

/// What a message should show for the current state
#[derive(Debug, Clone, PartialEq)]
pub struct PageView {
    pub content: String,
    pub page: usize,
    pub max_page: usize,
    pub prev_disabled: bool,
    pub next_disabled: bool,
}

#[derive(Debug, Clone)]
pub struct PaginationSession {
    rows: RowSetSnapshot,
    page_size: usize,
    max_page: usize,
    state: SessionState,
    created_at: Instant,
    last_activity: Instant,
}

impl PaginationSession {
    /// Sort `rows` once and open the view on `page`.
    ///
    /// An empty table opens on page 1 of 1; any other page without rows is
    /// `PageOutOfRange`.
    pub fn new(
        rows: RowSetSnapshot,
        sort: Option<SortColumn>,
        descending: bool,
        page: i64,
        page_size: usize,
    ) -> Result<Self> {
        Self::new_at(rows, sort, descending, page, page_size, Instant::now())
    }

    pub fn new_at(
        rows: RowSetSnapshot,
        sort: Option<SortColumn>,
        descending: bool,
        page: i64,
        page_size: usize,
        now: Instant,
    ) -> Result<Self> {
        let rows: RowSetSnapshot = match sort {
            Some(column) => sort_rows(&rows, column, descending).into(),
            None => rows,
        };
        let max_page = page_count(rows.len(), page_size);

        let opens_empty_table = rows.is_empty() && page == 1;
        if !opens_empty_table && paginate(&rows, page, page_size).is_empty() {
            return Err(BotError::PageOutOfRange { page, max_page });
        }

        Ok(Self {
            rows,
            page_size,
            max_page,
            // paginate accepted the page, so it is within 1..=max_page
            state: SessionState::Active { page: page as usize },
            created_at: now,
            last_activity: now,
        })
    }

    pub fn max_page(&self) -> usize {
        self.max_page
    }

    pub fn page(&self) -> usize {
        self.state.page()
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, SessionState::Active { .. })
    }

    /// Rows on the current page, sliced from the retained snapshot
    pub fn visible_rows(&self) -> &[Row] {
        paginate(&self.rows, self.page() as i64, self.page_size)
    }

    pub fn render(&self) -> PageView {
        let page = self.page();
        let expired = !self.is_active();
        let footer = if self.rows.is_empty() {
            format!("\n{}\nPage {}/{}", EMPTY_TABLE_NOTE, page, self.max_page)
        } else {
            format!("\nPage {}/{}", page, self.max_page)
        };

        // Fall back to denser layouts until the page fits in one message
        let rows = self.visible_rows();
        let mut content = render_page(rows) + &footer;
        if content.chars().count() > MESSAGE_LIMIT {
            content = render_compact_page(rows) + &footer;
        }
        if content.chars().count() > MESSAGE_LIMIT {
            content = render_clipped_page(rows) + &footer;
        }

        PageView {
            content,
            page,
            max_page: self.max_page,
            prev_disabled: expired || page <= 1,
            next_disabled: expired || page >= self.max_page,
        }
    }

    /// Apply a click and return the view to display. Expired sessions ignore input.
    pub fn handle(&mut self, event: NavEvent, now: Instant) -> PageView {
        if self.is_active() {
            self.state = transition(self.state, event, self.max_page);
            self.last_activity = now;
        }
        self.render()
    }

    pub fn is_expired(&self, now: Instant, idle: Duration) -> bool {
        !self.is_active()
            || now.saturating_duration_since(self.last_activity) >= idle
            || now.saturating_duration_since(self.created_at) >= MAX_LIFETIME
    }

    /// Time left before the session expires, whichever limit comes first
    pub fn remaining(&self, now: Instant, idle: Duration) -> Duration {
        let idle_left = idle.saturating_sub(now.saturating_duration_since(self.last_activity));
        let life_left = MAX_LIFETIME.saturating_sub(now.saturating_duration_since(self.created_at));
        idle_left.min(life_left)
    }

    /// Enter the terminal state; the final view has both controls disabled
    pub fn expire(&mut self) -> PageView {
        self.state = SessionState::Expired { page: self.page() };
        self.render()
    }
}
