//! Page cursors shared by the top-level list and the per-parent reply lists.
//!
//! Two disciplines use the same [`PageState`]:
//!
//! - accumulating (top level): each next page is appended, the page number
//!   only grows;
//! - windowed (replies): each page replaces the visible window, the page
//!   number moves one step either way and never drops below 1.
//!
//! `has_more` always comes from the page response; it is never inferred
//! from how full a page is.

use std::collections::HashSet;

use memeshare_shared::CommentId;

/// An independently paginated list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    TopLevel,
    Replies(CommentId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageState {
    page: u32,
    has_more: bool,
}

impl Default for PageState {
    fn default() -> Self {
        Self {
            page: 1,
            has_more: false,
        }
    }
}

impl PageState {
    pub fn new(page: u32, has_more: bool) -> Self {
        Self {
            page: page.max(1),
            has_more,
        }
    }

    /// Current 1-based page.
    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    /// Page to request for "load more", if the last response announced one.
    pub fn next(&self) -> Option<u32> {
        self.has_more.then(|| self.page + 1)
    }

    /// Page to request for "back", if not already on the first page.
    pub fn previous(&self) -> Option<u32> {
        (self.page > 1).then(|| self.page - 1)
    }

    pub fn is_first(&self) -> bool {
        self.page == 1
    }
}

/// Scopes with a request outstanding. A scope is entered at most once.
#[derive(Debug, Default)]
pub(crate) struct InFlight {
    scopes: HashSet<Scope>,
}

impl InFlight {
    /// Marks `scope` busy; `false` when it already was.
    pub(crate) fn enter(&mut self, scope: Scope) -> bool {
        self.scopes.insert(scope)
    }

    pub(crate) fn leave(&mut self, scope: Scope) {
        self.scopes.remove(&scope);
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, scope: Scope) -> bool {
        self.scopes.contains(&scope)
    }
}
