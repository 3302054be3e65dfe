//! The single shared, mutable dashboard state.
//!
//! [`Store`] owns the [`AggregateState`] and the rolling [`SystemLog`]. It is
//! created once in `main` and handed to components as `Rc<Store>`.
//!
//! Everything runs on one thread, so interior mutability is a `RefCell`.
//! Every method borrows, mutates and releases within a single call and no
//! borrow ever lives across an `.await`; a category slice is therefore
//! replaced in one step from the point of view of every other task.

use crate::models::{AggregateState, Article, Category, CategoryState};
use chrono::Local;
use serde::Serialize;
use std::cell::RefCell;
use std::collections::VecDeque;

/// Maximum number of entries kept by [`SystemLog`].
pub const LOG_CAPACITY: usize = 50;

/// One line of the dashboard's diagnostic log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    /// Local wall-clock time, `HH:MM:SS`.
    pub time: String,
    pub message: String,
}

/// Rolling log, newest entry first, oldest evicted past [`LOG_CAPACITY`].
#[derive(Debug, Default)]
pub struct SystemLog {
    entries: VecDeque<LogEntry>,
}

impl SystemLog {
    pub fn push(&mut self, time: impl Into<String>, message: impl Into<String>) {
        self.entries.push_front(LogEntry {
            time: time.into(),
            message: message.into(),
        });
        self.entries.truncate(LOG_CAPACITY);
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.iter().cloned().collect()
    }
}

/// Owner of the aggregate state and the system log.
#[derive(Debug, Default)]
pub struct Store {
    state: RefCell<AggregateState>,
    log: RefCell<SystemLog>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace a category's articles after a successful fetch.
    ///
    /// The lead image only changes when `lead_image` is `Some`.
    pub fn replace_articles(&self, category: Category, articles: Vec<Article>, lead_image: Option<String>) {
        let mut state = self.state.borrow_mut();
        let slot = state.entry(category).or_default();
        slot.articles = articles;
        if lead_image.is_some() {
            slot.lead_image = lead_image;
        }
    }

    /// Seed canned articles, but only into an empty slice.
    ///
    /// Returns `true` when the fallback was applied. Content from an earlier
    /// successful fetch is never overwritten.
    pub fn seed_fallback_if_empty(&self, category: Category, fallback: &[Article]) -> bool {
        let mut state = self.state.borrow_mut();
        let slot = state.entry(category).or_default();
        if slot.articles.is_empty() && !fallback.is_empty() {
            slot.articles = fallback.to_vec();
            true
        } else {
            false
        }
    }

    /// Copy of one category slice.
    pub fn category(&self, category: Category) -> Option<CategoryState> {
        self.state.borrow().get(&category).cloned()
    }

    /// Copy of the whole aggregate state, for projections.
    pub fn snapshot(&self) -> AggregateState {
        self.state.borrow().clone()
    }

    /// Append a line to the system log, stamped with the local time.
    pub fn log(&self, message: impl Into<String>) {
        let time = Local::now().format("%H:%M:%S").to_string();
        self.log.borrow_mut().push(time, message);
    }

    pub fn log_entries(&self) -> Vec<LogEntry> {
        self.log.borrow().entries()
    }
}
