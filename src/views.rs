//! Pure projections from the aggregate state to dashboard panels.
//!
//! Nothing here touches the network or the store: every function takes a
//! borrowed [`AggregateState`] and returns owned view values that a
//! [`crate::render::Renderer`] can display.
//!
//! | Panel | Function | Limit | Order |
//! |-------|----------|-------|-------|
//! | Category stream | [`category_view`] | 30 | most recent first |
//! | Hot stream | [`hot_view`] | 40 | most recent first, all categories |
//! | Ticker | [`ticker_view`] | 15 | shuffled |
//! | Lead image | [`lead_image`] | 1 | last fetched, else canned |
//!
//! All projections except the ticker are deterministic for a given state
//! (and `now`).

use crate::models::{AggregateState, Category};
use crate::registry::SourceRegistry;
use chrono::{DateTime, Local, Utc};
use itertools::Itertools;
use once_cell::sync::Lazy;
use rand::Rng;
use rand::seq::SliceRandom;
use regex::Regex;
use serde::Serialize;

pub const CATEGORY_VIEW_LIMIT: usize = 30;
pub const HOT_VIEW_LIMIT: usize = 40;
pub const TICKER_LIMIT: usize = 15;
pub const SNIPPET_CHARS: usize = 180;

static TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>?").unwrap());

/// One rendered entry of a category stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryItem {
    pub title: String,
    pub link: String,
    /// "5 хвилин тому" style label.
    pub relative_time: String,
    /// Summary with markup stripped, cut to [`SNIPPET_CHARS`] plus `...`.
    pub snippet: String,
}

/// A category stream panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryView {
    pub category: Category,
    pub label: String,
    pub items: Vec<CategoryItem>,
}

/// One entry of the merged hot stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HotItem {
    pub category: Category,
    pub category_label: String,
    pub title: String,
    pub link: String,
    pub published_at: DateTime<Utc>,
    /// Local `HH:MM`.
    pub time_label: String,
}

/// Titles for the scrolling ticker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TickerView {
    pub items: Vec<String>,
}

impl TickerView {
    /// Continuous-scroll text, each title framed by `+++`.
    pub fn text(&self) -> String {
        self.items.iter().map(|t| format!("+++ {t} +++")).join(" ")
    }
}

/// Remove markup tags. An unterminated trailing tag is removed too.
pub fn strip_tags(s: &str) -> String {
    TAGS.replace_all(s, "").into_owned()
}

/// Tag-free summary cut to [`SNIPPET_CHARS`] characters, always followed by `...`.
///
/// Characters are Unicode scalar values, so an emoji counts as one, not as two UTF-16 units.
pub fn snippet(summary: &str) -> String {
    let plain = strip_tags(summary);
    let mut out: String = plain.chars().take(SNIPPET_CHARS).collect();
    out.push_str("...");
    out
}

/// Articles of one category, most recent first, at most [`CATEGORY_VIEW_LIMIT`].
///
/// Ties keep their stored order.
pub fn category_view(state: &AggregateState, category: Category, now: DateTime<Utc>) -> CategoryView {
    let items = state
        .get(&category)
        .map(|slot| {
            slot.articles
                .iter()
                .sorted_by(|a, b| b.published_at.cmp(&a.published_at))
                .take(CATEGORY_VIEW_LIMIT)
                .map(|a| CategoryItem {
                    title: a.title.clone(),
                    link: a.link.clone(),
                    relative_time: relative_time(a.published_at, now),
                    snippet: snippet(&a.summary),
                })
                .collect()
        })
        .unwrap_or_default();

    CategoryView {
        category,
        label: category.display_name().to_string(),
        items,
    }
}

/// Every article of every category, newest first, at most [`HOT_VIEW_LIMIT`].
pub fn hot_view(state: &AggregateState) -> Vec<HotItem> {
    state
        .iter()
        .flat_map(|(category, slot)| slot.articles.iter().map(move |a| (*category, a)))
        .sorted_by(|(_, a), (_, b)| b.published_at.cmp(&a.published_at))
        .take(HOT_VIEW_LIMIT)
        .map(|(category, a)| HotItem {
            category,
            category_label: category.display_name().to_string(),
            title: a.title.clone(),
            link: a.link.clone(),
            published_at: a.published_at,
            time_label: a.published_at.with_timezone(&Local).format("%H:%M").to_string(),
        })
        .collect()
}

/// Up to [`TICKER_LIMIT`] titles in random order.
///
/// `None` when there are no titles at all; the ticker then keeps whatever it
/// showed before.
pub fn ticker_view<R: Rng + ?Sized>(state: &AggregateState, rng: &mut R) -> Option<TickerView> {
    let mut titles: Vec<String> = state
        .values()
        .flat_map(|slot| slot.articles.iter().map(|a| a.title.clone()))
        .collect();
    if titles.is_empty() {
        return None;
    }
    titles.shuffle(rng);
    titles.truncate(TICKER_LIMIT);
    Some(TickerView { items: titles })
}

/// Image for a category's visual panel: the fetched lead image, else the
/// first canned article's image.
pub fn lead_image(state: &AggregateState, registry: &SourceRegistry, category: Category) -> Option<String> {
    state
        .get(&category)
        .and_then(|slot| slot.lead_image.clone())
        .or_else(|| {
            registry
                .fallback(category)
                .first()
                .and_then(|a| a.image_url.clone())
        })
}

/// Ukrainian "time ago" label, with the same thresholds the dashboard's
/// date library uses.
pub fn relative_time(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let delta = now.signed_duration_since(then).num_seconds();
    let phrase = humanize(delta.unsigned_abs());
    if delta >= 0 {
        format!("{phrase} тому")
    } else {
        format!("за {phrase}")
    }
}

fn humanize(secs: u64) -> String {
    let secs = secs as f64;
    let minutes = (secs / 60.0).round();
    let hours = (secs / 3600.0).round();
    let days = (secs / 86_400.0).round();
    let months = (days / 30.4).round();
    let years = (days / 365.0).round();

    if secs < 45.0 {
        "декілька секунд".to_string()
    } else if secs < 90.0 {
        "хвилину".to_string()
    } else if minutes < 45.0 {
        plural(minutes as u64, ["хвилину", "хвилини", "хвилин"])
    } else if minutes < 90.0 {
        "годину".to_string()
    } else if hours < 22.0 {
        plural(hours as u64, ["годину", "години", "годин"])
    } else if hours < 36.0 {
        "день".to_string()
    } else if days < 26.0 {
        plural(days as u64, ["день", "дні", "днів"])
    } else if days < 46.0 {
        "місяць".to_string()
    } else if days < 320.0 {
        plural(months.max(2.0) as u64, ["місяць", "місяці", "місяців"])
    } else if days < 548.0 {
        "рік".to_string()
    } else {
        plural(years.max(2.0) as u64, ["рік", "роки", "років"])
    }
}

/// Ukrainian plural forms: one, few, many.
fn plural(n: u64, forms: [&str; 3]) -> String {
    let form = if n % 10 == 1 && n % 100 != 11 {
        forms[0]
    } else if (2..=4).contains(&(n % 10)) && !(12..=14).contains(&(n % 100)) {
        forms[1]
    } else {
        forms[2]
    };
    format!("{n} {form}")
}
