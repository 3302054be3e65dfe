//! Data models for categories, articles and the aggregate dashboard state.
//!
//! This module defines the core data structures used throughout the application:
//! - [`Category`]: One of the four fixed topical buckets
//! - [`Article`]: A normalized news item, as fetched or canned
//! - [`CategoryState`]: The articles and lead image currently shown for a category
//! - [`AggregateState`]: All category slices, owned by the [`crate::store::Store`]
//!
//! Articles are immutable once built. A category slice is always replaced
//! wholesale, never edited item by item.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A topical bucket of the dashboard.
///
/// The declaration order is the scheduling order: the first category starts
/// immediately, every following one is staggered after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Domestic (Ukrainian) agriculture.
    AgroUa,
    /// World agriculture and commodity markets.
    WorldAgro,
    /// Agricultural machinery and technology.
    TechAgro,
    /// Agricultural innovation.
    InnovAgro,
}

impl Category {
    /// Every category, in scheduling order.
    pub const ALL: [Category; 4] = [
        Category::AgroUa,
        Category::WorldAgro,
        Category::TechAgro,
        Category::InnovAgro,
    ];

    /// Stable key used in config files and snapshot output.
    pub fn key(self) -> &'static str {
        match self {
            Category::AgroUa => "agro_ua",
            Category::WorldAgro => "world_agro",
            Category::TechAgro => "tech_agro",
            Category::InnovAgro => "innov_agro",
        }
    }

    /// Human-facing label shown on the dashboard.
    pub fn display_name(self) -> &'static str {
        match self {
            Category::AgroUa => "Агро Україна",
            Category::WorldAgro => "Світ Агро",
            Category::TechAgro => "Техніка",
            Category::InnovAgro => "Новинки",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// A normalized news item.
///
/// `summary` is kept as delivered by the feed and may still contain markup;
/// tags are stripped only when a view is projected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    /// Headline, possibly translated.
    pub title: String,
    /// Link to the full story, or `"#"` for canned articles.
    pub link: String,
    /// Publication time.
    pub published_at: DateTime<Utc>,
    /// Resolved image for the article, if the feed carried one.
    pub image_url: Option<String>,
    /// Raw description, possibly translated.
    pub summary: String,
}

/// What the dashboard currently shows for one category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CategoryState {
    /// Articles in stored order (feed order, usually most recent first).
    pub articles: Vec<Article>,
    /// Image taken from the first article of the last fetch that had one.
    pub lead_image: Option<String>,
}

/// All category slices. Created empty; a slice appears after its category's
/// first pipeline run.
pub type AggregateState = BTreeMap<Category, CategoryState>;
