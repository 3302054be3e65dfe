//! Static source registry: feed URLs and canned fallback articles per category.
//!
//! The registry is built once at startup and never mutated. It comes either
//! from the built-in lists ([`SourceRegistry::builtin`]) or from a YAML file
//! that overrides some categories ([`SourceRegistry::from_yaml_file`]).
//!
//! # YAML format
//!
//! ```yaml
//! agro_ua:
//!   feeds:
//!     - https://agroportal.ua/rss/news/
//!   fallback:
//!     - title: "Рекордний врожай пшениці"
//!       link: "#"
//!       image_url: https://images.example/wheat.jpg
//!       summary: "Погодні умови сприяють рекордному збору."
//! ```
//!
//! Categories missing from the file keep their built-in entry.

use crate::models::{Article, Category};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;
use tracing::{info, instrument};
use url::Url;

/// Errors raised while loading a registry file.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Failed to read registry file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid registry YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Category {0} has no feed URLs")]
    NoFeeds(Category),
    #[error("Category {0} has no fallback articles")]
    NoFallback(Category),
    #[error("Category {category} has an invalid feed URL {url:?}")]
    InvalidFeedUrl { category: Category, url: String },
}

/// Sources and canned content for one category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryEntry {
    /// Candidate feed URLs. Never empty.
    pub feeds: Vec<String>,
    /// Canned articles used when nothing was ever fetched. Never empty.
    pub fallback: Vec<Article>,
}

/// A canned article as written in config, before it is stamped with a time.
#[derive(Debug, Clone, Deserialize)]
struct FallbackEntry {
    title: String,
    #[serde(default = "placeholder_link")]
    link: String,
    #[serde(default)]
    image_url: Option<String>,
    #[serde(default)]
    summary: String,
}

fn placeholder_link() -> String {
    "#".to_string()
}

impl FallbackEntry {
    fn stamp(self, now: DateTime<Utc>) -> Article {
        Article {
            title: self.title,
            link: self.link,
            published_at: now,
            image_url: self.image_url.filter(|s| !s.is_empty()),
            summary: self.summary,
        }
    }
}

#[derive(Debug, Deserialize)]
struct EntryFile {
    #[serde(default)]
    feeds: Vec<String>,
    #[serde(default)]
    fallback: Vec<FallbackEntry>,
}

/// Category → sources mapping shared by the fetcher and the pipeline.
#[derive(Debug, Clone)]
pub struct SourceRegistry {
    entries: BTreeMap<Category, RegistryEntry>,
}

impl SourceRegistry {
    /// The dashboard's own feed lists and canned articles.
    ///
    /// Canned articles are stamped with `now`, once, the same way the
    /// dashboard stamps them when it loads.
    pub fn builtin(now: DateTime<Utc>) -> Self {
        let entries = Category::ALL
            .into_iter()
            .map(|category| {
                let (feeds, fallback) = builtin_sources(category);
                let entry = RegistryEntry {
                    feeds: feeds.iter().map(|s| s.to_string()).collect(),
                    fallback: fallback
                        .iter()
                        .map(|&(title, image, summary)| Article {
                            title: title.to_string(),
                            link: placeholder_link(),
                            published_at: now,
                            image_url: image.map(str::to_string),
                            summary: summary.to_string(),
                        })
                        .collect(),
                };
                (category, entry)
            })
            .collect();
        Self { entries }
    }

    /// Load the built-in registry and override it with the categories found
    /// in a YAML file.
    #[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
    pub fn from_yaml_file(path: impl AsRef<Path>, now: DateTime<Utc>) -> Result<Self, RegistryError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let registry = Self::from_yaml_str(&raw, now)?;
        info!(categories = registry.entries.len(), "Loaded source registry");
        Ok(registry)
    }

    /// Same as [`SourceRegistry::from_yaml_file`], from an in-memory document.
    pub fn from_yaml_str(raw: &str, now: DateTime<Utc>) -> Result<Self, RegistryError> {
        let overrides: BTreeMap<Category, EntryFile> = serde_yaml::from_str(raw)?;
        let mut registry = Self::builtin(now);

        for (category, file) in overrides {
            if file.feeds.is_empty() {
                return Err(RegistryError::NoFeeds(category));
            }
            if file.fallback.is_empty() {
                return Err(RegistryError::NoFallback(category));
            }
            for feed in &file.feeds {
                let valid = Url::parse(feed)
                    .map(|u| matches!(u.scheme(), "http" | "https"))
                    .unwrap_or(false);
                if !valid {
                    return Err(RegistryError::InvalidFeedUrl {
                        category,
                        url: feed.clone(),
                    });
                }
            }
            let entry = RegistryEntry {
                feeds: file.feeds,
                fallback: file.fallback.into_iter().map(|f| f.stamp(now)).collect(),
            };
            registry.entries.insert(category, entry);
        }

        Ok(registry)
    }

    pub fn feeds(&self, category: Category) -> &[String] {
        self.entries
            .get(&category)
            .map(|e| e.feeds.as_slice())
            .unwrap_or_default()
    }

    pub fn fallback(&self, category: Category) -> &[Article] {
        self.entries
            .get(&category)
            .map(|e| e.fallback.as_slice())
            .unwrap_or_default()
    }

    /// Configured categories, in scheduling order.
    pub fn categories(&self) -> Vec<Category> {
        self.entries.keys().copied().collect()
    }
}

type CannedArticle = (&'static str, Option<&'static str>, &'static str);

fn builtin_sources(category: Category) -> (&'static [&'static str], &'static [CannedArticle]) {
    match category {
        Category::AgroUa => (
            &[
                "https://agroportal.ua/rss/news/",
                "https://kurkul.com/rss",
                "https://latifundist.com/rss",
                "https://agrotimes.ua/rss/",
            ],
            &[
                (
                    "Рекордний врожай пшениці очікується на півдні України",
                    Some("https://images.unsplash.com/photo-1574323347407-f5e1ad6d020b?auto=format&fit=crop&w=600&q=80"),
                    "Погодні умови сприяють рекордному збору зернових. Аграрії застосовують нові методи зрошення.",
                ),
                (
                    "Державна підтримка фермерів: нові гранти 2026",
                    None,
                    "Уряд оголосив про запуск програми пільгового кредитування для малих господарств.",
                ),
            ],
        ),
        Category::WorldAgro => (
            &[
                "https://www.world-grain.com/rss/articles",
                "https://www.agprofessional.com/rss",
                "https://www.agriculture.com/rss/news",
            ],
            &[(
                "Ціни на кукурудзу на Чиказькій біржі стабілізувалися",
                Some("https://images.unsplash.com/photo-1550989460-0adf9ea622e2?auto=format&fit=crop&w=600&q=80"),
                "Глобальний ринок реагує на звіти про запаси в США та Латинській Америці.",
            )],
        ),
        Category::TechAgro => (
            &[
                "https://traktorist.ua/rss",
                "https://itc.ua/tag/agro/feed/",
                "https://latifundist.com/tag/tehnika/rss",
            ],
            &[(
                "John Deere представив повністю автономний трактор",
                Some("https://images.unsplash.com/photo-1594132174009-5c023de3a073?auto=format&fit=crop&w=600&q=80"),
                "Нова модель працює без водія, використовуючи ШІ та 360-градусні камери для безпеки.",
            )],
        ),
        Category::InnovAgro => (
            &[
                "https://agroportal.ua/rss/technologies/",
                "https://kurkul.com/category/technics/rss",
                "https://agropravda.com/rss",
            ],
            &[(
                "Вертикальні ферми майбутнього: прорив у врожайності",
                Some("https://images.unsplash.com/photo-1558449028-b53a39d100fc?auto=format&fit=crop&w=600&q=80"),
                "Сінгапурські вчені розробили нову систему LED-освітлення, що прискорює ріст овочів.",
            )],
        ),
    }
}
