//! Lexicon-based sentiment over the whole dashboard corpus.
//!
//! Every title and summary of every category is lowercased and split into
//! runs of Ukrainian or Latin letters. Tokens are counted against a positive
//! and a negative word set (exact match, no stemming).

use crate::models::AggregateState;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::HashSet;

static WORDS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[а-яіїєґa-z]+").unwrap());

const POSITIVE_WORDS: [&str; 10] = [
    "врожай",
    "успіх",
    "зростання",
    "інновації",
    "прибуток",
    "підтримка",
    "експорт",
    "стабільність",
    "прорив",
    "розвиток",
];

const NEGATIVE_WORDS: [&str; 10] = [
    "посуха",
    "криза",
    "збитки",
    "шкідники",
    "падіння",
    "дефіцит",
    "проблема",
    "ризик",
    "війна",
    "неврожай",
];

/// Positive and negative word sets.
#[derive(Debug, Clone)]
pub struct Lexicon {
    positive: HashSet<String>,
    negative: HashSet<String>,
}

impl Lexicon {
    pub fn new<P, N>(positive: P, negative: N) -> Self
    where
        P: IntoIterator,
        P::Item: Into<String>,
        N: IntoIterator,
        N::Item: Into<String>,
    {
        Self {
            positive: positive.into_iter().map(Into::into).collect(),
            negative: negative.into_iter().map(Into::into).collect(),
        }
    }
}

impl Default for Lexicon {
    /// The agricultural growth/risk vocabulary.
    fn default() -> Self {
        Self::new(POSITIVE_WORDS, NEGATIVE_WORDS)
    }
}

/// Result of one analysis pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SentimentScore {
    pub positive_percent: u32,
    pub negative_percent: u32,
    /// Raw counts floored at 1, so the chart never gets an all-zero series.
    pub chart_series: [u32; 2],
}

/// Score `text` against `lexicon`.
pub fn score_text(text: &str, lexicon: &Lexicon) -> SentimentScore {
    let lowered = text.to_lowercase();
    let (mut pos, mut neg) = (0u32, 0u32);
    for token in WORDS.find_iter(&lowered).map(|m| m.as_str()) {
        if lexicon.positive.contains(token) {
            pos += 1;
        }
        if lexicon.negative.contains(token) {
            neg += 1;
        }
    }

    let total = (pos + neg).max(1) as f64;
    SentimentScore {
        positive_percent: (100.0 * pos as f64 / total).round() as u32,
        negative_percent: (100.0 * neg as f64 / total).round() as u32,
        chart_series: [pos.max(1), neg.max(1)],
    }
}

/// Score every title and summary currently held in `state`.
pub fn analyze(state: &AggregateState, lexicon: &Lexicon) -> SentimentScore {
    let corpus: String = state
        .values()
        .flat_map(|slot| slot.articles.iter())
        .map(|a| format!(" {} {}", a.title, a.summary))
        .collect();
    score_text(&corpus, lexicon)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Article, Category, CategoryState};
    use chrono::Utc;

    fn harvest_lexicon() -> Lexicon {
        Lexicon::new(["врожай"], ["посуха"])
    }

    #[test]
    fn test_two_to_one_rounds() {
        let score = score_text("врожай врожай посуха", &harvest_lexicon());
        assert_eq!((score.positive_percent, score.negative_percent), (67, 33));
        assert_eq!(score.chart_series, [2, 1]);
    }

    #[test]
    fn test_no_matches_is_zero_zero() {
        let score = score_text("нічого цікавого сьогодні", &Lexicon::default());
        assert_eq!((score.positive_percent, score.negative_percent), (0, 0));
        assert_eq!(score.chart_series, [1, 1]);
    }

    #[test]
    fn test_case_insensitive_and_exact_only() {
        let lexicon = harvest_lexicon();
        let score = score_text("ВРОЖАЙ! Врожайність, неврожай; посуха.", &lexicon);
        assert_eq!((score.positive_percent, score.negative_percent), (50, 50));
    }

    #[test]
    fn test_apostrophe_splits_tokens() {
        let lexicon = Lexicon::new(["сім"], Vec::<String>::new());
        let score = score_text("сім'я", &lexicon);
        assert_eq!(score.positive_percent, 100);
    }

    #[test]
    fn test_analyze_reads_titles_and_summaries() {
        let article = Article {
            title: "Експорт зерна".to_string(),
            link: "#".to_string(),
            published_at: Utc::now(),
            image_url: None,
            summary: "<p>Криза логістики та посуха</p>".to_string(),
        };
        let mut state = AggregateState::new();
        state.insert(
            Category::AgroUa,
            CategoryState {
                articles: vec![article],
                lead_image: None,
            },
        );
        let score = analyze(&state, &Lexicon::default());
        assert_eq!((score.positive_percent, score.negative_percent), (33, 67));
    }

    #[test]
    fn test_analyze_empty_state() {
        let score = analyze(&AggregateState::new(), &Lexicon::default());
        assert_eq!((score.positive_percent, score.negative_percent), (0, 0));
    }
}
