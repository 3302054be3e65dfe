//! The per-category fetch → translate → store → render pipeline.
//!
//! A run never fails from the caller's point of view. Every failure is
//! consumed here and turned into the degraded path:
//!
//! - **Fetch failed**: keep what the category already shows; seed the canned
//!   fallback only into an empty category.
//! - **Translation failed**: keep the original text (handled by the translator).
//! - **Render failed**: log and carry on.
//!
//! Within one run the order is fixed: fetch, then translation, then the
//! store write, then the render. Two runs for the same category may overlap
//! (see [`crate::scheduler`]); whichever writes last wins.

use crate::fetcher::{FeedEndpoint, FeedFetcher};
use crate::models::{Article, Category};
use crate::registry::SourceRegistry;
use crate::render::{RenderFrame, Renderer};
use crate::scheduler::CategoryJob;
use crate::sentiment::{self, Lexicon};
use crate::store::Store;
use crate::translate::{TranslationApi, Translator};
use crate::views;
use chrono::Utc;
use futures::future::join_all;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Instant;
use tracing::{info, instrument, warn};

/// Everything one category run needs, shared by all categories.
pub struct CategoryPipeline<E, A, R> {
    fetcher: FeedFetcher<E>,
    translator: Translator<A>,
    renderer: R,
    store: Rc<Store>,
    registry: Rc<SourceRegistry>,
    lexicon: Lexicon,
    rng: RefCell<StdRng>,
}

impl<E, A, R> CategoryPipeline<E, A, R>
where
    E: FeedEndpoint,
    A: TranslationApi,
    R: Renderer,
{
    pub fn new(
        fetcher: FeedFetcher<E>,
        translator: Translator<A>,
        renderer: R,
        store: Rc<Store>,
        registry: Rc<SourceRegistry>,
    ) -> Self {
        Self {
            fetcher,
            translator,
            renderer,
            store,
            registry,
            lexicon: Lexicon::default(),
            rng: RefCell::new(StdRng::from_os_rng()),
        }
    }

    /// Use a fixed random source for ticker shuffling.
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = RefCell::new(rng);
        self
    }

    pub fn with_lexicon(mut self, lexicon: Lexicon) -> Self {
        self.lexicon = lexicon;
        self
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Translate title and summary of every article.
    ///
    /// Both fields of an item are requested together and all items proceed
    /// concurrently; each field is awaited against its own item, so the
    /// completion order does not matter.
    async fn translate_all(&self, articles: Vec<Article>) -> Vec<Article> {
        join_all(articles.into_iter().map(|article| self.translate_article(article))).await
    }

    async fn translate_article(&self, article: Article) -> Article {
        let (title, summary) = futures::join!(
            self.translator.translate(&article.title),
            self.translator.translate(&article.summary)
        );
        Article {
            title,
            summary,
            ..article
        }
    }

    /// Project the current state into a frame for `category`.
    pub fn frame(&self, category: Category) -> RenderFrame {
        let state = self.store.snapshot();
        let now = Utc::now();
        let ticker = {
            let mut rng = self.rng.borrow_mut();
            views::ticker_view(&state, &mut *rng)
        };
        RenderFrame {
            category: views::category_view(&state, category, now),
            lead_image: views::lead_image(&state, &self.registry, category),
            hot: views::hot_view(&state),
            ticker,
            sentiment: sentiment::analyze(&state, &self.lexicon),
            log: self.store.log_entries(),
            rendered_at: now,
        }
    }
}

impl<E, A, R> CategoryJob for CategoryPipeline<E, A, R>
where
    E: FeedEndpoint,
    A: TranslationApi,
    R: Renderer,
{
    #[instrument(level = "info", skip(self))]
    async fn run(&self, category: Category) {
        let t0 = Instant::now();
        let name = category.display_name();
        self.store.log(format!("Моніторинг: {name}..."));

        match self.fetcher.fetch(category).await {
            Ok(articles) => {
                let translated = self.translate_all(articles).await;
                let count = translated.len();
                let lead_image = translated.first().and_then(|a| a.image_url.clone());
                self.store.replace_articles(category, translated, lead_image);
                self.store.log(format!("OK: {name} ({count} новин)"));
                info!(
                    count,
                    elapsed_ms = t0.elapsed().as_millis() as u64,
                    "Category refreshed"
                );
            }
            Err(e) => {
                let seeded = self
                    .store
                    .seed_fallback_if_empty(category, self.registry.fallback(category));
                self.store.log(format!("Резерв для {name}."));
                warn!(error = %e, seeded, "Fetch failed; keeping existing or canned content");
            }
        }

        let frame = self.frame(category);
        if let Err(e) = self.renderer.render(&frame).await {
            warn!(error = %e, "Render failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::{FeedItem, FeedResponse, FetchError};
    use crate::translate::TranslationError;
    use std::cell::Cell;
    use std::collections::VecDeque;
    use std::error::Error;
    use std::time::Duration;

    /// Plays back scripted responses; `None` (or an empty script) fails.
    #[derive(Default)]
    struct ScriptedEndpoint {
        script: RefCell<VecDeque<Option<FeedResponse>>>,
    }

    impl ScriptedEndpoint {
        fn new(script: Vec<Option<FeedResponse>>) -> Self {
            Self {
                script: RefCell::new(script.into()),
            }
        }
    }

    impl FeedEndpoint for ScriptedEndpoint {
        async fn retrieve(&self, _feed_url: &str) -> Result<FeedResponse, FetchError> {
            let next = self.script.borrow_mut().pop_front().flatten();
            next.ok_or(FetchError::NoItems)
        }
    }

    struct MarkingApi;

    impl TranslationApi for MarkingApi {
        async fn request(&self, text: &str) -> Result<String, TranslationError> {
            Ok(format!("[uk] {text}"))
        }
    }

    #[derive(Default)]
    struct RecordingRenderer {
        frames: RefCell<Vec<RenderFrame>>,
        fail: Cell<bool>,
    }

    impl Renderer for RecordingRenderer {
        async fn render(&self, frame: &RenderFrame) -> Result<(), Box<dyn Error>> {
            self.frames.borrow_mut().push(frame.clone());
            if self.fail.get() {
                return Err("disk full".into());
            }
            Ok(())
        }
    }

    fn response(titles: &[&str]) -> FeedResponse {
        FeedResponse {
            status: "ok".to_string(),
            items: titles
                .iter()
                .enumerate()
                .map(|(i, t)| FeedItem {
                    title: Some(t.to_string()),
                    link: Some(format!("https://example.com/{i}")),
                    pub_date: Some(format!("2025-05-06 10:0{i}:00")),
                    description: Some(format!("{t} body")),
                    thumbnail: (i == 0).then(|| "https://img/first.jpg".to_string()),
                    ..Default::default()
                })
                .collect(),
        }
    }

    fn pipeline<E: FeedEndpoint>(endpoint: E) -> CategoryPipeline<E, MarkingApi, RecordingRenderer> {
        let registry = Rc::new(SourceRegistry::builtin(Utc::now()));
        let fetcher = FeedFetcher::with_rng(endpoint, registry.clone(), StdRng::seed_from_u64(1));
        CategoryPipeline::new(
            fetcher,
            Translator::new(MarkingApi),
            RecordingRenderer::default(),
            Rc::new(Store::new()),
            registry,
        )
        .with_rng(StdRng::seed_from_u64(2))
    }

    #[tokio::test]
    async fn test_failing_fetch_seeds_fallback_and_keeps_it() {
        let p = pipeline(ScriptedEndpoint::default());
        let fallback = p.registry.fallback(Category::AgroUa).to_vec();

        p.run(Category::AgroUa).await;
        assert_eq!(p.store.category(Category::AgroUa).unwrap().articles, fallback);

        for _ in 0..3 {
            p.run(Category::AgroUa).await;
            let articles = p.store.category(Category::AgroUa).unwrap().articles;
            assert!(!articles.is_empty());
            assert_eq!(articles, fallback);
        }
        assert_eq!(p.store.log_entries()[0].message, "Резерв для Агро Україна.");
    }

    #[tokio::test]
    async fn test_failed_fetch_preserves_existing_articles() {
        let p = pipeline(ScriptedEndpoint::new(vec![Some(response(&["Corn up"])), None]));

        p.run(Category::WorldAgro).await;
        let before = p.store.category(Category::WorldAgro).unwrap();
        assert_eq!(before.articles[0].title, "[uk] Corn up");

        p.run(Category::WorldAgro).await;
        assert_eq!(p.store.category(Category::WorldAgro).unwrap(), before);
    }

    #[tokio::test]
    async fn test_success_translates_and_sets_lead_image() {
        let p = pipeline(ScriptedEndpoint::new(vec![Some(response(&[
            "Wheat exports",
            "Врожай зернових",
        ]))]));

        p.run(Category::AgroUa).await;

        let slot = p.store.category(Category::AgroUa).unwrap();
        assert_eq!(slot.articles.len(), 2);
        assert_eq!(slot.articles[0].title, "[uk] Wheat exports");
        assert_eq!(slot.articles[0].summary, "[uk] Wheat exports body");
        assert_eq!(slot.articles[1].title, "Врожай зернових");
        assert_eq!(slot.articles[0].link, "https://example.com/0");
        assert_eq!(slot.lead_image.as_deref(), Some("https://img/first.jpg"));

        let log = p.store.log_entries();
        assert_eq!(log[0].message, "OK: Агро Україна (2 новин)");
        assert_eq!(log[1].message, "Моніторинг: Агро Україна...");
    }

    #[tokio::test]
    async fn test_every_run_renders_one_frame() {
        let p = pipeline(ScriptedEndpoint::new(vec![Some(response(&["Врожай"]))]));

        p.run(Category::TechAgro).await;
        p.run(Category::InnovAgro).await;

        let frames = p.renderer().frames.borrow();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].category.category, Category::TechAgro);
        assert_eq!(frames[0].category.items[0].title, "Врожай");
        assert_eq!(frames[0].sentiment.positive_percent, 100);
        assert_eq!(frames[1].category.category, Category::InnovAgro);
        assert!(!frames[1].category.items.is_empty());
        assert_eq!(frames[1].hot.len(), 2);
        assert!(frames[1].ticker.is_some());
    }

    #[tokio::test]
    async fn test_render_failure_is_swallowed() {
        let p = pipeline(ScriptedEndpoint::default());
        p.renderer().fail.set(true);
        p.run(Category::AgroUa).await;
        assert_eq!(p.renderer().frames.borrow().len(), 1);
        assert!(p.store.category(Category::AgroUa).is_some());
    }

    #[tokio::test]
    async fn test_custom_lexicon_drives_sentiment() {
        let p = pipeline(ScriptedEndpoint::new(vec![Some(response(&["Посуха на півдні"]))]))
            .with_lexicon(Lexicon::new(Vec::<String>::new(), ["посуха"]));

        p.run(Category::AgroUa).await;

        let frames = p.renderer().frames.borrow();
        assert_eq!(frames[0].sentiment.negative_percent, 100);
        assert_eq!(frames[0].sentiment.chart_series, [1, 2]);
    }

    /// First call answers after 10s, second after 1s.
    struct SlowThenFastEndpoint {
        calls: Cell<usize>,
    }

    impl FeedEndpoint for SlowThenFastEndpoint {
        async fn retrieve(&self, _feed_url: &str) -> Result<FeedResponse, FetchError> {
            let call = self.calls.get();
            self.calls.set(call + 1);
            if call == 0 {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok(response(&["Врожай старий"]))
            } else {
                tokio::time::sleep(Duration::from_secs(1)).await;
                Ok(response(&["Врожай новий"]))
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_overlapping_runs_last_write_wins() {
        let p = pipeline(SlowThenFastEndpoint { calls: Cell::new(0) });

        futures::join!(p.run(Category::AgroUa), p.run(Category::AgroUa));

        let slot = p.store.category(Category::AgroUa).unwrap();
        assert_eq!(slot.articles[0].title, "Врожай старий");
    }
}
