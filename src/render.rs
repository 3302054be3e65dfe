//! Render frames and the renderers that consume them.
//!
//! After every pipeline run the pipeline builds one [`RenderFrame`]: the
//! refreshed category panel plus the panels derived from the whole state
//! (hot stream, ticker, sentiment, log). A [`Renderer`] decides what to do
//! with it.
//!
//! The default [`SnapshotRenderer`] keeps the latest value of every panel in
//! a [`DashboardSnapshot`] and writes it out as JSON (and optionally
//! Markdown) after each frame.

use crate::models::Category;
use crate::outputs::{json, markdown};
use crate::sentiment::SentimentScore;
use crate::store::LogEntry;
use crate::views::{CategoryView, HotItem, TickerView};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::error::Error;
use tracing::{debug, instrument};

/// Everything that changes after one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderFrame {
    /// The category whose pipeline produced this frame.
    pub category: CategoryView,
    pub lead_image: Option<String>,
    pub hot: Vec<HotItem>,
    /// `None` leaves the ticker as it was.
    pub ticker: Option<TickerView>,
    pub sentiment: SentimentScore,
    pub log: Vec<LogEntry>,
    pub rendered_at: DateTime<Utc>,
}

/// Consumer of render frames.
pub trait Renderer {
    async fn render(&self, frame: &RenderFrame) -> Result<(), Box<dyn Error>>;
}

/// One category's stream and visual panel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryPanel {
    pub view: CategoryView,
    pub lead_image: Option<String>,
}

/// The last known content of every panel.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DashboardSnapshot {
    pub categories: BTreeMap<Category, CategoryPanel>,
    pub hot: Vec<HotItem>,
    pub ticker: Option<TickerView>,
    pub sentiment: Option<SentimentScore>,
    pub log: Vec<LogEntry>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl DashboardSnapshot {
    /// Fold a frame in. Panels of other categories keep their content.
    pub fn apply(&mut self, frame: &RenderFrame) {
        self.categories.insert(
            frame.category.category,
            CategoryPanel {
                view: frame.category.clone(),
                lead_image: frame.lead_image.clone(),
            },
        );
        self.hot = frame.hot.clone();
        if let Some(ticker) = &frame.ticker {
            self.ticker = Some(ticker.clone());
        }
        self.sentiment = Some(frame.sentiment);
        self.log = frame.log.clone();
        self.updated_at = Some(frame.rendered_at);
    }
}

/// Writes the dashboard to disk after every frame.
///
/// # Output
///
/// ```text
/// json_output_dir/dashboard.json
/// markdown_output_dir/dashboard.md   (when configured)
/// ```
#[derive(Debug)]
pub struct SnapshotRenderer {
    json_output_dir: String,
    markdown_output_dir: Option<String>,
    dashboard: RefCell<DashboardSnapshot>,
}

impl SnapshotRenderer {
    pub fn new(json_output_dir: impl Into<String>, markdown_output_dir: Option<String>) -> Self {
        Self {
            json_output_dir: json_output_dir.into(),
            markdown_output_dir,
            dashboard: RefCell::new(DashboardSnapshot::default()),
        }
    }

    pub fn dashboard(&self) -> DashboardSnapshot {
        self.dashboard.borrow().clone()
    }
}

impl Renderer for SnapshotRenderer {
    #[instrument(level = "debug", skip_all, fields(category = %frame.category.category))]
    async fn render(&self, frame: &RenderFrame) -> Result<(), Box<dyn Error>> {
        let snapshot = {
            let mut dashboard = self.dashboard.borrow_mut();
            dashboard.apply(frame);
            dashboard.clone()
        };

        json::write_snapshot(&snapshot, &self.json_output_dir).await?;
        if let Some(dir) = &self.markdown_output_dir {
            markdown::write_dashboard(&snapshot, dir).await?;
        }
        debug!("Rendered dashboard snapshot");
        Ok(())
    }
}
