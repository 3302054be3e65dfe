//! Staggered, repeating per-category refresh tasks.
//!
//! Every category gets its own task on the current [`LocalSet`]:
//!
//! ```text
//! category i:  sleep(i * stagger) ─┬─ run ── interval ── run ── interval ── run ...
//! ```
//!
//! Each tick detaches the run with `spawn_local` instead of awaiting it, so a
//! run that stalls on the network never delays the next tick, and a slow run
//! from cycle N can overlap the run from cycle N+1. No run is ever cancelled;
//! whichever run writes the store last wins.
//!
//! The tasks live as long as the process. Must be called from within a
//! [`LocalSet`].
//!
//! [`LocalSet`]: tokio::task::LocalSet

use crate::models::Category;
use crate::store::Store;
use futures::future::join_all;
use std::rc::Rc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval, sleep};
use tracing::{debug, info, instrument};

/// Log line written at the start of every cycle.
pub const CYCLE_BANNER: &str = "Оновлення агро-панелі...";

/// One unit of scheduled work: refresh a category.
pub trait CategoryJob {
    async fn run(&self, category: Category);
}

/// Timing of the refresh cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleConfig {
    /// Time between two runs of the same category.
    pub interval: Duration,
    /// Extra start delay per category index.
    pub stagger: Duration,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            stagger: Duration::from_millis(1500),
        }
    }
}

impl ScheduleConfig {
    /// Start delay of the category at `index`.
    pub fn offset(&self, index: usize) -> Duration {
        self.stagger.saturating_mul(index as u32)
    }
}

/// Spawn one repeating task per category.
///
/// The task at index 0 writes [`CYCLE_BANNER`] to the system log before each
/// of its runs.
#[instrument(level = "info", skip(job, store))]
pub fn spawn_schedule<J>(
    job: Rc<J>,
    store: Rc<Store>,
    categories: &[Category],
    config: ScheduleConfig,
) -> Vec<JoinHandle<()>>
where
    J: CategoryJob + 'static,
{
    categories
        .iter()
        .copied()
        .enumerate()
        .map(|(index, category)| {
            let job = Rc::clone(&job);
            let store = Rc::clone(&store);
            let offset = config.offset(index);
            tokio::task::spawn_local(async move {
                sleep(offset).await;
                let mut ticker = interval(config.interval);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                loop {
                    ticker.tick().await;
                    if index == 0 {
                        store.log(CYCLE_BANNER);
                        info!("Refresh cycle started");
                    }
                    debug!(%category, "Dispatching category run");
                    let job = Rc::clone(&job);
                    tokio::task::spawn_local(async move {
                        job.run(category).await;
                    });
                }
            })
        })
        .collect()
}

/// Run one staggered cycle over `categories` and wait for every run.
#[instrument(level = "info", skip(job, store))]
pub async fn run_cycle<J>(job: &J, store: &Store, categories: &[Category], config: ScheduleConfig)
where
    J: CategoryJob,
{
    store.log(CYCLE_BANNER);
    join_all(categories.iter().copied().enumerate().map(|(index, category)| async move {
        sleep(config.offset(index)).await;
        job.run(category).await;
    }))
    .await;
    info!(categories = categories.len(), "Refresh cycle finished");
}
