//! Scheduled background tasks using tokio-cron-scheduler.
//!
//! Two independent jobs share only the staging directory:
//!
//! ```text
//! Scheduler
//!     ├─► materialize (CRON_BOOKING_SITEMAP_MATERIALIZE)
//!     │       └─► robots.txt → index → download → NDJSON
//!     └─► ingest (CRON_BOOKING_SITEMAP)
//!             └─► NDJSON → batches → dedup → crawl → upsert
//! ```
//!
//! A job still running when its next tick fires skips that tick. Failures
//! are logged; the next tick is the retry.

use anyhow::Result;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::domains::sitemaps::{ingest_listings, materialize_sitemaps};
use crate::kernel::ServerDeps;

/// Start all scheduled tasks
pub async fn start_scheduler(deps: ServerDeps) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;

    let materialize_deps = deps.clone();
    let materialize_guard = Arc::new(Mutex::new(()));
    let materialize_job = Job::new_async(
        deps.config.materialize_cron.as_str(),
        move |_uuid, _lock| {
            let deps = materialize_deps.clone();
            let guard = materialize_guard.clone();
            Box::pin(async move {
                run_exclusive(&guard, "materialize", run_materialize(&deps)).await;
            })
        },
    )?;

    scheduler.add(materialize_job).await?;

    let ingest_deps = deps.clone();
    let ingest_guard = Arc::new(Mutex::new(()));
    let ingest_job = Job::new_async(deps.config.ingest_cron.as_str(), move |_uuid, _lock| {
        let deps = ingest_deps.clone();
        let guard = ingest_guard.clone();
        Box::pin(async move {
            run_exclusive(&guard, "ingest", run_ingest(&deps)).await;
        })
    })?;

    scheduler.add(ingest_job).await?;
    scheduler.start().await?;

    tracing::info!(
        materialize = %deps.config.materialize_cron,
        ingest = %deps.config.ingest_cron,
        "Scheduled tasks started"
    );
    Ok(scheduler)
}

/// Run `task` unless the previous run still holds `guard`.
///
/// Returns false when the tick was skipped. Task errors are logged.
async fn run_exclusive<F>(guard: &Mutex<()>, job: &str, task: F) -> bool
where
    F: Future<Output = Result<()>>,
{
    let Ok(_running) = guard.try_lock() else {
        tracing::warn!(job, "Previous run still in progress, skipping this tick");
        return false;
    };

    if let Err(e) = task.await {
        tracing::error!(job, "Scheduled task failed: {:#}", e);
    }
    true
}

/// Run sitemap materialization task
pub async fn run_materialize(deps: &ServerDeps) -> Result<()> {
    tracing::info!("Running sitemap materialization task");

    let written = materialize_sitemaps(&deps.config, &deps.http).await?;

    tracing::info!(files = written.len(), "Sitemap materialization completed");
    Ok(())
}

/// Run sitemap ingest task
pub async fn run_ingest(deps: &ServerDeps) -> Result<()> {
    tracing::info!("Running sitemap ingest task");

    let report = ingest_listings(&deps.config, &deps.db_pool, deps.crawler.as_ref()).await?;

    tracing::info!(inserted = report.inserted, "Sitemap ingest completed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn tick_during_a_running_job_is_skipped() {
        let guard = Mutex::new(());
        let runs = AtomicUsize::new(0);

        let slow = run_exclusive(&guard, "test", async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            runs.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        let overlapping = async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            run_exclusive(&guard, "test", async {
                runs.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .await
        };

        let (first, second) = tokio::join!(slow, overlapping);

        assert!(first);
        assert!(!second);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_run_releases_the_guard() {
        let guard = Mutex::new(());

        assert!(run_exclusive(&guard, "test", async { Err(anyhow::anyhow!("boom")) }).await);
        assert!(run_exclusive(&guard, "test", async { Ok(()) }).await);
    }
}
