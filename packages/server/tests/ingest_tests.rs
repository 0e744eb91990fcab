//! Integration tests for the ingest trigger.
//!
//! Runs `ingest_listings` against staged NDJSON files, the shared Postgres
//! container and a mock crawler:
//! - Known URLs are never sent to the crawler
//! - A second run over unchanged input inserts nothing
//! - Only the first file with a full batch is processed
//! - A failed dispatch fails the run

mod common;

use crate::common::{hotel_urls, seed_listings, stage_ndjson, TestHarness};
use ingest_core::domains::listings::HotelListing;
use ingest_core::domains::sitemaps::ingest_listings;
use ingest_core::kernel::MockPageCrawler;
use ingest_core::Config;
use test_context::test_context;

fn config_for(ctx: &TestHarness, root: &std::path::Path, origin: &str) -> Config {
    let mut config = Config::new(ctx.db_url.clone(), root);
    config.origin = origin.to_string();
    config.group_size = 10;
    config.max_groups = 2;
    config
}

#[test_context(TestHarness)]
#[tokio::test]
async fn ingests_unknown_urls_and_skips_known(ctx: &TestHarness) {
    let origin = ctx.origin("ingest_e2e");
    let staging = tempfile::tempdir().unwrap();
    let urls = hotel_urls("e2e", 25);
    let path = stage_ndjson(staging.path(), "sitembk-hotel-en-us.0000.ndjson", &urls).unwrap();
    seed_listings(&[urls[0].as_str(), urls[1].as_str()], &origin, &ctx.db_pool)
        .await
        .unwrap();

    // Every URL but one renders
    let crawler = MockPageCrawler::new().locating_all(&urls[..19], "Street");
    let config = config_for(&ctx, staging.path(), &origin);

    let report = ingest_listings(&config, &ctx.db_pool, &crawler).await.unwrap();

    assert_eq!(report.file, Some(path));
    assert_eq!(report.batches, 2);
    assert_eq!(report.skipped_known, 2);
    assert_eq!(report.crawled, 18);
    assert_eq!(report.inserted, 17);

    let crawled = crawler.crawled_urls();
    assert_eq!(crawled, urls[2..20].to_vec());
    assert_eq!(crawler.calls()[0].policy, config.dispatch_policy());

    // Trailing partial batch is not ingested
    assert_eq!(
        HotelListing::count_by_origin(&origin, &ctx.db_pool).await.unwrap(),
        19
    );
    let stored = HotelListing::find_by_url(&urls[5], &origin, &ctx.db_pool)
        .await
        .unwrap()
        .expect("listing stored");
    assert_eq!(stored.location, Some(format!("Street {}", urls[5])));
    assert_eq!(stored.lastmod, Some(chrono::Utc::now().date_naive()));
}

#[test_context(TestHarness)]
#[tokio::test]
async fn second_run_inserts_nothing(ctx: &TestHarness) {
    let origin = ctx.origin("ingest_idempotent");
    let staging = tempfile::tempdir().unwrap();
    let urls = hotel_urls("idem-run", 20);
    stage_ndjson(staging.path(), "a.ndjson", &urls).unwrap();

    let crawler = MockPageCrawler::new().locating_all(&urls, "Street");
    let config = config_for(&ctx, staging.path(), &origin);

    let first = ingest_listings(&config, &ctx.db_pool, &crawler).await.unwrap();
    let second = ingest_listings(&config, &ctx.db_pool, &crawler).await.unwrap();

    assert_eq!(first.inserted, 20);
    assert_eq!(second.inserted, 0);
    assert_eq!(second.skipped_known, 20);
    assert_eq!(second.crawled, 0);
    assert_eq!(crawler.calls().len(), 2);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn only_the_first_file_with_a_full_batch_is_used(ctx: &TestHarness) {
    let origin = ctx.origin("ingest_file_choice");
    let staging = tempfile::tempdir().unwrap();
    stage_ndjson(staging.path(), "a.ndjson", &hotel_urls("short", 3)).unwrap();
    let chosen = stage_ndjson(staging.path(), "b.ndjson", &hotel_urls("full", 10)).unwrap();
    stage_ndjson(staging.path(), "c.ndjson", &hotel_urls("later", 10)).unwrap();

    let crawler = MockPageCrawler::new();
    let config = config_for(&ctx, staging.path(), &origin);

    let report = ingest_listings(&config, &ctx.db_pool, &crawler).await.unwrap();

    assert_eq!(report.file, Some(chosen));
    assert_eq!(report.batches, 1);
    assert_eq!(crawler.crawled_urls(), hotel_urls("full", 10));
    assert_eq!(report.inserted, 0);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn missing_staging_dir_is_an_empty_run(ctx: &TestHarness) {
    let staging = tempfile::tempdir().unwrap();
    let config = config_for(&ctx, &staging.path().join("absent"), "unused");
    let crawler = MockPageCrawler::new();

    let report = ingest_listings(&config, &ctx.db_pool, &crawler).await.unwrap();

    assert_eq!(report, Default::default());
    assert!(crawler.calls().is_empty());
}

#[test_context(TestHarness)]
#[tokio::test]
async fn dispatch_failure_fails_the_run(ctx: &TestHarness) {
    let origin = ctx.origin("ingest_dispatch_failure");
    let staging = tempfile::tempdir().unwrap();
    stage_ndjson(staging.path(), "a.ndjson", &hotel_urls("fail", 10)).unwrap();

    let crawler = MockPageCrawler::new().failing();
    let config = config_for(&ctx, staging.path(), &origin);

    let result = ingest_listings(&config, &ctx.db_pool, &crawler).await;

    assert!(result.is_err());
    assert_eq!(
        HotelListing::count_by_origin(&origin, &ctx.db_pool).await.unwrap(),
        0
    );
}
