use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::collections::HashSet;

/// Rows written per INSERT statement.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// A stored hotel listing. `(hotel_url, origin)` is unique.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct HotelListing {
    pub id: i64,
    pub hotel_url: String,
    pub location: Option<String>,
    pub lastmod: Option<NaiveDate>,
    pub origin: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Row to insert; the database assigns `id` and timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewHotelListing {
    pub hotel_url: String,
    pub location: Option<String>,
    pub lastmod: Option<NaiveDate>,
    pub origin: String,
}

impl HotelListing {
    /// Subset of `urls` already stored for `origin`, in one query.
    pub async fn find_existing_urls(
        urls: &[String],
        origin: &str,
        pool: &PgPool,
    ) -> Result<HashSet<String>> {
        if urls.is_empty() {
            return Ok(HashSet::new());
        }

        let existing = sqlx::query_scalar::<_, String>(
            r#"
            SELECT hotel_url FROM hotel_listings
            WHERE origin = $1 AND hotel_url = ANY($2)
            "#,
        )
        .bind(origin)
        .bind(urls)
        .fetch_all(pool)
        .await?;

        Ok(existing.into_iter().collect())
    }

    /// URLs not yet stored for `origin`, in input order.
    ///
    /// Runs before the crawl so known listings are never rendered again.
    pub async fn filter_unknown(
        urls: &[String],
        origin: &str,
        pool: &PgPool,
    ) -> Result<Vec<String>> {
        let existing = Self::find_existing_urls(urls, origin, pool).await?;

        Ok(urls
            .iter()
            .filter(|url| !existing.contains(*url))
            .cloned()
            .collect())
    }

    /// Insert `rows` in chunks of [`DEFAULT_CHUNK_SIZE`].
    pub async fn bulk_upsert(rows: &[NewHotelListing], pool: &PgPool) -> Result<u64> {
        Self::bulk_upsert_chunked(rows, DEFAULT_CHUNK_SIZE, pool).await
    }

    /// Insert `rows` in chunks inside a single transaction.
    ///
    /// Collisions on `(hotel_url, origin)` keep the stored row and are not
    /// counted. Any failing chunk rolls back every chunk of this call.
    /// Returns the number of rows actually inserted.
    pub async fn bulk_upsert_chunked(
        rows: &[NewHotelListing],
        chunk_size: usize,
        pool: &PgPool,
    ) -> Result<u64> {
        if rows.is_empty() {
            return Ok(0);
        }

        let mut tx = pool.begin().await?;
        let mut inserted = 0u64;

        for (index, chunk) in rows.chunks(chunk_size.max(1)).enumerate() {
            let hotel_urls: Vec<String> = chunk.iter().map(|r| r.hotel_url.clone()).collect();
            let locations: Vec<Option<String>> = chunk.iter().map(|r| r.location.clone()).collect();
            let lastmods: Vec<Option<NaiveDate>> = chunk.iter().map(|r| r.lastmod).collect();
            let origins: Vec<String> = chunk.iter().map(|r| r.origin.clone()).collect();

            let result = sqlx::query(
                r#"
                INSERT INTO hotel_listings (hotel_url, location, lastmod, origin)
                SELECT * FROM UNNEST($1::text[], $2::text[], $3::date[], $4::text[])
                ON CONFLICT (hotel_url, origin) DO NOTHING
                "#,
            )
            .bind(&hotel_urls)
            .bind(&locations)
            .bind(&lastmods)
            .bind(&origins)
            .execute(&mut *tx)
            .await;

            match result {
                Ok(done) => inserted += done.rows_affected(),
                Err(e) => {
                    tx.rollback().await.context("Failed to roll back upsert")?;
                    return Err(e).context(format!("Upsert chunk {} failed", index));
                }
            }
        }

        tx.commit().await?;
        Ok(inserted)
    }

    /// Count listings stored for an origin
    pub async fn count_by_origin(origin: &str, pool: &PgPool) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM hotel_listings WHERE origin = $1",
        )
        .bind(origin)
        .fetch_one(pool)
        .await?;

        Ok(count)
    }

    /// Find a listing by its natural key
    pub async fn find_by_url(hotel_url: &str, origin: &str, pool: &PgPool) -> Result<Option<Self>> {
        let listing = sqlx::query_as::<_, HotelListing>(
            r#"
            SELECT * FROM hotel_listings
            WHERE hotel_url = $1 AND origin = $2
            "#,
        )
        .bind(hotel_url)
        .bind(origin)
        .fetch_optional(pool)
        .await?;

        Ok(listing)
    }
}
