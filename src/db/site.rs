use super::{DBClient, StoreError};
use crate::dtos::{SiteConfigEntry, StatisticsInput};
use crate::models::{SiteConfig, Statistics};
use async_trait::async_trait;

/// Site copy and statistics snapshots
#[async_trait]
pub trait SiteExt: Send + Sync {
    /// Every entry, ordered by key
    async fn get_site_config(&self) -> Result<Vec<SiteConfig>, StoreError>;

    /// Insert or overwrite entries by key, in one transaction
    async fn upsert_site_config(
        &self,
        entries: &[SiteConfigEntry],
    ) -> Result<Vec<SiteConfig>, StoreError>;

    /// Most recently recorded snapshot, if any
    async fn latest_statistics(&self) -> Result<Option<Statistics>, StoreError>;

    async fn record_statistics(&self, input: &StatisticsInput) -> Result<Statistics, StoreError>;
}

#[async_trait]
impl SiteExt for DBClient {
    async fn get_site_config(&self) -> Result<Vec<SiteConfig>, StoreError> {
        let entries = sqlx::query_as::<_, SiteConfig>(
            "SELECT key, value, description, updated_at FROM site_config ORDER BY key",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    async fn upsert_site_config(
        &self,
        entries: &[SiteConfigEntry],
    ) -> Result<Vec<SiteConfig>, StoreError> {
        let mut tx = self.pool.begin().await?;
        let mut saved = Vec::with_capacity(entries.len());

        for entry in entries {
            let row = sqlx::query_as::<_, SiteConfig>(
                r#"
                INSERT INTO site_config (key, value, description)
                VALUES ($1, $2, $3)
                ON CONFLICT (key) DO UPDATE
                SET value = EXCLUDED.value,
                    description = COALESCE(EXCLUDED.description, site_config.description),
                    updated_at = NOW()
                RETURNING key, value, description, updated_at
                "#,
            )
            .bind(&entry.key)
            .bind(&entry.value)
            .bind(&entry.description)
            .fetch_one(&mut *tx)
            .await?;
            saved.push(row);
        }

        tx.commit().await?;
        Ok(saved)
    }

    async fn latest_statistics(&self) -> Result<Option<Statistics>, StoreError> {
        let stats = sqlx::query_as::<_, Statistics>(
            r#"
            SELECT id, year, month, total_glass_collected, total_points, total_users,
                   total_partners, created_at
            FROM statistics
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(stats)
    }

    async fn record_statistics(&self, input: &StatisticsInput) -> Result<Statistics, StoreError> {
        let stats = sqlx::query_as::<_, Statistics>(
            r#"
            INSERT INTO statistics (year, month, total_glass_collected, total_points, total_users, total_partners)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, year, month, total_glass_collected, total_points, total_users,
                      total_partners, created_at
            "#,
        )
        .bind(input.year)
        .bind(input.month)
        .bind(input.total_glass_collected)
        .bind(input.total_points)
        .bind(input.total_users)
        .bind(input.total_partners)
        .fetch_one(&self.pool)
        .await?;

        Ok(stats)
    }
}
