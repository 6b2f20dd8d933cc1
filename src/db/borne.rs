use super::{Conditions, DBClient, StoreError, like_pattern};
use crate::dtos::BorneInput;
use crate::facets::{self, FacetCount};
use crate::filters::BorneFilter;
use crate::models::{Borne, BorneStatus};
use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

const BORNE_COLUMNS: &str = "id, name, address, city, zip_code, latitude, longitude, status, \
     description, created_at, updated_at";

/// Collection point operations
#[async_trait]
pub trait BorneExt: Send + Sync {
    /// One page of bornes ordered by name, plus the total under the same filter
    async fn list_bornes(&self, filter: &BorneFilter) -> Result<(Vec<Borne>, i64), StoreError>;

    /// Number of bornes passing the filter, `limit` is ignored
    async fn count_bornes(&self, filter: &BorneFilter) -> Result<i64, StoreError>;

    async fn get_borne(&self, borne_id: Uuid) -> Result<Option<Borne>, StoreError>;

    /// City counts over every borne
    async fn borne_city_facets(&self) -> Result<Vec<FacetCount>, StoreError>;

    async fn create_borne(&self, input: &BorneInput) -> Result<Borne, StoreError>;

    async fn update_borne(&self, borne_id: Uuid, input: &BorneInput) -> Result<Borne, StoreError>;

    async fn delete_borne(&self, borne_id: Uuid) -> Result<(), StoreError>;
}

fn push_borne_conditions(qb: &mut QueryBuilder<'_, Postgres>, filter: &BorneFilter) {
    let mut conditions = Conditions::new();

    match filter.active {
        Some(true) => {
            conditions
                .next(qb)
                .push("status <> ")
                .push_bind(BorneStatus::Retired);
        }
        Some(false) => {
            conditions
                .next(qb)
                .push("status = ")
                .push_bind(BorneStatus::Retired);
        }
        None => {}
    }

    if let Some(city) = &filter.city {
        conditions
            .next(qb)
            .push("city ILIKE ")
            .push_bind(like_pattern(city))
            .push(" ESCAPE '\\'");
    }
}

#[async_trait]
impl BorneExt for DBClient {
    async fn list_bornes(&self, filter: &BorneFilter) -> Result<(Vec<Borne>, i64), StoreError> {
        let total = self.count_bornes(filter).await?;

        let pagination = filter.pagination();
        let mut query = QueryBuilder::new(format!("SELECT {BORNE_COLUMNS} FROM bornes"));
        push_borne_conditions(&mut query, filter);
        query
            .push(" ORDER BY name COLLATE \"C\" ASC, created_at ASC LIMIT ")
            .push_bind(pagination.limit)
            .push(" OFFSET ")
            .push_bind(pagination.offset());

        let bornes = query
            .build_query_as::<Borne>()
            .fetch_all(&self.pool)
            .await?;

        Ok((bornes, total))
    }

    async fn count_bornes(&self, filter: &BorneFilter) -> Result<i64, StoreError> {
        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM bornes");
        push_borne_conditions(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;
        Ok(total)
    }

    async fn get_borne(&self, borne_id: Uuid) -> Result<Option<Borne>, StoreError> {
        let borne = sqlx::query_as::<_, Borne>(&format!(
            "SELECT {BORNE_COLUMNS} FROM bornes WHERE id = $1"
        ))
        .bind(borne_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(borne)
    }

    async fn borne_city_facets(&self) -> Result<Vec<FacetCount>, StoreError> {
        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT city, COUNT(*) FROM bornes GROUP BY city")
                .fetch_all(&self.pool)
                .await?;

        Ok(facets::from_grouped(rows))
    }

    async fn create_borne(&self, input: &BorneInput) -> Result<Borne, StoreError> {
        let borne = sqlx::query_as::<_, Borne>(&format!(
            r#"
            INSERT INTO bornes (name, address, city, zip_code, latitude, longitude, status, description)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {BORNE_COLUMNS}
            "#
        ))
        .bind(&input.name)
        .bind(&input.address)
        .bind(&input.city)
        .bind(&input.zip_code)
        .bind(input.latitude)
        .bind(input.longitude)
        .bind(input.status)
        .bind(&input.description)
        .fetch_one(&self.pool)
        .await?;

        Ok(borne)
    }

    async fn update_borne(&self, borne_id: Uuid, input: &BorneInput) -> Result<Borne, StoreError> {
        let borne = sqlx::query_as::<_, Borne>(&format!(
            r#"
            UPDATE bornes
            SET name = $1, address = $2, city = $3, zip_code = $4, latitude = $5,
                longitude = $6, status = $7, description = $8, updated_at = NOW()
            WHERE id = $9
            RETURNING {BORNE_COLUMNS}
            "#
        ))
        .bind(&input.name)
        .bind(&input.address)
        .bind(&input.city)
        .bind(&input.zip_code)
        .bind(input.latitude)
        .bind(input.longitude)
        .bind(input.status)
        .bind(&input.description)
        .bind(borne_id)
        .fetch_optional(&self.pool)
        .await?;

        borne.ok_or(StoreError::NotFound)
    }

    async fn delete_borne(&self, borne_id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM bornes WHERE id = $1")
            .bind(borne_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        Ok(())
    }
}
