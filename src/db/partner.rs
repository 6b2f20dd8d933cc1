use super::{Conditions, DBClient, StoreError, like_pattern};
use crate::dtos::PartnerInput;
use crate::facets::{self, PartnerFacets};
use crate::filters::{Criterion, PartnerFilter};
use crate::models::Partner;
use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

const PARTNER_COLUMNS: &str = "id, name, slug, description, long_description, category, \
     logo_url, image_url, address, city, zip_code, latitude, longitude, phone, email, website, \
     advantages, points_required, discount, is_active, is_featured, created_at, updated_at";

/// Partner directory operations
#[async_trait]
pub trait PartnerExt: Send + Sync {
    async fn list_partners(
        &self,
        filter: &PartnerFilter,
    ) -> Result<(Vec<Partner>, i64), StoreError>;

    /// Number of partners passing the filter, `limit` is ignored
    async fn count_partners(&self, filter: &PartnerFilter) -> Result<i64, StoreError>;

    async fn get_partner_by_slug(&self, slug: &str) -> Result<Option<Partner>, StoreError>;

    /// Category and city counts over every partner
    async fn partner_facets(&self) -> Result<PartnerFacets, StoreError>;

    /// Insert a partner under `slug`; a taken slug is a `Conflict`
    async fn create_partner(&self, slug: &str, input: &PartnerInput)
    -> Result<Partner, StoreError>;

    /// Replace every field but the slug
    async fn update_partner(
        &self,
        partner_id: Uuid,
        input: &PartnerInput,
    ) -> Result<Partner, StoreError>;

    async fn delete_partner(&self, partner_id: Uuid) -> Result<(), StoreError>;
}

fn push_partner_conditions(qb: &mut QueryBuilder<'_, Postgres>, filter: &PartnerFilter) {
    let mut conditions = Conditions::new();

    if let Some(active) = filter.active {
        conditions.next(qb).push("is_active = ").push_bind(active);
    }

    match filter.category {
        Criterion::Any => {}
        Criterion::Exactly(category) => {
            conditions.next(qb).push("category = ").push_bind(category);
        }
        Criterion::Unmatchable => {
            conditions.next(qb).push("FALSE");
        }
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
impl PartnerExt for DBClient {
    async fn list_partners(
        &self,
        filter: &PartnerFilter,
    ) -> Result<(Vec<Partner>, i64), StoreError> {
        let total = self.count_partners(filter).await?;

        let pagination = filter.pagination();
        let mut query = QueryBuilder::new(format!("SELECT {PARTNER_COLUMNS} FROM partners"));
        push_partner_conditions(&mut query, filter);
        query
            .push(" ORDER BY name COLLATE \"C\" ASC, created_at ASC LIMIT ")
            .push_bind(pagination.limit)
            .push(" OFFSET ")
            .push_bind(pagination.offset());

        let partners = query
            .build_query_as::<Partner>()
            .fetch_all(&self.pool)
            .await?;

        Ok((partners, total))
    }

    async fn count_partners(&self, filter: &PartnerFilter) -> Result<i64, StoreError> {
        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM partners");
        push_partner_conditions(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;
        Ok(total)
    }

    async fn get_partner_by_slug(&self, slug: &str) -> Result<Option<Partner>, StoreError> {
        let partner = sqlx::query_as::<_, Partner>(&format!(
            "SELECT {PARTNER_COLUMNS} FROM partners WHERE slug = $1"
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;

        Ok(partner)
    }

    async fn partner_facets(&self) -> Result<PartnerFacets, StoreError> {
        let categories: Vec<(String, i64)> =
            sqlx::query_as("SELECT category::text, COUNT(*) FROM partners GROUP BY category")
                .fetch_all(&self.pool)
                .await?;

        let cities: Vec<(String, i64)> =
            sqlx::query_as("SELECT city, COUNT(*) FROM partners GROUP BY city")
                .fetch_all(&self.pool)
                .await?;

        Ok(PartnerFacets {
            categories: facets::from_grouped(categories),
            cities: facets::from_grouped(cities),
        })
    }

    async fn create_partner(
        &self,
        slug: &str,
        input: &PartnerInput,
    ) -> Result<Partner, StoreError> {
        let partner = sqlx::query_as::<_, Partner>(&format!(
            r#"
            INSERT INTO partners (
                name, slug, description, long_description, category, logo_url, image_url,
                address, city, zip_code, latitude, longitude, phone, email, website,
                advantages, points_required, discount, is_active, is_featured
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)
            RETURNING {PARTNER_COLUMNS}
            "#
        ))
        .bind(&input.name)
        .bind(slug)
        .bind(&input.description)
        .bind(&input.long_description)
        .bind(input.category)
        .bind(&input.logo_url)
        .bind(&input.image_url)
        .bind(&input.address)
        .bind(&input.city)
        .bind(&input.zip_code)
        .bind(input.latitude)
        .bind(input.longitude)
        .bind(&input.phone)
        .bind(&input.email)
        .bind(&input.website)
        .bind(&input.advantages)
        .bind(input.points_required)
        .bind(&input.discount)
        .bind(input.is_active)
        .bind(input.is_featured)
        .fetch_one(&self.pool)
        .await?;

        Ok(partner)
    }

    async fn update_partner(
        &self,
        partner_id: Uuid,
        input: &PartnerInput,
    ) -> Result<Partner, StoreError> {
        let partner = sqlx::query_as::<_, Partner>(&format!(
            r#"
            UPDATE partners
            SET name = $1, description = $2, long_description = $3, category = $4,
                logo_url = $5, image_url = $6, address = $7, city = $8, zip_code = $9,
                latitude = $10, longitude = $11, phone = $12, email = $13, website = $14,
                advantages = $15, points_required = $16, discount = $17, is_active = $18,
                is_featured = $19, updated_at = NOW()
            WHERE id = $20
            RETURNING {PARTNER_COLUMNS}
            "#
        ))
        .bind(&input.name)
        .bind(&input.description)
        .bind(&input.long_description)
        .bind(input.category)
        .bind(&input.logo_url)
        .bind(&input.image_url)
        .bind(&input.address)
        .bind(&input.city)
        .bind(&input.zip_code)
        .bind(input.latitude)
        .bind(input.longitude)
        .bind(&input.phone)
        .bind(&input.email)
        .bind(&input.website)
        .bind(&input.advantages)
        .bind(input.points_required)
        .bind(&input.discount)
        .bind(input.is_active)
        .bind(input.is_featured)
        .bind(partner_id)
        .fetch_optional(&self.pool)
        .await?;

        partner.ok_or(StoreError::NotFound)
    }

    async fn delete_partner(&self, partner_id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM partners WHERE id = $1")
            .bind(partner_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PartnerCategory;

    #[test]
    fn unknown_category_compiles_to_false() {
        let filter = PartnerFilter {
            category: Criterion::Unmatchable,
            ..PartnerFilter::everything()
        };
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new("SELECT COUNT(*) FROM partners");
        push_partner_conditions(&mut qb, &filter);
        assert_eq!(qb.sql(), "SELECT COUNT(*) FROM partners WHERE FALSE");
    }

    #[test]
    fn every_criterion_is_bound() {
        let filter = PartnerFilter {
            active: Some(true),
            category: Criterion::Exactly(PartnerCategory::Cafe),
            city: Some("Port".into()),
            limit: 50,
        };
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new("SELECT COUNT(*) FROM partners");
        push_partner_conditions(&mut qb, &filter);
        assert_eq!(
            qb.sql(),
            "SELECT COUNT(*) FROM partners WHERE is_active = $1 AND category = $2 \
             AND city ILIKE $3 ESCAPE '\\'"
        );
    }
}
