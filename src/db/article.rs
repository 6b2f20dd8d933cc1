use super::{Conditions, DBClient, StoreError};
use crate::dtos::ArticleInput;
use crate::facets::{self, FacetCount};
use crate::filters::{ArticleFilter, Criterion};
use crate::models::Article;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

const ARTICLE_SELECT: &str = "SELECT a.id, a.title, a.slug, a.excerpt, a.content, a.image_url, \
     a.category, a.tags, a.is_published, a.is_featured, a.published_at, a.views, a.author_id, \
     u.name AS author_name, a.created_at, a.updated_at \
     FROM articles a LEFT JOIN users u ON u.id = a.author_id";

const PUBLICATION_ORDER: &str = " ORDER BY a.published_at DESC NULLS LAST, a.created_at ASC";

/// Article operations
///
/// Lookups by slug ignore visibility; callers decide what the public may see.
#[async_trait]
pub trait ArticleExt: Send + Sync {
    /// One page in publication order, plus the total under the same filter
    async fn list_articles(
        &self,
        filter: &ArticleFilter,
    ) -> Result<(Vec<Article>, i64), StoreError>;

    async fn get_article(&self, article_id: Uuid) -> Result<Option<Article>, StoreError>;

    async fn get_article_by_slug(&self, slug: &str) -> Result<Option<Article>, StoreError>;

    /// Other articles visible at `now` sharing the category or a tag
    async fn related_articles(
        &self,
        article: &Article,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Article>, StoreError>;

    /// Category counts over the articles visible at `now`
    async fn article_category_facets(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<FacetCount>, StoreError>;

    /// Every article, drafts included, newest first
    async fn all_articles(&self) -> Result<Vec<Article>, StoreError>;

    async fn create_article(
        &self,
        author_id: Uuid,
        slug: &str,
        input: &ArticleInput,
    ) -> Result<Article, StoreError>;

    async fn update_article(
        &self,
        article_id: Uuid,
        slug: &str,
        input: &ArticleInput,
    ) -> Result<Article, StoreError>;

    async fn delete_article(&self, article_id: Uuid) -> Result<(), StoreError>;
}

fn push_visible(qb: &mut QueryBuilder<'_, Postgres>, now: DateTime<Utc>) {
    qb.push("a.is_published AND (a.published_at IS NULL OR a.published_at <= ")
        .push_bind(now)
        .push(")");
}

fn push_article_conditions(qb: &mut QueryBuilder<'_, Postgres>, filter: &ArticleFilter) {
    let mut conditions = Conditions::new();

    match filter.published {
        Some(true) => push_visible(conditions.next(qb), filter.now),
        Some(false) => {
            conditions.next(qb).push("NOT a.is_published");
        }
        None => {}
    }

    if let Some(featured) = filter.featured {
        conditions.next(qb).push("a.is_featured = ").push_bind(featured);
    }

    match filter.category {
        Criterion::Any => {}
        Criterion::Exactly(category) => {
            conditions.next(qb).push("a.category = ").push_bind(category);
        }
        Criterion::Unmatchable => {
            conditions.next(qb).push("FALSE");
        }
    }
}

/// Re-read an article with its author's name joined in
async fn fetch_joined(client: &DBClient, article_id: Uuid) -> Result<Article, StoreError> {
    let article = sqlx::query_as::<_, Article>(&format!("{ARTICLE_SELECT} WHERE a.id = $1"))
        .bind(article_id)
        .fetch_optional(&client.pool)
        .await?;

    article.ok_or(StoreError::NotFound)
}

#[async_trait]
impl ArticleExt for DBClient {
    async fn list_articles(
        &self,
        filter: &ArticleFilter,
    ) -> Result<(Vec<Article>, i64), StoreError> {
        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM articles a");
        push_article_conditions(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut query = QueryBuilder::new(ARTICLE_SELECT);
        push_article_conditions(&mut query, filter);
        query
            .push(PUBLICATION_ORDER)
            .push(" LIMIT ")
            .push_bind(filter.pagination.limit)
            .push(" OFFSET ")
            .push_bind(filter.pagination.offset());

        let articles = query
            .build_query_as::<Article>()
            .fetch_all(&self.pool)
            .await?;

        Ok((articles, total))
    }

    async fn get_article(&self, article_id: Uuid) -> Result<Option<Article>, StoreError> {
        match fetch_joined(self, article_id).await {
            Ok(article) => Ok(Some(article)),
            Err(StoreError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn get_article_by_slug(&self, slug: &str) -> Result<Option<Article>, StoreError> {
        let article = sqlx::query_as::<_, Article>(&format!("{ARTICLE_SELECT} WHERE a.slug = $1"))
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;

        Ok(article)
    }

    async fn related_articles(
        &self,
        article: &Article,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Article>, StoreError> {
        let mut query = QueryBuilder::new(ARTICLE_SELECT);
        query.push(" WHERE ");
        push_visible(&mut query, now);
        query
            .push(" AND a.id <> ")
            .push_bind(article.id)
            .push(" AND (a.category = ")
            .push_bind(article.category)
            .push(" OR a.tags && ")
            .push_bind(article.tags.clone())
            .push(")")
            .push(PUBLICATION_ORDER)
            .push(" LIMIT ")
            .push_bind(limit);

        let related = query
            .build_query_as::<Article>()
            .fetch_all(&self.pool)
            .await?;

        Ok(related)
    }

    async fn article_category_facets(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<FacetCount>, StoreError> {
        let mut query = QueryBuilder::new("SELECT a.category::text, COUNT(*) FROM articles a WHERE ");
        push_visible(&mut query, now);
        query.push(" GROUP BY a.category");

        let rows: Vec<(String, i64)> = query.build_query_as().fetch_all(&self.pool).await?;

        Ok(facets::from_grouped(rows))
    }

    async fn all_articles(&self) -> Result<Vec<Article>, StoreError> {
        let articles = sqlx::query_as::<_, Article>(&format!(
            "{ARTICLE_SELECT} ORDER BY a.created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(articles)
    }

    async fn create_article(
        &self,
        author_id: Uuid,
        slug: &str,
        input: &ArticleInput,
    ) -> Result<Article, StoreError> {
        let article_id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO articles (
                title, slug, excerpt, content, image_url, category, tags,
                is_published, is_featured, published_at, author_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING id
            "#,
        )
        .bind(&input.title)
        .bind(slug)
        .bind(&input.excerpt)
        .bind(&input.content)
        .bind(&input.image_url)
        .bind(input.category)
        .bind(&input.tags)
        .bind(input.is_published)
        .bind(input.is_featured)
        .bind(input.published_at)
        .bind(author_id)
        .fetch_one(&self.pool)
        .await?;

        fetch_joined(self, article_id).await
    }

    async fn update_article(
        &self,
        article_id: Uuid,
        slug: &str,
        input: &ArticleInput,
    ) -> Result<Article, StoreError> {
        let updated: Option<Uuid> = sqlx::query_scalar(
            r#"
            UPDATE articles
            SET title = $1, slug = $2, excerpt = $3, content = $4, image_url = $5,
                category = $6, tags = $7, is_published = $8, is_featured = $9,
                published_at = $10, updated_at = NOW()
            WHERE id = $11
            RETURNING id
            "#,
        )
        .bind(&input.title)
        .bind(slug)
        .bind(&input.excerpt)
        .bind(&input.content)
        .bind(&input.image_url)
        .bind(input.category)
        .bind(&input.tags)
        .bind(input.is_published)
        .bind(input.is_featured)
        .bind(input.published_at)
        .bind(article_id)
        .fetch_optional(&self.pool)
        .await?;

        let article_id = updated.ok_or(StoreError::NotFound)?;
        fetch_joined(self, article_id).await
    }

    async fn delete_article(&self, article_id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM articles WHERE id = $1")
            .bind(article_id)
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
    use crate::dtos::ArticleQueryParams;

    #[test]
    fn published_filter_applies_visibility_rule() {
        let params = ArticleQueryParams {
            published: Some("true".into()),
            category: Some("TRI".into()),
            ..Default::default()
        };
        let filter = ArticleFilter::from_params(&params, Utc::now());
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new("SELECT COUNT(*) FROM articles a");
        push_article_conditions(&mut qb, &filter);
        assert_eq!(
            qb.sql(),
            "SELECT COUNT(*) FROM articles a WHERE a.is_published AND \
             (a.published_at IS NULL OR a.published_at <= $1) AND a.category = $2"
        );
    }

    #[test]
    fn drafts_filter_ignores_dates() {
        let params = ArticleQueryParams {
            published: Some("false".into()),
            ..Default::default()
        };
        let filter = ArticleFilter::from_params(&params, Utc::now());
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new("SELECT COUNT(*) FROM articles a");
        push_article_conditions(&mut qb, &filter);
        assert_eq!(
            qb.sql(),
            "SELECT COUNT(*) FROM articles a WHERE NOT a.is_published"
        );
    }
}
