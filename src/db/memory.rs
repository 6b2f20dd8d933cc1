//! In-process store.
//!
//! Evaluates the same filter structs the PostgreSQL backend compiles to SQL,
//! with the same orderings, so handlers behave identically on both. Used by
//! the test suites and by `STORE_BACKEND=memory` for local runs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{ArticleExt, BorneExt, ContactExt, PartnerExt, SiteExt, StoreError, UserExt};
use crate::dtos::{
    ArticleInput, BorneInput, MessageFlagsDto, PartnerInput, SiteConfigEntry, StatisticsInput,
};
use crate::facets::{self, FacetCount, PartnerFacets};
use crate::filters::{ArticleFilter, BorneFilter, PartnerFilter, is_related, publication_order};
use crate::intake::ContactSubmission;
use crate::models::{
    Article, Borne, ContactMessage, Partner, SiteConfig, Statistics, User, UserRole,
};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    bornes: Vec<Borne>,
    partners: Vec<Partner>,
    articles: Vec<Article>,
    messages: Vec<ContactMessage>,
    site_config: Vec<SiteConfig>,
    statistics: Vec<Statistics>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    offline: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following operation fail as an unreachable database would
    pub fn go_offline(&self) {
        self.offline.store(true, AtomicOrdering::SeqCst);
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.offline.load(AtomicOrdering::SeqCst) {
            return Err(StoreError::Backend(sqlx::Error::PoolClosed));
        }
        Ok(())
    }

    pub async fn insert_user(&self, user: User) {
        self.tables.write().await.users.push(user);
    }

    pub async fn insert_borne(&self, borne: Borne) {
        self.tables.write().await.bornes.push(borne);
    }

    pub async fn insert_partner(&self, partner: Partner) {
        self.tables.write().await.partners.push(partner);
    }

    pub async fn insert_article(&self, article: Article) {
        self.tables.write().await.articles.push(article);
    }

    pub async fn insert_statistics(&self, statistics: Statistics) {
        self.tables.write().await.statistics.push(statistics);
    }

    pub async fn insert_site_config(&self, key: &str, value: &str) {
        self.tables.write().await.site_config.push(SiteConfig {
            key: key.to_string(),
            value: value.to_string(),
            description: None,
            updated_at: Utc::now(),
        });
    }
}

#[async_trait]
impl BorneExt for MemoryStore {
    async fn list_bornes(&self, filter: &BorneFilter) -> Result<(Vec<Borne>, i64), StoreError> {
        self.check()?;
        let tables = self.tables.read().await;
        let mut rows: Vec<Borne> = tables
            .bornes
            .iter()
            .filter(|b| filter.matches(b))
            .cloned()
            .collect();
        // ORDER BY name COLLATE "C", created_at
        rows.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.created_at.cmp(&b.created_at)));

        let total = rows.len() as i64;
        Ok((filter.pagination().apply(rows), total))
    }

    async fn count_bornes(&self, filter: &BorneFilter) -> Result<i64, StoreError> {
        self.check()?;
        let tables = self.tables.read().await;
        Ok(tables.bornes.iter().filter(|b| filter.matches(b)).count() as i64)
    }

    async fn get_borne(&self, borne_id: Uuid) -> Result<Option<Borne>, StoreError> {
        self.check()?;
        let tables = self.tables.read().await;
        Ok(tables.bornes.iter().find(|b| b.id == borne_id).cloned())
    }

    async fn borne_city_facets(&self) -> Result<Vec<FacetCount>, StoreError> {
        self.check()?;
        let tables = self.tables.read().await;
        Ok(facets::tally(tables.bornes.iter().map(|b| b.city.as_str())))
    }

    async fn create_borne(&self, input: &BorneInput) -> Result<Borne, StoreError> {
        self.check()?;
        let now = Utc::now();
        let borne = Borne {
            id: Uuid::new_v4(),
            name: input.name.clone(),
            address: input.address.clone(),
            city: input.city.clone(),
            zip_code: input.zip_code.clone(),
            latitude: input.latitude,
            longitude: input.longitude,
            status: input.status,
            description: input.description.clone(),
            created_at: now,
            updated_at: now,
        };
        self.tables.write().await.bornes.push(borne.clone());
        Ok(borne)
    }

    async fn update_borne(&self, borne_id: Uuid, input: &BorneInput) -> Result<Borne, StoreError> {
        self.check()?;
        let mut tables = self.tables.write().await;
        let borne = tables
            .bornes
            .iter_mut()
            .find(|b| b.id == borne_id)
            .ok_or(StoreError::NotFound)?;

        borne.name = input.name.clone();
        borne.address = input.address.clone();
        borne.city = input.city.clone();
        borne.zip_code = input.zip_code.clone();
        borne.latitude = input.latitude;
        borne.longitude = input.longitude;
        borne.status = input.status;
        borne.description = input.description.clone();
        borne.updated_at = Utc::now();
        Ok(borne.clone())
    }

    async fn delete_borne(&self, borne_id: Uuid) -> Result<(), StoreError> {
        self.check()?;
        let mut tables = self.tables.write().await;
        let before = tables.bornes.len();
        tables.bornes.retain(|b| b.id != borne_id);
        if tables.bornes.len() == before {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl PartnerExt for MemoryStore {
    async fn list_partners(
        &self,
        filter: &PartnerFilter,
    ) -> Result<(Vec<Partner>, i64), StoreError> {
        self.check()?;
        let tables = self.tables.read().await;
        let mut rows: Vec<Partner> = tables
            .partners
            .iter()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.created_at.cmp(&b.created_at)));

        let total = rows.len() as i64;
        Ok((filter.pagination().apply(rows), total))
    }

    async fn count_partners(&self, filter: &PartnerFilter) -> Result<i64, StoreError> {
        self.check()?;
        let tables = self.tables.read().await;
        Ok(tables.partners.iter().filter(|p| filter.matches(p)).count() as i64)
    }

    async fn get_partner_by_slug(&self, slug: &str) -> Result<Option<Partner>, StoreError> {
        self.check()?;
        let tables = self.tables.read().await;
        Ok(tables.partners.iter().find(|p| p.slug == slug).cloned())
    }

    async fn partner_facets(&self) -> Result<PartnerFacets, StoreError> {
        self.check()?;
        let tables = self.tables.read().await;
        Ok(PartnerFacets {
            categories: facets::tally(tables.partners.iter().map(|p| p.category.as_str())),
            cities: facets::tally(tables.partners.iter().map(|p| p.city.as_str())),
        })
    }

    async fn create_partner(
        &self,
        slug: &str,
        input: &PartnerInput,
    ) -> Result<Partner, StoreError> {
        self.check()?;
        let mut tables = self.tables.write().await;
        if tables.partners.iter().any(|p| p.slug == slug) {
            return Err(StoreError::Conflict("partners_slug_key".to_string()));
        }

        let now = Utc::now();
        let partner = Partner {
            id: Uuid::new_v4(),
            name: input.name.clone(),
            slug: slug.to_string(),
            description: input.description.clone(),
            long_description: input.long_description.clone(),
            category: input.category,
            logo_url: input.logo_url.clone(),
            image_url: input.image_url.clone(),
            address: input.address.clone(),
            city: input.city.clone(),
            zip_code: input.zip_code.clone(),
            latitude: input.latitude,
            longitude: input.longitude,
            phone: input.phone.clone(),
            email: input.email.clone(),
            website: input.website.clone(),
            advantages: input.advantages.clone(),
            points_required: input.points_required,
            discount: input.discount.clone(),
            is_active: input.is_active,
            is_featured: input.is_featured,
            created_at: now,
            updated_at: now,
        };
        tables.partners.push(partner.clone());
        Ok(partner)
    }

    async fn update_partner(
        &self,
        partner_id: Uuid,
        input: &PartnerInput,
    ) -> Result<Partner, StoreError> {
        self.check()?;
        let mut tables = self.tables.write().await;
        let partner = tables
            .partners
            .iter_mut()
            .find(|p| p.id == partner_id)
            .ok_or(StoreError::NotFound)?;

        partner.name = input.name.clone();
        partner.description = input.description.clone();
        partner.long_description = input.long_description.clone();
        partner.category = input.category;
        partner.logo_url = input.logo_url.clone();
        partner.image_url = input.image_url.clone();
        partner.address = input.address.clone();
        partner.city = input.city.clone();
        partner.zip_code = input.zip_code.clone();
        partner.latitude = input.latitude;
        partner.longitude = input.longitude;
        partner.phone = input.phone.clone();
        partner.email = input.email.clone();
        partner.website = input.website.clone();
        partner.advantages = input.advantages.clone();
        partner.points_required = input.points_required;
        partner.discount = input.discount.clone();
        partner.is_active = input.is_active;
        partner.is_featured = input.is_featured;
        partner.updated_at = Utc::now();
        Ok(partner.clone())
    }

    async fn delete_partner(&self, partner_id: Uuid) -> Result<(), StoreError> {
        self.check()?;
        let mut tables = self.tables.write().await;
        let before = tables.partners.len();
        tables.partners.retain(|p| p.id != partner_id);
        if tables.partners.len() == before {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl ArticleExt for MemoryStore {
    async fn list_articles(
        &self,
        filter: &ArticleFilter,
    ) -> Result<(Vec<Article>, i64), StoreError> {
        self.check()?;
        let tables = self.tables.read().await;
        let mut rows: Vec<Article> = tables
            .articles
            .iter()
            .filter(|a| filter.matches(a))
            .cloned()
            .collect();
        rows.sort_by(publication_order);

        let total = rows.len() as i64;
        Ok((filter.pagination.apply(rows), total))
    }

    async fn get_article(&self, article_id: Uuid) -> Result<Option<Article>, StoreError> {
        self.check()?;
        let tables = self.tables.read().await;
        Ok(tables.articles.iter().find(|a| a.id == article_id).cloned())
    }

    async fn get_article_by_slug(&self, slug: &str) -> Result<Option<Article>, StoreError> {
        self.check()?;
        let tables = self.tables.read().await;
        Ok(tables.articles.iter().find(|a| a.slug == slug).cloned())
    }

    async fn related_articles(
        &self,
        article: &Article,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Article>, StoreError> {
        self.check()?;
        let tables = self.tables.read().await;
        let mut rows: Vec<Article> = tables
            .articles
            .iter()
            .filter(|a| a.is_visible_at(now) && is_related(a, article))
            .cloned()
            .collect();
        rows.sort_by(publication_order);
        rows.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(rows)
    }

    async fn article_category_facets(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<FacetCount>, StoreError> {
        self.check()?;
        let tables = self.tables.read().await;
        Ok(facets::tally(
            tables
                .articles
                .iter()
                .filter(|a| a.is_visible_at(now))
                .map(|a| a.category.as_str()),
        ))
    }

    async fn all_articles(&self) -> Result<Vec<Article>, StoreError> {
        self.check()?;
        let tables = self.tables.read().await;
        let mut rows = tables.articles.clone();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn create_article(
        &self,
        author_id: Uuid,
        slug: &str,
        input: &ArticleInput,
    ) -> Result<Article, StoreError> {
        self.check()?;
        let mut tables = self.tables.write().await;
        if tables.articles.iter().any(|a| a.slug == slug) {
            return Err(StoreError::Conflict("articles_slug_key".to_string()));
        }

        let author_name = tables
            .users
            .iter()
            .find(|u| u.id == author_id)
            .and_then(|u| u.name.clone());
        let now = Utc::now();
        let article = Article {
            id: Uuid::new_v4(),
            title: input.title.clone(),
            slug: slug.to_string(),
            excerpt: input.excerpt.clone(),
            content: input.content.clone(),
            image_url: input.image_url.clone(),
            category: input.category,
            tags: input.tags.clone(),
            is_published: input.is_published,
            is_featured: input.is_featured,
            published_at: input.published_at,
            views: 0,
            author_id,
            author_name,
            created_at: now,
            updated_at: now,
        };
        tables.articles.push(article.clone());
        Ok(article)
    }

    async fn update_article(
        &self,
        article_id: Uuid,
        slug: &str,
        input: &ArticleInput,
    ) -> Result<Article, StoreError> {
        self.check()?;
        let mut tables = self.tables.write().await;
        if tables
            .articles
            .iter()
            .any(|a| a.slug == slug && a.id != article_id)
        {
            return Err(StoreError::Conflict("articles_slug_key".to_string()));
        }

        let article = tables
            .articles
            .iter_mut()
            .find(|a| a.id == article_id)
            .ok_or(StoreError::NotFound)?;

        article.title = input.title.clone();
        article.slug = slug.to_string();
        article.excerpt = input.excerpt.clone();
        article.content = input.content.clone();
        article.image_url = input.image_url.clone();
        article.category = input.category;
        article.tags = input.tags.clone();
        article.is_published = input.is_published;
        article.is_featured = input.is_featured;
        article.published_at = input.published_at;
        article.updated_at = Utc::now();
        Ok(article.clone())
    }

    async fn delete_article(&self, article_id: Uuid) -> Result<(), StoreError> {
        self.check()?;
        let mut tables = self.tables.write().await;
        let before = tables.articles.len();
        tables.articles.retain(|a| a.id != article_id);
        if tables.articles.len() == before {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl ContactExt for MemoryStore {
    async fn save_contact_message(
        &self,
        submission: &ContactSubmission,
    ) -> Result<ContactMessage, StoreError> {
        self.check()?;
        let message = ContactMessage {
            id: Uuid::new_v4(),
            kind: submission.kind(),
            name: submission.name().to_string(),
            email: submission.email().to_string(),
            message: submission.message().to_string(),
            company_name: submission.company_name().map(str::to_string),
            phone: submission.phone().map(str::to_string),
            position: submission.position().map(str::to_string),
            is_read: false,
            is_archived: false,
            created_at: Utc::now(),
        };
        self.tables.write().await.messages.push(message.clone());
        Ok(message)
    }

    async fn list_contact_messages(&self) -> Result<Vec<ContactMessage>, StoreError> {
        self.check()?;
        let tables = self.tables.read().await;
        // newest first; later inserts win ties
        let mut rows: Vec<ContactMessage> = tables.messages.iter().rev().cloned().collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn count_contact_messages(&self, unread_only: bool) -> Result<i64, StoreError> {
        self.check()?;
        let tables = self.tables.read().await;
        Ok(tables
            .messages
            .iter()
            .filter(|m| !unread_only || !m.is_read)
            .count() as i64)
    }

    async fn update_message_flags(
        &self,
        message_id: Uuid,
        flags: &MessageFlagsDto,
    ) -> Result<ContactMessage, StoreError> {
        self.check()?;
        let mut tables = self.tables.write().await;
        let message = tables
            .messages
            .iter_mut()
            .find(|m| m.id == message_id)
            .ok_or(StoreError::NotFound)?;

        if let Some(is_read) = flags.is_read {
            message.is_read = is_read;
        }
        if let Some(is_archived) = flags.is_archived {
            message.is_archived = is_archived;
        }
        Ok(message.clone())
    }

    async fn delete_contact_message(&self, message_id: Uuid) -> Result<(), StoreError> {
        self.check()?;
        let mut tables = self.tables.write().await;
        let before = tables.messages.len();
        tables.messages.retain(|m| m.id != message_id);
        if tables.messages.len() == before {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl SiteExt for MemoryStore {
    async fn get_site_config(&self) -> Result<Vec<SiteConfig>, StoreError> {
        self.check()?;
        let tables = self.tables.read().await;
        let mut rows = tables.site_config.clone();
        rows.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(rows)
    }

    async fn upsert_site_config(
        &self,
        entries: &[SiteConfigEntry],
    ) -> Result<Vec<SiteConfig>, StoreError> {
        self.check()?;
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        let mut saved = Vec::with_capacity(entries.len());

        for entry in entries {
            let row = match tables.site_config.iter_mut().find(|c| c.key == entry.key) {
                Some(existing) => {
                    existing.value = entry.value.clone();
                    if entry.description.is_some() {
                        existing.description = entry.description.clone();
                    }
                    existing.updated_at = now;
                    existing.clone()
                }
                None => {
                    let row = SiteConfig {
                        key: entry.key.clone(),
                        value: entry.value.clone(),
                        description: entry.description.clone(),
                        updated_at: now,
                    };
                    tables.site_config.push(row.clone());
                    row
                }
            };
            saved.push(row);
        }

        Ok(saved)
    }

    async fn latest_statistics(&self) -> Result<Option<Statistics>, StoreError> {
        self.check()?;
        let tables = self.tables.read().await;
        // max_by_key keeps the last maximum, so later inserts win ties
        Ok(tables
            .statistics
            .iter()
            .max_by_key(|s| s.created_at)
            .cloned())
    }

    async fn record_statistics(&self, input: &StatisticsInput) -> Result<Statistics, StoreError> {
        self.check()?;
        let stats = Statistics {
            id: Uuid::new_v4(),
            year: input.year,
            month: input.month,
            total_glass_collected: input.total_glass_collected,
            total_points: input.total_points,
            total_users: input.total_users,
            total_partners: input.total_partners,
            created_at: Utc::now(),
        };
        self.tables.write().await.statistics.push(stats.clone());
        Ok(stats)
    }
}

#[async_trait]
impl UserExt for MemoryStore {
    async fn get_user(
        &self,
        user_id: Option<Uuid>,
        email: Option<&str>,
    ) -> Result<Option<User>, StoreError> {
        self.check()?;
        let tables = self.tables.read().await;
        let user = if let Some(user_id) = user_id {
            tables.users.iter().find(|u| u.id == user_id)
        } else if let Some(email) = email {
            tables.users.iter().find(|u| u.email == email)
        } else {
            None
        };
        Ok(user.cloned())
    }

    async fn save_user(
        &self,
        email: &str,
        name: Option<&str>,
        password: &str,
        role: UserRole,
    ) -> Result<User, StoreError> {
        self.check()?;
        let mut tables = self.tables.write().await;
        if tables.users.iter().any(|u| u.email == email) {
            return Err(StoreError::Conflict("users_email_key".to_string()));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            name: name.map(str::to_string),
            password: password.to_string(),
            role,
            created_at: now,
            updated_at: now,
        };
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn get_user_count(&self) -> Result<i64, StoreError> {
        self.check()?;
        Ok(self.tables.read().await.users.len() as i64)
    }
}
