use chrono::prelude::*;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

/// Operational state of a collection point ("borne")
///
/// This is the single source of truth for whether a borne can be used.
/// There is no separate "active" flag: a borne is considered active for every
/// status except `Retired`.
///
/// Stored in PostgreSQL as the "borne_status" ENUM. `Retired` keeps the
/// historical wire value `INACTIVE` so the public site and existing rows
/// keep working.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "borne_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BorneStatus {
    Active,
    Maintenance,
    Full,
    #[sqlx(rename = "INACTIVE")]
    #[serde(rename = "INACTIVE")]
    Retired,
}

impl BorneStatus {
    pub const ALL: [BorneStatus; 4] = [
        BorneStatus::Active,
        BorneStatus::Maintenance,
        BorneStatus::Full,
        BorneStatus::Retired,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BorneStatus::Active => "ACTIVE",
            BorneStatus::Maintenance => "MAINTENANCE",
            BorneStatus::Full => "FULL",
            BorneStatus::Retired => "INACTIVE",
        }
    }

    /// Whether the borne is still part of the network (not retired)
    pub fn is_active(&self) -> bool {
        *self != BorneStatus::Retired
    }
}

impl FromStr for BorneStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BorneStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or(UnknownVariant)
    }
}

/// Closed set of partner categories
///
/// Rust names are English, the wire and database values are the ones the
/// public site has always used (RESTAURANT, BOUTIQUE, SUPERMARCHE, ...).
#[derive(Debug, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "partner_category")]
pub enum PartnerCategory {
    #[sqlx(rename = "RESTAURANT")]
    #[serde(rename = "RESTAURANT")]
    Restaurant,
    #[sqlx(rename = "BAR")]
    #[serde(rename = "BAR")]
    Bar,
    #[sqlx(rename = "CAFE")]
    #[serde(rename = "CAFE")]
    Cafe,
    #[sqlx(rename = "BOUTIQUE")]
    #[serde(rename = "BOUTIQUE")]
    Shop,
    #[sqlx(rename = "SUPERMARCHE")]
    #[serde(rename = "SUPERMARCHE")]
    Supermarket,
    #[sqlx(rename = "LOISIRS")]
    #[serde(rename = "LOISIRS")]
    Leisure,
    #[sqlx(rename = "BEAUTE")]
    #[serde(rename = "BEAUTE")]
    Beauty,
    #[sqlx(rename = "SERVICES")]
    #[serde(rename = "SERVICES")]
    Services,
    #[sqlx(rename = "AUTRE")]
    #[serde(rename = "AUTRE")]
    Other,
}

impl PartnerCategory {
    pub const ALL: [PartnerCategory; 9] = [
        PartnerCategory::Restaurant,
        PartnerCategory::Bar,
        PartnerCategory::Cafe,
        PartnerCategory::Shop,
        PartnerCategory::Supermarket,
        PartnerCategory::Leisure,
        PartnerCategory::Beauty,
        PartnerCategory::Services,
        PartnerCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PartnerCategory::Restaurant => "RESTAURANT",
            PartnerCategory::Bar => "BAR",
            PartnerCategory::Cafe => "CAFE",
            PartnerCategory::Shop => "BOUTIQUE",
            PartnerCategory::Supermarket => "SUPERMARCHE",
            PartnerCategory::Leisure => "LOISIRS",
            PartnerCategory::Beauty => "BEAUTE",
            PartnerCategory::Services => "SERVICES",
            PartnerCategory::Other => "AUTRE",
        }
    }
}

impl FromStr for PartnerCategory {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PartnerCategory::ALL
            .into_iter()
            .find(|category| category.as_str() == s)
            .ok_or(UnknownVariant)
    }
}

/// Closed set of article categories
#[derive(Debug, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "article_category")]
pub enum ArticleCategory {
    #[sqlx(rename = "EVENEMENT")]
    #[serde(rename = "EVENEMENT")]
    Event,
    #[sqlx(rename = "TRI")]
    #[serde(rename = "TRI")]
    SortingTips,
    #[sqlx(rename = "PARTENAIRES")]
    #[serde(rename = "PARTENAIRES")]
    Partners,
    #[sqlx(rename = "RESULTATS")]
    #[serde(rename = "RESULTATS")]
    Results,
    #[sqlx(rename = "ACTUALITE")]
    #[serde(rename = "ACTUALITE")]
    News,
    #[sqlx(rename = "CONSEILS")]
    #[serde(rename = "CONSEILS")]
    Advice,
}

impl ArticleCategory {
    pub const ALL: [ArticleCategory; 6] = [
        ArticleCategory::Event,
        ArticleCategory::SortingTips,
        ArticleCategory::Partners,
        ArticleCategory::Results,
        ArticleCategory::News,
        ArticleCategory::Advice,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ArticleCategory::Event => "EVENEMENT",
            ArticleCategory::SortingTips => "TRI",
            ArticleCategory::Partners => "PARTENAIRES",
            ArticleCategory::Results => "RESULTATS",
            ArticleCategory::News => "ACTUALITE",
            ArticleCategory::Advice => "CONSEILS",
        }
    }
}

impl FromStr for ArticleCategory {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ArticleCategory::ALL
            .into_iter()
            .find(|category| category.as_str() == s)
            .ok_or(UnknownVariant)
    }
}

/// Returned when a query string names an enum value that does not exist
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownVariant;

/// Discriminant of a contact message, persisted next to the message itself
#[derive(Debug, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "contact_kind")]
pub enum ContactKind {
    #[sqlx(rename = "PARTICULIER")]
    #[serde(rename = "PARTICULIER")]
    Individual,
    #[sqlx(rename = "COMMERCANT")]
    #[serde(rename = "COMMERCANT")]
    Merchant,
}

impl ContactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContactKind::Individual => "PARTICULIER",
            ContactKind::Merchant => "COMMERCANT",
        }
    }
}

/// Back-office role
///
/// Editors manage articles only, admins manage everything.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "user_role", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    Admin,
    Editor,
}

impl UserRole {
    pub fn to_str(&self) -> &str {
        match self {
            UserRole::Admin => "ADMIN",
            UserRole::Editor => "EDITOR",
        }
    }
}

/// Back-office account
///
/// `password` holds an argon2 PHC string, never the plain text.
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub password: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Glass collection point ("borne")
///
/// Both coordinates are mandatory: a borne that cannot be placed on the map
/// is never stored.
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Borne {
    pub id: Uuid,
    pub name: String,
    pub address: String,
    pub city: String,
    pub zip_code: String,
    pub latitude: f64,
    pub longitude: f64,
    pub status: BorneStatus,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Merchant offering rewards against program points
///
/// `slug` is unique and is the public lookup key. `discount` is free display
/// text ("-10%", "1 café offert"), not a structured amount.
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Partner {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub long_description: Option<String>,
    pub category: PartnerCategory,
    pub logo_url: Option<String>,
    pub image_url: Option<String>,
    pub address: String,
    pub city: String,
    pub zip_code: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub advantages: Vec<String>,
    pub points_required: i32,
    pub discount: Option<String>,
    pub is_active: bool,
    pub is_featured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// News/blog article
///
/// `author_name` is not a column: it is joined from the users table when the
/// article is read.
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub excerpt: Option<String>,
    pub content: String,
    pub image_url: Option<String>,
    pub category: ArticleCategory,
    pub tags: Vec<String>,
    pub is_published: bool,
    pub is_featured: bool,
    pub published_at: Option<DateTime<Utc>>,
    pub views: i32,
    pub author_id: Uuid,
    pub author_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Article {
    /// Public visibility rule for articles
    ///
    /// Drafts and future-dated articles are hidden from the public site.
    /// A published article without a publication date is visible right away.
    pub fn is_visible_at(&self, now: DateTime<Utc>) -> bool {
        self.is_published && self.published_at.is_none_or(|at| at <= now)
    }
}

/// Message received through the contact form
///
/// Merchant-only columns (`company_name`, `phone`, `position`) are always
/// `None` for individual messages.
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContactMessage {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: ContactKind,
    pub name: String,
    pub email: String,
    pub message: String,
    pub company_name: Option<String>,
    pub phone: Option<String>,
    pub position: Option<String>,
    pub is_read: bool,
    pub is_archived: bool,
    pub created_at: DateTime<Utc>,
}

/// Editable site copy, one row per key
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SiteConfig {
    pub key: String,
    pub value: String,
    pub description: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Periodic cumulative figures displayed on the public site
///
/// The latest row by `created_at` is the current one.
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub id: Uuid,
    pub year: i32,
    pub month: i32,
    pub total_glass_collected: f64,
    pub total_points: i64,
    pub total_users: i64,
    pub total_partners: i64,
    pub created_at: DateTime<Utc>,
}
