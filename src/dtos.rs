use crate::models::{
    Article, ArticleCategory, Borne, BorneStatus, ContactMessage, Partner, PartnerCategory,
    Statistics, User,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

// DTOs define what goes over the wire. Database models stay internal; the
// public JSON shape (camelCase, derived `position`, envelopes) lives here.

// ============================================================================
// Envelopes
// ============================================================================

/// `{ "success": true, "data": ... }`
#[derive(Debug, Serialize, Deserialize)]
pub struct DataResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> DataResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// List envelope with pagination metadata next to the data
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse<T> {
    pub success: bool,
    pub data: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub total_pages: i64,
}

/// Generic success response for writes
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
}

// ============================================================================
// List query parameters
// ============================================================================
//
// Everything is received as raw strings: the filters module decides what a
// malformed value means instead of letting the extractor reject the request.

#[derive(Debug, Default, Clone, Deserialize)]
pub struct BorneQueryParams {
    pub active: Option<String>,
    pub city: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct PartnerQueryParams {
    pub active: Option<String>,
    pub category: Option<String>,
    pub city: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct ArticleQueryParams {
    pub published: Option<String>,
    pub featured: Option<String>,
    pub category: Option<String>,
    pub limit: Option<String>,
    pub page: Option<String>,
}

// ============================================================================
// Borne DTOs
// ============================================================================

/// Public borne shape used by the map
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BorneDto {
    pub id: Uuid,
    pub name: String,
    pub address: String,
    pub city: String,
    pub zip_code: String,
    pub position: [f64; 2],
    pub is_active: bool,
    pub status: BorneStatus,
    pub description: Option<String>,
}

impl BorneDto {
    pub fn from_borne(borne: &Borne) -> Self {
        BorneDto {
            id: borne.id,
            name: borne.name.clone(),
            address: borne.address.clone(),
            city: borne.city.clone(),
            zip_code: borne.zip_code.clone(),
            position: [borne.latitude, borne.longitude],
            is_active: borne.status.is_active(),
            status: borne.status,
            description: borne.description.clone(),
        }
    }

    pub fn from_bornes(bornes: &[Borne]) -> Vec<BorneDto> {
        bornes.iter().map(BorneDto::from_borne).collect()
    }
}

/// Borne detail: the list shape plus timestamps
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BorneDetailDto {
    #[serde(flatten)]
    pub borne: BorneDto,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ============================================================================
// Partner DTOs
// ============================================================================

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PartnerDto {
    #[serde(flatten)]
    pub partner: Partner,
    /// `[lat, lng]` when both coordinates are known
    pub position: Option<[f64; 2]>,
}

impl PartnerDto {
    pub fn from_partner(partner: &Partner) -> Self {
        let position = match (partner.latitude, partner.longitude) {
            (Some(lat), Some(lng)) => Some([lat, lng]),
            _ => None,
        };
        PartnerDto {
            partner: partner.clone(),
            position,
        }
    }

    pub fn from_partners(partners: &[Partner]) -> Vec<PartnerDto> {
        partners.iter().map(PartnerDto::from_partner).collect()
    }
}

// ============================================================================
// Article DTOs
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthorDto {
    pub name: Option<String>,
}

/// Article card for list views (no body)
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleListItemDto {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub excerpt: Option<String>,
    pub image_url: Option<String>,
    pub category: ArticleCategory,
    pub tags: Vec<String>,
    pub is_published: bool,
    pub is_featured: bool,
    pub published_at: Option<DateTime<Utc>>,
    pub author: AuthorDto,
}

impl ArticleListItemDto {
    pub fn from_article(article: &Article) -> Self {
        ArticleListItemDto {
            id: article.id,
            title: article.title.clone(),
            slug: article.slug.clone(),
            excerpt: article.excerpt.clone(),
            image_url: article.image_url.clone(),
            category: article.category,
            tags: article.tags.clone(),
            is_published: article.is_published,
            is_featured: article.is_featured,
            published_at: article.published_at,
            author: AuthorDto {
                name: article.author_name.clone(),
            },
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelatedArticleDto {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub excerpt: Option<String>,
    pub image_url: Option<String>,
    pub category: ArticleCategory,
    pub published_at: Option<DateTime<Utc>>,
}

impl RelatedArticleDto {
    pub fn from_article(article: &Article) -> Self {
        RelatedArticleDto {
            id: article.id,
            title: article.title.clone(),
            slug: article.slug.clone(),
            excerpt: article.excerpt.clone(),
            image_url: article.image_url.clone(),
            category: article.category,
            published_at: article.published_at,
        }
    }
}

/// Full article with its rendered body and up to three related entries
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleDetailDto {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub excerpt: Option<String>,
    pub content: String,
    pub content_html: String,
    pub image_url: Option<String>,
    pub category: ArticleCategory,
    pub tags: Vec<String>,
    pub is_published: bool,
    pub is_featured: bool,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub author: AuthorDto,
    pub related_articles: Vec<RelatedArticleDto>,
}

// ============================================================================
// Statistics DTOs
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteInfoDto {
    pub site_name: String,
    pub contact_email: String,
    pub contact_phone: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsDto {
    pub bornes: i64,
    pub partners: i64,
    pub users: i64,
    pub contact_messages: i64,
    pub total_glass_collected: f64,
    pub total_points: i64,
    pub total_users: i64,
    pub total_partners: i64,
    pub site_config: SiteInfoDto,
}

// ============================================================================
// Contact DTOs
// ============================================================================

/// Contact form sent by a private person (`type: "PARTICULIER"`)
///
/// Fields default to empty so a missing field is reported by the validator
/// under its own name instead of failing deserialization as a whole.
#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IndividualContactDto {
    #[serde(default)]
    #[validate(length(min = 2, message = "Le nom doit contenir au moins 2 caractères"))]
    pub name: String,

    #[serde(default)]
    #[validate(email(message = "Email invalide"))]
    pub email: String,

    #[serde(default)]
    #[validate(length(min = 10, message = "Le message doit contenir au moins 10 caractères"))]
    pub message: String,
}

/// Contact form sent by a merchant (`type: "COMMERCANT"`)
#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MerchantContactDto {
    #[serde(default)]
    #[validate(length(
        min = 2,
        message = "Le nom de l'entreprise doit contenir au moins 2 caractères"
    ))]
    pub company_name: String,

    #[serde(default)]
    #[validate(length(min = 2, message = "Le nom doit contenir au moins 2 caractères"))]
    pub name: String,

    #[serde(default)]
    pub position: Option<String>,

    #[serde(default)]
    #[validate(email(message = "Email invalide"))]
    pub email: String,

    #[serde(default)]
    #[validate(length(min = 10, message = "Le téléphone doit contenir au moins 10 caractères"))]
    pub phone: String,

    #[serde(default)]
    #[validate(length(min = 10, message = "Le message doit contenir au moins 10 caractères"))]
    pub message: String,
}

// ============================================================================
// Back-office DTOs
// ============================================================================

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct LoginAdminDto {
    #[validate(email(message = "Email invalide"))]
    pub email: String,

    #[validate(length(min = 1, message = "Mot de passe requis"))]
    pub password: String,
}

/// Account data sent back to the back-office (no password hash)
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterUserDto {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub role: String,
}

impl FilterUserDto {
    pub fn filter_user(user: &User) -> Self {
        FilterUserDto {
            id: user.id,
            email: user.email.to_owned(),
            name: user.name.to_owned(),
            role: user.role.to_str().to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponseDto {
    pub success: bool,
    pub access_token: String,
    pub user: FilterUserDto,
}

/// Create/update payload for a borne
#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BorneInput {
    #[validate(length(min = 1, message = "Nom requis"))]
    pub name: String,

    #[validate(length(min = 1, message = "Adresse requise"))]
    pub address: String,

    #[validate(length(min = 1, message = "Ville requise"))]
    pub city: String,

    #[validate(length(min = 1, message = "Code postal requis"))]
    pub zip_code: String,

    #[validate(range(min = -90.0, max = 90.0, message = "Latitude hors limites"))]
    pub latitude: f64,

    #[validate(range(min = -180.0, max = 180.0, message = "Longitude hors limites"))]
    pub longitude: f64,

    pub status: BorneStatus,

    pub description: Option<String>,
}

/// Create/update payload for a partner
///
/// `slug` is only read on creation; when absent it is derived from the name.
#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartnerInput {
    #[validate(length(min = 1, message = "Nom requis"))]
    pub name: String,

    pub slug: Option<String>,
    pub description: Option<String>,
    pub long_description: Option<String>,
    pub category: PartnerCategory,
    pub logo_url: Option<String>,
    pub image_url: Option<String>,

    #[validate(length(min = 1, message = "Adresse requise"))]
    pub address: String,

    #[validate(length(min = 1, message = "Ville requise"))]
    pub city: String,

    #[validate(length(min = 1, message = "Code postal requis"))]
    pub zip_code: String,

    #[validate(range(min = -90.0, max = 90.0, message = "Latitude hors limites"))]
    pub latitude: Option<f64>,

    #[validate(range(min = -180.0, max = 180.0, message = "Longitude hors limites"))]
    pub longitude: Option<f64>,

    pub phone: Option<String>,

    #[validate(email(message = "Email invalide"))]
    pub email: Option<String>,

    #[validate(url(message = "URL invalide"))]
    pub website: Option<String>,

    #[serde(default)]
    pub advantages: Vec<String>,

    #[serde(default)]
    #[validate(range(min = 0, message = "Le nombre de points doit être positif"))]
    pub points_required: i32,

    pub discount: Option<String>,

    #[serde(default = "default_true")]
    pub is_active: bool,

    #[serde(default)]
    pub is_featured: bool,
}

fn default_true() -> bool {
    true
}

/// Create/update payload for an article
#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleInput {
    #[validate(length(min = 1, message = "Titre requis"))]
    pub title: String,

    pub slug: Option<String>,
    pub excerpt: Option<String>,

    #[validate(length(min = 1, message = "Contenu requis"))]
    pub content: String,

    pub image_url: Option<String>,
    pub category: ArticleCategory,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub is_published: bool,

    #[serde(default)]
    pub is_featured: bool,

    pub published_at: Option<DateTime<Utc>>,
}

/// Read/archive toggles on a contact message
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageFlagsDto {
    pub is_read: Option<bool>,
    pub is_archived: Option<bool>,
}

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfigEntry {
    #[validate(length(min = 1, message = "Clé requise"))]
    pub key: String,
    pub value: String,
    pub description: Option<String>,
}

/// Entries are validated one by one so errors can name their index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfigUpdateDto {
    pub entries: Vec<SiteConfigEntry>,
}

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticsInput {
    #[validate(range(min = 2000, max = 2100, message = "Année invalide"))]
    pub year: i32,

    #[validate(range(min = 1, max = 12, message = "Mois invalide"))]
    pub month: i32,

    #[validate(range(min = 0.0, message = "Valeur négative"))]
    pub total_glass_collected: f64,

    #[validate(range(min = 0, message = "Valeur négative"))]
    pub total_points: i64,

    #[validate(range(min = 0, message = "Valeur négative"))]
    pub total_users: i64,

    #[validate(range(min = 0, message = "Valeur négative"))]
    pub total_partners: i64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardDto {
    pub bornes_count: i64,
    pub partners_count: i64,
    pub articles_count: i64,
    pub messages_count: i64,
    pub unread_messages_count: i64,
    pub recent_messages: Vec<ContactMessage>,
    pub stats: Option<Statistics>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminBornesDto {
    pub bornes: Vec<Borne>,
    pub active_count: usize,
    pub inactive_count: usize,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminPartnersDto {
    pub partners: Vec<Partner>,
    pub active_count: usize,
    pub featured_count: usize,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminArticlesDto {
    pub articles: Vec<Article>,
    pub published_count: usize,
    pub draft_count: usize,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminMessagesDto {
    pub messages: Vec<ContactMessage>,
    pub unread_count: usize,
    pub individual_count: usize,
    pub merchant_count: usize,
}
