//! List filters for bornes, partners and articles.
//!
//! Every list endpoint turns its raw query string into one of the closed
//! filter structs below. The structs are the single description of a list
//! query: the PostgreSQL backend compiles them to SQL and the in-memory
//! backend evaluates them with `matches`, so both agree on what a page and a
//! total contain.
//!
//! Parsing never fails: malformed numbers fall back to defaults and unknown
//! flag values count as unset.

use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::str::FromStr;

use crate::dtos::{ArticleQueryParams, BorneQueryParams, PartnerQueryParams};
use crate::models::{Article, ArticleCategory, Borne, Partner, PartnerCategory};

pub const DEFAULT_BORNE_LIMIT: i64 = 100;
pub const DEFAULT_PARTNER_LIMIT: i64 = 50;
pub const DEFAULT_ARTICLE_LIMIT: i64 = 20;

/// Exact-match criterion on a closed enum
///
/// `Unmatchable` is what an unknown query value turns into: the list is
/// simply empty instead of the request failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Criterion<T> {
    Any,
    Exactly(T),
    Unmatchable,
}

impl<T: FromStr + PartialEq + Copy> Criterion<T> {
    pub fn parse(raw: Option<&str>) -> Self {
        match non_empty(raw) {
            None => Criterion::Any,
            Some(value) => value
                .parse::<T>()
                .map(Criterion::Exactly)
                .unwrap_or(Criterion::Unmatchable),
        }
    }

    pub fn admits(&self, value: &T) -> bool {
        match self {
            Criterion::Any => true,
            Criterion::Exactly(expected) => expected == value,
            Criterion::Unmatchable => false,
        }
    }
}

/// `"true"` / `"false"` → `Some`, everything else → unset
pub fn parse_flag(raw: Option<&str>) -> Option<bool> {
    match raw.map(str::trim) {
        Some("true") => Some(true),
        Some("false") => Some(false),
        _ => None,
    }
}

/// Positive integer or the default
pub fn parse_positive(raw: Option<&str>, default: i64) -> i64 {
    raw.and_then(|value| value.trim().parse::<i64>().ok())
        .filter(|value| *value >= 1)
        .unwrap_or(default)
}

fn non_empty(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|value| !value.is_empty())
}

/// Case-insensitive substring test
pub fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Offset pagination, 1-based pages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
}

impl Pagination {
    pub fn new(page: i64, limit: i64) -> Self {
        Self {
            page: page.max(1),
            limit: limit.max(1),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    pub fn total_pages(&self, total: i64) -> i64 {
        if total <= 0 {
            return 0;
        }
        total / self.limit + i64::from(total % self.limit != 0)
    }

    /// Slice an already filtered and ordered sequence
    pub fn apply<T>(&self, rows: Vec<T>) -> Vec<T> {
        let offset = usize::try_from(self.offset()).unwrap_or(usize::MAX);
        let limit = usize::try_from(self.limit).unwrap_or(usize::MAX);
        rows.into_iter().skip(offset).take(limit).collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BorneFilter {
    /// `Some(true)`: everything but retired bornes, `Some(false)`: retired only
    pub active: Option<bool>,
    pub city: Option<String>,
    pub limit: i64,
}

impl BorneFilter {
    pub fn from_params(params: &BorneQueryParams) -> Self {
        Self {
            active: parse_flag(params.active.as_deref()),
            city: non_empty(params.city.as_deref()).map(str::to_string),
            limit: parse_positive(params.limit.as_deref(), DEFAULT_BORNE_LIMIT),
        }
    }

    /// Every borne, used by the back-office
    pub fn everything() -> Self {
        Self {
            active: None,
            city: None,
            limit: i64::MAX,
        }
    }

    pub fn matches(&self, borne: &Borne) -> bool {
        self.active.is_none_or(|active| borne.status.is_active() == active)
            && self
                .city
                .as_deref()
                .is_none_or(|city| contains_ci(&borne.city, city))
    }

    pub fn pagination(&self) -> Pagination {
        Pagination::new(1, self.limit)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PartnerFilter {
    pub active: Option<bool>,
    pub category: Criterion<PartnerCategory>,
    pub city: Option<String>,
    pub limit: i64,
}

impl PartnerFilter {
    pub fn from_params(params: &PartnerQueryParams) -> Self {
        Self {
            active: parse_flag(params.active.as_deref()),
            category: Criterion::parse(params.category.as_deref()),
            city: non_empty(params.city.as_deref()).map(str::to_string),
            limit: parse_positive(params.limit.as_deref(), DEFAULT_PARTNER_LIMIT),
        }
    }

    pub fn everything() -> Self {
        Self {
            active: None,
            category: Criterion::Any,
            city: None,
            limit: i64::MAX,
        }
    }

    pub fn matches(&self, partner: &Partner) -> bool {
        self.active.is_none_or(|active| partner.is_active == active)
            && self.category.admits(&partner.category)
            && self
                .city
                .as_deref()
                .is_none_or(|city| contains_ci(&partner.city, city))
    }

    pub fn pagination(&self) -> Pagination {
        Pagination::new(1, self.limit)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArticleFilter {
    /// `Some(true)`: publicly visible at `now`, `Some(false)`: drafts only
    pub published: Option<bool>,
    pub featured: Option<bool>,
    pub category: Criterion<ArticleCategory>,
    pub pagination: Pagination,
    pub now: DateTime<Utc>,
}

impl ArticleFilter {
    pub fn from_params(params: &ArticleQueryParams, now: DateTime<Utc>) -> Self {
        Self {
            published: parse_flag(params.published.as_deref()),
            featured: parse_flag(params.featured.as_deref()),
            category: Criterion::parse(params.category.as_deref()),
            pagination: Pagination::new(
                parse_positive(params.page.as_deref(), 1),
                parse_positive(params.limit.as_deref(), DEFAULT_ARTICLE_LIMIT),
            ),
            now,
        }
    }

    pub fn matches(&self, article: &Article) -> bool {
        let published = match self.published {
            None => true,
            Some(true) => article.is_visible_at(self.now),
            Some(false) => !article.is_published,
        };
        published
            && self
                .featured
                .is_none_or(|featured| article.is_featured == featured)
            && self.category.admits(&article.category)
    }
}

/// Public article order: newest publication first, undated last, then
/// creation order
pub fn publication_order(a: &Article, b: &Article) -> Ordering {
    match (a.published_at, b.published_at) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
    .then_with(|| a.created_at.cmp(&b.created_at))
}

/// Same-category or shared-tag test used for related articles
pub fn is_related(candidate: &Article, to: &Article) -> bool {
    candidate.id != to.id
        && (candidate.category == to.category
            || candidate.tags.iter().any(|tag| to.tags.contains(tag)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BorneStatus;
    use chrono::Duration;
    use uuid::Uuid;

    fn borne(name: &str, city: &str, status: BorneStatus) -> Borne {
        let now = Utc::now();
        Borne {
            id: Uuid::new_v4(),
            name: name.into(),
            address: "1 rue du Port".into(),
            city: city.into(),
            zip_code: "97400".into(),
            latitude: -20.88,
            longitude: 55.45,
            status,
            description: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn flags_only_accept_true_and_false() {
        assert_eq!(parse_flag(Some("true")), Some(true));
        assert_eq!(parse_flag(Some("false")), Some(false));
        assert_eq!(parse_flag(Some("yes")), None);
        assert_eq!(parse_flag(Some("")), None);
        assert_eq!(parse_flag(None), None);
    }

    #[test]
    fn malformed_numbers_fall_back_to_defaults() {
        assert_eq!(parse_positive(Some("abc"), 20), 20);
        assert_eq!(parse_positive(Some("0"), 20), 20);
        assert_eq!(parse_positive(Some("-4"), 20), 20);
        assert_eq!(parse_positive(Some("7"), 20), 7);
        assert_eq!(parse_positive(None, 100), 100);
    }

    #[test]
    fn page_below_one_never_underflows() {
        let params = ArticleQueryParams {
            page: Some("-3".into()),
            limit: Some("10".into()),
            ..Default::default()
        };
        let filter = ArticleFilter::from_params(&params, Utc::now());
        assert_eq!(filter.pagination.page, 1);
        assert_eq!(filter.pagination.offset(), 0);
        assert_eq!(Pagination::new(0, 10).offset(), 0);
    }

    #[test]
    fn total_pages_is_ceiling() {
        let p = Pagination::new(1, 20);
        assert_eq!(p.total_pages(0), 0);
        assert_eq!(p.total_pages(1), 1);
        assert_eq!(p.total_pages(20), 1);
        assert_eq!(p.total_pages(21), 2);
        assert_eq!(Pagination::new(1, 3).total_pages(10), 4);
        assert_eq!(Pagination::new(1, i64::MAX).total_pages(2), 1);
        assert_eq!(Pagination::new(1, i64::MAX).total_pages(i64::MAX), 1);
    }

    #[test]
    fn pages_concatenate_to_the_full_set() {
        let rows: Vec<i32> = (0..23).collect();
        let limit = 5;
        let pages = Pagination::new(1, limit).total_pages(rows.len() as i64);
        let mut joined = Vec::new();
        for page in 1..=pages {
            joined.extend(Pagination::new(page, limit).apply(rows.clone()));
        }
        assert_eq!(joined, rows);
        assert!(Pagination::new(pages + 1, limit).apply(rows).is_empty());
    }

    #[test]
    fn unknown_category_matches_nothing() {
        let criterion = Criterion::<PartnerCategory>::parse(Some("PIZZERIA"));
        assert_eq!(criterion, Criterion::Unmatchable);
        for category in PartnerCategory::ALL {
            assert!(!criterion.admits(&category));
        }
        assert_eq!(Criterion::<PartnerCategory>::parse(Some("")), Criterion::Any);
    }

    #[test]
    fn borne_city_is_case_insensitive_substring() {
        let params = BorneQueryParams {
            city: Some("saint-d".into()),
            ..Default::default()
        };
        let filter = BorneFilter::from_params(&params);
        assert!(filter.matches(&borne("A", "Saint-Denis", BorneStatus::Active)));
        assert!(!filter.matches(&borne("B", "Saint-Pierre", BorneStatus::Active)));
    }

    #[test]
    fn borne_active_flag_follows_status() {
        let active = BorneFilter {
            active: Some(true),
            ..BorneFilter::everything()
        };
        let retired = BorneFilter {
            active: Some(false),
            ..BorneFilter::everything()
        };
        let full = borne("A", "Le Port", BorneStatus::Full);
        let gone = borne("B", "Le Port", BorneStatus::Retired);
        assert!(active.matches(&full));
        assert!(!active.matches(&gone));
        assert!(retired.matches(&gone));
        assert!(!retired.matches(&full));
    }

    #[test]
    fn publication_order_puts_undated_last_and_keeps_creation_order() {
        let now = Utc::now();
        let mk = |published_at: Option<DateTime<Utc>>, created_offset: i64| Article {
            id: Uuid::new_v4(),
            title: String::new(),
            slug: Uuid::new_v4().to_string(),
            excerpt: None,
            content: String::new(),
            image_url: None,
            category: ArticleCategory::News,
            tags: vec![],
            is_published: true,
            is_featured: false,
            published_at,
            views: 0,
            author_id: Uuid::new_v4(),
            author_name: None,
            created_at: now + Duration::seconds(created_offset),
            updated_at: now,
        };
        let old = mk(Some(now - Duration::days(3)), 0);
        let recent = mk(Some(now - Duration::days(1)), 1);
        let tie_first = mk(Some(now - Duration::days(2)), 2);
        let tie_second = mk(Some(now - Duration::days(2)), 3);
        let undated = mk(None, 4);

        let mut all = vec![
            undated.clone(),
            tie_second.clone(),
            old.clone(),
            tie_first.clone(),
            recent.clone(),
        ];
        all.sort_by(publication_order);
        let ids: Vec<Uuid> = all.iter().map(|a| a.id).collect();
        assert_eq!(
            ids,
            vec![recent.id, tie_first.id, tie_second.id, old.id, undated.id]
        );
    }
}
