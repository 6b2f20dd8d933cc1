use sqlx::{Pool, Postgres, QueryBuilder};
use thiserror::Error;

pub mod memory;
pub use memory::MemoryStore;

mod borne;
pub use borne::BorneExt;

mod partner;
pub use partner::PartnerExt;

mod article;
pub use article::ArticleExt;

mod contact;
pub use contact::ContactExt;

mod site;
pub use site::SiteExt;

mod user;
pub use user::UserExt;

const SCHEMA: &str = include_str!("../sql/schema.sql");

/// Failure of an entity store operation
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,

    /// A unique constraint (slug, email, ...) rejected the write
    #[error("unique constraint violated: {0}")]
    Conflict(String),

    #[error("store backend failure: {0}")]
    Backend(#[source] sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                StoreError::Conflict(db_err.constraint().unwrap_or("unique").to_string())
            }
            other => StoreError::Backend(other),
        }
    }
}

/// Everything the handlers need from persistence
///
/// Implemented by `DBClient` (PostgreSQL) and `MemoryStore`. Handlers only
/// ever see `Arc<dyn Store>`.
pub trait Store: BorneExt + PartnerExt + ArticleExt + ContactExt + SiteExt + UserExt {}

impl<T> Store for T where T: BorneExt + PartnerExt + ArticleExt + ContactExt + SiteExt + UserExt {}

#[derive(Debug, Clone)]
pub struct DBClient {
    pool: Pool<Postgres>,
}

impl DBClient {
    pub fn new(pool: Pool<Postgres>) -> Self {
        DBClient { pool }
    }

    /// Create enums, tables and indexes when they don't exist yet
    pub async fn apply_schema(&self) -> Result<(), sqlx::Error> {
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
        Ok(())
    }
}

/// Appends ` WHERE ` before the first condition and ` AND ` before the others
struct Conditions {
    any: bool,
}

impl Conditions {
    fn new() -> Self {
        Conditions { any: false }
    }

    fn next<'q, 'args>(
        &mut self,
        qb: &'q mut QueryBuilder<'args, Postgres>,
    ) -> &'q mut QueryBuilder<'args, Postgres> {
        qb.push(if self.any { " AND " } else { " WHERE " });
        self.any = true;
        qb
    }
}

/// `%needle%` with LIKE wildcards escaped, to be used with `ESCAPE '\'`
fn like_pattern(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len() + 2);
    escaped.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}
