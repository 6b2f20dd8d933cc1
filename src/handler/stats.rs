use axum::{Json, Router, extract::State, response::IntoResponse, routing::get};
use tracing::instrument;

use crate::{
    AppState,
    dtos::{DataResponse, SiteInfoDto, StatsDto},
    error::HttpError,
    filters::{BorneFilter, PartnerFilter},
    models::{SiteConfig, Statistics},
};

// Shown until a first snapshot is recorded
const DEFAULT_GLASS_COLLECTED: f64 = 450.0;
const DEFAULT_POINTS: i64 = 25_000;

const DEFAULT_SITE_NAME: &str = "Cliiink Réunion";
const DEFAULT_CONTACT_EMAIL: &str = "contact@cliiink-reunion.re";

pub fn stats_handler() -> Router<AppState> {
    Router::new().route("/", get(get_stats))
}

#[instrument(skip(app_state))]
pub async fn get_stats(State(app_state): State<AppState>) -> Result<impl IntoResponse, HttpError> {
    let store = &app_state.db_client;

    let active_bornes = BorneFilter {
        active: Some(true),
        ..BorneFilter::everything()
    };
    let active_partners = PartnerFilter {
        active: Some(true),
        ..PartnerFilter::everything()
    };

    let (bornes, partners, users, contact_messages, snapshot, config) = tokio::try_join!(
        store.count_bornes(&active_bornes),
        store.count_partners(&active_partners),
        store.get_user_count(),
        store.count_contact_messages(false),
        store.latest_statistics(),
        store.get_site_config(),
    )
    .map_err(|e| HttpError::from_store("aggregate", "statistics", e))?;

    Ok(Json(DataResponse::new(aggregate(
        bornes,
        partners,
        users,
        contact_messages,
        snapshot,
        &config,
    ))))
}

/// Live counts plus the cumulative figures of the latest snapshot
pub fn aggregate(
    bornes: i64,
    partners: i64,
    users: i64,
    contact_messages: i64,
    snapshot: Option<Statistics>,
    config: &[SiteConfig],
) -> StatsDto {
    let lookup = |key: &str, default: &str| {
        config
            .iter()
            .find(|entry| entry.key == key)
            .map(|entry| entry.value.clone())
            .unwrap_or_else(|| default.to_string())
    };

    let (total_glass_collected, total_points, total_users, total_partners) = match snapshot {
        Some(s) => (
            s.total_glass_collected,
            s.total_points,
            s.total_users,
            s.total_partners,
        ),
        None => (DEFAULT_GLASS_COLLECTED, DEFAULT_POINTS, users, partners),
    };

    StatsDto {
        bornes,
        partners,
        users,
        contact_messages,
        total_glass_collected,
        total_points,
        total_users,
        total_partners,
        site_config: SiteInfoDto {
            site_name: lookup("siteName", DEFAULT_SITE_NAME),
            contact_email: lookup("contactEmail", DEFAULT_CONTACT_EMAIL),
            contact_phone: lookup("contactPhone", ""),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    #[test]
    fn live_counts_stand_in_without_a_snapshot() {
        let stats = aggregate(12, 4, 3, 7, None, &[]);
        assert_eq!(stats.total_glass_collected, 450.0);
        assert_eq!(stats.total_points, 25_000);
        assert_eq!(stats.total_users, 3);
        assert_eq!(stats.total_partners, 4);
        assert_eq!(stats.site_config.site_name, "Cliiink Réunion");
        assert_eq!(stats.site_config.contact_phone, "");
    }

    #[test]
    fn snapshot_and_site_config_win() {
        let snapshot = Statistics {
            id: Uuid::new_v4(),
            year: 2024,
            month: 6,
            total_glass_collected: 1200.5,
            total_points: 90_000,
            total_users: 5000,
            total_partners: 80,
            created_at: Utc::now(),
        };
        let config = vec![SiteConfig {
            key: "contactPhone".into(),
            value: "0262 00 00 00".into(),
            description: None,
            updated_at: Utc::now(),
        }];

        let stats = aggregate(12, 4, 3, 7, Some(snapshot), &config);
        assert_eq!(stats.total_glass_collected, 1200.5);
        assert_eq!(stats.total_users, 5000);
        assert_eq!(stats.bornes, 12);
        assert_eq!(stats.site_config.contact_phone, "0262 00 00 00");
        assert_eq!(stats.site_config.contact_email, "contact@cliiink-reunion.re");
    }
}
