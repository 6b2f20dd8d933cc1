//! Backend of the Cliiink Réunion glass recycling site: collection point
//! map, partner directory, news feed, contact intake and back-office.

pub mod config;
pub mod db;
pub mod dtos;
pub mod error;
pub mod facets;
pub mod filters;
pub mod handler;
pub mod http;
pub mod intake;
pub mod mail;
pub mod map_view;
pub mod markdown;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod tracing_config;
pub mod utils;

use std::sync::Arc;

use config::Config;
use db::Store;
use intake::{AbuseVerifier, ContactNotifier};

/// Shared state handed to every handler
///
/// The store and the two outbound ports are trait objects so the binary can
/// pick PostgreSQL, reCAPTCHA and SMTP while tests plug in-process doubles.
#[derive(Clone)]
pub struct AppState {
    pub env: Arc<Config>,
    pub db_client: Arc<dyn Store>,
    pub verifier: Arc<dyn AbuseVerifier>,
    pub notifier: Arc<dyn ContactNotifier>,
}
