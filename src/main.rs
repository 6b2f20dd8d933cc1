use std::sync::Arc;

use axum::http::{
    HeaderValue, Method,
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
};
use dotenv::dotenv;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;

use cliiink_backend::{
    AppState,
    config::{Config, StoreBackend},
    db::{DBClient, MemoryStore, Store},
    http::RecaptchaVerifier,
    intake::{AbuseVerifier, ContactNotifier, DisabledVerifier, LogNotifier},
    mail::MailNotifier,
    models::UserRole,
    routes,
    tracing_config::init_tracing,
    utils::password,
};

async fn open_store(config: &Config) -> Arc<dyn Store> {
    match (config.store_backend, config.database_url.as_deref()) {
        (StoreBackend::Postgres, Some(database_url)) => {
            let pool = match PgPoolOptions::new()
                .max_connections(10)
                .connect(database_url)
                .await
            {
                Ok(pool) => {
                    tracing::info!("Connection to the database is successful");
                    pool
                }
                Err(err) => {
                    tracing::error!("Failed to connect to the database: {:?}", err);
                    std::process::exit(1);
                }
            };

            let db_client = DBClient::new(pool);
            if let Err(err) = db_client.apply_schema().await {
                tracing::error!("Failed to apply the schema: {:?}", err);
                std::process::exit(1);
            }
            Arc::new(db_client)
        }
        _ => {
            tracing::warn!("Using the in-memory store, data is lost on restart");
            Arc::new(MemoryStore::new())
        }
    }
}

/// First admin account, created from ADMIN_EMAIL / ADMIN_PASSWORD when the
/// user table is empty
async fn bootstrap_admin(store: &dyn Store, config: &Config) {
    let (Some(email), Some(plain)) = (&config.admin_email, &config.admin_password) else {
        return;
    };

    match store.get_user_count().await {
        Ok(0) => {}
        Ok(_) => return,
        Err(err) => {
            tracing::error!("Failed to count users: {}", err);
            return;
        }
    }

    let hashed = match password::hash(plain.as_str()) {
        Ok(hashed) => hashed,
        Err(err) => {
            tracing::error!("Failed to hash the admin password: {}", err);
            return;
        }
    };

    match store
        .save_user(email, Some("Administrateur"), &hashed, UserRole::Admin)
        .await
    {
        Ok(user) => tracing::info!(user_id = %user.id, "Initial admin account created"),
        Err(err) => tracing::error!("Failed to create the admin account: {}", err),
    }
}

#[tokio::main]
async fn main() {
    // must stay alive until the end of main
    let _guard = init_tracing();

    dotenv().ok();

    let config = Config::init();

    let db_client = open_store(&config).await;
    bootstrap_admin(db_client.as_ref(), &config).await;

    let verifier: Arc<dyn AbuseVerifier> = match &config.recaptcha_secret {
        Some(secret) => Arc::new(RecaptchaVerifier::new(
            reqwest::Client::new(),
            config.recaptcha_verify_url.clone(),
            secret.clone(),
        )),
        None => Arc::new(DisabledVerifier),
    };
    if !verifier.enabled() {
        tracing::warn!("RECAPTCHA_SECRET_KEY not set, contact submissions are not verified");
    }

    let notifier: Arc<dyn ContactNotifier> = match &config.smtp {
        Some(smtp) => Arc::new(MailNotifier::new(
            smtp.clone(),
            config.contact_email.clone(),
            config.partners_email.clone(),
        )),
        None => {
            tracing::warn!("SMTP not configured, contact messages are only logged");
            Arc::new(LogNotifier)
        }
    };

    let origin = match config.frontend_url.parse::<HeaderValue>() {
        Ok(origin) => origin,
        Err(err) => {
            tracing::error!("FRONTEND_URL is not a valid origin: {}", err);
            std::process::exit(1);
        }
    };

    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_headers([AUTHORIZATION, ACCEPT, CONTENT_TYPE])
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ]);

    let port = config.port;
    let app_state = AppState {
        env: Arc::new(config),
        db_client,
        verifier,
        notifier,
    };

    let app = routes::create_router(app_state).layer(cors);

    let listener = match tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("Failed to bind port {}: {}", port, err);
            std::process::exit(1);
        }
    };

    tracing::info!("Server is running on http://localhost:{}", port);

    if let Err(err) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", err);
    }
}
