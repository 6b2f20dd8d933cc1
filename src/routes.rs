use axum::Router;
use tower_http::trace::TraceLayer;

use crate::{
    AppState,
    handler::{
        admin::admin_handler, article::article_handler, auth::auth_handler,
        borne::borne_handler, contact::contact_handler, partner::partner_handler,
        stats::stats_handler,
    },
};

pub fn create_router(app_state: AppState) -> Router {
    let api_route = Router::new()
        .nest("/bornes", borne_handler())
        .nest("/partenaires", partner_handler())
        .nest("/actualites", article_handler())
        .nest("/contact", contact_handler())
        .nest("/stats", stats_handler())
        // login/logout stay outside the session middleware
        .nest(
            "/admin",
            auth_handler().merge(admin_handler(app_state.clone())),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(app_state);

    Router::new().nest("/api", api_route)
}
