use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use chrono::{Duration, Utc};
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

use cliiink_backend::{
    AppState,
    config::Config,
    db::{ContactExt, MemoryStore, Store, UserExt},
    intake::{AbuseVerifier, ContactNotifier, NotifyError, Verdict, VerifierError},
    models::{
        Article, ArticleCategory, Borne, BorneStatus, ContactMessage, Partner, PartnerCategory,
        User, UserRole,
    },
    routes::create_router,
    utils::{password, token},
};

const JWT_SECRET: &str = "integration-secret";

// ----------------------------------------------------------------------------
// Doubles
// ----------------------------------------------------------------------------

struct FixedVerifier(Result<Verdict, ()>);

#[async_trait]
impl AbuseVerifier for FixedVerifier {
    async fn verify(&self, _token: &str) -> Result<Verdict, VerifierError> {
        self.0
            .map_err(|_| VerifierError::Transport("connection refused".into()))
    }
}

#[derive(Default)]
struct CountingNotifier {
    calls: AtomicUsize,
    fail: bool,
}

#[async_trait]
impl ContactNotifier for CountingNotifier {
    async fn notify(&self, _message: &ContactMessage) -> Result<(), NotifyError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(NotifyError("smtp down".into()));
        }
        Ok(())
    }
}

struct TestApp {
    router: Router,
    store: Arc<MemoryStore>,
    notifier: Arc<CountingNotifier>,
}

fn config() -> Config {
    Config::from_lookup(|key| match key {
        "JWT_SECRET_KEY" => Some(JWT_SECRET.to_string()),
        "STORE_BACKEND" => Some("memory".to_string()),
        _ => None,
    })
    .unwrap()
}

fn test_app_with(verdict: Result<Verdict, ()>, notifier: CountingNotifier) -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let notifier = Arc::new(notifier);
    let db_client: Arc<dyn Store> = store.clone();

    let app_state = AppState {
        env: Arc::new(config()),
        db_client,
        verifier: Arc::new(FixedVerifier(verdict)),
        notifier: notifier.clone(),
    };

    TestApp {
        router: create_router(app_state),
        store,
        notifier,
    }
}

fn test_app() -> TestApp {
    test_app_with(
        Ok(Verdict {
            success: true,
            score: 0.9,
        }),
        CountingNotifier::default(),
    )
}

impl TestApp {
    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Request::get(uri).body(Body::empty()).unwrap()).await
    }

    async fn post_json(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(
            Request::post(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    async fn get_as(&self, uri: &str, user: &User) -> (StatusCode, Value) {
        self.send(
            Request::get(uri)
                .header(header::AUTHORIZATION, bearer(user))
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    /// POST a raw body, so malformed JSON can be sent too
    async fn post_raw_as(&self, uri: &str, user: &User, body: &str) -> (StatusCode, Value) {
        self.send(
            Request::post(uri)
                .header(header::AUTHORIZATION, bearer(user))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    async fn user(&self, email: &str, plain: &str, role: UserRole) -> User {
        let hashed = password::hash(plain).unwrap();
        self.store
            .save_user(email, Some("Test"), &hashed, role)
            .await
            .unwrap()
    }
}

fn bearer(user: &User) -> String {
    let token = token::create_token(
        &user.id.to_string(),
        user.role,
        JWT_SECRET.as_bytes(),
        3600,
    )
    .unwrap();
    format!("Bearer {token}")
}

// ----------------------------------------------------------------------------
// Fixtures
// ----------------------------------------------------------------------------

fn borne(name: &str, city: &str, status: BorneStatus) -> Borne {
    let now = Utc::now();
    Borne {
        id: Uuid::new_v4(),
        name: name.into(),
        address: "1 rue du Verre".into(),
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

fn partner(name: &str, category: PartnerCategory, city: &str) -> Partner {
    let now = Utc::now();
    Partner {
        id: Uuid::new_v4(),
        name: name.into(),
        slug: name.to_lowercase().replace(' ', "-"),
        description: None,
        long_description: None,
        category,
        logo_url: None,
        image_url: None,
        address: "2 rue du Commerce".into(),
        city: city.into(),
        zip_code: "97400".into(),
        latitude: None,
        longitude: None,
        phone: None,
        email: None,
        website: None,
        advantages: vec!["-10% sur l'addition".into()],
        points_required: 100,
        discount: Some("-10%".into()),
        is_active: true,
        is_featured: false,
        created_at: now,
        updated_at: now,
    }
}

fn article(slug: &str, is_published: bool, published_at: Option<chrono::DateTime<Utc>>) -> Article {
    let now = Utc::now();
    Article {
        id: Uuid::new_v4(),
        title: slug.to_uppercase(),
        slug: slug.into(),
        excerpt: None,
        content: "## Résultats\n- **12 tonnes** collectées".into(),
        image_url: None,
        category: ArticleCategory::News,
        tags: vec!["collecte".into()],
        is_published,
        is_featured: false,
        published_at,
        views: 0,
        author_id: Uuid::new_v4(),
        author_name: Some("Équipe Cliiink".into()),
        created_at: now,
        updated_at: now,
    }
}

fn ids(body: &Value) -> Vec<String> {
    body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["id"].as_str().unwrap().to_string())
        .collect()
}

// ----------------------------------------------------------------------------
// Read API
// ----------------------------------------------------------------------------

#[tokio::test]
async fn saint_denis_bornes_and_city_facets() {
    let app = test_app();
    app.store
        .insert_borne(borne("Barachois", "Saint-Denis", BorneStatus::Active))
        .await;
    app.store
        .insert_borne(borne("Sainte-Clotilde", "Saint-Denis", BorneStatus::Maintenance))
        .await;
    app.store
        .insert_borne(borne("Front de mer", "Saint-Pierre", BorneStatus::Active))
        .await;

    let (status, body) = app.get("/api/bornes?city=saint-denis").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["total"], 2);
    assert_eq!(body["page"], 1);
    assert_eq!(body["data"][0]["name"], "Barachois");
    assert_eq!(body["data"][0]["position"], json!([-20.88, 55.45]));
    assert_eq!(body["data"][1]["status"], "MAINTENANCE");

    let (status, body) = app.get("/api/bornes/facets").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["data"],
        json!([
            { "name": "Saint-Denis", "count": 2 },
            { "name": "Saint-Pierre", "count": 1 },
        ])
    );

    // the list resource answers OPTIONS with the same facets
    let (status, options) = app
        .send(
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/api/bornes")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(options, body);
}

#[tokio::test]
async fn retired_bornes_are_not_active() {
    let app = test_app();
    app.store
        .insert_borne(borne("Ancienne", "Le Port", BorneStatus::Retired))
        .await;
    app.store
        .insert_borne(borne("Pleine", "Le Port", BorneStatus::Full))
        .await;

    let (_, body) = app.get("/api/bornes?active=true").await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["data"][0]["name"], "Pleine");
    assert_eq!(body["data"][0]["isActive"], true);

    let (_, body) = app.get("/api/bornes?active=false").await;
    assert_eq!(body["data"][0]["status"], "INACTIVE");
    assert_eq!(body["data"][0]["isActive"], false);
}

#[tokio::test]
async fn huge_limit_is_a_single_page() {
    let app = test_app();
    app.store
        .insert_borne(borne("Barachois", "Saint-Denis", BorneStatus::Active))
        .await;
    app.store
        .insert_borne(borne("Front de mer", "Saint-Pierre", BorneStatus::Active))
        .await;

    let (status, body) = app.get("/api/bornes?limit=9223372036854775807").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 2);
    assert_eq!(body["totalPages"], 1);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn malformed_query_keeps_the_json_envelope() {
    let app = test_app();
    let (status, body) = app.get("/api/bornes?limit=1&limit=2").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Paramètres de requête invalides");
}

#[tokio::test]
async fn borne_detail_by_id() {
    let app = test_app();
    let known = borne("Barachois", "Saint-Denis", BorneStatus::Active);
    let id = known.id;
    app.store.insert_borne(known).await;

    let (status, body) = app.get(&format!("/api/bornes/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Barachois");
    assert!(body["data"]["createdAt"].is_string());

    let (status, body) = app.get("/api/bornes/pas-un-uuid").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);

    let (status, _) = app.get(&format!("/api/bornes/{}", Uuid::new_v4())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn partner_facets_add_up_to_the_total() {
    let app = test_app();
    for (name, category, city) in [
        ("Le Bistrot", PartnerCategory::Restaurant, "Saint-Denis"),
        ("Chez Paulette", PartnerCategory::Restaurant, "Saint-Pierre"),
        ("Boutik Kréol", PartnerCategory::Shop, "Saint-Denis"),
        ("Ti Bar", PartnerCategory::Bar, "Le Port"),
    ] {
        app.store.insert_partner(partner(name, category, city)).await;
    }

    let (_, list) = app.get("/api/partenaires").await;
    let total = list["total"].as_i64().unwrap();
    assert_eq!(total, 4);

    let (status, body) = app.get("/api/partenaires/facets").await;
    assert_eq!(status, StatusCode::OK);
    for field in ["categories", "cities"] {
        let facets = body["data"][field].as_array().unwrap();
        let sum: i64 = facets.iter().map(|f| f["count"].as_i64().unwrap()).sum();
        assert_eq!(sum, total, "{field}");
        assert!(facets.iter().all(|f| f["count"].as_i64().unwrap() > 0));
    }
}

#[tokio::test]
async fn partner_lookup_by_slug() {
    let app = test_app();
    app.store
        .insert_partner(partner("Le Bistrot", PartnerCategory::Restaurant, "Saint-Denis"))
        .await;

    let (status, body) = app.get("/api/partenaires/le-bistrot").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Le Bistrot");
    assert_eq!(body["data"]["position"], Value::Null);

    let (status, body) = app.get("/api/partenaires/inconnu").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Partenaire non trouvé");

    let (_, body) = app.get("/api/partenaires?category=NAWAK").await;
    assert_eq!(body["total"], 0);
}

#[tokio::test]
async fn article_pages_cover_every_match_once() {
    let app = test_app();
    let now = Utc::now();
    for i in 0..7 {
        app.store
            .insert_article(article(
                &format!("article-{i}"),
                true,
                Some(now - Duration::days(i + 1)),
            ))
            .await;
    }

    let (_, first) = app.get("/api/actualites?published=true&limit=3").await;
    assert_eq!(first["total"], 7);
    assert_eq!(first["totalPages"], 3);

    let mut seen = Vec::new();
    for page in 1..=3 {
        let (_, body) = app
            .get(&format!("/api/actualites?published=true&limit=3&page={page}"))
            .await;
        assert_eq!(body["page"], page);
        seen.extend(ids(&body));
    }
    assert_eq!(seen.len(), 7);
    assert_eq!(seen.iter().collect::<HashSet<_>>().len(), 7);

    // newest publication first
    let (_, body) = app.get("/api/actualites?limit=1").await;
    assert_eq!(body["data"][0]["slug"], "article-0");
}

#[tokio::test]
async fn hidden_articles_are_not_found() {
    let app = test_app();
    let now = Utc::now();
    app.store.insert_article(article("brouillon", false, None)).await;
    app.store
        .insert_article(article("programme", true, Some(now + Duration::days(2))))
        .await;
    app.store
        .insert_article(article("publie", true, Some(now - Duration::days(2))))
        .await;

    let (_, unknown) = app.get("/api/actualites/inexistant").await;
    for slug in ["brouillon", "programme"] {
        let (status, body) = app.get(&format!("/api/actualites/{slug}")).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{slug}");
        assert_eq!(body, unknown, "{slug}");
    }

    let (_, list) = app.get("/api/actualites?published=true").await;
    assert_eq!(list["total"], 1);
    assert_eq!(list["data"][0]["slug"], "publie");

    let (status, body) = app.get("/api/actualites/publie").await;
    assert_eq!(status, StatusCode::OK);
    assert!(
        body["data"]["contentHtml"]
            .as_str()
            .unwrap()
            .contains("<strong>12 tonnes</strong>")
    );
    assert_eq!(body["data"]["relatedArticles"], json!([]));
    assert_eq!(body["data"]["author"]["name"], "Équipe Cliiink");

    // still listed for the back-office
    let editor = app.user("redac@cliiink.re", "motdepasse", UserRole::Editor).await;
    let (status, admin) = app.get_as("/api/admin/actualites", &editor).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(admin["data"]["articles"].as_array().unwrap().len(), 3);
    assert_eq!(admin["data"]["draftCount"], 1);
}

#[tokio::test]
async fn related_articles_are_capped_at_three() {
    let app = test_app();
    let now = Utc::now();
    for i in 0..5 {
        app.store
            .insert_article(article(&format!("a-{i}"), true, Some(now - Duration::hours(i + 1))))
            .await;
    }

    let (_, body) = app.get("/api/actualites/a-0").await;
    let related = body["data"]["relatedArticles"].as_array().unwrap();
    assert_eq!(related.len(), 3);
    assert!(related.iter().all(|r| r["slug"] != "a-0"));
    assert_eq!(related[0]["slug"], "a-1");
}

#[tokio::test]
async fn store_failures_do_not_leak() {
    let app = test_app();
    app.store.go_offline();

    for uri in ["/api/bornes", "/api/partenaires/x", "/api/actualites", "/api/stats"] {
        let (status, body) = app.get(uri).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "{uri}");
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Une erreur est survenue");
    }
}

#[tokio::test]
async fn stats_fall_back_without_a_snapshot() {
    let app = test_app();
    app.store
        .insert_borne(borne("Barachois", "Saint-Denis", BorneStatus::Active))
        .await;
    app.store
        .insert_borne(borne("Ancienne", "Saint-Denis", BorneStatus::Retired))
        .await;
    app.store.insert_site_config("siteName", "Cliiink 974").await;

    let (status, body) = app.get("/api/stats").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["bornes"], 1);
    assert_eq!(body["data"]["totalGlassCollected"], 450.0);
    assert_eq!(body["data"]["totalPoints"], 25000);
    assert_eq!(body["data"]["siteConfig"]["siteName"], "Cliiink 974");
}

// ----------------------------------------------------------------------------
// Contact intake
// ----------------------------------------------------------------------------

#[tokio::test]
async fn merchant_without_phone_names_the_field() {
    let app = test_app();
    let (status, body) = app
        .post_json(
            "/api/contact",
            json!({
                "type": "COMMERCANT",
                "companyName": "Boulangerie du Port",
                "name": "Marie Hoarau",
                "email": "marie@boulangerie.re",
                "message": "Nous voulons rejoindre le programme."
            }),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    let fields: Vec<&str> = body["details"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, vec!["phone"]);
    assert!(app.store.list_contact_messages().await.unwrap().is_empty());
}

#[tokio::test]
async fn individual_ignores_merchant_fields() {
    let app = test_app();
    let (status, body) = app
        .post_json(
            "/api/contact",
            json!({
                "type": "PARTICULIER",
                "name": "Jean Payet",
                "email": "jean@example.re",
                "message": "Où trouver la borne la plus proche ?",
                "companyName": "Ne doit pas être stocké",
                "phone": "0262000000"
            }),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    let id = body["id"].as_str().unwrap();

    let stored = app.store.list_contact_messages().await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].id.to_string(), id);
    assert_eq!(stored[0].company_name, None);
    assert_eq!(stored[0].phone, None);
    assert_eq!(app.notifier.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn wrongly_typed_phone_names_the_field() {
    let app = test_app();
    let (status, body) = app
        .post_json(
            "/api/contact",
            json!({
                "type": "COMMERCANT",
                "companyName": "Boulangerie du Port",
                "name": "Marie Hoarau",
                "email": "marie@boulangerie.re",
                "phone": 692000000,
                "message": "Nous voulons rejoindre le programme."
            }),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"][0]["field"], "phone");
    assert!(app.store.list_contact_messages().await.unwrap().is_empty());
}

#[tokio::test]
async fn unknown_type_and_bad_json_are_rejected() {
    let app = test_app();

    let (status, body) = app
        .post_json("/api/contact", json!({ "name": "Jean", "email": "jean@example.re" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"][0]["field"], "type");

    let (status, body) = app
        .send(
            Request::post("/api/contact")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{ pas du json"))
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn low_score_is_forbidden_and_not_stored() {
    let app = test_app_with(
        Ok(Verdict {
            success: true,
            score: 0.2,
        }),
        CountingNotifier::default(),
    );
    let (status, body) = app
        .post_json(
            "/api/contact",
            json!({
                "type": "PARTICULIER",
                "name": "Robot",
                "email": "robot@example.re",
                "message": "Achetez nos produits miracles !",
                "recaptchaToken": "token"
            }),
        )
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Vérification anti-spam échouée");
    assert!(app.store.list_contact_messages().await.unwrap().is_empty());
    assert_eq!(app.notifier.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn unreachable_verifier_is_forbidden() {
    let app = test_app_with(Err(()), CountingNotifier::default());
    let (status, _) = app
        .post_json(
            "/api/contact",
            json!({
                "type": "PARTICULIER",
                "name": "Jean Payet",
                "email": "jean@example.re",
                "message": "Bonjour, une question sur les points.",
                "recaptchaToken": "token"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn notification_failure_keeps_the_message() {
    let app = test_app_with(
        Ok(Verdict {
            success: true,
            score: 0.9,
        }),
        CountingNotifier {
            fail: true,
            ..Default::default()
        },
    );
    let (status, _) = app
        .post_json(
            "/api/contact",
            json!({
                "type": "COMMERCANT",
                "companyName": "Boulangerie du Port",
                "name": "Marie Hoarau",
                "position": "Gérante",
                "email": "marie@boulangerie.re",
                "phone": "0262 42 42 42",
                "message": "Nous voulons rejoindre le programme.",
                "recaptchaToken": "token"
            }),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    let stored = app.store.list_contact_messages().await.unwrap();
    assert_eq!(stored[0].company_name.as_deref(), Some("Boulangerie du Port"));
    assert_eq!(stored[0].position.as_deref(), Some("Gérante"));
    assert_eq!(app.notifier.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn contact_only_accepts_post() {
    let app = test_app();
    let (status, body) = app.get("/api/contact").await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body, json!({ "success": false, "error": "Method not allowed" }));
}

// ----------------------------------------------------------------------------
// Back-office
// ----------------------------------------------------------------------------

#[tokio::test]
async fn admin_routes_require_a_session() {
    let app = test_app();
    let (status, body) = app.get("/api/admin/bornes").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);

    let (status, _) = app
        .send(
            Request::get("/api/admin/dashboard")
                .header(header::AUTHORIZATION, "Bearer pas-un-jwt")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn editors_only_reach_articles() {
    let app = test_app();
    let editor = app.user("redac@cliiink.re", "motdepasse", UserRole::Editor).await;

    let (status, _) = app.get_as("/api/admin/bornes", &editor).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.get_as("/api/admin/actualites", &editor).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn login_sets_the_session_cookie() {
    let app = test_app();
    app.user("admin@cliiink.re", "motdepasse", UserRole::Admin).await;

    let (status, body) = app
        .post_json(
            "/api/admin/login",
            json!({ "email": "admin@cliiink.re", "password": "faux" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (_, unknown) = app
        .post_json(
            "/api/admin/login",
            json!({ "email": "personne@cliiink.re", "password": "faux" }),
        )
        .await;
    assert_eq!(body, unknown);

    let response = app
        .router
        .clone()
        .oneshot(
            Request::post("/api/admin/login")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({ "email": "admin@cliiink.re", "password": "motdepasse" }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(cookie.starts_with("admin_token="));
    assert!(cookie.contains("HttpOnly"));
    let pair = cookie.split(';').next().unwrap().to_string();

    let (status, body) = app
        .send(
            Request::get("/api/admin/dashboard")
                .header(header::COOKIE, pair)
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["bornesCount"], 0);
}

#[tokio::test]
async fn admin_creates_a_partner_with_a_derived_slug() {
    let app = test_app();
    let admin = app.user("admin@cliiink.re", "motdepasse", UserRole::Admin).await;
    let token = token::create_token(
        &admin.id.to_string(),
        admin.role,
        JWT_SECRET.as_bytes(),
        3600,
    )
    .unwrap();

    let create = |body: Value| {
        Request::post("/api/admin/partenaires")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    };
    let payload = json!({
        "name": "Le Bistrot Créole",
        "category": "RESTAURANT",
        "address": "1 rue de Paris",
        "city": "Saint-Denis",
        "zipCode": "97400",
        "latitude": -20.88,
        "longitude": 55.45
    });

    let (status, body) = app.send(create(payload.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["slug"], "le-bistrot-creole");

    let (status, _) = app.send(create(payload)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = app.get("/api/partenaires/le-bistrot-creole").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["position"], json!([-20.88, 55.45]));

    let (status, body) = app
        .send(create(json!({
            "name": "Hors carte",
            "category": "RESTAURANT",
            "address": "1 rue de Paris",
            "city": "Saint-Denis",
            "zipCode": "97400",
            "latitude": 120.0
        })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"][0]["field"], "latitude");
}

#[tokio::test]
async fn dashboard_counts_every_record() {
    let app = test_app();
    let admin = app.user("admin@cliiink.re", "motdepasse", UserRole::Admin).await;
    app.store
        .insert_borne(borne("Barachois", "Saint-Denis", BorneStatus::Active))
        .await;
    app.store
        .insert_borne(borne("Ancienne", "Le Port", BorneStatus::Retired))
        .await;
    app.store
        .insert_partner(partner("Le Bistrot", PartnerCategory::Restaurant, "Saint-Denis"))
        .await;
    app.store
        .insert_partner(Partner {
            is_active: false,
            ..partner("Fermé", PartnerCategory::Restaurant, "Le Port")
        })
        .await;

    let (status, body) = app.get_as("/api/admin/dashboard", &admin).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["bornesCount"], 2);
    assert_eq!(body["data"]["partnersCount"], 2);

    // public stats only count what is live
    let (_, body) = app.get("/api/stats").await;
    assert_eq!(body["data"]["bornes"], 1);
    assert_eq!(body["data"]["partners"], 1);
}

#[tokio::test]
async fn mistyped_admin_body_keeps_the_json_envelope() {
    let app = test_app();
    let admin = app.user("admin@cliiink.re", "motdepasse", UserRole::Admin).await;

    let (status, body) = app.post_raw_as("/api/admin/bornes", &admin, r#"{"name":5}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Corps de requête JSON invalide");

    let (status, body) = app.post_raw_as("/api/admin/partenaires", &admin, "{ pas du json").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}
