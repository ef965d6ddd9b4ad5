//! HTTP handlers for the BitcoinHub API.
//!
//! [`router`] mounts every endpoint under `/api`. Write endpoints that act on
//! behalf of a user sit behind [`middleware::require_auth`]; everything else
//! is public. Static file serving and the outer tower layers are added by the
//! server binary.

pub mod alerts;
pub mod auth;
pub mod convert;
pub mod error;
pub mod extract;
pub mod feeds;
pub mod files;
pub mod forum;
pub mod learning;
pub mod legislation;
pub mod middleware;
pub mod notifications;
pub mod portfolio;
pub mod state;
pub mod status;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
};

pub use error::ApiError;
pub use state::{AppState, AppStateInner};

/// Multipart framing on top of the largest accepted file.
const UPLOAD_BODY_LIMIT: usize = files::MAX_FILE_SIZE + 1024 * 1024;

pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(status::health))
        .route("/last-updated", get(status::last_updated))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/bitcoin/price", get(feeds::bitcoin_price))
        .route("/bitcoin/market-data", get(feeds::market_data))
        .route("/bitcoin/chart", get(feeds::chart))
        .route("/news", get(feeds::news))
        .route("/social/reddit", get(feeds::reddit))
        .route("/social/tweets", get(feeds::tweets))
        .route("/worldbank/economic-data", get(feeds::economic_data))
        .route("/worldbank/indicator/{country}/{indicator}", get(feeds::indicator))
        .route("/worldbank/timeseries/{country}/{indicator}", get(feeds::timeseries))
        .route("/liquidity", get(feeds::liquidity))
        .route("/forum/posts", get(forum::list_posts))
        .route("/forum/posts/latest", get(forum::latest_posts))
        .route("/forum/posts/{id}/replies", get(forum::replies))
        .route("/tips/daily", get(learning::daily_tip))
        .route("/learning/games", get(learning::list_games))
        .route("/learning/games/{id}", get(learning::get_game))
        .route("/learning/games/{id}/score", post(learning::score_game))
        .route("/notifications", get(notifications::list_notifications))
        .route("/notifications/{id}/read", post(notifications::mark_read))
        .route("/notifications/clear-all", post(notifications::clear_all))
        .route("/legislation", get(legislation::get_legislation))
        .route("/legislation/refresh", post(legislation::refresh))
        .route("/legislation/catalysts", get(legislation::catalysts))
        .route("/legislation/admin-upload", post(legislation::admin_upload))
        .route(
            "/upload",
            post(files::upload_file).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/auth/me", get(auth::me))
        .route("/forum/posts", post(forum::create_post))
        .route("/forum/posts/{id}/reactions", post(forum::toggle_reaction))
        .route("/forum/posts/{id}", delete(forum::delete_post))
        .route("/portfolio", get(portfolio::get_portfolio).post(portfolio::update_holding))
        .route("/portfolio/bitcoin", post(portfolio::update_bitcoin))
        .route("/alerts", get(alerts::list_alerts).post(alerts::create_alert))
        .route("/alerts/{id}", delete(alerts::delete_alert))
        .route(
            "/learning/progress",
            get(learning::get_progress).post(learning::update_progress),
        )
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ))
        .with_state(state);

    Router::new().nest("/api", public_routes.merge(protected_routes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::{Body, to_bytes};
    use axum::http::{HeaderMap, Request, StatusCode, header};
    use btchub_db::Database;
    use btchub_feeds::cryptocompare::FALLBACK_PRICE;
    use btchub_feeds::{
        LegiScanClient, LegislationService, LiquidityClient, NewsClient, NotificationService,
        PriceClient, RedditClient, TwitterClient, WorldBankClient,
    };
    use btchub_quiz::Catalog;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    const ADMIN: &str = "HodlMyBeer21";
    const ADMIN_PASSWORD: &str = "letmein";

    /// Base URL of a port nothing listens on.
    fn dead_url() -> String {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        format!("http://{}", listener.local_addr().unwrap())
    }

    fn upload_dir() -> std::path::PathBuf {
        std::env::temp_dir().join("btchub-api-tests")
    }

    fn app() -> Router {
        let http = reqwest::Client::builder().no_proxy().build().unwrap();
        let dead = dead_url();
        let prices = Arc::new(PriceClient::with_base_url(http.clone(), &dead));
        let news = Arc::new(NewsClient::new(http.clone(), None));
        let db = Database::open_in_memory().unwrap();
        auth::ensure_admin_account(&db, ADMIN, Some(ADMIN_PASSWORD)).unwrap();

        router(Arc::new(AppStateInner {
            db,
            catalog: Catalog::builtin().unwrap(),
            prices: prices.clone(),
            news: news.clone(),
            reddit: RedditClient::with_base_url(http.clone(), &dead),
            twitter: TwitterClient::new(http.clone(), None),
            worldbank: WorldBankClient::with_base_url(http.clone(), &dead),
            liquidity: LiquidityClient::with_base_url(http.clone(), &dead, Some("test-key".into())),
            legislation: LegislationService::new(
                LegiScanClient::new(http.clone(), None),
                None,
                Some(ADMIN_PASSWORD.into()),
            ),
            notifications: NotificationService::new(prices, news, None),
            jwt_secret: "test-secret".into(),
            admin_username: ADMIN.into(),
            upload_dir: upload_dir(),
        }))
    }

    async fn call(
        app: &Router,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, HeaderMap, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let req = match body {
            Some(body) => req
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => req.body(Body::empty()),
        }
        .unwrap();

        let resp = app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let headers = resp.headers().clone();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, headers, value)
    }

    async fn register(app: &Router, username: &str) -> String {
        let (status, _, body) = call(
            app,
            "POST",
            "/api/auth/register",
            None,
            Some(json!({ "username": username, "password": "correct horse" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        body["token"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn health_is_public() {
        let (status, _, body) = call(&app(), "GET", "/api/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn register_sets_session_cookie() {
        let app = app();
        let (status, headers, body) = call(
            &app,
            "POST",
            "/api/auth/register",
            None,
            Some(json!({ "username": "satoshi", "password": "correct horse" })),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["user"]["username"], "satoshi");
        assert_eq!(body["user"]["streakDays"], 1);
        let cookie = headers.get(header::SET_COOKIE).unwrap().to_str().unwrap();
        assert!(cookie.starts_with("connect.sid="));
        assert!(cookie.contains("HttpOnly"));
    }

    #[tokio::test]
    async fn session_from_cookie_or_bearer() {
        let app = app();
        let token = register(&app, "satoshi").await;

        let (status, _, body) = call(&app, "GET", "/api/auth/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["username"], "satoshi");

        let req = Request::builder()
            .uri("/api/auth/me")
            .header(header::COOKIE, format!("connect.sid={token}"))
            .body(Body::empty())
            .unwrap();
        assert_eq!(app.clone().oneshot(req).await.unwrap().status(), StatusCode::OK);

        let (status, _, body) = call(&app, "GET", "/api/auth/me", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Not authenticated");

        let (status, _, _) = call(&app, "GET", "/api/auth/me", Some("garbage"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn duplicate_username_and_bad_password() {
        let app = app();
        register(&app, "satoshi").await;

        let creds = json!({ "username": "satoshi", "password": "correct horse" });
        let (status, _, _) = call(&app, "POST", "/api/auth/register", None, Some(creds)).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let wrong = json!({ "username": "satoshi", "password": "battery staple" });
        let (status, _, body) = call(&app, "POST", "/api/auth/login", None, Some(wrong)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Invalid credentials");

        let short = json!({ "username": "hal", "password": "short" });
        let (status, _, _) = call(&app, "POST", "/api/auth/register", None, Some(short)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn admin_name_cannot_be_registered() {
        let app = app();
        for name in [ADMIN, "hodlmybeer21"] {
            let creds = json!({ "username": name, "password": "correct horse" });
            let (status, _, body) = call(&app, "POST", "/api/auth/register", None, Some(creds)).await;
            assert_eq!(status, StatusCode::CONFLICT);
            assert_eq!(body["message"], "Username already exists");
        }

        let creds = json!({ "username": ADMIN, "password": ADMIN_PASSWORD });
        let (status, _, body) = call(&app, "POST", "/api/auth/login", None, Some(creds)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["username"], ADMIN);
    }

    #[tokio::test]
    async fn bad_json_bodies_get_json_errors() {
        let app = app();
        let missing = json!({ "username": "satoshi" });
        let (status, _, body) = call(&app, "POST", "/api/auth/register", None, Some(missing)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].as_str().unwrap().contains("password"));

        let req = Request::builder()
            .method("POST")
            .uri("/api/auth/login")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{\"username\":"))
            .unwrap();
        let resp = app.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert!(body["message"].is_string());
    }

    #[tokio::test]
    async fn forum_flow() {
        let app = app();
        let user = register(&app, "alice").await;
        let creds = json!({ "username": ADMIN, "password": ADMIN_PASSWORD });
        let (status, _, login) = call(&app, "POST", "/api/auth/login", None, Some(creds)).await;
        assert_eq!(status, StatusCode::OK);
        let admin = login["token"].as_str().unwrap().to_string();

        let post = json!({ "title": "gm", "content": "Stacking sats", "categories": ["general"] });
        let (status, _, _) = call(&app, "POST", "/api/forum/posts", None, Some(post.clone())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _, created) = call(&app, "POST", "/api/forum/posts", Some(&user), Some(post)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["username"], "alice");
        let id = created["id"].as_i64().unwrap();

        let reply = json!({ "content": "same", "isReply": true, "parentPostId": id });
        let (status, _, _) = call(&app, "POST", "/api/forum/posts", Some(&admin), Some(reply)).await;
        assert_eq!(status, StatusCode::CREATED);

        let (_, _, posts) = call(&app, "GET", "/api/forum/posts", None, None).await;
        assert_eq!(posts.as_array().unwrap().len(), 1);
        assert_eq!(posts[0]["commentCount"], 1);

        let (_, _, replies) = call(&app, "GET", &format!("/api/forum/posts/{id}/replies"), None, None).await;
        assert_eq!(replies[0]["content"], "same");

        let uri = format!("/api/forum/posts/{id}/reactions");
        let (status, _, counts) = call(&app, "POST", &uri, Some(&user), Some(json!({ "type": "rocket" }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(counts, json!({ "rocket": 1 }));
        let (_, _, counts) = call(&app, "POST", &uri, Some(&user), Some(json!({ "type": "rocket" }))).await;
        assert_eq!(counts, json!({}));
        let (status, _, _) = call(&app, "POST", &uri, Some(&user), Some(json!({ "type": "poop" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _, _) = call(&app, "GET", "/api/forum/posts/abc/replies", None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let uri = format!("/api/forum/posts/{id}");
        let (status, _, _) = call(&app, "DELETE", &uri, Some(&user), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (status, _, _) = call(&app, "DELETE", &uri, Some(&admin), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _, _) = call(&app, "DELETE", &uri, Some(&admin), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn portfolio_upsert_keeps_one_row() {
        let app = app();
        let token = register(&app, "satoshi").await;

        for amount in [0.5, 1.25] {
            let (status, _, _) = call(
                &app,
                "POST",
                "/api/portfolio/bitcoin",
                Some(&token),
                Some(json!({ "amount": amount })),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
        }

        let (_, _, portfolio) = call(&app, "GET", "/api/portfolio", Some(&token), None).await;
        let entries = portfolio["entries"].as_array().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0]["amount"], 1.25);
        let total = portfolio["totalValue"].as_f64().unwrap();
        assert!((total - 1.25 * FALLBACK_PRICE).abs() < 1e-6);

        let (status, _, _) = call(
            &app,
            "POST",
            "/api/portfolio/bitcoin",
            Some(&token),
            Some(json!({ "amount": -1.0 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn alerts_trigger_when_listed() {
        let app = app();
        let token = register(&app, "satoshi").await;

        for kind in ["above", "below"] {
            let (status, _, _) = call(
                &app,
                "POST",
                "/api/alerts",
                Some(&token),
                Some(json!({ "type": kind, "price": 1000.0 })),
            )
            .await;
            assert_eq!(status, StatusCode::CREATED);
        }

        let (_, _, alerts) = call(&app, "GET", "/api/alerts", Some(&token), None).await;
        let alerts = alerts.as_array().unwrap();
        let by_kind = |k: &str| alerts.iter().find(|a| a["type"] == k).unwrap();
        assert_eq!(by_kind("above")["isTriggered"], true);
        assert_eq!(by_kind("below")["isTriggered"], false);

        let other = register(&app, "mallory").await;
        let id = by_kind("below")["id"].as_i64().unwrap();
        let uri = format!("/api/alerts/{id}");
        let (status, _, _) = call(&app, "DELETE", &uri, Some(&other), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _, _) = call(&app, "DELETE", &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn learning_defaults_and_games() {
        let app = app();
        let token = register(&app, "satoshi").await;

        let (_, _, progress) = call(&app, "GET", "/api/learning/progress", Some(&token), None).await;
        assert_eq!(progress["courseId"], "bitcoin-basics");
        assert_eq!(progress["totalLessons"], 10);

        let (_, _, tip) = call(&app, "GET", "/api/tips/daily", None, None).await;
        assert!(!tip["title"].as_str().unwrap().is_empty());

        let (_, _, games) = call(&app, "GET", "/api/learning/games", None, None).await;
        assert_eq!(games.as_array().unwrap().len(), 13);

        let (_, _, game) = call(&app, "GET", "/api/learning/games/dollar-dilemma", None, None).await;
        let answers: Vec<Value> = game["levels"]
            .as_array()
            .unwrap()
            .iter()
            .map(|l| l["quiz"]["correct"].clone())
            .collect();
        let (status, _, summary) = call(
            &app,
            "POST",
            "/api/learning/games/dollar-dilemma/score",
            None,
            Some(json!({ "answers": answers })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(summary["completed"], true);
        assert_eq!(summary["score"], summary["maxScore"]);

        let (status, _, _) = call(&app, "GET", "/api/learning/games/nope", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn invalid_world_bank_codes_are_rejected() {
        let (status, _, _) = call(&app(), "GET", "/api/worldbank/indicator/U%20S/GDP", None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn economic_feeds_degrade_to_empty() {
        let app = app();
        let (status, _, data) = call(&app, "GET", "/api/worldbank/economic-data", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(data["usIndicators"], json!([]));
        assert_eq!(data["globalIndicators"], json!([]));
        assert_eq!(data["keyMetrics"]["usgdp"], Value::Null);

        let (status, _, data) = call(&app, "GET", "/api/liquidity", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(data["indicators"], json!([]));
        assert_eq!(data["summary"]["overallSignal"], "neutral");
        assert_eq!(data["summary"]["totalIndicators"], 0);
    }

    #[tokio::test]
    async fn upload_is_on_disk_when_acknowledged() {
        let payload: Vec<u8> = (0..=255u8).cycle().take(64 * 1024).collect();
        let boundary = "btchub-boundary";
        let mut body = format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"pepe.PNG\"\r\nContent-Type: image/png\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(&payload);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

        let req = Request::builder()
            .method("POST")
            .uri("/api/upload")
            .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={boundary}"))
            .body(Body::from(body))
            .unwrap();
        let resp = app().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let uploaded: Value = serde_json::from_slice(&bytes).unwrap();

        let filename = uploaded["file"]["filename"].as_str().unwrap();
        assert!(filename.ends_with(".png"));
        assert_eq!(uploaded["file"]["size"], payload.len());
        assert_eq!(std::fs::read(upload_dir().join(filename)).unwrap(), payload);
        std::fs::remove_file(upload_dir().join(filename)).unwrap();
    }

    #[tokio::test]
    async fn legislation_upload_requires_password() {
        let app = app();
        let upload = |password: &str| {
            json!({
                "password": password,
                "data": { "bills": [], "lastUpdated": "", "summary": "", "nextMajorEvent": "" }
            })
        };

        let (status, _, _) = call(&app, "POST", "/api/legislation/admin-upload", None, Some(upload("nope"))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _, _) = call(&app, "POST", "/api/legislation/admin-upload", None, Some(upload(ADMIN_PASSWORD))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
