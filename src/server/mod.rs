//! HTTP surface: dashboard, manual trigger and query API
//!
//! Handlers only read history through [`HistoryStore`](crate::history::HistoryStore)
//! and only write it by running sweeps through the shared orchestrator.

use crate::clock::Clock;
use crate::config::Config;
use crate::orchestrator::CheckOrchestrator;
use axum::{middleware, routing::get, Router};
use chrono::FixedOffset;
use log::info;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

/// Login, logout and the session middleware
pub mod auth;
pub mod error;
/// Route handlers
pub mod handlers;

pub use auth::SessionStore;
pub use error::AppError;

/// State shared by every handler
pub struct AppState {
    pub orchestrator: Arc<CheckOrchestrator>,
    pub clock: Arc<dyn Clock>,
    /// Zone used for hour bucket tokens
    pub offset: FixedOffset,
    /// Shared secret, `None` when the dashboard is open
    pub password: Option<String>,
    pub sessions: SessionStore,
}

impl AppState {
    pub fn new(orchestrator: Arc<CheckOrchestrator>, clock: Arc<dyn Clock>, config: &Config) -> Self {
        Self {
            orchestrator,
            clock,
            offset: config.utc_offset(),
            password: config
                .auth
                .is_enabled()
                .then(|| config.auth.password.clone()),
            sessions: SessionStore::new(),
        }
    }

    pub fn auth_enabled(&self) -> bool {
        self.password.is_some()
    }
}

/// Build the application router
pub fn router(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .route("/", get(handlers::dashboard))
        .route("/check", get(handlers::check))
        .route("/log", get(handlers::log))
        .route("/buckets", get(handlers::buckets))
        .route("/info", get(handlers::info))
        .route("/health", get(handlers::health))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_session,
        ));

    Router::new()
        .merge(protected)
        .route("/login", get(auth::login_form).post(auth::login))
        .route("/logout", get(auth::logout))
        .with_state(state)
}

/// Serve the router on `bind` until `shutdown` is cancelled
///
/// # Errors
///
/// Returns the I/O error if the address cannot be bound or the server fails.
pub async fn serve(
    bind: &str,
    state: Arc<AppState>,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    let listener = TcpListener::bind(bind).await?;
    info!("Dashboard listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    info!("Dashboard stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::{RecordingSink, TransitionNotifier};
    use crate::clock::MockClock;
    use crate::config::SiteList;
    use crate::history::{HistoryStore, SqliteHistory};
    use crate::probe::{MockProber, ProbeOutcome};
    use crate::records::{CheckRecord, Monitor, Status, Timestamp};
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
        response::Response,
    };
    use serde_json::Value;
    use tower::ServiceExt;

    // 2024-03-01 13:30:00 UTC
    const NOW: Timestamp = 1_709_299_800;

    struct TestApp {
        router: Router,
        store: Arc<SqliteHistory>,
    }

    async fn test_app(source: SiteList, password: Option<&str>) -> TestApp {
        let store = Arc::new(SqliteHistory::in_memory().await.unwrap());
        let mut clock = MockClock::new();
        clock.expect_now().return_const(NOW);
        let clock: Arc<dyn Clock> = Arc::new(clock);

        let prober = MockProber::new().respond(
            "https://site-b.example",
            ProbeOutcome::from_status_code(503, 15),
        );
        let orchestrator = CheckOrchestrator::new(
            Arc::new(source),
            Arc::new(prober),
            store.clone(),
            Arc::new(TransitionNotifier::new(Arc::new(RecordingSink::new()))),
            clock.clone(),
        );

        let mut config = Config::default();
        if let Some(password) = password {
            config.auth.password = password.to_string();
        }
        let state = AppState::new(Arc::new(orchestrator), clock, &config);

        TestApp {
            router: router(Arc::new(state)),
            store,
        }
    }

    fn two_sites() -> SiteList {
        SiteList::Inline(vec![
            Monitor::new("site-a", "https://site-a.example"),
            Monitor::new("site-b", "https://site-b.example"),
        ])
    }

    async fn get(app: &TestApp, uri: &str) -> Response {
        app.router
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    async fn body_json(response: Response) -> Value {
        serde_json::from_str(&body_text(response).await).unwrap()
    }

    fn record(name: &str, status: Status, timestamp: Timestamp) -> CheckRecord {
        CheckRecord {
            name: name.to_string(),
            status,
            status_code: 200,
            timestamp,
            scheduled: true,
            duration_ms: 80,
            error_detail: None,
        }
    }

    #[tokio::test]
    async fn test_log_without_records_is_empty_array() {
        let app = test_app(two_sites(), None).await;
        let response = get(&app, "/log").await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_check_runs_manual_sweep() {
        let app = test_app(two_sites(), None).await;

        let response = get(&app, "/check").await;
        assert_eq!(response.status(), StatusCode::OK);
        let results = body_json(response).await;
        assert_eq!(results[0]["name"], "site-a");
        assert_eq!(results[0]["status"], "up");
        assert_eq!(results[1]["statusCode"], 503);
        assert!(results[0]["headers"].is_object());

        let logged = body_json(get(&app, "/log?name=site-b").await).await;
        assert_eq!(logged.as_array().unwrap().len(), 1);
        assert_eq!(logged[0]["status"], "down");
        assert_eq!(logged[0]["scheduled"], false);
        assert_eq!(logged[0]["timestamp"], NOW);
    }

    #[tokio::test]
    async fn test_check_with_broken_site_list_is_500() {
        let app = test_app(
            SiteList::env_var("UPWATCH_TEST_ROUTER_SITES", Arc::new(|_: &str| None::<String>)),
            None,
        )
        .await;

        let response = get(&app, "/check").await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert!(body["error"]
            .as_str()
            .unwrap()
            .contains("UPWATCH_TEST_ROUTER_SITES is not set"));
    }

    #[tokio::test]
    async fn test_log_filters() {
        let app = test_app(two_sites(), None).await;
        for record in [
            record("site-a", Status::Up, NOW - 7200),
            record("site-a", Status::Down, NOW - 1800),
            record("site-a", Status::Up, NOW - 60),
            record("site-b", Status::Up, NOW - 30),
        ] {
            app.store.append(&record).await.unwrap();
        }

        // No parameters: last hour, newest first, all monitors
        let all = body_json(get(&app, "/log").await).await;
        let names: Vec<_> = all.as_array().unwrap().iter().map(|e| e["name"].clone()).collect();
        assert_eq!(names, vec!["site-b", "site-a", "site-a"]);

        // Bucket 13:00-14:00 UTC, ascending
        let bucket = body_json(get(&app, "/log?name=site-a&time=2024-03-01%2013").await).await;
        let statuses: Vec<_> = bucket.as_array().unwrap().iter().map(|e| e["status"].clone()).collect();
        assert_eq!(statuses, vec!["down", "up"]);

        let range = format!("/log?name=site-a&from={}&to={}&limit=1", NOW - 7200, NOW);
        let limited = body_json(get(&app, &range).await).await;
        assert_eq!(limited.as_array().unwrap().len(), 1);
        assert_eq!(limited[0]["timestamp"], NOW - 7200);

        let oldest = body_json(get(&app, "/log?name=site-a&order=asc&limit=1").await).await;
        assert_eq!(oldest[0]["timestamp"], NOW - 7200);
    }

    #[tokio::test]
    async fn test_log_rejects_malformed_input() {
        let app = test_app(two_sites(), None).await;

        for uri in [
            "/log?limit=ten",
            "/log?from=yesterday&to=1",
            "/log?time=2024-03-01",
            "/log?order=sideways",
        ] {
            let response = get(&app, uri).await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", uri);
            assert!(body_json(response).await["error"].is_string());
        }
    }

    #[tokio::test]
    async fn test_buckets() {
        let app = test_app(two_sites(), None).await;
        app.store.append(&record("site-a", Status::Up, NOW)).await.unwrap();

        let all = body_json(get(&app, "/buckets").await).await;
        assert_eq!(all.as_array().unwrap().len(), 2);
        assert_eq!(all[0]["bars"].as_array().unwrap().len(), 24);
        assert_eq!(all[0]["bars"][23]["cell"], "ok");
        assert_eq!(all[0]["bars"][23]["hour"], "2024-03-01 13");
        assert_eq!(all[1]["bars"][23]["cell"], "empty");

        let week = body_json(get(&app, "/buckets?name=site-a&range=168").await).await;
        assert_eq!(week[0]["bars"].as_array().unwrap().len(), 168);

        let response = get(&app, "/buckets?range=fortnight").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_dashboard_renders_monitors() {
        let app = test_app(two_sites(), None).await;
        let response = get(&app, "/?range=all").await;

        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains("site-a"));
        assert!(html.contains("https://site-b.example"));
        assert!(html.contains("<strong>All data</strong>"));
    }

    #[tokio::test]
    async fn test_info_and_health() {
        let app = test_app(two_sites(), None).await;

        let info = body_json(get(&app, "/info").await).await;
        assert_eq!(info["monitors"].as_array().unwrap().len(), 2);
        assert_eq!(info["notifications"]["sink"], "recording");
        assert_eq!(info["auth_enabled"], false);

        let health = body_json(get(&app, "/health").await).await;
        assert_eq!(health["status"], "ok");
        assert_eq!(health["checks"].as_array().unwrap().len(), 3);
        assert!(health.get("suggestions").is_none());
    }

    #[tokio::test]
    async fn test_health_reports_broken_site_list() {
        let app = test_app(
            SiteList::env_var("UPWATCH_TEST_HEALTH_SITES", Arc::new(|_: &str| None::<String>)),
            None,
        )
        .await;

        let response = get(&app, "/health").await;
        assert_eq!(response.status(), StatusCode::OK);
        let health = body_json(response).await;
        assert_eq!(health["status"], "degraded");
        assert_eq!(health["checks"][0]["ok"], false);
        assert!(health["suggestions"]["monitors"].is_string());
    }

    #[tokio::test]
    async fn test_login_flow() {
        let app = test_app(two_sites(), Some("hunter2")).await;

        let response = get(&app, "/log").await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(body_text(response).await.contains("<form"));

        let login = |password: &str| {
            Request::builder()
                .method("POST")
                .uri("/login")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(format!("password={}", password)))
                .unwrap()
        };

        let rejected = app.router.clone().oneshot(login("wrong")).await.unwrap();
        assert_eq!(rejected.status(), StatusCode::UNAUTHORIZED);
        assert!(rejected.headers().get(header::SET_COOKIE).is_none());

        let accepted = app.router.clone().oneshot(login("hunter2")).await.unwrap();
        assert_eq!(accepted.status(), StatusCode::SEE_OTHER);
        let set_cookie = accepted
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(set_cookie.starts_with("auth="));
        assert!(set_cookie.contains("HttpOnly"));
        let cookie = set_cookie.split(';').next().unwrap().to_string();

        let authed = app
            .router
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/log")
                    .header(header::COOKIE, &cookie)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(authed.status(), StatusCode::OK);

        let logout = app
            .router
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/logout")
                    .header(header::COOKIE, &cookie)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(logout.status(), StatusCode::SEE_OTHER);

        let after = app
            .router
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/log")
                    .header(header::COOKIE, &cookie)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(after.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_login_page_redirects_when_auth_disabled() {
        let app = test_app(two_sites(), None).await;
        let response = get(&app, "/login").await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
    }
}
