//! Shared-secret login
//!
//! A correct password earns an opaque session id in the `auth` cookie. Session
//! ids live in memory and expire an hour after login, so a restart logs
//! everyone out.

use crate::dashboard::render_login;
use crate::records::Timestamp;
use crate::server::AppState;
use axum::{
    body::Body,
    extract::{Form, State},
    http::{Request, StatusCode},
    middleware::Next,
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use log::{info, warn};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use uuid::Uuid;

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "auth";

/// Session lifetime in seconds
pub const SESSION_TTL: i64 = 3600;

/// In-memory session ids and their expiry times
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<String, Timestamp>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a session at `now`, returning its id
    pub fn issue(&self, now: Timestamp) -> String {
        let id = Uuid::new_v4().to_string();
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        sessions.retain(|_, expires| *expires > now);
        sessions.insert(id.clone(), now + SESSION_TTL);
        id
    }

    /// Whether `id` names a session that has not expired at `now`
    pub fn is_valid(&self, id: &str, now: Timestamp) -> bool {
        let sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        sessions.get(id).is_some_and(|expires| *expires > now)
    }

    pub fn revoke(&self, id: &str) {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id);
    }

    pub fn len(&self) -> usize {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub password: String,
}

/// Middleware that answers with the login form unless the request carries a
/// live session cookie. Does nothing when no password is configured.
pub async fn require_session(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    req: Request<Body>,
    next: Next,
) -> Response {
    if !state.auth_enabled() {
        return next.run(req).await;
    }

    let now = state.clock.now();
    let authenticated = jar
        .get(SESSION_COOKIE)
        .is_some_and(|cookie| state.sessions.is_valid(cookie.value(), now));

    if authenticated {
        next.run(req).await
    } else {
        (StatusCode::UNAUTHORIZED, Html(render_login(None))).into_response()
    }
}

/// `GET /login`
pub async fn login_form(State(state): State<Arc<AppState>>) -> Response {
    if !state.auth_enabled() {
        return Redirect::to("/").into_response();
    }
    Html(render_login(None)).into_response()
}

/// `POST /login`
pub async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Response {
    let Some(ref password) = state.password else {
        return Redirect::to("/").into_response();
    };

    if form.password != *password {
        warn!("Rejected login with wrong password");
        return (
            StatusCode::UNAUTHORIZED,
            Html(render_login(Some("Wrong password"))),
        )
            .into_response();
    }

    let id = state.sessions.issue(state.clock.now());
    info!("Issued new dashboard session");
    let cookie = Cookie::build((SESSION_COOKIE, id))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax);

    (jar.add(cookie), Redirect::to("/")).into_response()
}

/// `GET /logout`
pub async fn logout(State(state): State<Arc<AppState>>, jar: CookieJar) -> Response {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        state.sessions.revoke(cookie.value());
    }
    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    (jar, Redirect::to("/")).into_response()
}
