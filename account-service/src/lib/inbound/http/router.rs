use std::sync::Arc;
use std::time::Duration;

use auth::Authenticator;
use axum::body::Body;
use axum::http::Request;
use axum::http::Response;
use axum::middleware;
use axum::routing::get;
use axum::routing::post;
use axum::routing::put;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::Span;

use super::handlers::change_password::change_password;
use super::handlers::confirm_password_reset::confirm_password_reset;
use super::handlers::create_profile::create_profile;
use super::handlers::get_profile::get_profile;
use super::handlers::login::login;
use super::handlers::logout::logout;
use super::handlers::register::register;
use super::handlers::request_password_reset::request_password_reset;
use super::handlers::update_profile::update_profile;
use super::handlers::verify_email::verify_email;
use super::middleware::require_authentication;
use super::middleware::resolve_session;
use crate::identity::ports::AccountServicePort;
use crate::password::ports::PasswordServicePort;
use crate::profile::ports::ProfileServicePort;

#[derive(Clone)]
pub struct AppState {
    pub account_service: Arc<dyn AccountServicePort>,
    pub profile_service: Arc<dyn ProfileServicePort>,
    pub password_service: Arc<dyn PasswordServicePort>,
    pub authenticator: Arc<Authenticator>,
    pub cookie_name: String,
}

pub fn create_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/login", post(login))
        .route("/register", post(register))
        .route("/verify-email", get(verify_email))
        .route("/password/reset/request", post(request_password_reset))
        .route("/password/reset/confirm", post(confirm_password_reset));

    let protected_routes = Router::new()
        .route(
            "/me",
            get(get_profile)
                .put(update_profile)
                .patch(update_profile)
                .post(create_profile),
        )
        .route("/password/change", put(change_password))
        .route("/logout", post(logout))
        .route_layer(middleware::from_fn(require_authentication));

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|request: &Request<Body>| {
            // Headers are left out: they carry bearer tokens and session cookies.
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                uri = %request.uri(),
                version = ?request.version(),
            )
        })
        .on_request(|request: &Request<Body>, _span: &Span| {
            tracing::info!(
                method = %request.method(),
                uri = %request.uri(),
                "Request started"
            );
        })
        .on_response(
            |response: &Response<Body>, latency: Duration, _span: &Span| {
                tracing::info!(
                    status = response.status().as_u16(),
                    latency_ms = latency.as_millis(),
                    "Request completed"
                );
            },
        );

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            resolve_session,
        ))
        .layer(trace_layer)
        .layer(CorsLayer::permissive())
        .with_state(state)
}
