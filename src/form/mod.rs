mod actions;
mod guard;
mod page;

use axum::{Router, routing::{get, post}};
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer, cookie::SameSite};

use crate::{AppState, res};

pub use guard::{InFlight, InFlightGuard};
pub use page::render;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(page::form_page))
        .route("/token", post(actions::token))
        .route("/refresh", post(actions::refresh))
        .route("/select", post(actions::select))
        .route("/generate", post(actions::generate))
        .route("/register", post(actions::register))
        .route("/reset", post(actions::reset))
        .route("/style.css", get(res::stylesheet))
        .route("/healthz", get(|| async { "ok" }))
}

/// The form with its in-memory session layer attached.
pub fn app(app_state: AppState) -> Router {
    let session_layer = SessionManagerLayer::new(MemoryStore::default())
        .with_secure(false)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(app_state.config.session_idle));

    router()
        .with_state(app_state)
        .layer(session_layer)
}
