//! REST API
//!
//! Every route works against a [`SharedRepository`], so the same router
//! serves PostgreSQL in production and the in-memory store in tests.

mod calendar;
mod clients;
pub mod error;
mod progress;
mod schedule;
mod sessions;
mod templates;
mod trainers;

use axum::{Json, Router, routing::get};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use crate::db::SharedRepository;
use crate::models::{Client, Trainer, WorkoutTemplate};
pub use error::{ApiError, ApiResult};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub repo: SharedRepository,
}

impl AppState {
    pub fn new(repo: SharedRepository) -> Self {
        Self { repo }
    }

    pub(crate) async fn require_trainer(&self, id: i32) -> ApiResult<Trainer> {
        self.repo
            .get_trainer(id)
            .await?
            .ok_or_else(|| ApiError::not_found("trainer", id))
    }

    pub(crate) async fn require_client(&self, id: i32) -> ApiResult<Client> {
        self.repo
            .get_client(id)
            .await?
            .ok_or_else(|| ApiError::not_found("client", id))
    }

    pub(crate) async fn require_template(&self, id: i32) -> ApiResult<WorkoutTemplate> {
        self.repo
            .get_template(id)
            .await?
            .ok_or_else(|| ApiError::not_found("workout template", id))
    }
}

/// `?trainerId=` on list routes
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TrainerQuery {
    pub trainer_id: i32,
}

/// `?clientId=` on list routes
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ClientQuery {
    pub client_id: Option<i32>,
}

/// Build the full application router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(trainers::router())
        .merge(clients::router())
        .merge(progress::router())
        .merge(calendar::router())
        .merge(templates::router())
        .merge(sessions::router())
        .merge(schedule::router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "trainer_manager",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}


#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};

    use super::test_support::{app, call};

    #[tokio::test]
    async fn health_reports_ok() {
        let (app, _) = app();
        let (status, body) = call(&app, Method::GET, "/health", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        let (app, _) = app();
        let (status, _) = call(&app, Method::GET, "/api/nothing", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
