use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};

use super::{ApiError, ApiResult, AppState};
use crate::models::{NewTrainer, Trainer};

pub(super) fn router() -> Router<AppState> {
    Router::new()
        .route("/api/trainers", get(list).post(create))
        .route("/api/trainers/{id}", get(get_by_id))
}

async fn list(State(state): State<AppState>) -> ApiResult<Json<Vec<Trainer>>> {
    Ok(Json(state.repo.list_trainers().await?))
}

async fn get_by_id(State(state): State<AppState>, Path(id): Path<i32>) -> ApiResult<Json<Trainer>> {
    Ok(Json(state.require_trainer(id).await?))
}

async fn create(
    State(state): State<AppState>,
    Json(trainer): Json<NewTrainer>,
) -> ApiResult<(StatusCode, Json<Trainer>)> {
    if trainer.name.trim().is_empty() {
        return Err(ApiError::validation("trainer name is required"));
    }
    if trainer.email.trim().is_empty() {
        return Err(ApiError::validation("trainer email is required"));
    }
    let trainer = state.repo.create_trainer(&trainer).await?;
    Ok((StatusCode::CREATED, Json(trainer)))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use crate::api::test_support::{app, call};

    #[tokio::test]
    async fn create_then_fetch() {
        let (app, _) = app();
        let (status, created) = call(
            &app,
            Method::POST,
            "/api/trainers",
            Some(json!({"name": "Sam", "email": "sam@example.com"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let uri = format!("/api/trainers/{}", created["id"]);
        let (status, fetched) = call(&app, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["email"], "sam@example.com");
    }

    #[tokio::test]
    async fn blank_name_is_rejected() {
        let (app, _) = app();
        let (status, body) = call(
            &app,
            Method::POST,
            "/api/trainers",
            Some(json!({"name": " ", "email": "sam@example.com"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "validation");
    }

    #[tokio::test]
    async fn unknown_trainer_is_404() {
        let (app, _) = app();
        let (status, body) = call(&app, Method::GET, "/api/trainers/77", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "trainer 77 not found");
    }
}
