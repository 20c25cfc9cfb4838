use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};

use super::{ApiError, ApiResult, AppState, TrainerQuery};
use crate::models::{NewWorkoutTemplate, WorkoutTemplate, WorkoutTemplatePatch};

pub(super) fn router() -> Router<AppState> {
    Router::new()
        .route("/api/workout-templates", get(list).post(create))
        .route(
            "/api/workout-templates/{id}",
            get(get_by_id).patch(update).delete(remove),
        )
}

fn check_duration(minutes: i32) -> ApiResult<()> {
    if minutes <= 0 {
        return Err(ApiError::validation("duration must be positive"));
    }
    Ok(())
}

async fn list(
    State(state): State<AppState>,
    Query(query): Query<TrainerQuery>,
) -> ApiResult<Json<Vec<WorkoutTemplate>>> {
    Ok(Json(state.repo.list_templates(query.trainer_id).await?))
}

async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<Json<WorkoutTemplate>> {
    Ok(Json(state.require_template(id).await?))
}

async fn create(
    State(state): State<AppState>,
    Json(template): Json<NewWorkoutTemplate>,
) -> ApiResult<(StatusCode, Json<WorkoutTemplate>)> {
    if template.name.trim().is_empty() {
        return Err(ApiError::validation("template name is required"));
    }
    check_duration(template.duration_minutes)?;
    state.require_trainer(template.trainer_id).await?;

    let template = state.repo.create_template(&template).await?;
    Ok((StatusCode::CREATED, Json(template)))
}

async fn update(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(patch): Json<WorkoutTemplatePatch>,
) -> ApiResult<Json<WorkoutTemplate>> {
    if let Some(minutes) = patch.duration_minutes {
        check_duration(minutes)?;
    }
    state
        .repo
        .update_template(id, patch)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("workout template", id))
}

async fn remove(State(state): State<AppState>, Path(id): Path<i32>) -> ApiResult<StatusCode> {
    if state.repo.delete_template(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found("workout template", id))
    }
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use crate::api::test_support::{app, call, seed};

    #[tokio::test]
    async fn template_lifecycle() {
        let (app, _) = app();
        let (trainer_id, _) = seed(&app).await;

        let (status, created) = call(
            &app,
            Method::POST,
            "/api/workout-templates",
            Some(json!({"trainerId": trainer_id, "name": "Push day"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["durationMinutes"], 60);
        let uri = format!("/api/workout-templates/{}", created["id"]);

        let (_, updated) = call(&app, Method::PATCH, &uri, Some(json!({"durationMinutes": 45}))).await;
        assert_eq!(updated["durationMinutes"], 45);

        let (_, list) = call(&app, Method::GET, &format!("/api/workout-templates?trainerId={trainer_id}"), None).await;
        assert_eq!(list.as_array().unwrap().len(), 1);

        let (status, _) = call(&app, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = call(&app, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn non_positive_duration_is_rejected() {
        let (app, _) = app();
        let (trainer_id, _) = seed(&app).await;
        let (status, _) = call(
            &app,
            Method::POST,
            "/api/workout-templates",
            Some(json!({"trainerId": trainer_id, "name": "Zero", "durationMinutes": 0})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
