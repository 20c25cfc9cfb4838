//! Measurements and goals.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, patch, post},
};

use super::{ApiError, ApiResult, AppState};
use crate::models::{Goal, GoalPatch, Measurement, NewGoal, NewMeasurement};

pub(super) fn router() -> Router<AppState> {
    Router::new()
        .route("/api/measurements", post(create_measurement))
        .route("/api/measurements/{id}", delete(delete_measurement))
        .route("/api/goals", post(create_goal))
        .route("/api/goals/{id}", patch(update_goal).delete(delete_goal))
}

async fn create_measurement(
    State(state): State<AppState>,
    Json(measurement): Json<NewMeasurement>,
) -> ApiResult<(StatusCode, Json<Measurement>)> {
    if measurement.weight_kg.is_some_and(|w| w <= 0.0) {
        return Err(ApiError::validation("weight must be positive"));
    }
    if measurement
        .body_fat_pct
        .is_some_and(|pct| !(0.0..=100.0).contains(&pct))
    {
        return Err(ApiError::validation("body fat must be between 0 and 100 percent"));
    }
    state.require_client(measurement.client_id).await?;

    let measurement = state.repo.create_measurement(&measurement).await?;
    Ok((StatusCode::CREATED, Json(measurement)))
}

async fn delete_measurement(State(state): State<AppState>, Path(id): Path<i32>) -> ApiResult<StatusCode> {
    if state.repo.delete_measurement(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found("measurement", id))
    }
}

async fn create_goal(
    State(state): State<AppState>,
    Json(goal): Json<NewGoal>,
) -> ApiResult<(StatusCode, Json<Goal>)> {
    if goal.title.trim().is_empty() {
        return Err(ApiError::validation("goal title is required"));
    }
    state.require_client(goal.client_id).await?;

    let goal = state.repo.create_goal(&goal).await?;
    Ok((StatusCode::CREATED, Json(goal)))
}

async fn update_goal(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(patch): Json<GoalPatch>,
) -> ApiResult<Json<Goal>> {
    state
        .repo
        .update_goal(id, patch)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("goal", id))
}

async fn delete_goal(State(state): State<AppState>, Path(id): Path<i32>) -> ApiResult<StatusCode> {
    if state.repo.delete_goal(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found("goal", id))
    }
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use crate::api::test_support::{app, call, seed};

    #[tokio::test]
    async fn measurement_for_unknown_client_is_404() {
        let (app, _) = app();
        let (status, _) = call(
            &app,
            Method::POST,
            "/api/measurements",
            Some(json!({"clientId": 12, "measuredOn": "2024-01-01"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn measurements_list_in_date_order() {
        let (app, _) = app();
        let (_, client_id) = seed(&app).await;
        for day in ["2024-02-10", "2024-01-05"] {
            let (status, _) = call(
                &app,
                Method::POST,
                "/api/measurements",
                Some(json!({"clientId": client_id, "measuredOn": day, "bodyFatPct": 18.5})),
            )
            .await;
            assert_eq!(status, StatusCode::CREATED);
        }

        let (_, list) = call(&app, Method::GET, &format!("/api/clients/{client_id}/measurements"), None).await;
        let days: Vec<&str> = list
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["measuredOn"].as_str().unwrap())
            .collect();
        assert_eq!(days, vec!["2024-01-05", "2024-02-10"]);
    }

    #[tokio::test]
    async fn out_of_range_body_fat_is_rejected() {
        let (app, _) = app();
        let (_, client_id) = seed(&app).await;
        let (status, _) = call(
            &app,
            Method::POST,
            "/api/measurements",
            Some(json!({"clientId": client_id, "measuredOn": "2024-01-01", "bodyFatPct": 140.0})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn goal_can_be_marked_achieved_then_deleted() {
        let (app, _) = app();
        let (_, client_id) = seed(&app).await;
        let (_, goal) = call(
            &app,
            Method::POST,
            "/api/goals",
            Some(json!({"clientId": client_id, "title": "Run 5k", "targetDate": "2024-09-01"})),
        )
        .await;
        assert_eq!(goal["achieved"], false);
        let uri = format!("/api/goals/{}", goal["id"]);

        let (status, updated) = call(&app, Method::PATCH, &uri, Some(json!({"achieved": true}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["achieved"], true);
        assert_eq!(updated["title"], "Run 5k");

        let (status, _) = call(&app, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = call(&app, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
