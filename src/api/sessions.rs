use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::info;

use super::{ApiError, ApiResult, AppState};
use crate::models::{NewSession, Session, SessionFilter, SessionPatch};
use crate::schedule::{BulkSessionRequest, RecurringSessionRequest};

pub(super) fn router() -> Router<AppState> {
    Router::new()
        .route("/api/sessions", get(list).post(create))
        .route("/api/sessions/bulk", post(create_bulk))
        .route("/api/sessions/recurring", post(create_recurring))
        .route("/api/sessions/{id}", get(get_by_id).patch(update).delete(remove))
}

#[derive(Debug, Serialize)]
struct Created {
    created: usize,
}

#[derive(Debug, Serialize)]
struct CreatedSeries {
    created: usize,
    dates: Vec<NaiveDateTime>,
}

/// Referenced client and template must exist when a session is written.
async fn check_references(
    state: &AppState,
    client_id: Option<i32>,
    workout_template_id: Option<i32>,
) -> ApiResult<()> {
    if let Some(client_id) = client_id {
        state.require_client(client_id).await?;
    }
    if let Some(template_id) = workout_template_id {
        state.require_template(template_id).await?;
    }
    Ok(())
}

async fn list(
    State(state): State<AppState>,
    Query(filter): Query<SessionFilter>,
) -> ApiResult<Json<Vec<Session>>> {
    Ok(Json(state.repo.list_sessions(&filter).await?))
}

async fn get_by_id(State(state): State<AppState>, Path(id): Path<i32>) -> ApiResult<Json<Session>> {
    state
        .repo
        .get_session(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("session", id))
}

async fn create(
    State(state): State<AppState>,
    Json(session): Json<NewSession>,
) -> ApiResult<(StatusCode, Json<Session>)> {
    if session.duration_minutes <= 0 {
        return Err(ApiError::validation("duration must be positive"));
    }
    check_references(&state, session.client_id, session.workout_template_id).await?;

    let session = state.repo.create_session(&session).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

async fn update(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(patch): Json<SessionPatch>,
) -> ApiResult<Json<Session>> {
    if patch.duration_minutes.is_some_and(|minutes| minutes <= 0) {
        return Err(ApiError::validation("duration must be positive"));
    }
    check_references(&state, None, patch.workout_template_id).await?;

    state
        .repo
        .update_session(id, patch)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("session", id))
}

async fn remove(State(state): State<AppState>, Path(id): Path<i32>) -> ApiResult<StatusCode> {
    if state.repo.delete_session(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found("session", id))
    }
}

/// Creates one scheduled session per supplied date, all at `time`.
async fn create_bulk(
    State(state): State<AppState>,
    Json(request): Json<BulkSessionRequest>,
) -> ApiResult<(StatusCode, Json<Created>)> {
    let sessions = request.to_sessions()?;
    check_references(&state, Some(request.client_id), request.workout_template_id).await?;

    let created = state.repo.create_sessions(&sessions).await?;
    info!(client_id = request.client_id, created, "Bulk sessions created");
    Ok((StatusCode::CREATED, Json(Created { created })))
}

/// Generates the series from a recurrence rule and creates it.
async fn create_recurring(
    State(state): State<AppState>,
    Json(request): Json<RecurringSessionRequest>,
) -> ApiResult<(StatusCode, Json<CreatedSeries>)> {
    let sessions = request.to_sessions()?;
    check_references(&state, Some(request.client_id), request.workout_template_id).await?;

    let created = state.repo.create_sessions(&sessions).await?;
    info!(
        client_id = request.client_id,
        frequency = %request.rule.frequency,
        created,
        "Recurring sessions created"
    );
    let dates = sessions.iter().map(|s| s.scheduled_at).collect();
    Ok((StatusCode::CREATED, Json(CreatedSeries { created, dates })))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use crate::api::test_support::{app, call, seed};

    #[tokio::test]
    async fn bulk_creates_one_session_per_date() {
        let (app, _) = app();
        let (_, client_id) = seed(&app).await;

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/sessions/bulk",
            Some(json!({
                "clientId": client_id,
                "dates": ["2024-05-01", "2024-05-08", "2024-05-15"],
                "time": "17:45",
                "note": "Upper body",
                "duration": 50
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["created"], 3);

        let (_, sessions) = call(&app, Method::GET, &format!("/api/sessions?clientId={client_id}"), None).await;
        let sessions = sessions.as_array().unwrap();
        assert_eq!(sessions.len(), 3);
        assert_eq!(sessions[0]["scheduledAt"], "2024-05-01T17:45:00");
        assert_eq!(sessions[2]["durationMinutes"], 50);
        assert_eq!(sessions[1]["status"], "scheduled");
    }

    #[tokio::test]
    async fn bulk_with_no_dates_creates_nothing() {
        let (app, _) = app();
        let (_, client_id) = seed(&app).await;
        let (status, body) = call(
            &app,
            Method::POST,
            "/api/sessions/bulk",
            Some(json!({"clientId": client_id, "dates": [], "time": "08:00"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["created"], 0);
    }

    #[tokio::test]
    async fn bulk_for_unknown_client_writes_nothing() {
        let (app, _) = app();
        let (status, _) = call(
            &app,
            Method::POST,
            "/api/sessions/bulk",
            Some(json!({"clientId": 404, "dates": ["2024-05-01"], "time": "08:00"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, sessions) = call(&app, Method::GET, "/api/sessions", None).await;
        assert!(sessions.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn bulk_rejects_unknown_template_and_bad_time() {
        let (app, _) = app();
        let (_, client_id) = seed(&app).await;

        let (status, _) = call(
            &app,
            Method::POST,
            "/api/sessions/bulk",
            Some(json!({"clientId": client_id, "dates": ["2024-05-01"], "time": "08:00", "workoutTemplateId": 999})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/sessions/bulk",
            Some(json!({"clientId": client_id, "dates": ["2024-05-01"], "time": "8 o'clock"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "validation");
    }

    #[tokio::test]
    async fn recurring_generates_and_stores_series() {
        let (app, _) = app();
        let (_, client_id) = seed(&app).await;

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/sessions/recurring",
            Some(json!({
                "clientId": client_id,
                "frequency": "weekly",
                "startDate": "2024-01-01",
                "dayOfWeek": 3,
                "maxSessions": 4
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["created"], 4);
        assert_eq!(body["dates"][0], "2024-01-03T09:00:00");
        assert_eq!(body["dates"][3], "2024-01-24T09:00:00");
    }

    #[tokio::test]
    async fn recurring_without_anchor_is_rejected() {
        let (app, _) = app();
        let (_, client_id) = seed(&app).await;

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/sessions/recurring",
            Some(json!({"clientId": client_id, "frequency": "weekly", "startDate": "2024-01-01"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "day of week is required for weekly sessions");
    }

    #[tokio::test]
    async fn oversized_series_is_rejected_without_writing() {
        let (app, _) = app();
        let (_, client_id) = seed(&app).await;

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/sessions/recurring",
            Some(json!({
                "clientId": client_id,
                "frequency": "monthly",
                "startDate": "2024-01-01",
                "dayOfMonth": 1,
                "maxSessions": 1000000
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "validation");
        assert_eq!(body["message"], "at most 520 sessions can be scheduled at once, got 1000000");

        let (_, sessions) = call(&app, Method::GET, "/api/sessions", None).await;
        assert!(sessions.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn out_of_range_anchor_is_a_validation_error() {
        let (app, _) = app();
        let (_, client_id) = seed(&app).await;

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/sessions/recurring",
            Some(json!({"clientId": client_id, "frequency": "weekly", "startDate": "2024-01-01", "dayOfWeek": 300})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "validation");
    }

    #[tokio::test]
    async fn session_status_update_and_range_filter() {
        let (app, _) = app();
        let (_, client_id) = seed(&app).await;
        let (_, first) = call(
            &app,
            Method::POST,
            "/api/sessions",
            Some(json!({"clientId": client_id, "scheduledAt": "2024-06-01T09:00:00"})),
        )
        .await;
        call(
            &app,
            Method::POST,
            "/api/sessions",
            Some(json!({"clientId": client_id, "scheduledAt": "2024-07-01T09:00:00"})),
        )
        .await;

        let uri = format!("/api/sessions/{}", first["id"]);
        let (status, updated) = call(&app, Method::PATCH, &uri, Some(json!({"status": "completed"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["status"], "completed");

        let (_, june) = call(
            &app,
            Method::GET,
            "/api/sessions?from=2024-06-01T00:00:00&to=2024-07-01T00:00:00",
            None,
        )
        .await;
        assert_eq!(june.as_array().unwrap().len(), 1);
        assert_eq!(june[0]["status"], "completed");

        let (status, _) = call(&app, Method::PATCH, &uri, Some(json!({"status": "skipped"}))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }
}
