use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get},
};

use super::{ApiError, ApiResult, AppState, ClientQuery};
use crate::models::{CalendarEvent, NewCalendarEvent};

pub(super) fn router() -> Router<AppState> {
    Router::new()
        .route("/api/calendar-events", get(list).post(create))
        .route("/api/calendar-events/{id}", delete(remove))
}

async fn list(
    State(state): State<AppState>,
    Query(query): Query<ClientQuery>,
) -> ApiResult<Json<Vec<CalendarEvent>>> {
    Ok(Json(state.repo.list_calendar_events(query.client_id).await?))
}

async fn create(
    State(state): State<AppState>,
    Json(event): Json<NewCalendarEvent>,
) -> ApiResult<(StatusCode, Json<CalendarEvent>)> {
    if event.title.trim().is_empty() {
        return Err(ApiError::validation("event title is required"));
    }
    if event.ends_at.is_some_and(|ends_at| ends_at < event.starts_at) {
        return Err(ApiError::validation("event cannot end before it starts"));
    }
    if let Some(client_id) = event.client_id {
        state.require_client(client_id).await?;
    }

    let event = state.repo.create_calendar_event(&event).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

async fn remove(State(state): State<AppState>, Path(id): Path<i32>) -> ApiResult<StatusCode> {
    if state.repo.delete_calendar_event(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found("calendar event", id))
    }
}
