use axum::{Json, Router, routing::post};
use chrono::NaiveDateTime;
use serde::Serialize;

use super::{ApiResult, AppState};
use crate::schedule::{RecurrenceRule, generate};

pub(super) fn router() -> Router<AppState> {
    Router::new().route("/api/schedule/preview", post(preview))
}

#[derive(Debug, Serialize)]
struct Preview {
    dates: Vec<NaiveDateTime>,
}

/// Dates a rule would produce. Writes nothing.
async fn preview(Json(rule): Json<RecurrenceRule>) -> ApiResult<Json<Preview>> {
    Ok(Json(Preview { dates: generate(&rule)? }))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use crate::api::test_support::{app, call};

    #[tokio::test]
    async fn monthly_preview_skips_passed_day() {
        let (app, _) = app();
        let (status, body) = call(
            &app,
            Method::POST,
            "/api/schedule/preview",
            Some(json!({"frequency": "monthly", "startDate": "2024-01-20", "dayOfMonth": 15, "maxSessions": 3})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["dates"],
            json!(["2024-02-15T09:00:00", "2024-03-15T09:00:00", "2024-04-15T09:00:00"])
        );
    }

    #[tokio::test]
    async fn preview_rejects_end_before_start() {
        let (app, _) = app();
        let (status, body) = call(
            &app,
            Method::POST,
            "/api/schedule/preview",
            Some(json!({"frequency": "weekly", "startDate": "2024-01-20", "endDate": "2024-01-10", "dayOfWeek": 1})),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "validation");
    }
}
