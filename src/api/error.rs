//! API error type and its JSON rendering.
//!
//! ```json
//! { "code": "not_found", "message": "client 7 not found" }
//! ```
//!
//! Store failures are logged here and answered with a generic message; a
//! failed cascade additionally carries what had been deleted in `details`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, error};

use crate::db::{CascadeError, StoreError};
use crate::schedule::{RecurrenceError, ScheduleError};

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

#[derive(Debug, Error)]
pub enum ApiError {
    /// 404
    #[error("{0}")]
    NotFound(String),

    /// 400
    #[error("{0}")]
    Validation(String),

    /// 500
    #[error(transparent)]
    Store(#[from] StoreError),

    /// 500, with the partial report
    #[error(transparent)]
    Cascade(#[from] CascadeError),
}

impl ApiError {
    pub fn not_found(kind: &str, id: i32) -> Self {
        ApiError::NotFound(format!("{kind} {id} not found"))
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation(message.into())
    }
}

impl From<ScheduleError> for ApiError {
    fn from(err: ScheduleError) -> Self {
        ApiError::Validation(err.to_string())
    }
}

impl From<RecurrenceError> for ApiError {
    fn from(err: RecurrenceError) -> Self {
        ApiError::Validation(err.to_string())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::NotFound(message) => (
                StatusCode::NOT_FOUND,
                ErrorBody { code: "not_found", message, details: None },
            ),
            ApiError::Validation(message) => {
                debug!(%message, "Rejected request");
                (
                    StatusCode::BAD_REQUEST,
                    ErrorBody { code: "validation", message, details: None },
                )
            }
            ApiError::Store(err) => {
                error!(error = %err, "Store error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        code: "store",
                        message: "storage operation failed".to_string(),
                        details: None,
                    },
                )
            }
            ApiError::Cascade(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody {
                    code: "cascade",
                    message: format!("deleting client {} failed", err.client_id),
                    details: Some(json!({
                        "collection": err.collection,
                        "completed": err.completed,
                        "rolledBack": err.rolled_back,
                    })),
                },
            ),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use http_body_util::BodyExt;
    use serde_json::{Value, json};

    use super::*;
    use crate::db::{Collection, DocumentStore, StoreResult, cascade};

    /// Two sessions delete fine; scanning measurements fails.
    struct FailsOnMeasurements;

    #[async_trait]
    impl DocumentStore for FailsOnMeasurements {
        async fn find_by_client(&self, collection: Collection, _client_id: i32) -> StoreResult<Vec<i32>> {
            match collection {
                Collection::Sessions => Ok(vec![10, 11]),
                Collection::Measurements => Err(StoreError::Backend("connection reset".to_string())),
                _ => Ok(Vec::new()),
            }
        }

        async fn delete(&self, _collection: Collection, _id: i32) -> StoreResult<bool> {
            Ok(true)
        }
    }

    async fn render(err: ApiError) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn rolled_back_cascade_reports_undone_work() {
        let err = cascade::delete_client(&FailsOnMeasurements, 4)
            .await
            .map_err(CascadeError::rolled_back)
            .unwrap_err();

        let (status, body) = render(err.into()).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["code"], "cascade");
        assert_eq!(body["message"], "deleting client 4 failed");
        assert_eq!(body["details"]["collection"], "measurements");
        assert_eq!(body["details"]["rolledBack"], true);
        assert_eq!(body["details"]["completed"]["sessions"], 2);
        assert_eq!(body["details"]["completed"]["clientDeleted"], false);
    }

    #[tokio::test]
    async fn transaction_failure_has_no_collection() {
        let err = CascadeError::transaction(4, StoreError::Backend("pool closed".to_string()));
        assert!(err.rolled_back);
        assert_eq!(err.completed, crate::db::CascadeReport::new(4));

        let (status, body) = render(err.into()).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body["details"],
            json!({
                "collection": null,
                "rolledBack": true,
                "completed": {
                    "clientId": 4,
                    "sessions": 0,
                    "measurements": 0,
                    "goals": 0,
                    "calendarEvents": 0,
                    "clientDeleted": false
                }
            })
        );
    }

    #[tokio::test]
    async fn recurrence_errors_are_validation() {
        let (status, body) = render(RecurrenceError::MissingStartDate.into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"code": "validation", "message": "start date is required"}));
    }
}
