use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};

use super::{ApiError, ApiResult, AppState, TrainerQuery};
use crate::db::CascadeReport;
use crate::models::{Client, ClientPatch, Goal, Measurement, NewClient};

pub(super) fn router() -> Router<AppState> {
    Router::new()
        .route("/api/clients", get(list).post(create))
        .route("/api/clients/{id}", get(get_by_id).patch(update).delete(delete))
        .route("/api/clients/{id}/measurements", get(list_measurements))
        .route("/api/clients/{id}/goals", get(list_goals))
}

async fn list(
    State(state): State<AppState>,
    Query(query): Query<TrainerQuery>,
) -> ApiResult<Json<Vec<Client>>> {
    Ok(Json(state.repo.list_clients(query.trainer_id).await?))
}

async fn get_by_id(State(state): State<AppState>, Path(id): Path<i32>) -> ApiResult<Json<Client>> {
    Ok(Json(state.require_client(id).await?))
}

async fn create(
    State(state): State<AppState>,
    Json(client): Json<NewClient>,
) -> ApiResult<(StatusCode, Json<Client>)> {
    if client.name.trim().is_empty() {
        return Err(ApiError::validation("client name is required"));
    }
    state.require_trainer(client.trainer_id).await?;

    let client = state.repo.create_client(&client).await?;
    Ok((StatusCode::CREATED, Json(client)))
}

async fn update(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(patch): Json<ClientPatch>,
) -> ApiResult<Json<Client>> {
    if patch.name.as_deref().is_some_and(|name| name.trim().is_empty()) {
        return Err(ApiError::validation("client name cannot be blank"));
    }
    state
        .repo
        .update_client(id, patch)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("client", id))
}

/// Deletes the client together with its sessions, measurements, goals and
/// calendar events. Unknown ids succeed with an empty report.
async fn delete(State(state): State<AppState>, Path(id): Path<i32>) -> ApiResult<Json<CascadeReport>> {
    Ok(Json(state.repo.delete_client(id).await?))
}

async fn list_measurements(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<Json<Vec<Measurement>>> {
    state.require_client(id).await?;
    Ok(Json(state.repo.list_measurements(id).await?))
}

async fn list_goals(State(state): State<AppState>, Path(id): Path<i32>) -> ApiResult<Json<Vec<Goal>>> {
    state.require_client(id).await?;
    Ok(Json(state.repo.list_goals(id).await?))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use crate::api::test_support::{app, call, seed};
    use crate::db::{Collection, DocumentStore, Repository};

    #[tokio::test]
    async fn client_requires_existing_trainer() {
        let (app, _) = app();
        let (status, _) = call(
            &app,
            Method::POST,
            "/api/clients",
            Some(json!({"trainerId": 5, "name": "Ada"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn list_is_scoped_to_trainer() {
        let (app, _) = app();
        let (trainer_id, _) = seed(&app).await;

        let (_, own) = call(&app, Method::GET, &format!("/api/clients?trainerId={trainer_id}"), None).await;
        let (_, other) = call(&app, Method::GET, "/api/clients?trainerId=999", None).await;

        assert_eq!(own.as_array().unwrap().len(), 1);
        assert!(other.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn patch_edits_profile() {
        let (app, _) = app();
        let (_, client_id) = seed(&app).await;

        let (status, body) = call(
            &app,
            Method::PATCH,
            &format!("/api/clients/{client_id}"),
            Some(json!({"notes": "knee injury"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["notes"], "knee injury");
        assert_eq!(body["name"], "Ada");

        let (status, _) = call(&app, Method::PATCH, "/api/clients/999", Some(json!({}))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn delete_cascades_to_every_dependent() {
        let (app, store) = app();
        let (_, client_id) = seed(&app).await;

        for day in ["2024-03-04", "2024-03-11", "2024-03-18"] {
            call(
                &app,
                Method::POST,
                "/api/sessions",
                Some(json!({"clientId": client_id, "scheduledAt": format!("{day}T09:00:00")})),
            )
            .await;
        }
        for weight in [81.5, 80.9] {
            call(
                &app,
                Method::POST,
                "/api/measurements",
                Some(json!({"clientId": client_id, "measuredOn": "2024-03-01", "weightKg": weight})),
            )
            .await;
        }
        call(
            &app,
            Method::POST,
            "/api/goals",
            Some(json!({"clientId": client_id, "title": "Deadlift 100kg"})),
        )
        .await;

        let (status, report) = call(&app, Method::DELETE, &format!("/api/clients/{client_id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(report["sessions"], 3);
        assert_eq!(report["measurements"], 2);
        assert_eq!(report["goals"], 1);
        assert_eq!(report["calendarEvents"], 0);
        assert_eq!(report["clientDeleted"], true);

        let id = client_id as i32;
        for collection in Collection::DEPENDENTS {
            assert!(store.find_by_client(collection, id).await.unwrap().is_empty());
        }
        assert!(store.get_client(id).await.unwrap().is_none());
        let (status, _) = call(&app, Method::GET, &format!("/api/clients/{client_id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn deleting_twice_is_harmless() {
        let (app, _) = app();
        let (_, client_id) = seed(&app).await;
        let uri = format!("/api/clients/{client_id}");

        call(&app, Method::DELETE, &uri, None).await;
        let (status, report) = call(&app, Method::DELETE, &uri, None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(report["clientDeleted"], false);
    }

    #[tokio::test]
    async fn failed_cascade_returns_partial_report() {
        let (app, store) = app();
        let (_, client_id) = seed(&app).await;
        call(
            &app,
            Method::POST,
            "/api/sessions",
            Some(json!({"clientId": client_id, "scheduledAt": "2024-03-04T09:00:00"})),
        )
        .await;
        store.fail_deletes_in(Some(Collection::Measurements));
        call(
            &app,
            Method::POST,
            "/api/measurements",
            Some(json!({"clientId": client_id, "measuredOn": "2024-03-01"})),
        )
        .await;

        let (status, body) = call(&app, Method::DELETE, &format!("/api/clients/{client_id}"), None).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["code"], "cascade");
        assert_eq!(body["details"]["collection"], "measurements");
        assert_eq!(body["details"]["completed"]["sessions"], 1);
        assert_eq!(body["details"]["rolledBack"], false);
    }

    #[tokio::test]
    async fn progress_lists_need_a_known_client() {
        let (app, _) = app();
        let (status, _) = call(&app, Method::GET, "/api/clients/31/goals", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
