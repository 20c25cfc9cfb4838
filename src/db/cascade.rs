//! Client cascade delete.
//!
//! Dependents go first, in [`Collection::DEPENDENTS`] order, and the client
//! record goes last so that no dependent ever points at a missing client
//! while the cascade is running. The walk stops at the first store error and
//! reports what it had already removed.
//!
//! Whether a failure leaves partial deletions behind depends on the store:
//! [`Database`](super::Database) runs the cascade in one transaction and
//! rolls it back, the in-memory store keeps what was already deleted. The
//! `rolled_back` flag on [`CascadeError`] tells the caller which happened.

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::{Collection, DocumentStore, StoreError};

/// What a cascade removed, per collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CascadeReport {
    pub client_id: i32,
    pub sessions: usize,
    pub measurements: usize,
    pub goals: usize,
    pub calendar_events: usize,
    /// `false` when the client did not exist.
    pub client_deleted: bool,
}

impl CascadeReport {
    pub fn new(client_id: i32) -> Self {
        Self {
            client_id,
            ..Self::default()
        }
    }

    fn record(&mut self, collection: Collection) {
        match collection {
            Collection::Sessions => self.sessions += 1,
            Collection::Measurements => self.measurements += 1,
            Collection::Goals => self.goals += 1,
            Collection::CalendarEvents => self.calendar_events += 1,
            Collection::Clients => self.client_deleted = true,
        }
    }

    pub fn dependents(&self) -> usize {
        self.sessions + self.measurements + self.goals + self.calendar_events
    }

    /// Every record removed, the client included.
    pub fn total(&self) -> usize {
        self.dependents() + usize::from(self.client_deleted)
    }

    fn fail(&self, collection: Option<Collection>, source: StoreError) -> CascadeError {
        CascadeError {
            client_id: self.client_id,
            collection,
            completed: self.clone(),
            rolled_back: false,
            source,
        }
    }
}

#[derive(Debug, Error)]
#[error("deleting client {client_id} failed: {source}")]
pub struct CascadeError {
    pub client_id: i32,
    /// Collection being cleared when the store failed. `None` when the
    /// failure was in opening or committing the surrounding transaction.
    pub collection: Option<Collection>,
    /// Deletions made before the failure.
    pub completed: CascadeReport,
    /// Whether `completed` was undone by the store.
    pub rolled_back: bool,
    #[source]
    pub source: StoreError,
}

impl CascadeError {
    /// Failure outside the per-collection walk (transaction begin/commit).
    pub fn transaction(client_id: i32, source: StoreError) -> Self {
        CascadeReport::new(client_id).fail(None, source).rolled_back()
    }

    pub fn rolled_back(mut self) -> Self {
        self.rolled_back = true;
        self
    }
}

/// Delete `client_id` and every record that references it.
///
/// Deleting an unknown client is not an error: the report comes back empty
/// with `client_deleted == false`.
pub async fn delete_client<S>(store: &S, client_id: i32) -> Result<CascadeReport, CascadeError>
where
    S: DocumentStore + ?Sized,
{
    let mut report = CascadeReport::new(client_id);

    for collection in Collection::DEPENDENTS {
        let ids = store
            .find_by_client(collection, client_id)
            .await
            .map_err(|source| report.fail(Some(collection), source))?;
        debug!(client_id, %collection, count = ids.len(), "Deleting dependents");

        for id in ids {
            let removed = store
                .delete(collection, id)
                .await
                .map_err(|source| report.fail(Some(collection), source))?;
            if removed {
                report.record(collection);
            }
        }
    }

    let removed = store
        .delete(Collection::Clients, client_id)
        .await
        .map_err(|source| report.fail(Some(Collection::Clients), source))?;
    if removed {
        report.record(Collection::Clients);
    }

    info!(
        client_id,
        sessions = report.sessions,
        measurements = report.measurements,
        goals = report.goals,
        calendar_events = report.calendar_events,
        client_deleted = report.client_deleted,
        "Client cascade finished"
    );
    Ok(report)
}

/// Log a failed cascade once, with where it stopped.
pub(crate) fn log_failure(err: &CascadeError) {
    warn!(
        client_id = err.client_id,
        collection = ?err.collection,
        completed = err.completed.total(),
        rolled_back = err.rolled_back,
        error = %err.source,
        "Client cascade failed"
    );
}
