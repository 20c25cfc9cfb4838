use std::fmt;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::config::{Config, StorageBackend};
use crate::models::{
    CalendarEvent, Client, ClientPatch, Goal, GoalPatch, Measurement, NewCalendarEvent, NewClient,
    NewGoal, NewMeasurement, NewSession, NewTrainer, NewWorkoutTemplate, Session, SessionFilter,
    SessionPatch, Trainer, WorkoutTemplate, WorkoutTemplatePatch,
};

pub mod cascade;
pub mod memory;
pub mod postgres;

pub use cascade::{CascadeError, CascadeReport};
pub use memory::MemoryStore;
pub use postgres::Database;

/// Stored collections that take part in a client cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Clients,
    Sessions,
    Measurements,
    Goals,
    CalendarEvents,
}

impl Collection {
    /// Collections whose records reference a client, in deletion order.
    pub const DEPENDENTS: [Collection; 4] = [
        Collection::Sessions,
        Collection::Measurements,
        Collection::Goals,
        Collection::CalendarEvents,
    ];

    pub fn table(self) -> &'static str {
        match self {
            Collection::Clients => "clients",
            Collection::Sessions => "sessions",
            Collection::Measurements => "measurements",
            Collection::Goals => "goals",
            Collection::CalendarEvents => "calendar_events",
        }
    }

    /// Column that holds the client reference.
    pub fn client_column(self) -> &'static str {
        match self {
            Collection::Clients => "id",
            _ => "client_id",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error("store unavailable: {0}")]
    Backend(String),
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// The two primitives the client cascade needs from a store.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Ids of every record in `collection` that references `client_id`.
    async fn find_by_client(&self, collection: Collection, client_id: i32) -> StoreResult<Vec<i32>>;

    /// Delete one record. Returns `false` if it did not exist.
    async fn delete(&self, collection: Collection, id: i32) -> StoreResult<bool>;
}

/// Typed access to every collection the application manages.
///
/// `get_*` return `None` for unknown ids; `update_*` return `None` when there
/// was nothing to update; `delete_*` return whether a record was removed.
#[async_trait]
pub trait Repository: Send + Sync {
    // Trainer operations
    async fn list_trainers(&self) -> StoreResult<Vec<Trainer>>;
    async fn get_trainer(&self, id: i32) -> StoreResult<Option<Trainer>>;
    async fn create_trainer(&self, trainer: &NewTrainer) -> StoreResult<Trainer>;

    // Client operations
    async fn list_clients(&self, trainer_id: i32) -> StoreResult<Vec<Client>>;
    async fn get_client(&self, id: i32) -> StoreResult<Option<Client>>;
    async fn create_client(&self, client: &NewClient) -> StoreResult<Client>;
    async fn update_client(&self, id: i32, patch: ClientPatch) -> StoreResult<Option<Client>>;
    /// Remove a client and every record that references it.
    async fn delete_client(&self, id: i32) -> Result<CascadeReport, CascadeError>;

    // Workout template operations
    async fn list_templates(&self, trainer_id: i32) -> StoreResult<Vec<WorkoutTemplate>>;
    async fn get_template(&self, id: i32) -> StoreResult<Option<WorkoutTemplate>>;
    async fn create_template(&self, template: &NewWorkoutTemplate) -> StoreResult<WorkoutTemplate>;
    async fn update_template(
        &self,
        id: i32,
        patch: WorkoutTemplatePatch,
    ) -> StoreResult<Option<WorkoutTemplate>>;
    async fn delete_template(&self, id: i32) -> StoreResult<bool>;

    // Session operations
    async fn list_sessions(&self, filter: &SessionFilter) -> StoreResult<Vec<Session>>;
    async fn get_session(&self, id: i32) -> StoreResult<Option<Session>>;
    async fn create_session(&self, session: &NewSession) -> StoreResult<Session>;
    /// Insert every session or none of them. Returns the number created.
    async fn create_sessions(&self, sessions: &[NewSession]) -> StoreResult<usize>;
    async fn update_session(&self, id: i32, patch: SessionPatch) -> StoreResult<Option<Session>>;
    async fn delete_session(&self, id: i32) -> StoreResult<bool>;

    // Progress operations
    async fn list_measurements(&self, client_id: i32) -> StoreResult<Vec<Measurement>>;
    async fn create_measurement(&self, measurement: &NewMeasurement) -> StoreResult<Measurement>;
    async fn delete_measurement(&self, id: i32) -> StoreResult<bool>;

    async fn list_goals(&self, client_id: i32) -> StoreResult<Vec<Goal>>;
    async fn create_goal(&self, goal: &NewGoal) -> StoreResult<Goal>;
    async fn update_goal(&self, id: i32, patch: GoalPatch) -> StoreResult<Option<Goal>>;
    async fn delete_goal(&self, id: i32) -> StoreResult<bool>;

    // Calendar operations
    async fn list_calendar_events(&self, client_id: Option<i32>) -> StoreResult<Vec<CalendarEvent>>;
    async fn create_calendar_event(&self, event: &NewCalendarEvent) -> StoreResult<CalendarEvent>;
    async fn delete_calendar_event(&self, id: i32) -> StoreResult<bool>;
}

pub type SharedRepository = Arc<dyn Repository>;

/// Open the configured store
pub async fn init(config: &Config) -> Result<SharedRepository> {
    match config.storage_backend {
        StorageBackend::Memory => {
            info!("Using in-memory store");
            Ok(Arc::new(MemoryStore::new()))
        }
        StorageBackend::Postgres => {
            let db = Database::new(config).await?;
            if config.run_migrations {
                db.migrate().await?;
            }
            info!("Database connection established");
            Ok(Arc::new(db))
        }
    }
}
