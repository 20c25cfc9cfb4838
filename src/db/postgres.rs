use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, Transaction};
use tokio::sync::Mutex;
use tracing::error;

use super::cascade::{self, CascadeError, CascadeReport};
use super::{Collection, DocumentStore, Repository, StoreError, StoreResult};
use crate::config::Config;
use crate::models::{
    CalendarEvent, Client, ClientPatch, Goal, GoalPatch, Measurement, NewCalendarEvent, NewClient,
    NewGoal, NewMeasurement, NewSession, NewTrainer, NewWorkoutTemplate, Session, SessionFilter,
    SessionPatch, SessionStatus, Trainer, WorkoutTemplate, WorkoutTemplatePatch,
};

const SESSION_COLUMNS: &str =
    "id, client_id, workout_template_id, scheduled_at, duration_minutes, status, note";

/// Session as stored; `status` is free text in the table.
#[derive(sqlx::FromRow)]
struct SessionRow {
    id: i32,
    client_id: Option<i32>,
    workout_template_id: Option<i32>,
    scheduled_at: NaiveDateTime,
    duration_minutes: i32,
    status: String,
    note: Option<String>,
}

impl TryFrom<SessionRow> for Session {
    type Error = StoreError;

    fn try_from(row: SessionRow) -> StoreResult<Self> {
        let status = row
            .status
            .parse::<SessionStatus>()
            .map_err(|e| StoreError::Corrupt(format!("session {}: {e}", row.id)))?;
        Ok(Session {
            id: row.id,
            client_id: row.client_id,
            workout_template_id: row.workout_template_id,
            scheduled_at: row.scheduled_at,
            duration_minutes: row.duration_minutes,
            status,
            note: row.note,
        })
    }
}

fn sessions_from(rows: Vec<SessionRow>) -> StoreResult<Vec<Session>> {
    rows.into_iter().map(Session::try_from).collect()
}

/// Database connection pool
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new Database instance with a connection pool
    pub async fn new(config: &Config) -> Result<Self> {
        let url = config
            .database_url()
            .context("DATABASE_URL is not set")?;
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(url)
            .await?;

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool
    pub fn get_pool(&self) -> &PgPool {
        &self.pool
    }

    /// Apply the migrations embedded from `migrations/`
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::migrate!().run(self.get_pool()).await?;
        Ok(())
    }

    async fn exec_delete(&self, collection: Collection, id: i32) -> StoreResult<bool> {
        let sql = format!("DELETE FROM {} WHERE id = $1", collection.table());
        let result = sqlx::query(&sql).bind(id).execute(self.get_pool()).await?;
        Ok(result.rows_affected() > 0)
    }
}

/// Cascade primitives scoped to one open transaction.
struct TransactionStore {
    tx: Mutex<Transaction<'static, Postgres>>,
}

#[async_trait]
impl DocumentStore for TransactionStore {
    async fn find_by_client(&self, collection: Collection, client_id: i32) -> StoreResult<Vec<i32>> {
        let sql = format!(
            "SELECT id FROM {} WHERE {} = $1 ORDER BY id",
            collection.table(),
            collection.client_column()
        );
        let mut tx = self.tx.lock().await;
        let ids = sqlx::query_scalar::<_, i32>(&sql)
            .bind(client_id)
            .fetch_all(&mut **tx)
            .await?;
        Ok(ids)
    }

    async fn delete(&self, collection: Collection, id: i32) -> StoreResult<bool> {
        let sql = format!("DELETE FROM {} WHERE id = $1", collection.table());
        let mut tx = self.tx.lock().await;
        let result = sqlx::query(&sql).bind(id).execute(&mut **tx).await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl Repository for Database {
    // Trainer operations
    async fn list_trainers(&self) -> StoreResult<Vec<Trainer>> {
        let trainers = sqlx::query_as::<_, Trainer>(
            "SELECT id, name, email, phone FROM trainers ORDER BY name ASC",
        )
        .fetch_all(self.get_pool())
        .await?;

        Ok(trainers)
    }

    async fn get_trainer(&self, id: i32) -> StoreResult<Option<Trainer>> {
        let trainer = sqlx::query_as::<_, Trainer>(
            "SELECT id, name, email, phone FROM trainers WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.get_pool())
        .await?;

        Ok(trainer)
    }

    async fn create_trainer(&self, trainer: &NewTrainer) -> StoreResult<Trainer> {
        let trainer = sqlx::query_as::<_, Trainer>(
            r#"
            INSERT INTO trainers (name, email, phone)
            VALUES ($1, $2, $3)
            RETURNING id, name, email, phone
            "#,
        )
        .bind(&trainer.name)
        .bind(&trainer.email)
        .bind(&trainer.phone)
        .fetch_one(self.get_pool())
        .await?;

        Ok(trainer)
    }

    // Client operations
    async fn list_clients(&self, trainer_id: i32) -> StoreResult<Vec<Client>> {
        let clients = sqlx::query_as::<_, Client>(
            r#"
            SELECT id, trainer_id, name, email, phone, notes, created_at
            FROM clients
            WHERE trainer_id = $1
            ORDER BY name ASC
            "#,
        )
        .bind(trainer_id)
        .fetch_all(self.get_pool())
        .await?;

        Ok(clients)
    }

    async fn get_client(&self, id: i32) -> StoreResult<Option<Client>> {
        let client = sqlx::query_as::<_, Client>(
            r#"
            SELECT id, trainer_id, name, email, phone, notes, created_at
            FROM clients
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(self.get_pool())
        .await?;

        Ok(client)
    }

    async fn create_client(&self, client: &NewClient) -> StoreResult<Client> {
        let client = sqlx::query_as::<_, Client>(
            r#"
            INSERT INTO clients (trainer_id, name, email, phone, notes)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, trainer_id, name, email, phone, notes, created_at
            "#,
        )
        .bind(client.trainer_id)
        .bind(&client.name)
        .bind(&client.email)
        .bind(&client.phone)
        .bind(&client.notes)
        .fetch_one(self.get_pool())
        .await?;

        Ok(client)
    }

    async fn update_client(&self, id: i32, patch: ClientPatch) -> StoreResult<Option<Client>> {
        let Some(mut client) = self.get_client(id).await? else {
            return Ok(None);
        };
        patch.apply(&mut client);

        let client = sqlx::query_as::<_, Client>(
            r#"
            UPDATE clients
            SET name = $1, email = $2, phone = $3, notes = $4
            WHERE id = $5
            RETURNING id, trainer_id, name, email, phone, notes, created_at
            "#,
        )
        .bind(&client.name)
        .bind(&client.email)
        .bind(&client.phone)
        .bind(&client.notes)
        .bind(id)
        .fetch_optional(self.get_pool())
        .await?;

        Ok(client)
    }

    async fn delete_client(&self, id: i32) -> Result<CascadeReport, CascadeError> {
        // Start a transaction
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| CascadeError::transaction(id, e.into()))?;
        let store = TransactionStore { tx: Mutex::new(tx) };

        match cascade::delete_client(&store, id).await {
            Ok(report) => {
                // Commit the transaction
                store
                    .tx
                    .into_inner()
                    .commit()
                    .await
                    .map_err(|e| CascadeError::transaction(id, e.into()))
                    .inspect_err(cascade::log_failure)?;
                Ok(report)
            }
            Err(err) => {
                if let Err(rollback) = store.tx.into_inner().rollback().await {
                    // the server drops the transaction with the connection anyway
                    error!(client_id = id, error = %rollback, "Rollback failed");
                }
                let err = err.rolled_back();
                cascade::log_failure(&err);
                Err(err)
            }
        }
    }

    // Workout template operations
    async fn list_templates(&self, trainer_id: i32) -> StoreResult<Vec<WorkoutTemplate>> {
        let templates = sqlx::query_as::<_, WorkoutTemplate>(
            r#"
            SELECT id, trainer_id, name, description, duration_minutes
            FROM workout_templates
            WHERE trainer_id = $1
            ORDER BY name ASC
            "#,
        )
        .bind(trainer_id)
        .fetch_all(self.get_pool())
        .await?;

        Ok(templates)
    }

    async fn get_template(&self, id: i32) -> StoreResult<Option<WorkoutTemplate>> {
        let template = sqlx::query_as::<_, WorkoutTemplate>(
            r#"
            SELECT id, trainer_id, name, description, duration_minutes
            FROM workout_templates
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(self.get_pool())
        .await?;

        Ok(template)
    }

    async fn create_template(&self, template: &NewWorkoutTemplate) -> StoreResult<WorkoutTemplate> {
        let template = sqlx::query_as::<_, WorkoutTemplate>(
            r#"
            INSERT INTO workout_templates (trainer_id, name, description, duration_minutes)
            VALUES ($1, $2, $3, $4)
            RETURNING id, trainer_id, name, description, duration_minutes
            "#,
        )
        .bind(template.trainer_id)
        .bind(&template.name)
        .bind(&template.description)
        .bind(template.duration_minutes)
        .fetch_one(self.get_pool())
        .await?;

        Ok(template)
    }

    async fn update_template(
        &self,
        id: i32,
        patch: WorkoutTemplatePatch,
    ) -> StoreResult<Option<WorkoutTemplate>> {
        let Some(mut template) = self.get_template(id).await? else {
            return Ok(None);
        };
        patch.apply(&mut template);

        let template = sqlx::query_as::<_, WorkoutTemplate>(
            r#"
            UPDATE workout_templates
            SET name = $1, description = $2, duration_minutes = $3
            WHERE id = $4
            RETURNING id, trainer_id, name, description, duration_minutes
            "#,
        )
        .bind(&template.name)
        .bind(&template.description)
        .bind(template.duration_minutes)
        .bind(id)
        .fetch_optional(self.get_pool())
        .await?;

        Ok(template)
    }

    async fn delete_template(&self, id: i32) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM workout_templates WHERE id = $1")
            .bind(id)
            .execute(self.get_pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    // Session operations
    async fn list_sessions(&self, filter: &SessionFilter) -> StoreResult<Vec<Session>> {
        let sql = format!(
            r#"
            SELECT {SESSION_COLUMNS}
            FROM sessions
            WHERE ($1::int IS NULL OR client_id = $1)
              AND ($2::timestamp IS NULL OR scheduled_at >= $2)
              AND ($3::timestamp IS NULL OR scheduled_at < $3)
            ORDER BY scheduled_at ASC, id ASC
            "#
        );
        let rows = sqlx::query_as::<_, SessionRow>(&sql)
            .bind(filter.client_id)
            .bind(filter.from)
            .bind(filter.to)
            .fetch_all(self.get_pool())
            .await?;

        sessions_from(rows)
    }

    async fn get_session(&self, id: i32) -> StoreResult<Option<Session>> {
        let sql = format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE id = $1");
        let row = sqlx::query_as::<_, SessionRow>(&sql)
            .bind(id)
            .fetch_optional(self.get_pool())
            .await?;

        row.map(Session::try_from).transpose()
    }

    async fn create_session(&self, session: &NewSession) -> StoreResult<Session> {
        let sql = format!(
            r#"
            INSERT INTO sessions (client_id, workout_template_id, scheduled_at, duration_minutes, status, note)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {SESSION_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, SessionRow>(&sql)
            .bind(session.client_id)
            .bind(session.workout_template_id)
            .bind(session.scheduled_at)
            .bind(session.duration_minutes)
            .bind(session.status.as_str())
            .bind(&session.note)
            .fetch_one(self.get_pool())
            .await?;

        Session::try_from(row)
    }

    async fn create_sessions(&self, sessions: &[NewSession]) -> StoreResult<usize> {
        // Begin a transaction
        let mut tx = self.pool.begin().await?;

        for session in sessions {
            sqlx::query(
                r#"
                INSERT INTO sessions (client_id, workout_template_id, scheduled_at, duration_minutes, status, note)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(session.client_id)
            .bind(session.workout_template_id)
            .bind(session.scheduled_at)
            .bind(session.duration_minutes)
            .bind(session.status.as_str())
            .bind(&session.note)
            .execute(&mut *tx)
            .await?;
        }

        // Commit the transaction
        tx.commit().await?;

        Ok(sessions.len())
    }

    async fn update_session(&self, id: i32, patch: SessionPatch) -> StoreResult<Option<Session>> {
        let Some(mut session) = self.get_session(id).await? else {
            return Ok(None);
        };
        patch.apply(&mut session);

        let sql = format!(
            r#"
            UPDATE sessions
            SET workout_template_id = $1, scheduled_at = $2, duration_minutes = $3, status = $4, note = $5
            WHERE id = $6
            RETURNING {SESSION_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, SessionRow>(&sql)
            .bind(session.workout_template_id)
            .bind(session.scheduled_at)
            .bind(session.duration_minutes)
            .bind(session.status.as_str())
            .bind(&session.note)
            .bind(id)
            .fetch_optional(self.get_pool())
            .await?;

        row.map(Session::try_from).transpose()
    }

    async fn delete_session(&self, id: i32) -> StoreResult<bool> {
        self.exec_delete(Collection::Sessions, id).await
    }

    // Progress operations
    async fn list_measurements(&self, client_id: i32) -> StoreResult<Vec<Measurement>> {
        let measurements = sqlx::query_as::<_, Measurement>(
            r#"
            SELECT id, client_id, measured_on, weight_kg, body_fat_pct, note
            FROM measurements
            WHERE client_id = $1
            ORDER BY measured_on ASC, id ASC
            "#,
        )
        .bind(client_id)
        .fetch_all(self.get_pool())
        .await?;

        Ok(measurements)
    }

    async fn create_measurement(&self, measurement: &NewMeasurement) -> StoreResult<Measurement> {
        let measurement = sqlx::query_as::<_, Measurement>(
            r#"
            INSERT INTO measurements (client_id, measured_on, weight_kg, body_fat_pct, note)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, client_id, measured_on, weight_kg, body_fat_pct, note
            "#,
        )
        .bind(measurement.client_id)
        .bind(measurement.measured_on)
        .bind(measurement.weight_kg)
        .bind(measurement.body_fat_pct)
        .bind(&measurement.note)
        .fetch_one(self.get_pool())
        .await?;

        Ok(measurement)
    }

    async fn delete_measurement(&self, id: i32) -> StoreResult<bool> {
        self.exec_delete(Collection::Measurements, id).await
    }

    async fn list_goals(&self, client_id: i32) -> StoreResult<Vec<Goal>> {
        let goals = sqlx::query_as::<_, Goal>(
            r#"
            SELECT id, client_id, title, target_date, achieved
            FROM goals
            WHERE client_id = $1
            ORDER BY id ASC
            "#,
        )
        .bind(client_id)
        .fetch_all(self.get_pool())
        .await?;

        Ok(goals)
    }

    async fn create_goal(&self, goal: &NewGoal) -> StoreResult<Goal> {
        let goal = sqlx::query_as::<_, Goal>(
            r#"
            INSERT INTO goals (client_id, title, target_date)
            VALUES ($1, $2, $3)
            RETURNING id, client_id, title, target_date, achieved
            "#,
        )
        .bind(goal.client_id)
        .bind(&goal.title)
        .bind(goal.target_date)
        .fetch_one(self.get_pool())
        .await?;

        Ok(goal)
    }

    async fn update_goal(&self, id: i32, patch: GoalPatch) -> StoreResult<Option<Goal>> {
        let current = sqlx::query_as::<_, Goal>(
            "SELECT id, client_id, title, target_date, achieved FROM goals WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.get_pool())
        .await?;
        let Some(mut goal) = current else {
            return Ok(None);
        };
        patch.apply(&mut goal);

        let goal = sqlx::query_as::<_, Goal>(
            r#"
            UPDATE goals
            SET title = $1, target_date = $2, achieved = $3
            WHERE id = $4
            RETURNING id, client_id, title, target_date, achieved
            "#,
        )
        .bind(&goal.title)
        .bind(goal.target_date)
        .bind(goal.achieved)
        .bind(id)
        .fetch_optional(self.get_pool())
        .await?;

        Ok(goal)
    }

    async fn delete_goal(&self, id: i32) -> StoreResult<bool> {
        self.exec_delete(Collection::Goals, id).await
    }

    // Calendar operations
    async fn list_calendar_events(&self, client_id: Option<i32>) -> StoreResult<Vec<CalendarEvent>> {
        let events = sqlx::query_as::<_, CalendarEvent>(
            r#"
            SELECT id, client_id, title, starts_at, ends_at
            FROM calendar_events
            WHERE ($1::int IS NULL OR client_id = $1)
            ORDER BY starts_at ASC, id ASC
            "#,
        )
        .bind(client_id)
        .fetch_all(self.get_pool())
        .await?;

        Ok(events)
    }

    async fn create_calendar_event(&self, event: &NewCalendarEvent) -> StoreResult<CalendarEvent> {
        let event = sqlx::query_as::<_, CalendarEvent>(
            r#"
            INSERT INTO calendar_events (client_id, title, starts_at, ends_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, client_id, title, starts_at, ends_at
            "#,
        )
        .bind(event.client_id)
        .bind(&event.title)
        .bind(event.starts_at)
        .bind(event.ends_at)
        .fetch_one(self.get_pool())
        .await?;

        Ok(event)
    }

    async fn delete_calendar_event(&self, id: i32) -> StoreResult<bool> {
        self.exec_delete(Collection::CalendarEvents, id).await
    }
}
