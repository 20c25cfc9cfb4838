use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;

use super::cascade::{self, CascadeError, CascadeReport};
use super::{Collection, DocumentStore, Repository, StoreError, StoreResult};
use crate::models::{
    CalendarEvent, Client, ClientPatch, Goal, GoalPatch, Measurement, NewCalendarEvent, NewClient,
    NewGoal, NewMeasurement, NewSession, NewTrainer, NewWorkoutTemplate, Session, SessionFilter,
    SessionPatch, Trainer, WorkoutTemplate, WorkoutTemplatePatch,
};

#[derive(Default)]
struct Tables {
    next_id: i32,
    trainers: BTreeMap<i32, Trainer>,
    clients: BTreeMap<i32, Client>,
    templates: BTreeMap<i32, WorkoutTemplate>,
    sessions: BTreeMap<i32, Session>,
    measurements: BTreeMap<i32, Measurement>,
    goals: BTreeMap<i32, Goal>,
    calendar_events: BTreeMap<i32, CalendarEvent>,
    #[cfg(test)]
    failing_deletes: Option<Collection>,
}

impl Tables {
    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }

    #[cfg(test)]
    fn check_delete(&self, collection: Collection) -> StoreResult<()> {
        if self.failing_deletes == Some(collection) {
            return Err(StoreError::Backend(format!("delete from {collection} refused")));
        }
        Ok(())
    }

    #[cfg(not(test))]
    fn check_delete(&self, _collection: Collection) -> StoreResult<()> {
        Ok(())
    }

    fn session_from(&mut self, session: &NewSession) -> Session {
        Session {
            id: self.next_id(),
            client_id: session.client_id,
            workout_template_id: session.workout_template_id,
            scheduled_at: session.scheduled_at,
            duration_minutes: session.duration_minutes,
            status: session.status,
            note: session.note.clone(),
        }
    }
}

/// Process-local store. Ids are shared across collections and never reused.
///
/// There are no transactions: a failed cascade keeps whatever it had
/// already deleted.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every delete in `collection` fail until cleared with `None`.
    #[cfg(test)]
    pub fn fail_deletes_in(&self, collection: Option<Collection>) {
        if let Ok(mut tables) = self.tables.lock() {
            tables.failing_deletes = collection;
        }
    }

    fn tables(&self) -> StoreResult<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".to_string()))
    }
}

fn sorted<T: Clone>(
    rows: &BTreeMap<i32, T>,
    keep: impl Fn(&T) -> bool,
) -> Vec<T> {
    rows.values().filter(|&row| keep(row)).cloned().collect()
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find_by_client(&self, collection: Collection, client_id: i32) -> StoreResult<Vec<i32>> {
        let tables = self.tables()?;
        let ids = match collection {
            Collection::Clients => tables
                .clients
                .contains_key(&client_id)
                .then_some(client_id)
                .into_iter()
                .collect(),
            Collection::Sessions => tables
                .sessions
                .values()
                .filter(|s| s.client_id == Some(client_id))
                .map(|s| s.id)
                .collect(),
            Collection::Measurements => tables
                .measurements
                .values()
                .filter(|m| m.client_id == client_id)
                .map(|m| m.id)
                .collect(),
            Collection::Goals => tables
                .goals
                .values()
                .filter(|g| g.client_id == client_id)
                .map(|g| g.id)
                .collect(),
            Collection::CalendarEvents => tables
                .calendar_events
                .values()
                .filter(|e| e.client_id == Some(client_id))
                .map(|e| e.id)
                .collect(),
        };
        Ok(ids)
    }

    async fn delete(&self, collection: Collection, id: i32) -> StoreResult<bool> {
        let mut tables = self.tables()?;
        tables.check_delete(collection)?;
        let removed = match collection {
            Collection::Clients => tables.clients.remove(&id).is_some(),
            Collection::Sessions => tables.sessions.remove(&id).is_some(),
            Collection::Measurements => tables.measurements.remove(&id).is_some(),
            Collection::Goals => tables.goals.remove(&id).is_some(),
            Collection::CalendarEvents => tables.calendar_events.remove(&id).is_some(),
        };
        Ok(removed)
    }
}

#[async_trait]
impl Repository for MemoryStore {
    async fn list_trainers(&self) -> StoreResult<Vec<Trainer>> {
        let tables = self.tables()?;
        let mut trainers = sorted(&tables.trainers, |_| true);
        trainers.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(trainers)
    }

    async fn get_trainer(&self, id: i32) -> StoreResult<Option<Trainer>> {
        Ok(self.tables()?.trainers.get(&id).cloned())
    }

    async fn create_trainer(&self, trainer: &NewTrainer) -> StoreResult<Trainer> {
        let mut tables = self.tables()?;
        let trainer = Trainer {
            id: tables.next_id(),
            name: trainer.name.clone(),
            email: trainer.email.clone(),
            phone: trainer.phone.clone(),
        };
        tables.trainers.insert(trainer.id, trainer.clone());
        Ok(trainer)
    }

    async fn list_clients(&self, trainer_id: i32) -> StoreResult<Vec<Client>> {
        let tables = self.tables()?;
        let mut clients = sorted(&tables.clients, |c| c.trainer_id == trainer_id);
        clients.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(clients)
    }

    async fn get_client(&self, id: i32) -> StoreResult<Option<Client>> {
        Ok(self.tables()?.clients.get(&id).cloned())
    }

    async fn create_client(&self, client: &NewClient) -> StoreResult<Client> {
        let mut tables = self.tables()?;
        let client = Client {
            id: tables.next_id(),
            trainer_id: client.trainer_id,
            name: client.name.clone(),
            email: client.email.clone(),
            phone: client.phone.clone(),
            notes: client.notes.clone(),
            created_at: Utc::now(),
        };
        tables.clients.insert(client.id, client.clone());
        Ok(client)
    }

    async fn update_client(&self, id: i32, patch: ClientPatch) -> StoreResult<Option<Client>> {
        let mut tables = self.tables()?;
        Ok(tables.clients.get_mut(&id).map(|client| {
            patch.apply(client);
            client.clone()
        }))
    }

    async fn delete_client(&self, id: i32) -> Result<CascadeReport, CascadeError> {
        cascade::delete_client(self, id).await.inspect_err(cascade::log_failure)
    }

    async fn list_templates(&self, trainer_id: i32) -> StoreResult<Vec<WorkoutTemplate>> {
        let tables = self.tables()?;
        let mut templates = sorted(&tables.templates, |t| t.trainer_id == trainer_id);
        templates.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(templates)
    }

    async fn get_template(&self, id: i32) -> StoreResult<Option<WorkoutTemplate>> {
        Ok(self.tables()?.templates.get(&id).cloned())
    }

    async fn create_template(&self, template: &NewWorkoutTemplate) -> StoreResult<WorkoutTemplate> {
        let mut tables = self.tables()?;
        let template = WorkoutTemplate {
            id: tables.next_id(),
            trainer_id: template.trainer_id,
            name: template.name.clone(),
            description: template.description.clone(),
            duration_minutes: template.duration_minutes,
        };
        tables.templates.insert(template.id, template.clone());
        Ok(template)
    }

    async fn update_template(
        &self,
        id: i32,
        patch: WorkoutTemplatePatch,
    ) -> StoreResult<Option<WorkoutTemplate>> {
        let mut tables = self.tables()?;
        Ok(tables.templates.get_mut(&id).map(|template| {
            patch.apply(template);
            template.clone()
        }))
    }

    async fn delete_template(&self, id: i32) -> StoreResult<bool> {
        Ok(self.tables()?.templates.remove(&id).is_some())
    }

    async fn list_sessions(&self, filter: &SessionFilter) -> StoreResult<Vec<Session>> {
        let tables = self.tables()?;
        let mut sessions = sorted(&tables.sessions, |s| filter.matches(s));
        sessions.sort_by_key(|s| (s.scheduled_at, s.id));
        Ok(sessions)
    }

    async fn get_session(&self, id: i32) -> StoreResult<Option<Session>> {
        Ok(self.tables()?.sessions.get(&id).cloned())
    }

    async fn create_session(&self, session: &NewSession) -> StoreResult<Session> {
        let mut tables = self.tables()?;
        let session = tables.session_from(session);
        tables.sessions.insert(session.id, session.clone());
        Ok(session)
    }

    async fn create_sessions(&self, sessions: &[NewSession]) -> StoreResult<usize> {
        // one lock for the whole batch, so readers never see half of it
        let mut tables = self.tables()?;
        for session in sessions {
            let session = tables.session_from(session);
            tables.sessions.insert(session.id, session);
        }
        Ok(sessions.len())
    }

    async fn update_session(&self, id: i32, patch: SessionPatch) -> StoreResult<Option<Session>> {
        let mut tables = self.tables()?;
        Ok(tables.sessions.get_mut(&id).map(|session| {
            patch.apply(session);
            session.clone()
        }))
    }

    async fn delete_session(&self, id: i32) -> StoreResult<bool> {
        self.delete(Collection::Sessions, id).await
    }

    async fn list_measurements(&self, client_id: i32) -> StoreResult<Vec<Measurement>> {
        let tables = self.tables()?;
        let mut measurements = sorted(&tables.measurements, |m| m.client_id == client_id);
        measurements.sort_by_key(|m| (m.measured_on, m.id));
        Ok(measurements)
    }

    async fn create_measurement(&self, measurement: &NewMeasurement) -> StoreResult<Measurement> {
        let mut tables = self.tables()?;
        let measurement = Measurement {
            id: tables.next_id(),
            client_id: measurement.client_id,
            measured_on: measurement.measured_on,
            weight_kg: measurement.weight_kg,
            body_fat_pct: measurement.body_fat_pct,
            note: measurement.note.clone(),
        };
        tables.measurements.insert(measurement.id, measurement.clone());
        Ok(measurement)
    }

    async fn delete_measurement(&self, id: i32) -> StoreResult<bool> {
        self.delete(Collection::Measurements, id).await
    }

    async fn list_goals(&self, client_id: i32) -> StoreResult<Vec<Goal>> {
        let tables = self.tables()?;
        Ok(sorted(&tables.goals, |g| g.client_id == client_id))
    }

    async fn create_goal(&self, goal: &NewGoal) -> StoreResult<Goal> {
        let mut tables = self.tables()?;
        let goal = Goal {
            id: tables.next_id(),
            client_id: goal.client_id,
            title: goal.title.clone(),
            target_date: goal.target_date,
            achieved: false,
        };
        tables.goals.insert(goal.id, goal.clone());
        Ok(goal)
    }

    async fn update_goal(&self, id: i32, patch: GoalPatch) -> StoreResult<Option<Goal>> {
        let mut tables = self.tables()?;
        Ok(tables.goals.get_mut(&id).map(|goal| {
            patch.apply(goal);
            goal.clone()
        }))
    }

    async fn delete_goal(&self, id: i32) -> StoreResult<bool> {
        self.delete(Collection::Goals, id).await
    }

    async fn list_calendar_events(&self, client_id: Option<i32>) -> StoreResult<Vec<CalendarEvent>> {
        let tables = self.tables()?;
        let mut events = sorted(&tables.calendar_events, |e| {
            client_id.is_none() || e.client_id == client_id
        });
        events.sort_by_key(|e| (e.starts_at, e.id));
        Ok(events)
    }

    async fn create_calendar_event(&self, event: &NewCalendarEvent) -> StoreResult<CalendarEvent> {
        let mut tables = self.tables()?;
        let event = CalendarEvent {
            id: tables.next_id(),
            client_id: event.client_id,
            title: event.title.clone(),
            starts_at: event.starts_at,
            ends_at: event.ends_at,
        };
        tables.calendar_events.insert(event.id, event.clone());
        Ok(event)
    }

    async fn delete_calendar_event(&self, id: i32) -> StoreResult<bool> {
        self.delete(Collection::CalendarEvents, id).await
    }
}
