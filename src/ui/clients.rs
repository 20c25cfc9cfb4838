use anyhow::Result;
use crossterm::event::{self, Event, KeyCode};
use tui::{
    Frame,
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Span, Spans},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
};

use crate::db::{CascadeError, CascadeReport};
use crate::models::Client;
use crate::ui::components::{centered_rect, first_selected, select_next, select_previous};

/// Outcome of the last action, shown under the client list.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusLine {
    Info(String),
    Error(String),
}

impl StatusLine {
    pub fn from_cascade(result: &Result<CascadeReport, CascadeError>) -> Self {
        match result {
            Ok(report) => StatusLine::Info(cascade_summary(report)),
            Err(err) => StatusLine::Error(cascade_failure(err)),
        }
    }

    fn styled(&self) -> Span<'_> {
        match self {
            StatusLine::Info(text) => Span::styled(text.as_str(), Style::default().fg(Color::Green)),
            StatusLine::Error(text) => Span::styled(text.as_str(), Style::default().fg(Color::Red)),
        }
    }
}

pub fn cascade_summary(report: &CascadeReport) -> String {
    if !report.client_deleted {
        return match report.dependents() {
            0 => format!("Client {} was already gone, nothing deleted", report.client_id),
            n => format!("Client {} was already gone, removed {n} orphaned records", report.client_id),
        };
    }
    format!(
        "Deleted client {} with {} sessions, {} measurements, {} goals and {} calendar events",
        report.client_id, report.sessions, report.measurements, report.goals, report.calendar_events
    )
}

pub fn cascade_failure(err: &CascadeError) -> String {
    let stage = err
        .collection
        .map_or_else(|| "the transaction".to_string(), |c| c.to_string());
    let outcome = if err.rolled_back {
        "nothing was deleted".to_string()
    } else {
        format!("{} records were already deleted", err.completed.total())
    };
    format!(
        "Deleting client {} failed at {stage} ({outcome}): {}",
        err.client_id, err.source
    )
}

pub struct ClientsState {
    trainer_id: i32,
    clients: Vec<Client>,
    list_state: ListState,
    show_delete_confirmation: bool,
    status: Option<StatusLine>,
}

impl ClientsState {
    pub fn new(trainer_id: i32, clients: Vec<Client>) -> Self {
        let list_state = first_selected(clients.len());
        Self {
            trainer_id,
            clients,
            list_state,
            show_delete_confirmation: false,
            status: None,
        }
    }

    pub fn with_status(mut self, status: StatusLine) -> Self {
        self.status = Some(status);
        self
    }

    pub fn next(&mut self) {
        select_next(&mut self.list_state, self.clients.len());
    }

    pub fn previous(&mut self) {
        select_previous(&mut self.list_state, self.clients.len());
    }

    pub fn toggle_delete_confirmation(&mut self) {
        self.show_delete_confirmation = !self.show_delete_confirmation;
    }

    pub fn selected_client(&self) -> Option<&Client> {
        self.list_state.selected().and_then(|i| self.clients.get(i))
    }

    pub fn selected_client_id(&self) -> Option<i32> {
        self.selected_client().map(|c| c.id)
    }

    pub fn trainer_id(&self) -> i32 {
        self.trainer_id
    }
}

pub enum ClientAction {
    Back,
    DeleteClient(i32),
    ScheduleSessions(i32),
}

pub fn render_clients<B: Backend>(frame: &mut Frame<B>, state: &mut ClientsState) {
    let size = frame.size();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Min(1),
                Constraint::Length(2),
                Constraint::Length(3),
            ]
            .as_ref(),
        )
        .split(size);

    let items: Vec<ListItem> = state
        .clients
        .iter()
        .map(|client| {
            let contact = client.email.as_deref().or(client.phone.as_deref()).unwrap_or("");
            ListItem::new(Spans::from(vec![
                Span::raw(&client.name),
                Span::styled(format!("  {contact}"), Style::default().fg(Color::Gray)),
            ]))
        })
        .collect();

    let clients_list = List::new(items)
        .block(Block::default().title("Clients").borders(Borders::ALL))
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        );
    frame.render_stateful_widget(clients_list, chunks[0], &mut state.list_state);

    let status = state
        .status
        .as_ref()
        .map_or_else(|| Spans::from(""), |status| Spans::from(vec![status.styled()]));
    frame.render_widget(Paragraph::new(status).wrap(Wrap { trim: true }), chunks[1]);

    let buttons_text = if state.selected_client().is_some() {
        "<S> Schedule Sessions | <D> Delete Client | <Esc> Back"
    } else {
        "<Esc> Back"
    };
    let buttons = Paragraph::new(buttons_text)
        .block(Block::default().borders(Borders::TOP))
        .style(Style::default().fg(Color::White));
    frame.render_widget(buttons, chunks[2]);

    if state.show_delete_confirmation {
        let name = state.selected_client().map_or("", |c| c.name.as_str());
        render_delete_confirmation(frame, size, name);
    }
}

fn render_delete_confirmation<B: Backend>(frame: &mut Frame<B>, size: Rect, name: &str) {
    let popup_area = centered_rect(60, 25, size);

    let popup = Paragraph::new(vec![
        Spans::from(""),
        Spans::from(format!("Delete {name}?")),
        Spans::from(""),
        Spans::from("Their sessions, measurements, goals and calendar events"),
        Spans::from("will be deleted as well."),
        Spans::from(""),
        Spans::from("<Y> Yes  <N> No"),
    ])
    .block(Block::default().title("Confirm Delete").borders(Borders::ALL))
    .style(Style::default().fg(Color::White).bg(Color::Black));

    frame.render_widget(popup, popup_area);
}

pub fn handle_input(state: &mut ClientsState) -> Result<Option<ClientAction>> {
    if let Event::Key(key) = event::read()? {
        return Ok(apply_key(state, key.code));
    }
    Ok(None)
}

fn apply_key(state: &mut ClientsState, key: KeyCode) -> Option<ClientAction> {
    if state.show_delete_confirmation {
        match key {
            KeyCode::Char('y') => {
                state.toggle_delete_confirmation();
                return state.selected_client_id().map(ClientAction::DeleteClient);
            }
            KeyCode::Char('n') | KeyCode::Char('q') | KeyCode::Esc => state.toggle_delete_confirmation(),
            _ => {}
        }
        return None;
    }

    match key {
        KeyCode::Char('q') | KeyCode::Esc => return Some(ClientAction::Back),
        KeyCode::Char('d') if state.selected_client().is_some() => state.toggle_delete_confirmation(),
        KeyCode::Char('s') | KeyCode::Enter => {
            return state.selected_client_id().map(ClientAction::ScheduleSessions);
        }
        KeyCode::Down => state.next(),
        KeyCode::Up => state.previous(),
        _ => {}
    }
    None
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::db::{Collection, StoreError};

    fn client(id: i32, name: &str) -> Client {
        Client {
            id,
            trainer_id: 1,
            name: name.to_string(),
            email: None,
            phone: None,
            notes: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn delete_needs_confirmation() {
        let mut state = ClientsState::new(1, vec![client(7, "Ada"), client(8, "Grace")]);
        state.next();

        assert!(apply_key(&mut state, KeyCode::Char('d')).is_none());
        assert!(state.show_delete_confirmation);
        match apply_key(&mut state, KeyCode::Char('y')) {
            Some(ClientAction::DeleteClient(id)) => assert_eq!(id, 8),
            _ => panic!("expected a delete action"),
        }
        assert!(!state.show_delete_confirmation);
    }

    #[test]
    fn declining_keeps_the_client() {
        let mut state = ClientsState::new(1, vec![client(7, "Ada")]);
        apply_key(&mut state, KeyCode::Char('d'));
        assert!(apply_key(&mut state, KeyCode::Char('n')).is_none());
        assert!(!state.show_delete_confirmation);
    }

    #[test]
    fn delete_ignored_on_empty_list() {
        let mut state = ClientsState::new(1, Vec::new());
        assert!(apply_key(&mut state, KeyCode::Char('d')).is_none());
        assert!(!state.show_delete_confirmation);
        assert!(apply_key(&mut state, KeyCode::Char('s')).is_none());
    }

    #[test]
    fn summary_lists_every_collection() {
        let report = CascadeReport {
            client_id: 3,
            sessions: 4,
            measurements: 2,
            goals: 1,
            calendar_events: 0,
            client_deleted: true,
        };
        assert_eq!(
            cascade_summary(&report),
            "Deleted client 3 with 4 sessions, 2 measurements, 1 goals and 0 calendar events"
        );
        assert_eq!(
            cascade_summary(&CascadeReport::new(9)),
            "Client 9 was already gone, nothing deleted"
        );
    }

    #[test]
    fn failure_names_collection_and_partial_work() {
        let mut completed = CascadeReport::new(3);
        completed.sessions = 2;
        let err = CascadeError {
            client_id: 3,
            collection: Some(Collection::Goals),
            completed,
            rolled_back: false,
            source: StoreError::Backend("disk full".to_string()),
        };
        let status = StatusLine::from_cascade(&Err(err));
        assert_eq!(
            status,
            StatusLine::Error(
                "Deleting client 3 failed at goals (2 records were already deleted): store unavailable: disk full"
                    .to_string()
            )
        );
    }
}
