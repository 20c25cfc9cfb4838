use anyhow::Result;
use chrono::{Datelike, NaiveDate};
use crossterm::event::{self, Event, KeyCode};
use tui::{
    Frame,
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Span, Spans},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
};

use crate::models::NewSession;
use crate::schedule::{Frequency, RecurrenceRule, RecurringSessionRequest, ScheduleError};
use crate::ui::components::date_input::DateInputState;

const WEEKDAYS: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

pub enum ScheduleWizardAction {
    Cancel,
    Save(Vec<NewSession>),
}

#[derive(Clone, PartialEq, Copy)]
pub enum ScheduleField {
    Frequency,
    Anchor,
    StartDate,
    EndDate,
    MaxSessions,
    Time,
    Note,
}

impl ScheduleField {
    const ALL: [ScheduleField; 7] = [
        ScheduleField::Frequency,
        ScheduleField::Anchor,
        ScheduleField::StartDate,
        ScheduleField::EndDate,
        ScheduleField::MaxSessions,
        ScheduleField::Time,
        ScheduleField::Note,
    ];

    fn label(self) -> &'static str {
        match self {
            ScheduleField::Frequency => "Frequency",
            ScheduleField::Anchor => "Day",
            ScheduleField::StartDate => "Start Date",
            ScheduleField::EndDate => "End Date",
            ScheduleField::MaxSessions => "Max Sessions",
            ScheduleField::Time => "Time",
            ScheduleField::Note => "Note",
        }
    }
}

pub struct ScheduleWizardState {
    client_id: i32,
    client_name: String,
    pub frequency: Frequency,
    /// 1 = Monday ... 7 = Sunday
    pub day_of_week: u32,
    pub day_of_month: u32,
    pub start_date_state: DateInputState,
    pub end_date_state: DateInputState,
    pub max_sessions: String,
    pub time: String,
    pub note: String,
    pub current_field: ScheduleField,
    pub editing: bool,
}

impl ScheduleWizardState {
    /// Weekly on `today`'s weekday, starting `today`.
    pub fn new(client_id: i32, client_name: String, today: NaiveDate) -> Self {
        Self {
            client_id,
            client_name,
            frequency: Frequency::Weekly,
            day_of_week: today.weekday().number_from_monday(),
            day_of_month: today.day(),
            start_date_state: DateInputState::new(today),
            end_date_state: DateInputState::optional(today),
            max_sessions: String::new(),
            time: "09:00".to_string(),
            note: String::new(),
            current_field: ScheduleField::Frequency,
            editing: false,
        }
    }

    pub fn client_id(&self) -> i32 {
        self.client_id
    }

    pub fn rule(&self) -> RecurrenceRule {
        let (day_of_week, day_of_month) = match self.frequency {
            Frequency::Weekly | Frequency::Biweekly => (Some(self.day_of_week), None),
            Frequency::Monthly => (None, Some(self.day_of_month)),
        };
        RecurrenceRule {
            frequency: self.frequency,
            start_date: self.start_date_state.date(),
            end_date: self.end_date_state.date(),
            // blank means the frequency's default cap
            max_sessions: self.max_sessions.parse().ok(),
            day_of_week,
            day_of_month,
        }
    }

    pub fn request(&self) -> RecurringSessionRequest {
        let note = self.note.trim();
        RecurringSessionRequest {
            client_id: self.client_id,
            rule: self.rule(),
            time: Some(self.time.clone()),
            note: (!note.is_empty()).then(|| note.to_string()),
            duration: None,
            workout_template_id: None,
        }
    }

    /// Sessions the current form would create.
    pub fn sessions(&self) -> Result<Vec<NewSession>, ScheduleError> {
        self.request().to_sessions()
    }

    pub fn toggle_editing(&mut self) {
        self.editing = !self.editing;
        if self.editing {
            match self.current_field {
                ScheduleField::StartDate => self.start_date_state.toggle_editing(),
                ScheduleField::EndDate => self.end_date_state.toggle_editing(),
                _ => {}
            }
        } else {
            self.start_date_state.stop_editing();
            self.end_date_state.stop_editing();
        }
    }

    fn field_index(&self) -> usize {
        ScheduleField::ALL
            .iter()
            .position(|field| *field == self.current_field)
            .unwrap_or(0)
    }

    pub fn next_field(&mut self) {
        let i = (self.field_index() + 1) % ScheduleField::ALL.len();
        self.current_field = ScheduleField::ALL[i];
    }

    pub fn previous_field(&mut self) {
        let len = ScheduleField::ALL.len();
        let i = (self.field_index() + len - 1) % len;
        self.current_field = ScheduleField::ALL[i];
    }

    fn cycle_frequency(&mut self, forward: bool) {
        let all = Frequency::all();
        let i = all.iter().position(|f| *f == self.frequency).unwrap_or(0);
        let i = if forward { (i + 1) % all.len() } else { (i + all.len() - 1) % all.len() };
        self.frequency = all[i];
    }

    fn step_anchor(&mut self, forward: bool) {
        let (value, max) = match self.frequency {
            Frequency::Weekly | Frequency::Biweekly => (&mut self.day_of_week, 7),
            Frequency::Monthly => (&mut self.day_of_month, 31),
        };
        *value = match (forward, *value) {
            (true, v) if v >= max => 1,
            (true, v) => v + 1,
            (false, v) if v <= 1 => max,
            (false, v) => v - 1,
        };
    }

    pub fn edit_current_field(&mut self, key: KeyCode) {
        if !self.editing {
            return;
        }

        match self.current_field {
            ScheduleField::Frequency => match key {
                KeyCode::Right | KeyCode::Char(' ') => self.cycle_frequency(true),
                KeyCode::Left => self.cycle_frequency(false),
                _ => {}
            },
            ScheduleField::Anchor => match key {
                KeyCode::Right | KeyCode::Char(' ') => self.step_anchor(true),
                KeyCode::Left => self.step_anchor(false),
                _ => {}
            },
            ScheduleField::StartDate => self.start_date_state.handle_input(key),
            ScheduleField::EndDate => self.end_date_state.handle_input(key),
            ScheduleField::MaxSessions => match key {
                KeyCode::Char(c) if c.is_ascii_digit() && self.max_sessions.len() < 3 => {
                    self.max_sessions.push(c);
                }
                KeyCode::Backspace => {
                    self.max_sessions.pop();
                }
                _ => {}
            },
            ScheduleField::Time => match key {
                KeyCode::Char(c) if c.is_ascii_digit() || c == ':' => self.time.push(c),
                KeyCode::Backspace => {
                    self.time.pop();
                }
                _ => {}
            },
            ScheduleField::Note => match key {
                KeyCode::Char(c) => self.note.push(c),
                KeyCode::Backspace => {
                    self.note.pop();
                }
                _ => {}
            },
        }
    }

    fn anchor_display(&self) -> String {
        match self.frequency {
            Frequency::Weekly | Frequency::Biweekly => WEEKDAYS
                .get((self.day_of_week as usize).saturating_sub(1))
                .copied()
                .unwrap_or("?")
                .to_string(),
            Frequency::Monthly => format!("Day {} of the month", self.day_of_month),
        }
    }

    fn field_value(&self, field: ScheduleField) -> String {
        let editing = self.editing && self.current_field == field;
        let text = |value: &str| format!("{value}{}", if editing { "|" } else { "" });
        match field {
            ScheduleField::Frequency => self.frequency.to_string(),
            ScheduleField::Anchor => self.anchor_display(),
            ScheduleField::StartDate => self.start_date_state.get_display_string(),
            ScheduleField::EndDate => self.end_date_state.get_display_string(),
            ScheduleField::MaxSessions if self.max_sessions.is_empty() && !editing => {
                format!("default ({})", self.frequency.default_max_sessions())
            }
            ScheduleField::MaxSessions => text(&self.max_sessions),
            ScheduleField::Time => text(&self.time),
            ScheduleField::Note => text(&self.note),
        }
    }
}

pub fn render_schedule_wizard<B: Backend>(f: &mut Frame<B>, state: &mut ScheduleWizardState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(2)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Min(10),
                Constraint::Length(3),
            ]
            .as_ref(),
        )
        .split(f.size());

    let title = Paragraph::new(format!("Schedule Sessions for {}", state.client_name))
        .style(Style::default().fg(Color::Cyan))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(title, chunks[0]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)].as_ref())
        .split(chunks[1]);
    render_form(f, state, body[0]);
    render_preview(f, state, body[1]);

    let help_text = if state.editing {
        match state.current_field {
            ScheduleField::Frequency | ScheduleField::Anchor => {
                "Left/Right - Change | Enter - Done | Esc - Done"
            }
            ScheduleField::StartDate => {
                "Type digits | Left/Right - Switch date part | Enter - Done"
            }
            ScheduleField::EndDate => {
                "Type digits | Left/Right - Switch date part | Del - Clear | Enter - Done"
            }
            _ => "Enter - Done | Esc - Done",
        }
    } else {
        "Enter - Edit field | Up/Down - Navigate fields | S - Create sessions | Esc - Cancel"
    };
    let help = Paragraph::new(help_text)
        .style(Style::default().fg(Color::Gray))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(help, chunks[2]);
}

fn render_form<B: Backend>(f: &mut Frame<B>, state: &ScheduleWizardState, area: Rect) {
    let items: Vec<ListItem> = ScheduleField::ALL
        .iter()
        .map(|&field| {
            let selected = field == state.current_field;
            let label_style = if selected {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default()
            };
            let value_style = if selected && state.editing {
                Style::default().add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            ListItem::new(Spans::from(vec![
                Span::styled(format!("{}: ", field.label()), label_style),
                Span::styled(state.field_value(field), value_style),
            ]))
        })
        .collect();

    let form = List::new(items).block(Block::default().borders(Borders::ALL).title("Series"));
    f.render_widget(form, area);
}

fn render_preview<B: Backend>(f: &mut Frame<B>, state: &ScheduleWizardState, area: Rect) {
    match state.sessions() {
        Ok(sessions) => {
            let items: Vec<ListItem> = sessions
                .iter()
                .map(|s| ListItem::new(s.scheduled_at.format("%a %Y-%m-%d %H:%M").to_string()))
                .collect();
            let title = format!("Preview ({} sessions)", items.len());
            let list = List::new(items).block(Block::default().borders(Borders::ALL).title(title));
            f.render_widget(list, area);
        }
        Err(err) => {
            let message = Paragraph::new(err.to_string())
                .style(Style::default().fg(Color::Red))
                .wrap(Wrap { trim: true })
                .block(Block::default().borders(Borders::ALL).title("Preview"));
            f.render_widget(message, area);
        }
    }
}

pub fn handle_input(state: &mut ScheduleWizardState) -> Result<Option<ScheduleWizardAction>> {
    if let Event::Key(key) = event::read()? {
        return Ok(apply_key(state, key.code));
    }
    Ok(None)
}

fn apply_key(state: &mut ScheduleWizardState, key: KeyCode) -> Option<ScheduleWizardAction> {
    match key {
        KeyCode::Esc if state.editing => state.toggle_editing(),
        KeyCode::Esc => return Some(ScheduleWizardAction::Cancel),
        KeyCode::Enter => state.toggle_editing(),
        KeyCode::Up if !state.editing => state.previous_field(),
        KeyCode::Down if !state.editing => state.next_field(),
        KeyCode::Char('s') if !state.editing => {
            if let Ok(sessions) = state.sessions() {
                if !sessions.is_empty() {
                    return Some(ScheduleWizardAction::Save(sessions));
                }
            }
        }
        _ if state.editing => state.edit_current_field(key),
        _ => {}
    }
    None
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDateTime;

    use super::*;

    // a Wednesday
    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 10).unwrap()
    }

    fn wizard() -> ScheduleWizardState {
        ScheduleWizardState::new(5, "Ada".to_string(), today())
    }

    fn at(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    fn press(state: &mut ScheduleWizardState, keys: &[KeyCode]) -> Option<ScheduleWizardAction> {
        keys.iter().fold(None, |_, key| apply_key(state, *key))
    }

    fn go_to(state: &mut ScheduleWizardState, field: ScheduleField) {
        while state.current_field != field {
            state.next_field();
        }
    }

    #[test]
    fn defaults_to_weekly_on_todays_weekday() {
        let sessions = wizard().sessions().unwrap();

        assert_eq!(sessions.len(), 52);
        assert_eq!(sessions[0].scheduled_at, at("2024-01-10 09:00"));
        assert_eq!(sessions[1].scheduled_at, at("2024-01-17 09:00"));
        assert!(sessions.iter().all(|s| s.client_id == Some(5)));
    }

    #[test]
    fn switching_to_monthly_uses_day_of_month() {
        let mut state = wizard();
        press(&mut state, &[KeyCode::Enter, KeyCode::Right, KeyCode::Right, KeyCode::Enter]);
        assert_eq!(state.frequency, Frequency::Monthly);

        let rule = state.rule();
        assert_eq!(rule.day_of_month, Some(10));
        assert_eq!(rule.day_of_week, None);
        assert_eq!(state.sessions().unwrap().len(), 12);
    }

    #[test]
    fn anchor_wraps_around_the_week() {
        let mut state = wizard();
        state.day_of_week = 7;
        go_to(&mut state, ScheduleField::Anchor);
        press(&mut state, &[KeyCode::Enter, KeyCode::Right, KeyCode::Enter]);

        assert_eq!(state.day_of_week, 1);
        assert_eq!(state.sessions().unwrap()[0].scheduled_at, at("2024-01-15 09:00"));
    }

    #[test]
    fn max_sessions_and_time_shape_the_series() {
        let mut state = wizard();
        go_to(&mut state, ScheduleField::MaxSessions);
        press(&mut state, &[KeyCode::Enter, KeyCode::Char('3'), KeyCode::Enter]);
        go_to(&mut state, ScheduleField::Time);
        state.time.clear();
        press(
            &mut state,
            &[
                KeyCode::Enter,
                KeyCode::Char('1'),
                KeyCode::Char('8'),
                KeyCode::Char(':'),
                KeyCode::Char('3'),
                KeyCode::Char('0'),
                KeyCode::Enter,
            ],
        );

        match press(&mut state, &[KeyCode::Char('s')]) {
            Some(ScheduleWizardAction::Save(sessions)) => {
                assert_eq!(sessions.len(), 3);
                assert_eq!(sessions[2].scheduled_at, at("2024-01-24 18:30"));
            }
            _ => panic!("expected save"),
        }
    }

    #[test]
    fn end_date_cuts_the_series() {
        let mut state = wizard();
        go_to(&mut state, ScheduleField::EndDate);
        press(&mut state, &[KeyCode::Enter]);
        for c in "20240131".chars() {
            apply_key(&mut state, KeyCode::Char(c));
        }
        press(&mut state, &[KeyCode::Enter]);

        assert_eq!(state.rule().end_date, NaiveDate::from_ymd_opt(2024, 1, 31));
        assert_eq!(state.sessions().unwrap().len(), 4);
    }

    #[test]
    fn invalid_time_blocks_save() {
        let mut state = wizard();
        state.time = "25:99".to_string();

        assert!(matches!(state.sessions(), Err(ScheduleError::InvalidTime(_))));
        assert!(press(&mut state, &[KeyCode::Char('s')]).is_none());
    }

    #[test]
    fn blank_note_is_dropped() {
        let mut state = wizard();
        state.note = "   ".to_string();
        assert_eq!(state.request().note, None);

        state.note = "Legs".to_string();
        assert_eq!(state.sessions().unwrap()[0].note.as_deref(), Some("Legs"));
    }

    #[test]
    fn escape_leaves_editing_before_cancelling() {
        let mut state = wizard();
        press(&mut state, &[KeyCode::Enter]);
        assert!(press(&mut state, &[KeyCode::Esc]).is_none());
        assert!(!state.editing);
        assert!(matches!(
            press(&mut state, &[KeyCode::Esc]),
            Some(ScheduleWizardAction::Cancel)
        ));
    }
}
