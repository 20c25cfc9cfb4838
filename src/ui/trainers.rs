use anyhow::Result;
use crossterm::event::{self, Event, KeyCode};
use tui::{
    Frame,
    backend::Backend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Span, Spans},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
};

use crate::models::Trainer;
use crate::ui::components::{first_selected, select_next, select_previous};

pub struct TrainersState {
    trainers: Vec<Trainer>,
    list_state: ListState,
}

impl TrainersState {
    pub fn new(trainers: Vec<Trainer>) -> Self {
        let list_state = first_selected(trainers.len());
        Self { trainers, list_state }
    }

    pub fn next(&mut self) {
        select_next(&mut self.list_state, self.trainers.len());
    }

    pub fn previous(&mut self) {
        select_previous(&mut self.list_state, self.trainers.len());
    }

    pub fn selected_trainer(&self) -> Option<&Trainer> {
        self.list_state.selected().and_then(|i| self.trainers.get(i))
    }
}

pub enum TrainerAction {
    Exit,
    SelectTrainer(i32),
}

pub fn render_trainers<B: Backend>(frame: &mut Frame<B>, state: &mut TrainersState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(3)].as_ref())
        .split(frame.size());

    let items: Vec<ListItem> = state
        .trainers
        .iter()
        .map(|trainer| {
            ListItem::new(Spans::from(vec![
                Span::raw(&trainer.name),
                Span::styled(format!("  <{}>", trainer.email), Style::default().fg(Color::Gray)),
            ]))
        })
        .collect();

    let title = if state.trainers.is_empty() {
        "Trainers (none yet, create one through the API)"
    } else {
        "Trainers"
    };
    let list = List::new(items)
        .block(Block::default().title(title).borders(Borders::ALL))
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        );
    frame.render_stateful_widget(list, chunks[0], &mut state.list_state);

    let buttons = Paragraph::new("<Enter> View Clients | <Q> Quit")
        .block(Block::default().borders(Borders::TOP))
        .style(Style::default().fg(Color::White));
    frame.render_widget(buttons, chunks[1]);
}

pub fn handle_input(state: &mut TrainersState) -> Result<Option<TrainerAction>> {
    if let Event::Key(key) = event::read()? {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return Ok(Some(TrainerAction::Exit)),
            KeyCode::Down => state.next(),
            KeyCode::Up => state.previous(),
            KeyCode::Enter => {
                if let Some(trainer) = state.selected_trainer() {
                    return Ok(Some(TrainerAction::SelectTrainer(trainer.id)));
                }
            }
            _ => {}
        }
    }
    Ok(None)
}
