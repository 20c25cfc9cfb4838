use std::io;

use anyhow::Result;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen},
};
use tui::{
    Terminal,
    backend::{Backend, CrosstermBackend},
};

use crate::db::SharedRepository;
use crate::ui::{
    clients::{ClientAction, ClientsState, StatusLine, handle_input as handle_clients_input, render_clients},
    schedule_wizard::{
        ScheduleWizardAction, ScheduleWizardState, handle_input as handle_schedule_wizard_input,
        render_schedule_wizard,
    },
    trainers::{TrainerAction, TrainersState, handle_input as handle_trainers_input, render_trainers},
};

// Represents the current screen in the console
enum AppScreen {
    Trainers,
    Clients,
    ScheduleWizard(i32), // Contains trainer_id
}

struct AppState {
    repo: SharedRepository,
    screen: AppScreen,
    trainers_state: Option<TrainersState>,
    clients_state: Option<ClientsState>,
    schedule_wizard_state: Option<ScheduleWizardState>,
}

impl AppState {
    fn new(repo: SharedRepository) -> Self {
        Self {
            repo,
            screen: AppScreen::Trainers,
            trainers_state: None,
            clients_state: None,
            schedule_wizard_state: None,
        }
    }
}

/// Run the terminal console until the user quits.
pub async fn run(repo: SharedRepository) -> Result<()> {
    let mut app_state = AppState::new(repo);
    load_trainers_screen(&mut app_state).await?;

    terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &mut app_state).await;

    // Restore terminal
    terminal::disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

async fn run_app<B: Backend>(terminal: &mut Terminal<B>, app_state: &mut AppState) -> Result<()> {
    loop {
        terminal.draw(|f| match app_state.screen {
            AppScreen::Trainers => {
                if let Some(state) = &mut app_state.trainers_state {
                    render_trainers(f, state);
                }
            }
            AppScreen::Clients => {
                if let Some(state) = &mut app_state.clients_state {
                    render_clients(f, state);
                }
            }
            AppScreen::ScheduleWizard(_) => {
                if let Some(state) = &mut app_state.schedule_wizard_state {
                    render_schedule_wizard(f, state);
                }
            }
        })?;

        let should_quit = match app_state.screen {
            AppScreen::Trainers => handle_trainers_screen(app_state).await?,
            AppScreen::Clients => handle_clients_screen(app_state).await?,
            AppScreen::ScheduleWizard(_) => handle_schedule_wizard_screen(app_state).await?,
        };

        if should_quit {
            break;
        }
    }

    Ok(())
}

async fn load_trainers_screen(app_state: &mut AppState) -> Result<()> {
    let trainers = app_state.repo.list_trainers().await?;
    app_state.trainers_state = Some(TrainersState::new(trainers));
    app_state.screen = AppScreen::Trainers;
    Ok(())
}

async fn load_clients_screen(
    app_state: &mut AppState,
    trainer_id: i32,
    status: Option<StatusLine>,
) -> Result<()> {
    let clients = app_state.repo.list_clients(trainer_id).await?;
    let state = ClientsState::new(trainer_id, clients);
    app_state.clients_state = Some(match status {
        Some(status) => state.with_status(status),
        None => state,
    });
    app_state.screen = AppScreen::Clients;
    Ok(())
}

async fn handle_trainers_screen(app_state: &mut AppState) -> Result<bool> {
    if let Some(state) = &mut app_state.trainers_state {
        match handle_trainers_input(state)? {
            Some(TrainerAction::Exit) => return Ok(true),
            Some(TrainerAction::SelectTrainer(trainer_id)) => {
                load_clients_screen(app_state, trainer_id, None).await?;
            }
            None => {}
        }
    }

    Ok(false)
}

async fn handle_clients_screen(app_state: &mut AppState) -> Result<bool> {
    if let Some(state) = &mut app_state.clients_state {
        let trainer_id = state.trainer_id();
        match handle_clients_input(state)? {
            Some(ClientAction::Back) => {
                load_trainers_screen(app_state).await?;
            }
            Some(ClientAction::DeleteClient(client_id)) => {
                // failures stay on screen instead of leaving the console
                let result = app_state.repo.delete_client(client_id).await;
                let status = StatusLine::from_cascade(&result);
                load_clients_screen(app_state, trainer_id, Some(status)).await?;
            }
            Some(ClientAction::ScheduleSessions(client_id)) => {
                if let Some(client) = app_state.repo.get_client(client_id).await? {
                    let today = chrono::Local::now().date_naive();
                    app_state.schedule_wizard_state =
                        Some(ScheduleWizardState::new(client.id, client.name, today));
                    app_state.screen = AppScreen::ScheduleWizard(trainer_id);
                } else {
                    let status = StatusLine::Error(format!("Client {client_id} no longer exists"));
                    load_clients_screen(app_state, trainer_id, Some(status)).await?;
                }
            }
            None => {}
        }
    }

    Ok(false)
}

async fn handle_schedule_wizard_screen(app_state: &mut AppState) -> Result<bool> {
    let AppScreen::ScheduleWizard(trainer_id) = app_state.screen else {
        return Ok(false);
    };

    if let Some(state) = &mut app_state.schedule_wizard_state {
        match handle_schedule_wizard_input(state)? {
            Some(ScheduleWizardAction::Cancel) => {
                load_clients_screen(app_state, trainer_id, None).await?;
            }
            Some(ScheduleWizardAction::Save(sessions)) => {
                let client_id = state.client_id();
                let status = match app_state.repo.create_sessions(&sessions).await {
                    Ok(created) => {
                        StatusLine::Info(format!("Scheduled {created} sessions for client {client_id}"))
                    }
                    Err(err) => StatusLine::Error(format!("Scheduling failed: {err}")),
                };
                load_clients_screen(app_state, trainer_id, Some(status)).await?;
            }
            None => {}
        }
    }

    Ok(false)
}
