//! Main TUI application loop.
//!
//! Handles:
//! - Terminal setup and teardown
//! - Input event handling
//! - Forwarding transitions to the exploration session

use std::io;
use std::time::Duration;

use anyhow::Result;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    Terminal,
};

use crate::adapters::{LinearModel, ParquetDataset};
use crate::application::{ExplorationSession, ExploreError, Insight};

use super::ui::{
    explorer::{render_explorer, ExplorerState},
    render_disclaimer,
};

/// Age slider step for PageUp/PageDown.
const AGE_PAGE: i64 = 5;

/// Session type driven by the terminal front end.
pub type Session = ExplorationSession<LinearModel, ParquetDataset>;

/// Main application state
pub struct App {
    session: Session,
    view: ExplorerState,
    should_quit: bool,
}

impl App {
    /// Create the app around an already-sampled session and select the
    /// first candidate.
    #[must_use]
    pub fn new(session: Session) -> Self {
        let mut app = Self {
            view: ExplorerState::new(session.candidates().to_vec()),
            session,
            should_quit: false,
        };
        if let Some(id) = app.view.highlighted() {
            let outcome = app.session.select(id);
            app.apply(outcome);
        }
        app
    }

    /// Run the main application loop.
    ///
    /// # Errors
    /// Returns error if terminal operations fail.
    pub fn run(&mut self) -> Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let result = self.main_loop(&mut terminal);

        // Restore terminal
        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        )?;
        terminal.show_cursor()?;

        result
    }

    fn main_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
        loop {
            terminal.draw(|f| {
                let chunks = Layout::default()
                    .direction(Direction::Vertical)
                    .constraints([Constraint::Min(0), Constraint::Length(3)])
                    .split(f.area());

                render_explorer(f, chunks[0], &mut self.view);
                render_disclaimer(f, chunks[1]);
            })?;

            if event::poll(Duration::from_millis(50))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key.code, key.modifiers);
                    }
                }
            }

            if self.should_quit {
                break;
            }
        }

        Ok(())
    }

    fn handle_key(&mut self, key: KeyCode, modifiers: KeyModifiers) {
        // Global quit handling
        if key == KeyCode::Char('q') && modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return;
        }

        match key {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Up | KeyCode::Char('k') => self.view.move_cursor(-1),
            KeyCode::Down | KeyCode::Char('j') => self.view.move_cursor(1),
            KeyCode::Enter => {
                if let Some(id) = self.view.highlighted() {
                    let outcome = self.session.select(id);
                    self.apply(outcome);
                }
            }
            KeyCode::Left => self.step_age(-1),
            KeyCode::Right => self.step_age(1),
            KeyCode::PageDown => self.step_age(-AGE_PAGE),
            KeyCode::PageUp => self.step_age(AGE_PAGE),
            KeyCode::Char('r') | KeyCode::Char('R') => {
                self.view.show_raw = self.session.toggle_raw();
            }
            _ => {}
        }
    }

    fn step_age(&mut self, delta: i64) {
        let outcome = self.session.step_age(delta);
        self.apply(outcome);
    }

    /// Store a transition's outcome. Errors stay inline; the last good
    /// insight is kept on screen.
    fn apply(&mut self, outcome: Result<Insight, ExploreError>) {
        match outcome {
            Ok(insight) => {
                self.view.insight = Some(insight);
                self.view.error = None;
            }
            Err(e) => {
                tracing::warn!("Exploration step failed: {}", e);
                self.view.error = Some(e.to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::DEFAULT_ID_COLUMN;
    use crate::application::ScoringService;
    use crate::domain::{reference_payload, FeatureValue, PatientRecord};
    use crate::ports::{Cell, DatasetRow};
    use std::sync::Arc;

    fn app(ages: &[i64]) -> App {
        let record = PatientRecord::validate(&reference_payload()).expect("valid");
        let rows = ages.iter().enumerate().map(|(i, age)| {
            let mut cells: std::collections::BTreeMap<String, Cell> = record
                .features()
                .into_iter()
                .map(|(name, value)| match value {
                    FeatureValue::Number(x) => (name, Cell::Float(x)),
                    FeatureValue::Category(s) => (name, Cell::Text(s)),
                })
                .collect();
            cells.insert("age".into(), Cell::Int(*age));
            cells.insert(DEFAULT_ID_COLUMN.into(), Cell::Int(i as i64 + 1));
            DatasetRow { cells }
        });
        let dataset = ParquetDataset::from_rows(DEFAULT_ID_COLUMN, rows).expect("dataset");
        let model = LinearModel::load(std::path::Path::new("models/scoring_model.json"))
            .expect("Shipped model should load");
        let session = ExplorationSession::new(
            ScoringService::new(Arc::new(model)),
            Arc::new(dataset),
            100,
            Some(1),
        )
        .expect("session");
        App::new(session)
    }

    fn age(app: &App) -> Option<i64> {
        app.view.insight.as_ref().map(|i| i.age)
    }

    #[test]
    fn test_first_candidate_selected_on_start() {
        let app = app(&[40, 70]);
        assert_eq!(app.view.insight.as_ref().map(|i| i.patient_id), Some(1));
        assert_eq!(age(&app), Some(40));
    }

    #[test]
    fn test_arrow_and_page_keys_move_age() {
        let mut app = app(&[40]);
        app.handle_key(KeyCode::Right, KeyModifiers::NONE);
        assert_eq!(age(&app), Some(41));
        app.handle_key(KeyCode::PageDown, KeyModifiers::NONE);
        assert_eq!(age(&app), Some(36));
        app.handle_key(KeyCode::PageUp, KeyModifiers::NONE);
        app.handle_key(KeyCode::Left, KeyModifiers::NONE);
        assert_eq!(age(&app), Some(40));
        assert!(app.view.error.is_none());
    }

    #[test]
    fn test_enter_selects_highlighted_patient() {
        let mut app = app(&[40, 70]);
        app.handle_key(KeyCode::Down, KeyModifiers::NONE);
        app.handle_key(KeyCode::Enter, KeyModifiers::NONE);
        assert_eq!(app.view.insight.as_ref().map(|i| i.patient_id), Some(2));
        assert_eq!(age(&app), Some(70));
    }

    #[test]
    fn test_raw_toggle_and_quit() {
        let mut app = app(&[40]);
        app.handle_key(KeyCode::Char('r'), KeyModifiers::NONE);
        assert!(app.view.show_raw);
        app.handle_key(KeyCode::Char('r'), KeyModifiers::NONE);
        assert!(!app.view.show_raw);

        assert!(!app.should_quit);
        app.handle_key(KeyCode::Char('q'), KeyModifiers::CONTROL);
        assert!(app.should_quit);
    }
}
