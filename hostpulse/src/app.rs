//! App state and main loop: input handling and drawing the status panel.

use std::{io, time::Duration};

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use hostpulse_agent::StatusBoard;
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::time::sleep;

use crate::ui::status::draw_status;

pub struct App {
    board: StatusBoard,
    endpoint: String,
    should_quit: bool,
}

impl App {
    pub fn new(board: StatusBoard, endpoint: String) -> Self {
        Self {
            board,
            endpoint,
            should_quit: false,
        }
    }

    pub async fn run(&mut self) -> anyhow::Result<()> {
        // Terminal setup
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;

        let res = self.event_loop(&mut terminal).await;

        // Teardown runs even when the loop failed.
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        res
    }

    async fn event_loop<B: ratatui::backend::Backend>(
        &mut self,
        terminal: &mut Terminal<B>,
    ) -> anyhow::Result<()> {
        loop {
            // Input (non-blocking)
            while event::poll(Duration::from_millis(10))? {
                if let Event::Key(k) = event::read()? {
                    if k.kind == KeyEventKind::Press && is_quit(k.code, k.modifiers) {
                        self.should_quit = true;
                    }
                }
            }
            if self.should_quit {
                break;
            }

            // One snapshot per frame, so every line on screen agrees.
            let snap = self.board.snapshot();
            terminal.draw(|f| draw_status(f, &snap, &self.endpoint))?;

            sleep(Duration::from_millis(250)).await;
        }
        Ok(())
    }
}

fn is_quit(code: KeyCode, mods: KeyModifiers) -> bool {
    match code {
        KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => true,
        KeyCode::Char('c') => mods.contains(KeyModifiers::CONTROL),
        _ => false,
    }
}
