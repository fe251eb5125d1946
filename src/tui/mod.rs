//! Interactive terminal UI.
//!
//! [`run`] takes over the terminal (raw mode, alternate screen), draws the
//! [`App`] after every key press and hands the terminal back on exit, on
//! error and on panic.

mod app;
mod list;
mod render;

pub use app::{App, View};
pub use list::StatefulList;

use anyhow::{Context, Result};
use crossterm::ExecutableCommand;
use crossterm::event::{self, Event};
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::{Backend, CrosstermBackend};
use std::io::{Stdout, stdout};

use crate::api_client::SitzungSource;

pub fn run<S: SitzungSource>(source: S) -> Result<()> {
    // Load before taking over the terminal so a slow API does not leave a
    // blank screen.
    let app = App::new(source);

    install_panic_hook();
    let mut terminal = match init_terminal() {
        Ok(terminal) => terminal,
        Err(e) => {
            let _ = restore_terminal();
            return Err(e);
        }
    };
    let result = run_app(&mut terminal, app);
    let restored = restore_terminal();

    result.and(restored)
}

fn run_app<B: Backend, S: SitzungSource>(
    terminal: &mut Terminal<B>,
    mut app: App<S>,
) -> Result<()> {
    while !app.should_quit() {
        terminal
            .draw(|frame| frame.render_widget(&mut app, frame.area()))
            .context("failed to draw terminal UI")?;

        if let Event::Key(key) = event::read().context("failed to read terminal event")? {
            app.handle_key(key);
        }
    }
    Ok(())
}

fn init_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode().context("failed to enable raw mode")?;
    stdout()
        .execute(EnterAlternateScreen)
        .context("failed to enter alternate screen")?;
    let terminal =
        Terminal::new(CrosstermBackend::new(stdout())).context("failed to initialise terminal")?;
    Ok(terminal)
}

fn restore_terminal() -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode")?;
    stdout()
        .execute(LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    Ok(())
}

/// Restore the terminal before the default hook prints the panic message.
fn install_panic_hook() {
    let original = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = restore_terminal();
        original(info);
    }));
}
