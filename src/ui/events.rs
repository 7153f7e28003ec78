use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::time::Duration;

use super::app::App;

/// Handle keyboard events and update app state
/// Waits at most `timeout` for input, which also paces the frame loop
pub fn handle_events(app: &mut App, timeout: Duration) -> anyhow::Result<()> {
    if event::poll(timeout)? {
        if let Event::Key(key) = event::read()? {
            handle_key_event(app, key);
        }
    }
    Ok(())
}

/// Process individual key press
fn handle_key_event(app: &mut App, key: KeyEvent) {
    // Ignore release/repeat events on platforms that report them
    if key.kind != KeyEventKind::Press {
        return;
    }

    if key.modifiers.contains(KeyModifiers::CONTROL) && matches!(key.code, KeyCode::Char('c')) {
        app.quit();
        return;
    }

    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => {
            app.quit();
        }
        KeyCode::Char('r') => {
            app.request_reset();
        }
        KeyCode::Char('p') => {
            app.request_panic();
        }
        _ => {}
    }
}
