// SPDX-License-Identifier: GPL-3.0-only

//! Terminal front end
//!
//! Runs the scanner page in the alternate screen. Input is polled with a
//! short timeout so engine events and timers are drained between keys.

use crate::app::{AppModel, Message};
use crate::constants::timing;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use std::io::{self, stdout};
use std::time::{Duration, Instant};
use tracing::info;

/// Run the scanner page until the user quits
pub fn run(mut model: AppModel) -> Result<(), Box<dyn std::error::Error>> {
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &mut model);

    // Release the camera before handing the terminal back
    model.scanner.shutdown();

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    model: &mut AppModel,
) -> Result<(), Box<dyn std::error::Error>> {
    info!(engine = model.scanner.engine_name(), "Terminal UI started");
    let poll_interval = Duration::from_millis(timing::UI_POLL_INTERVAL_MS);

    while !model.should_quit {
        model.update(Message::Tick, Instant::now());

        let now = Instant::now();
        terminal.draw(|f| model.view(f, now))?;

        if event::poll(poll_interval)?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            let message = key_to_message(key, model);
            model.update(message, Instant::now());
        }
    }

    Ok(())
}

/// Map a key press to a page message
pub fn key_to_message(key: KeyEvent, model: &AppModel) -> Message {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return Message::Quit;
    }

    let has_result = model.scan_result.is_some();
    match key.code {
        KeyCode::Char('q') => Message::Quit,
        KeyCode::Enter => Message::Start,
        KeyCode::Char('x') => Message::Stop,
        KeyCode::Char('n') => Message::SwitchCamera,
        KeyCode::Char('f') => Message::ToggleTorch,
        KeyCode::Char('r') => Message::Retry,
        KeyCode::Char('l') => Message::RefreshCameras,
        KeyCode::Up | KeyCode::Char('k') => Message::SelectPreviousCamera,
        KeyCode::Down | KeyCode::Char('j') => Message::SelectNextCamera,
        KeyCode::Char('y') if has_result => Message::Copy,
        KeyCode::Char('o') if has_result => Message::Open,
        KeyCode::Char('s') if has_result => Message::Share,
        KeyCode::Char('m') if has_result => Message::ToggleOptions,
        KeyCode::Esc if has_result => Message::ClearResult,
        _ => Message::Noop,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::frame_processor::ScanResult;
    use crate::app::{ResultPresenter, ScannerController, SessionTiming};
    use crate::backends::camera::{DecodedPayload, ScanConfig, ScriptedEngine};
    use crate::platform::{CommandShare, Platform, SystemClipboard, SystemOpener, TerminalBell};

    fn model() -> AppModel {
        let scanner = ScannerController::new(
            Box::new(ScriptedEngine::new()),
            ScanConfig::default(),
            SessionTiming::default(),
        );
        let platform = Platform {
            clipboard: Box::new(SystemClipboard::default()),
            share: Box::new(CommandShare::new(None)),
            opener: Box::new(SystemOpener),
            feedback: Box::new(TerminalBell { enabled: false }),
        };
        AppModel::new(scanner, ResultPresenter::default(), platform)
    }

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_camera_keys() {
        let m = model();
        assert_eq!(key_to_message(press(KeyCode::Enter), &m), Message::Start);
        assert_eq!(key_to_message(press(KeyCode::Char('x')), &m), Message::Stop);
        assert_eq!(key_to_message(press(KeyCode::Char('n')), &m), Message::SwitchCamera);
        assert_eq!(key_to_message(press(KeyCode::Char('f')), &m), Message::ToggleTorch);
        assert_eq!(key_to_message(press(KeyCode::Down), &m), Message::SelectNextCamera);
    }

    #[test]
    fn test_ctrl_c_quits() {
        let m = model();
        let key = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(key_to_message(key, &m), Message::Quit);
        assert_eq!(key_to_message(press(KeyCode::Char('c')), &m), Message::Noop);
    }

    #[test]
    fn test_result_keys_need_a_result() {
        let mut m = model();
        assert_eq!(key_to_message(press(KeyCode::Char('y')), &m), Message::Noop);
        assert_eq!(key_to_message(press(KeyCode::Esc), &m), Message::Noop);

        m.scan_result = Some(ScanResult::new(DecodedPayload::qr("hello")));
        assert_eq!(key_to_message(press(KeyCode::Char('y')), &m), Message::Copy);
        assert_eq!(key_to_message(press(KeyCode::Char('s')), &m), Message::Share);
        assert_eq!(key_to_message(press(KeyCode::Esc), &m), Message::ClearResult);
    }
}
