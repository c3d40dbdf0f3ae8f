// TUI event loop and terminal management
use crate::{App, InputMode};
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers, MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use stargazer_api::Reachability;
use stargazer_core::Completion;
use std::io;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;

/// How long to wait for input before checking on fetches again
const TICK: Duration = Duration::from_millis(100);

pub async fn run_tui(
    mut app: App,
    mut completions: UnboundedReceiver<Completion>,
    mut reachability: UnboundedReceiver<Reachability>,
    mouse_enabled: bool,
) -> anyhow::Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    if mouse_enabled {
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    } else {
        execute!(stdout, EnterAlternateScreen)?;
    }
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    app.start();
    let result = event_loop(&mut terminal, &mut app, &mut completions, &mut reachability, mouse_enabled);

    // Restore terminal even if the loop bailed out
    disable_raw_mode()?;
    if mouse_enabled {
        execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    } else {
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    }
    terminal.show_cursor()?;

    result
}

fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    completions: &mut UnboundedReceiver<Completion>,
    reachability: &mut UnboundedReceiver<Reachability>,
    mouse_enabled: bool,
) -> anyhow::Result<()> {
    loop {
        terminal.draw(|f| crate::ui::render(f, app))?;
        app.after_draw();

        while let Ok(completion) = completions.try_recv() {
            app.engine.apply(completion);
        }
        while let Ok(status) = reachability.try_recv() {
            app.set_reachability(status);
        }
        app.process_events();

        if event::poll(TICK)? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => handle_key(app, key),
                Event::Mouse(mouse) if mouse_enabled => match mouse.kind {
                    MouseEventKind::ScrollDown => app.next(),
                    MouseEventKind::ScrollUp => app.previous(),
                    _ => {}
                },
                _ => {}
            }
            app.process_events();
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

pub fn handle_key(app: &mut App, key: KeyEvent) {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        app.quit();
        return;
    }

    match app.input_mode {
        InputMode::Filtering => match key.code {
            KeyCode::Enter => app.confirm_filter(),
            KeyCode::Esc => app.clear_filter(),
            KeyCode::Backspace => app.pop_filter_char(),
            KeyCode::Char(c) => app.push_filter_char(c),
            KeyCode::Down => app.next(),
            KeyCode::Up => app.previous(),
            _ => {}
        },
        InputMode::Normal => match key.code {
            KeyCode::Char('q') => app.quit(),
            KeyCode::Char('j') | KeyCode::Down => app.next(),
            KeyCode::Char('k') | KeyCode::Up => app.previous(),
            KeyCode::Char('g') | KeyCode::Home => app.first(),
            KeyCode::Char('G') | KeyCode::End => app.last(),
            KeyCode::Char('/') => app.enter_filter_mode(),
            KeyCode::Esc => {
                if !app.filter_input.is_empty() {
                    app.clear_filter();
                }
            }
            KeyCode::Char('f') => app.toggle_selected_favorite(),
            KeyCode::Char('F') | KeyCode::Tab => app.toggle_favorites_view(),
            KeyCode::Char('w') => app.cycle_time_window(),
            KeyCode::Char('r') => app.refresh(),
            KeyCode::Char('y') => app.copy_selected_url(),
            KeyCode::Enter => app.open_selected(),
            _ => {}
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::{pump, test_app};
    use stargazer_core::{Mode, TimeWindow};

    fn press(app: &mut App, code: KeyCode) {
        handle_key(app, KeyEvent::new(code, KeyModifiers::NONE));
    }

    #[tokio::test]
    async fn test_typed_letters_go_to_filter_not_shortcuts() {
        let (mut app, mut rx) = test_app(25);
        app.start();
        pump(&mut app, &mut rx, 2).await;

        press(&mut app, KeyCode::Char('/'));
        press(&mut app, KeyCode::Char('q'));
        press(&mut app, KeyCode::Char('f'));

        assert!(!app.should_quit);
        assert_eq!(app.engine.filter_text(), Some("qf"));
        assert!(app.engine.favorites().is_empty());

        press(&mut app, KeyCode::Esc);
        assert_eq!(app.input_mode, InputMode::Normal);
        assert!(app.engine.filter_text().is_none());
    }

    #[tokio::test]
    async fn test_window_and_mode_keys() {
        let (mut app, mut rx) = test_app(25);
        app.start();
        pump(&mut app, &mut rx, 2).await;

        press(&mut app, KeyCode::Char('w'));
        assert_eq!(app.engine.time_window(), TimeWindow::LastWeek);
        pump(&mut app, &mut rx, 2).await;

        press(&mut app, KeyCode::Tab);
        assert_eq!(app.engine.mode(), Mode::Favoriting);
    }

    #[tokio::test]
    async fn test_ctrl_c_quits_while_filtering() {
        let (mut app, _rx) = test_app(25);
        press(&mut app, KeyCode::Char('/'));
        handle_key(&mut app, KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(app.should_quit);
    }
}
