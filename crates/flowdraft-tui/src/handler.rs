use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};

use crate::app::{App, InputMode};
use crate::tui::AppEvent;

pub async fn handle_event(app: &mut App, event: AppEvent) {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => {
            app.tick_animation();
            app.poll_generation().await;
        }
    }
}

pub fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing => handle_editing_mode(app, key),
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,

        KeyCode::Char('i') | KeyCode::Tab => app.input_mode = InputMode::Editing,

        // Zoom
        KeyCode::Char('+') | KeyCode::Char('=') => app.session.zoom_in(),
        KeyCode::Char('-') => app.session.zoom_out(),
        KeyCode::Char('0') => app.session.reset_zoom(),

        // Diagram scrolling
        KeyCode::Char('j') | KeyCode::Down => app.scroll_diagram_down(),
        KeyCode::Char('k') | KeyCode::Up => app.scroll_diagram_up(),
        KeyCode::Char('l') | KeyCode::Right => app.scroll_diagram_right(),
        KeyCode::Char('h') | KeyCode::Left => app.scroll_diagram_left(),

        // Transcript scrolling
        KeyCode::PageDown => app.scroll_transcript_down(),
        KeyCode::PageUp => app.scroll_transcript_up(),

        KeyCode::Char('s') => app.toggle_source(),
        KeyCode::Char('n') => app.new_diagram(),

        _ => {}
    }
}

fn handle_editing_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.input_mode = InputMode::Normal,
        KeyCode::Enter if key.modifiers.contains(KeyModifiers::ALT) => app.insert_char('\n'),
        KeyCode::Enter => app.start_generation(),
        KeyCode::Backspace => app.delete_before_cursor(),
        KeyCode::Delete => app.delete_at_cursor(),
        KeyCode::Left => app.cursor_left(),
        KeyCode::Right => app.cursor_right(),
        KeyCode::Home => app.cursor_home(),
        KeyCode::End => app.cursor_end(),
        KeyCode::Char(c) => app.insert_char(c),
        _ => {}
    }
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    match mouse.kind {
        MouseEventKind::ScrollDown => app.scroll_diagram_down(),
        MouseEventKind::ScrollUp => app.scroll_diagram_up(),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowdraft_core::Config;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn test_app() -> App {
        App::new(&Config {
            provider: Some("ollama".to_string()),
            ollama_base_url: Some("http://127.0.0.1:1".to_string()),
            ..Config::default()
        })
    }

    #[tokio::test]
    async fn test_zoom_keys() {
        let mut app = test_app();
        handle_key(&mut app, press(KeyCode::Esc));
        assert_eq!(app.input_mode, InputMode::Normal);

        handle_key(&mut app, press(KeyCode::Char('+')));
        handle_key(&mut app, press(KeyCode::Char('=')));
        assert_eq!(app.session.scale_percent(), 120);

        handle_key(&mut app, press(KeyCode::Char('-')));
        assert_eq!(app.session.scale_percent(), 110);

        handle_key(&mut app, press(KeyCode::Char('0')));
        assert_eq!(app.session.scale_percent(), 100);
    }

    #[tokio::test]
    async fn test_alt_enter_inserts_newline() {
        let mut app = test_app();
        handle_key(&mut app, press(KeyCode::Char('a')));
        handle_key(&mut app, KeyEvent::new(KeyCode::Enter, KeyModifiers::ALT));
        handle_key(&mut app, press(KeyCode::Char('b')));
        assert_eq!(app.session.prompt(), "a\nb");
        assert!(!app.is_loading());
    }

    #[tokio::test]
    async fn test_typing_zoom_characters_edits_prompt() {
        let mut app = test_app();
        handle_key(&mut app, press(KeyCode::Char('+')));
        handle_key(&mut app, press(KeyCode::Char('q')));
        assert_eq!(app.session.prompt(), "+q");
        assert_eq!(app.session.scale_percent(), 100);
        assert!(!app.should_quit);
    }

    #[tokio::test]
    async fn test_enter_submits_and_leaves_edit_mode() {
        let mut app = test_app();
        handle_key(&mut app, press(KeyCode::Char('x')));
        handle_key(&mut app, press(KeyCode::Enter));
        assert!(app.is_loading());
        assert_eq!(app.input_mode, InputMode::Normal);
    }

    #[tokio::test]
    async fn test_quit_keys() {
        let mut app = test_app();
        handle_key(&mut app, KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(app.should_quit);

        let mut app = test_app();
        handle_key(&mut app, press(KeyCode::Esc));
        handle_key(&mut app, press(KeyCode::Char('q')));
        assert!(app.should_quit);
    }

    #[tokio::test]
    async fn test_source_toggle() {
        let mut app = test_app();
        handle_key(&mut app, press(KeyCode::Esc));
        handle_key(&mut app, press(KeyCode::Char('s')));
        assert!(app.show_source);
        handle_key(&mut app, press(KeyCode::Char('s')));
        assert!(!app.show_source);
    }
}
