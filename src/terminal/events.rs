use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app::Screen;
use crate::terminal::state::{Focus, UiState};

/// What a key press asks the controller to do. Pure UI changes (typing,
/// focus, cursor) are applied directly to `UiState`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    None,
    Quit,
    Login,
    Logout,
    Search,
    Download,
    ToggleCurrent,
    ToggleAll,
    ClearSelection,
}

pub fn handle_key(key: KeyEvent, screen: Screen, ui: &mut UiState, results_len: usize) -> Action {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return Action::Quit;
    }

    match screen {
        Screen::Login => handle_login_keys(key),
        Screen::Main => handle_main_keys(key, ui, results_len),
    }
}

fn handle_login_keys(key: KeyEvent) -> Action {
    match key.code {
        KeyCode::Char('l') | KeyCode::Enter => Action::Login,
        KeyCode::Char('q') | KeyCode::Esc => Action::Quit,
        _ => Action::None,
    }
}

fn handle_main_keys(key: KeyEvent, ui: &mut UiState, results_len: usize) -> Action {
    match key.code {
        KeyCode::Tab => {
            ui.focus = ui.focus.next();
            return Action::None;
        }
        KeyCode::BackTab => {
            ui.focus = ui.focus.prev();
            return Action::None;
        }
        KeyCode::Esc => {
            if ui.focus == Focus::List {
                return Action::Quit;
            }
            ui.focus = Focus::List;
            return Action::None;
        }
        _ => {}
    }

    match ui.focus {
        Focus::List => handle_list_keys(key, ui, results_len),
        Focus::FileType => handle_file_type_keys(key, ui),
        _ => handle_text_keys(key, ui),
    }
}

fn handle_text_keys(key: KeyEvent, ui: &mut UiState) -> Action {
    match key.code {
        KeyCode::Enter => return Action::Search,
        KeyCode::Backspace => {
            if let Some(field) = ui.field_mut() {
                field.pop();
            }
        }
        KeyCode::Char(c) => {
            if let Some(field) = ui.field_mut() {
                field.push(c);
            }
        }
        _ => {}
    }
    Action::None
}

fn handle_file_type_keys(key: KeyEvent, ui: &mut UiState) -> Action {
    match key.code {
        KeyCode::Enter => return Action::Search,
        KeyCode::Left | KeyCode::Char('h') => ui.file_type = ui.file_type.prev(),
        KeyCode::Right | KeyCode::Char('l') | KeyCode::Char(' ') => {
            ui.file_type = ui.file_type.next()
        }
        _ => {}
    }
    Action::None
}

fn handle_list_keys(key: KeyEvent, ui: &mut UiState, results_len: usize) -> Action {
    match key.code {
        KeyCode::Char('q') => Action::Quit,
        KeyCode::Down | KeyCode::Char('j') => {
            ui.move_cursor(1, results_len);
            Action::None
        }
        KeyCode::Up | KeyCode::Char('k') => {
            ui.move_cursor(-1, results_len);
            Action::None
        }
        KeyCode::Home => {
            ui.move_cursor(i32::MIN / 2, results_len);
            Action::None
        }
        KeyCode::End => {
            ui.move_cursor(i32::MAX / 2, results_len);
            Action::None
        }
        KeyCode::Char('/') => {
            ui.focus = Focus::Term;
            Action::None
        }
        KeyCode::Char(' ') | KeyCode::Enter => Action::ToggleCurrent,
        KeyCode::Char('a') => Action::ToggleAll,
        KeyCode::Char('c') => Action::ClearSelection,
        KeyCode::Char('d') => Action::Download,
        KeyCode::Char('r') => Action::Search,
        KeyCode::Char('L') => Action::Logout,
        _ => Action::None,
    }
}
