use crate::app::InputMode;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Quit,
    NextTab,
    PrevTab,
    SelectTab(u8),
    Down,
    Up,
    PageDown,
    PageUp,
    Top,
    Bottom,
    Select,
    Back,
    Refresh,
    ToggleHelp,
    StartSearch,
    SubmitSearch,
    CancelSearch,
    Backspace,
    InputChar(char),
}

pub fn map_key(mode: InputMode, key: KeyEvent) -> Option<Action> {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return Some(Action::Quit);
    }

    match mode {
        InputMode::Normal => map_normal_mode_key(key),
        InputMode::Search => map_search_mode_key(key),
    }
}

fn map_normal_mode_key(key: KeyEvent) -> Option<Action> {
    match key.code {
        KeyCode::Char('q') => Some(Action::Quit),
        KeyCode::Char(c) if key.modifiers.is_empty() && c.is_ascii_digit() => {
            c.to_digit(10).map(|digit| Action::SelectTab(digit as u8))
        }
        KeyCode::Tab => Some(Action::NextTab),
        KeyCode::BackTab => Some(Action::PrevTab),
        KeyCode::Right => Some(Action::NextTab),
        KeyCode::Left => Some(Action::PrevTab),
        KeyCode::Char('j') if key.modifiers.is_empty() => Some(Action::Down),
        KeyCode::Down => Some(Action::Down),
        KeyCode::Char('k') if key.modifiers.is_empty() => Some(Action::Up),
        KeyCode::Up => Some(Action::Up),
        KeyCode::PageDown => Some(Action::PageDown),
        KeyCode::PageUp => Some(Action::PageUp),
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            Some(Action::PageDown)
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => Some(Action::PageUp),
        KeyCode::Char('g') | KeyCode::Home => Some(Action::Top),
        KeyCode::Char('G') | KeyCode::End => Some(Action::Bottom),
        KeyCode::Enter => Some(Action::Select),
        KeyCode::Esc | KeyCode::Backspace => Some(Action::Back),
        KeyCode::Char('/') => Some(Action::StartSearch),
        KeyCode::Char('r') | KeyCode::F(5) => Some(Action::Refresh),
        KeyCode::Char('?') => Some(Action::ToggleHelp),
        _ => None,
    }
}

fn map_search_mode_key(key: KeyEvent) -> Option<Action> {
    match key.code {
        KeyCode::Esc => Some(Action::CancelSearch),
        KeyCode::Enter => Some(Action::SubmitSearch),
        KeyCode::Char('m') | KeyCode::Char('j')
            if key.modifiers.contains(KeyModifiers::CONTROL) =>
        {
            Some(Action::SubmitSearch)
        }
        KeyCode::Backspace => Some(Action::Backspace),
        KeyCode::Char(c) if key.modifiers.is_empty() || key.modifiers == KeyModifiers::SHIFT => {
            Some(Action::InputChar(c))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::{Action, map_key};
    use crate::app::InputMode;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

    #[test]
    fn normal_mode_maps_quit() {
        let key = KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE);
        assert_eq!(map_key(InputMode::Normal, key), Some(Action::Quit));
    }

    #[test]
    fn ctrl_c_quits_in_every_mode() {
        let key = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(map_key(InputMode::Normal, key), Some(Action::Quit));
        assert_eq!(map_key(InputMode::Search, key), Some(Action::Quit));
    }

    #[test]
    fn search_mode_treats_q_as_text() {
        let key = KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE);
        assert_eq!(map_key(InputMode::Search, key), Some(Action::InputChar('q')));
    }

    #[test]
    fn search_mode_accepts_shifted_chars() {
        let key = KeyEvent::new(KeyCode::Char('E'), KeyModifiers::SHIFT);
        assert_eq!(map_key(InputMode::Search, key), Some(Action::InputChar('E')));
    }

    #[test]
    fn tab_keys_cycle_tabs() {
        let tab = KeyEvent::new(KeyCode::Tab, KeyModifiers::NONE);
        let back_tab = KeyEvent::new(KeyCode::BackTab, KeyModifiers::SHIFT);
        assert_eq!(map_key(InputMode::Normal, tab), Some(Action::NextTab));
        assert_eq!(map_key(InputMode::Normal, back_tab), Some(Action::PrevTab));
    }

    #[test]
    fn digits_select_tabs() {
        let key = KeyEvent::new(KeyCode::Char('3'), KeyModifiers::NONE);
        assert_eq!(map_key(InputMode::Normal, key), Some(Action::SelectTab(3)));
        let zero = KeyEvent::new(KeyCode::Char('0'), KeyModifiers::NONE);
        assert_eq!(map_key(InputMode::Normal, zero), Some(Action::SelectTab(0)));
    }

    #[test]
    fn digits_are_text_while_searching() {
        let key = KeyEvent::new(KeyCode::Char('3'), KeyModifiers::NONE);
        assert_eq!(map_key(InputMode::Search, key), Some(Action::InputChar('3')));
    }

    #[test]
    fn esc_and_enter_depend_on_mode() {
        let esc = KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE);
        let enter = KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE);
        assert_eq!(map_key(InputMode::Normal, esc), Some(Action::Back));
        assert_eq!(map_key(InputMode::Search, esc), Some(Action::CancelSearch));
        assert_eq!(map_key(InputMode::Normal, enter), Some(Action::Select));
        assert_eq!(map_key(InputMode::Search, enter), Some(Action::SubmitSearch));
    }

    #[test]
    fn search_mode_maps_ctrl_m_to_submit() {
        let key = KeyEvent::new(KeyCode::Char('m'), KeyModifiers::CONTROL);
        assert_eq!(map_key(InputMode::Search, key), Some(Action::SubmitSearch));
    }

    #[test]
    fn slash_starts_search() {
        let key = KeyEvent::new(KeyCode::Char('/'), KeyModifiers::NONE);
        assert_eq!(map_key(InputMode::Normal, key), Some(Action::StartSearch));
    }
}
