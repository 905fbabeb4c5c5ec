use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::visualizer::{VisualizerMode, VisualizerState};

/// Actions the render loop understands, from the keyboard or a remote client
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    SelectMode(VisualizerMode),
    NextMode,
    PrevMode,
    TogglePause,
    SetPaused(bool),
    SaveSettings,
    Quit,
}

/// What the render loop should do after applying a command
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Flow {
    Continue,
    /// Write the current mode to the config file
    Save,
    Exit,
}

/// Map a key press to a command. Releases and repeats are ignored.
pub fn map_key(key: KeyEvent) -> Option<Command> {
    if key.kind != KeyEventKind::Press {
        return None;
    }

    match key.code {
        KeyCode::Esc => Some(Command::Quit),
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Some(Command::Quit),
        KeyCode::Char('q') => Some(Command::Quit),
        KeyCode::Char(' ') => Some(Command::TogglePause),
        KeyCode::Char(c @ '1'..='5') => {
            VisualizerMode::from_number(c as u8 - b'0').map(Command::SelectMode)
        }
        KeyCode::Tab => Some(Command::NextMode),
        KeyCode::BackTab => Some(Command::PrevMode),
        KeyCode::Char('w') => Some(Command::SaveSettings),
        _ => None,
    }
}

pub fn apply(state: &mut VisualizerState, command: Command) -> Flow {
    match command {
        Command::SelectMode(mode) => state.set_mode(mode),
        Command::NextMode => state.next_mode(),
        Command::PrevMode => state.prev_mode(),
        Command::TogglePause => state.toggle_pause(),
        Command::SetPaused(paused) => state.set_paused(paused),
        Command::SaveSettings => return Flow::Save,
        Command::Quit => return Flow::Exit,
    }
    Flow::Continue
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VisualizerConfig;
    use crossterm::event::KeyEventState;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn digit_keys_select_modes() {
        assert_eq!(
            map_key(press(KeyCode::Char('1'))),
            Some(Command::SelectMode(VisualizerMode::Circular))
        );
        assert_eq!(
            map_key(press(KeyCode::Char('5'))),
            Some(Command::SelectMode(VisualizerMode::Particles))
        );
        assert_eq!(map_key(press(KeyCode::Char('6'))), None);
        assert_eq!(map_key(press(KeyCode::Char('0'))), None);
    }

    #[test]
    fn control_keys() {
        assert_eq!(map_key(press(KeyCode::Char(' '))), Some(Command::TogglePause));
        assert_eq!(map_key(press(KeyCode::Esc)), Some(Command::Quit));
        assert_eq!(map_key(press(KeyCode::Char('q'))), Some(Command::Quit));
        assert_eq!(
            map_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(Command::Quit)
        );
        assert_eq!(map_key(press(KeyCode::Char('c'))), None);
        assert_eq!(map_key(press(KeyCode::Tab)), Some(Command::NextMode));
    }

    #[test]
    fn releases_are_ignored() {
        let release = KeyEvent {
            code: KeyCode::Esc,
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Release,
            state: KeyEventState::NONE,
        };
        assert_eq!(map_key(release), None);
    }

    #[test]
    fn apply_drives_state() {
        let mut state = VisualizerState::new(&VisualizerConfig::default(), VisualizerMode::Circular);

        assert_eq!(apply(&mut state, Command::SelectMode(VisualizerMode::Radial)), Flow::Continue);
        assert_eq!(state.mode(), VisualizerMode::Radial);

        apply(&mut state, Command::NextMode);
        assert_eq!(state.mode(), VisualizerMode::Particles);

        apply(&mut state, Command::TogglePause);
        assert!(state.is_paused());
        apply(&mut state, Command::SetPaused(false));
        assert!(!state.is_paused());

        assert_eq!(apply(&mut state, Command::SaveSettings), Flow::Save);
        assert_eq!(apply(&mut state, Command::Quit), Flow::Exit);
    }
}
