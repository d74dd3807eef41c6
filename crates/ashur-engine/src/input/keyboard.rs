use std::collections::BTreeMap;

use super::controls::{ControlCommand, Controls};
use super::state::InputState;
use super::types::Key;

/// Keyboard keys bound to each command.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyboardBindings {
    keys: BTreeMap<ControlCommand, Vec<Key>>,
}

impl Default for KeyboardBindings {
    fn default() -> Self {
        let keys = [
            (ControlCommand::Up, vec![Key::ArrowUp]),
            (ControlCommand::Down, vec![Key::ArrowDown]),
            (ControlCommand::Left, vec![Key::ArrowLeft]),
            (ControlCommand::Right, vec![Key::ArrowRight]),
            (ControlCommand::Jump, vec![Key::Z]),
            (ControlCommand::AltJump, vec![Key::A]),
            (ControlCommand::Run, vec![Key::X]),
            (ControlCommand::AltRun, vec![Key::S]),
            (ControlCommand::Drop, vec![Key::Shift]),
            (ControlCommand::Start, vec![Key::Escape, Key::Enter]),
        ];
        Self { keys: keys.into_iter().collect() }
    }
}

impl KeyboardBindings {
    pub fn keys(&self, cmd: ControlCommand) -> &[Key] {
        self.keys.get(&cmd).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Replaces the keys of `cmd`.
    pub fn bind(&mut self, cmd: ControlCommand, keys: impl IntoIterator<Item = Key>) {
        self.keys.insert(cmd, keys.into_iter().collect());
    }

    /// Writes every command from the held keys of `state`.
    pub fn apply(&self, state: &InputState, controls: &mut Controls) {
        for cmd in ControlCommand::ALL {
            let held = self.keys(cmd).iter().any(|&k| state.key_down(k));
            controls.set(cmd, held);
        }
        controls.analog_x = axis(controls.left, controls.right);
        controls.analog_y = axis(controls.up, controls.down);
    }
}

fn axis(negative: bool, positive: bool) -> f32 {
    match (negative, positive) {
        (true, false) => -1.0,
        (false, true) => 1.0,
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{InputEvent, InputFrame, KeyState, Modifiers};

    fn press(state: &mut InputState, key: Key) {
        let mut frame = InputFrame::default();
        state.apply_event(
            &mut frame,
            InputEvent::Key {
                key,
                state: KeyState::Pressed,
                modifiers: Modifiers::default(),
                code: 0,
                repeat: false,
            },
        );
    }

    #[test]
    fn held_keys_become_commands() {
        let mut state = InputState::default();
        press(&mut state, Key::ArrowLeft);
        press(&mut state, Key::Z);

        let mut c = Controls::default();
        c.run = true;
        KeyboardBindings::default().apply(&state, &mut c);

        assert!(c.left && c.jump);
        assert!(!c.run);
        assert_eq!((c.analog_x, c.analog_y), (-1.0, 0.0));
    }

    #[test]
    fn rebinding_replaces_keys() {
        let mut b = KeyboardBindings::default();
        b.bind(ControlCommand::Jump, [Key::Space]);
        assert_eq!(b.keys(ControlCommand::Jump), &[Key::Space]);

        let mut state = InputState::default();
        press(&mut state, Key::Z);
        let mut c = Controls::default();
        b.apply(&state, &mut c);
        assert!(!c.jump);
    }
}
