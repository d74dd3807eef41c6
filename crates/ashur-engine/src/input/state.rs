use std::collections::{BTreeMap, HashSet};

use super::frame::InputFrame;
use super::types::{InputEvent, Key, KeyState, Modifiers, TouchEvent, TouchPhase};

/// Current input state for the game window.
///
/// Holds held keys and live touches. Per-frame transitions are recorded into
/// an `InputFrame`.
#[derive(Debug, Default)]
pub struct InputState {
    /// Current modifier state.
    pub modifiers: Modifiers,

    /// Whether the window is focused.
    pub focused: bool,

    /// Set of currently held keys.
    pub keys_down: HashSet<Key>,

    /// Live touch contacts, normalized to the window.
    pub touches: BTreeMap<u64, (f32, f32)>,

    /// A touch event has arrived at least once.
    pub touch_seen: bool,
}

impl InputState {
    /// Applies a platform-agnostic input event to the current state and writes deltas to `frame`.
    pub fn apply_event(&mut self, frame: &mut InputFrame, ev: InputEvent) {
        match &ev {
            InputEvent::ModifiersChanged(m) => {
                self.modifiers = *m;
            }

            InputEvent::Focused(f) => {
                self.focused = *f;
                if !*f {
                    // Nothing stays held across a focus loss.
                    self.keys_down.clear();
                    self.touches.clear();
                }
            }

            InputEvent::Key {
                key,
                state,
                modifiers,
                ..
            } => {
                self.modifiers = *modifiers;

                match state {
                    KeyState::Pressed => {
                        if self.keys_down.insert(*key) {
                            frame.keys_pressed.insert(*key);
                        }
                    }
                    KeyState::Released => {
                        if self.keys_down.remove(key) {
                            frame.keys_released.insert(*key);
                        }
                    }
                }
            }

            InputEvent::Touch(TouchEvent { id, phase, x, y }) => {
                self.touch_seen = true;
                match phase {
                    TouchPhase::Started | TouchPhase::Moved => {
                        self.touches.insert(*id, (*x, *y));
                    }
                    TouchPhase::Ended | TouchPhase::Cancelled => {
                        self.touches.remove(id);
                    }
                }
            }
        }

        frame.push_event(ev);
    }

    pub fn key_down(&self, key: Key) -> bool {
        self.keys_down.contains(&key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(key: Key, state: KeyState) -> InputEvent {
        InputEvent::Key { key, state, modifiers: Modifiers::default(), code: 0, repeat: false }
    }

    #[test]
    fn key_transitions_are_recorded_once() {
        let mut s = InputState::default();
        let mut f = InputFrame::default();
        s.apply_event(&mut f, key(Key::Z, KeyState::Pressed));
        s.apply_event(&mut f, key(Key::Z, KeyState::Pressed));
        assert!(s.key_down(Key::Z));
        assert_eq!(f.keys_pressed.len(), 1);
        assert_eq!(f.events.len(), 2);

        s.apply_event(&mut f, key(Key::Z, KeyState::Released));
        assert!(!s.key_down(Key::Z));
        assert!(f.keys_released.contains(&Key::Z));
    }

    #[test]
    fn focus_loss_releases_keys_and_touches() {
        let mut s = InputState::default();
        let mut f = InputFrame::default();
        s.apply_event(&mut f, key(Key::X, KeyState::Pressed));
        s.apply_event(
            &mut f,
            InputEvent::Touch(TouchEvent { id: 1, phase: TouchPhase::Started, x: 0.5, y: 0.5 }),
        );
        s.apply_event(&mut f, InputEvent::Focused(false));
        assert!(s.keys_down.is_empty());
        assert!(s.touches.is_empty());
        assert!(s.touch_seen);
    }
}
