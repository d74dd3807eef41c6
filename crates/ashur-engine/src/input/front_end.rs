use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use log::debug;

use crate::config::{EngineConfig, MAX_PLAYERS};

use super::controls::Controls;
use super::joystick::{JoystickBindings, JoystickSource};
use super::keyboard::KeyboardBindings;
use super::state::InputState;
use super::touch::{TouchKeyMap, TouchScreenController, TouchSource};

/// Device driving one player.
///
/// Text form: `keyboard`, `joystick:N`, `none`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum PlayerSource {
    Keyboard,
    Joystick(usize),
    None,
}

impl fmt::Display for PlayerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlayerSource::Keyboard => f.write_str("keyboard"),
            PlayerSource::Joystick(n) => write!(f, "joystick:{n}"),
            PlayerSource::None => f.write_str("none"),
        }
    }
}

impl FromStr for PlayerSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("keyboard") {
            return Ok(PlayerSource::Keyboard);
        }
        if s.eq_ignore_ascii_case("none") {
            return Ok(PlayerSource::None);
        }
        let index = s
            .split_once(':')
            .filter(|(kind, _)| kind.trim().eq_ignore_ascii_case("joystick"))
            .map(|(_, n)| n.trim())
            .ok_or_else(|| format!("expected keyboard, joystick:N or none, got `{s}`"))?;
        index
            .parse()
            .map(PlayerSource::Joystick)
            .map_err(|_| format!("invalid joystick index `{index}`"))
    }
}

/// Merges keyboard, joystick and touch into per-player [`Controls`].
///
/// Each player reads from its configured source; touch is applied last and
/// only to the first player.
#[derive(Debug, Clone)]
pub struct InputFrontEnd {
    players: [Controls; MAX_PLAYERS],
    player_count: usize,
    sources: [PlayerSource; MAX_PLAYERS],
    keyboard: KeyboardBindings,
    joystick_enabled: bool,
    deadzone: f32,
    joysticks: BTreeMap<usize, JoystickBindings>,
    touch: TouchScreenController,
}

impl Default for InputFrontEnd {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

impl InputFrontEnd {
    pub fn from_config(config: &EngineConfig) -> Self {
        let mut map = TouchKeyMap::default();
        map.set_canvas_size(config.touch.canvas_width as f32, config.touch.canvas_height as f32);
        let mut touch = TouchScreenController::new(map);
        touch.set_enabled(config.touch.enabled);

        let joysticks = config
            .joystick
            .devices
            .iter()
            .map(|(&index, table)| (index, JoystickBindings::from_table(table)))
            .collect();

        Self {
            players: [Controls::default(); MAX_PLAYERS],
            player_count: config.players.count.clamp(1, MAX_PLAYERS),
            sources: config.players.sources,
            keyboard: KeyboardBindings::default(),
            joystick_enabled: config.joystick.enabled,
            deadzone: config.joystick.deadzone,
            joysticks,
            touch,
        }
    }

    pub fn player_count(&self) -> usize {
        self.player_count
    }

    /// Controls of player `player` (0-based); default for unused slots.
    pub fn controls(&self, player: usize) -> Controls {
        self.players.get(player).copied().unwrap_or_default()
    }

    pub fn players(&self) -> &[Controls] {
        &self.players[..self.player_count]
    }

    pub fn source(&self, player: usize) -> Option<PlayerSource> {
        self.sources.get(player).copied()
    }

    pub fn set_source(&mut self, player: usize, source: PlayerSource) {
        if let Some(slot) = self.sources.get_mut(player) {
            *slot = source;
        }
    }

    pub fn keyboard_bindings_mut(&mut self) -> &mut KeyboardBindings {
        &mut self.keyboard
    }

    /// Bindings of joystick `index`, created from defaults on first use.
    pub fn joystick_bindings_mut(&mut self, index: usize) -> &mut JoystickBindings {
        self.joysticks.entry(index).or_default()
    }

    pub fn touch(&self) -> &TouchScreenController {
        &self.touch
    }

    pub fn touch_mut(&mut self) -> &mut TouchScreenController {
        &mut self.touch
    }

    /// Polls every source and rewrites all player controls.
    pub fn update(
        &mut self,
        keyboard: &InputState,
        touch: &dyn TouchSource,
        joysticks: &mut dyn JoystickSource,
    ) {
        if self.joystick_enabled {
            joysticks.refresh();
        }

        for player in 0..MAX_PLAYERS {
            let mut c = Controls::default();
            if player < self.player_count {
                match self.sources[player] {
                    PlayerSource::Keyboard => self.keyboard.apply(keyboard, &mut c),
                    PlayerSource::Joystick(n) if self.joystick_enabled => {
                        match joysticks.poll(n) {
                            Some(snapshot) => {
                                let bindings = self.joysticks.entry(n).or_default();
                                bindings.apply(&snapshot, self.deadzone, &mut c);
                            }
                            None => debug!("joystick {n} of player {} not available", player + 1),
                        }
                    }
                    PlayerSource::Joystick(_) | PlayerSource::None => {}
                }
                if player == 0 {
                    self.touch.update(touch, &mut c);
                }
            }
            self.players[player] = c;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{
        FingerSample, HatDirection, InputEvent, InputFrame, JoystickSnapshot, Key, KeyState, Modifiers, NoJoysticks,
    };

    struct OnePad(JoystickSnapshot);

    impl JoystickSource for OnePad {
        fn device_count(&self) -> usize {
            1
        }

        fn poll(&mut self, index: usize) -> Option<JoystickSnapshot> {
            (index == 0).then(|| self.0.clone())
        }
    }

    struct OneFinger(f32, f32);

    impl TouchSource for OneFinger {
        fn device_count(&self) -> usize {
            1
        }

        fn fingers(&self, _device: usize) -> Vec<FingerSample> {
            vec![FingerSample { id: 0, x: self.0, y: self.1, pressure: 1.0 }]
        }
    }

    fn holding(key: Key) -> InputState {
        let mut state = InputState::default();
        state.apply_event(
            &mut InputFrame::default(),
            InputEvent::Key { key, state: KeyState::Pressed, modifiers: Modifiers::default(), code: 0, repeat: false },
        );
        state
    }

    fn two_players() -> InputFrontEnd {
        let mut config = EngineConfig::default();
        config.players.count = 2;
        config.players.sources = [PlayerSource::Keyboard, PlayerSource::Joystick(0), PlayerSource::None, PlayerSource::None];
        InputFrontEnd::from_config(&config)
    }

    #[test]
    fn player_sources_parse_and_print() {
        for text in ["keyboard", "joystick:2", "none"] {
            let source: PlayerSource = text.parse().unwrap();
            assert_eq!(source.to_string(), text);
        }
        assert_eq!(" Joystick : 1 ".parse::<PlayerSource>(), Ok(PlayerSource::Joystick(1)));
        assert!("mouse".parse::<PlayerSource>().is_err());
        assert!("joystick:x".parse::<PlayerSource>().is_err());
    }

    #[test]
    fn each_player_reads_its_own_source() {
        let mut fe = two_players();
        let mut pad = JoystickSnapshot { buttons: vec![true], axes: vec![], hats: vec![HatDirection::Up.mask()] };
        pad.buttons.resize(10, false);

        fe.update(&holding(Key::ArrowRight), &OneFinger(0.5, 0.1), &mut OnePad(pad));

        let p1 = fe.controls(0);
        let p2 = fe.controls(1);
        assert!(p1.right && !p1.jump);
        assert!(p2.jump && p2.up && !p2.right);
        assert!(!fe.controls(2).any_held());
        assert_eq!(fe.players().len(), 2);
    }

    #[test]
    fn missing_joystick_means_no_input() {
        let mut fe = two_players();
        fe.update(&InputState::default(), &OneFinger(0.5, 0.1), &mut NoJoysticks);
        assert!(!fe.controls(1).any_held());
    }

    #[test]
    fn touch_is_merged_into_the_first_player() {
        let mut fe = two_players();
        // Jump key centre on the default canvas.
        let finger = OneFinger(951.5 / 1024.0, 441.5 / 600.0);
        fe.update(&holding(Key::ArrowLeft), &finger, &mut NoJoysticks);

        let p1 = fe.controls(0);
        assert!(p1.left && p1.jump);
        assert!(!fe.controls(1).jump);
    }
}
