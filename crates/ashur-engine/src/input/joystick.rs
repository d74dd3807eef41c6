use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use log::warn;

use super::controls::{ControlCommand, Controls};

/// Direction bits of a hat switch.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum HatDirection {
    Up,
    Right,
    Down,
    Left,
}

impl HatDirection {
    pub fn mask(self) -> u8 {
        match self {
            HatDirection::Up => 0x1,
            HatDirection::Right => 0x2,
            HatDirection::Down => 0x4,
            HatDirection::Left => 0x8,
        }
    }

    fn name(self) -> &'static str {
        match self {
            HatDirection::Up => "up",
            HatDirection::Right => "right",
            HatDirection::Down => "down",
            HatDirection::Left => "left",
        }
    }
}

/// One physical joystick input.
///
/// Text form: `button:N`, `axis:N:+`, `axis:N:-`, `hat:N:up|down|left|right`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum JoyInput {
    Button(u32),
    Axis { index: u32, positive: bool },
    Hat { index: u32, direction: HatDirection },
}

impl fmt::Display for JoyInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoyInput::Button(i) => write!(f, "button:{i}"),
            JoyInput::Axis { index, positive } => {
                write!(f, "axis:{index}:{}", if *positive { '+' } else { '-' })
            }
            JoyInput::Hat { index, direction } => write!(f, "hat:{index}:{}", direction.name()),
        }
    }
}

impl FromStr for JoyInput {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split(':').map(str::trim).collect();
        let index = |p: &str| {
            p.parse::<u32>()
                .map_err(|_| format!("invalid joystick input index in `{s}`"))
        };

        match parts.as_slice() {
            [kind, i] if kind.eq_ignore_ascii_case("button") => Ok(JoyInput::Button(index(*i)?)),
            [kind, i, sign] if kind.eq_ignore_ascii_case("axis") => {
                let positive = match *sign {
                    "+" => true,
                    "-" => false,
                    _ => return Err(format!("axis direction must be + or - in `{s}`")),
                };
                Ok(JoyInput::Axis { index: index(*i)?, positive })
            }
            [kind, i, dir] if kind.eq_ignore_ascii_case("hat") => {
                let direction = [HatDirection::Up, HatDirection::Right, HatDirection::Down, HatDirection::Left]
                    .into_iter()
                    .find(|d| d.name().eq_ignore_ascii_case(dir))
                    .ok_or_else(|| format!("unknown hat direction in `{s}`"))?;
                Ok(JoyInput::Hat { index: index(*i)?, direction })
            }
            _ => Err(format!("unrecognized joystick input `{s}`")),
        }
    }
}

/// State of one device at poll time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JoystickSnapshot {
    pub buttons: Vec<bool>,
    /// In [-1, 1].
    pub axes: Vec<f32>,
    /// [`HatDirection`] bit masks.
    pub hats: Vec<u8>,
}

impl JoystickSnapshot {
    pub fn is_active(&self, input: JoyInput, deadzone: f32) -> bool {
        match input {
            JoyInput::Button(i) => self.buttons.get(i as usize).copied().unwrap_or(false),
            JoyInput::Axis { index, positive } => {
                let v = self.axes.get(index as usize).copied().unwrap_or(0.0);
                if positive { v > deadzone } else { v < -deadzone }
            }
            JoyInput::Hat { index, direction } => self
                .hats
                .get(index as usize)
                .is_some_and(|h| h & direction.mask() != 0),
        }
    }

    /// Axis value with the dead zone removed and the rest rescaled to [-1, 1].
    pub fn axis(&self, index: u32, deadzone: f32) -> f32 {
        let v = self.axes.get(index as usize).copied().unwrap_or(0.0).clamp(-1.0, 1.0);
        if v.abs() <= deadzone || deadzone >= 1.0 {
            return 0.0;
        }
        v.signum() * (v.abs() - deadzone) / (1.0 - deadzone)
    }

    /// First active input: buttons, then axes, then hats.
    pub fn first_active(&self, deadzone: f32) -> Option<JoyInput> {
        let buttons = (0..self.buttons.len() as u32).map(JoyInput::Button);
        let axes = (0..self.axes.len() as u32).flat_map(|index| {
            [true, false].map(|positive| JoyInput::Axis { index, positive })
        });
        let hats = (0..self.hats.len() as u32).flat_map(|index| {
            [HatDirection::Up, HatDirection::Right, HatDirection::Down, HatDirection::Left]
                .map(|direction| JoyInput::Hat { index, direction })
        });
        buttons
            .chain(axes)
            .chain(hats)
            .find(|&input| self.is_active(input, deadzone))
    }
}

/// Polled joystick hardware.
///
/// A device that cannot be read reports `None`, which counts as no input.
pub trait JoystickSource {
    fn device_count(&self) -> usize;

    /// Called once per input poll before any [`poll`](Self::poll).
    fn refresh(&mut self) {}

    fn poll(&mut self, index: usize) -> Option<JoystickSnapshot>;
}

/// No joystick hardware.
#[derive(Debug, Default, Copy, Clone)]
pub struct NoJoysticks;

impl JoystickSource for NoJoysticks {
    fn device_count(&self) -> usize {
        0
    }

    fn poll(&mut self, _index: usize) -> Option<JoystickSnapshot> {
        None
    }
}

/// Joystick inputs bound to each command of one device.
#[derive(Debug, Clone, PartialEq)]
pub struct JoystickBindings {
    inputs: BTreeMap<ControlCommand, Vec<JoyInput>>,
    /// Axes feeding the analog stick.
    pub analog_axes: (u32, u32),
}

impl Default for JoystickBindings {
    fn default() -> Self {
        use JoyInput::{Axis, Button, Hat};
        let hat = |direction| Hat { index: 0, direction };
        let inputs = [
            (ControlCommand::Up, vec![hat(HatDirection::Up), Axis { index: 1, positive: false }]),
            (ControlCommand::Down, vec![hat(HatDirection::Down), Axis { index: 1, positive: true }]),
            (ControlCommand::Left, vec![hat(HatDirection::Left), Axis { index: 0, positive: false }]),
            (ControlCommand::Right, vec![hat(HatDirection::Right), Axis { index: 0, positive: true }]),
            (ControlCommand::Jump, vec![Button(0)]),
            (ControlCommand::AltJump, vec![Button(1)]),
            (ControlCommand::Run, vec![Button(2)]),
            (ControlCommand::AltRun, vec![Button(3)]),
            (ControlCommand::Drop, vec![Button(8)]),
            (ControlCommand::Start, vec![Button(9)]),
        ];
        Self {
            inputs: inputs.into_iter().collect(),
            analog_axes: (0, 1),
        }
    }
}

impl JoystickBindings {
    /// Defaults overridden by a `[joystick.N]` config table.
    ///
    /// Values are comma-separated inputs; `analog = X,Y` picks the stick axes.
    /// Unknown commands and unparsable values are logged and skipped.
    pub fn from_table(table: &BTreeMap<String, String>) -> Self {
        let mut bindings = Self::default();
        for (key, value) in table {
            if key.eq_ignore_ascii_case("analog") {
                match parse_axes(value) {
                    Some(axes) => bindings.analog_axes = axes,
                    None => warn!("invalid analog axes `{value}`; keeping {:?}", bindings.analog_axes),
                }
                continue;
            }

            let cmd = match key.parse::<ControlCommand>() {
                Ok(cmd) => cmd,
                Err(e) => {
                    warn!("{e}; ignoring joystick binding");
                    continue;
                }
            };
            let parsed: Result<Vec<JoyInput>, String> = value
                .split(',')
                .filter(|s| !s.trim().is_empty())
                .map(str::parse)
                .collect();
            match parsed {
                Ok(inputs) => bindings.bind(cmd, inputs),
                Err(e) => warn!("{e}; keeping default binding for {cmd}"),
            }
        }
        bindings
    }

    pub fn inputs(&self, cmd: ControlCommand) -> &[JoyInput] {
        self.inputs.get(&cmd).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn bind(&mut self, cmd: ControlCommand, inputs: impl IntoIterator<Item = JoyInput>) {
        self.inputs.insert(cmd, inputs.into_iter().collect());
    }

    /// Config table form of these bindings.
    pub fn to_table(&self) -> BTreeMap<String, String> {
        let mut table: BTreeMap<String, String> = self
            .inputs
            .iter()
            .map(|(cmd, inputs)| {
                let value = inputs.iter().map(ToString::to_string).collect::<Vec<_>>().join(",");
                (cmd.name().to_string(), value)
            })
            .collect();
        table.insert(
            "analog".to_string(),
            format!("{},{}", self.analog_axes.0, self.analog_axes.1),
        );
        table
    }

    /// Writes every command and the analog stick from `snapshot`.
    pub fn apply(&self, snapshot: &JoystickSnapshot, deadzone: f32, controls: &mut Controls) {
        for cmd in ControlCommand::ALL {
            let held = self.inputs(cmd).iter().any(|&i| snapshot.is_active(i, deadzone));
            controls.set(cmd, held);
        }
        controls.analog_x = snapshot.axis(self.analog_axes.0, deadzone);
        controls.analog_y = snapshot.axis(self.analog_axes.1, deadzone);
    }
}

fn parse_axes(value: &str) -> Option<(u32, u32)> {
    let (x, y) = value.split_once(',')?;
    Some((x.trim().parse().ok()?, y.trim().parse().ok()?))
}

/// Captures the first active input of a device, for interactive rebinding.
pub fn poll_binding(source: &mut dyn JoystickSource, index: usize, deadzone: f32) -> Option<JoyInput> {
    source.poll(index)?.first_active(deadzone)
}

#[cfg(feature = "gamepad")]
pub use gamepad::GilrsSource;

#[cfg(feature = "gamepad")]
mod gamepad {
    use gilrs::{Axis, Button, GamepadId, Gilrs};
    use log::{info, warn};

    use super::{HatDirection, JoystickSnapshot, JoystickSource};

    const BUTTONS: [Button; 13] = [
        Button::South,
        Button::East,
        Button::West,
        Button::North,
        Button::LeftTrigger,
        Button::RightTrigger,
        Button::LeftTrigger2,
        Button::RightTrigger2,
        Button::Select,
        Button::Start,
        Button::LeftThumb,
        Button::RightThumb,
        Button::Mode,
    ];

    /// Gamepads seen through gilrs, indexed in connection order.
    pub struct GilrsSource {
        gilrs: Option<Gilrs>,
        ids: Vec<GamepadId>,
    }

    impl GilrsSource {
        /// Without a usable gamepad backend this reports no devices.
        pub fn new() -> Self {
            let gilrs = match Gilrs::new() {
                Ok(g) => Some(g),
                Err(e) => {
                    warn!("gamepad support unavailable: {e}");
                    None
                }
            };
            let mut source = Self { gilrs, ids: Vec::new() };
            source.rescan();
            if let Some(g) = &source.gilrs {
                for id in &source.ids {
                    info!("gamepad {}: {}", usize::from(*id), g.gamepad(*id).name());
                }
            }
            source
        }

        fn rescan(&mut self) {
            let Some(g) = &self.gilrs else { return };
            for (id, _) in g.gamepads() {
                if !self.ids.contains(&id) {
                    self.ids.push(id);
                }
            }
        }
    }

    impl Default for GilrsSource {
        fn default() -> Self {
            Self::new()
        }
    }

    impl JoystickSource for GilrsSource {
        fn device_count(&self) -> usize {
            self.ids.len()
        }

        fn refresh(&mut self) {
            if let Some(g) = &mut self.gilrs {
                while g.next_event().is_some() {}
            }
            self.rescan();
        }

        fn poll(&mut self, index: usize) -> Option<JoystickSnapshot> {
            let g = self.gilrs.as_ref()?;
            let pad = g.connected_gamepad(*self.ids.get(index)?)?;

            let buttons = BUTTONS.iter().map(|&b| pad.is_pressed(b)).collect();
            let axes = vec![
                pad.value(Axis::LeftStickX),
                -pad.value(Axis::LeftStickY),
                pad.value(Axis::RightStickX),
                -pad.value(Axis::RightStickY),
            ];
            let hat = [
                (Button::DPadUp, HatDirection::Up),
                (Button::DPadRight, HatDirection::Right),
                (Button::DPadDown, HatDirection::Down),
                (Button::DPadLeft, HatDirection::Left),
            ]
            .into_iter()
            .filter(|&(b, _)| pad.is_pressed(b))
            .fold(0u8, |m, (_, d)| m | d.mask());

            Some(JoystickSnapshot { buttons, axes, hats: vec![hat] })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Pads(Vec<Option<JoystickSnapshot>>);

    impl JoystickSource for Pads {
        fn device_count(&self) -> usize {
            self.0.len()
        }

        fn poll(&mut self, index: usize) -> Option<JoystickSnapshot> {
            self.0.get(index).cloned().flatten()
        }
    }

    fn snapshot() -> JoystickSnapshot {
        JoystickSnapshot {
            buttons: vec![false; 10],
            axes: vec![0.0; 4],
            hats: vec![0],
        }
    }

    // ── parsing ───────────────────────────────────────────────────────────

    #[test]
    fn inputs_parse_and_print() {
        for text in ["button:3", "axis:1:-", "axis:0:+", "hat:0:left"] {
            let input: JoyInput = text.parse().unwrap();
            assert_eq!(input.to_string(), text);
        }
        assert_eq!(" Hat : 1 : UP ".parse::<JoyInput>(), Ok(JoyInput::Hat { index: 1, direction: HatDirection::Up }));
        for bad in ["", "button", "button:x", "axis:1", "axis:1:*", "hat:0:north", "key:1"] {
            assert!(bad.parse::<JoyInput>().is_err(), "{bad}");
        }
    }

    #[test]
    fn table_overrides_defaults_and_skips_garbage() {
        let table: BTreeMap<String, String> = [
            ("jump", "button:5, button:6"),
            ("run", "button:nope"),
            ("fly", "button:1"),
            ("analog", "2,3"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let b = JoystickBindings::from_table(&table);
        assert_eq!(b.inputs(ControlCommand::Jump), &[JoyInput::Button(5), JoyInput::Button(6)]);
        assert_eq!(b.inputs(ControlCommand::Run), JoystickBindings::default().inputs(ControlCommand::Run));
        assert_eq!(b.analog_axes, (2, 3));
        assert_eq!(JoystickBindings::from_table(&b.to_table()), b);
    }

    // ── mapping ───────────────────────────────────────────────────────────

    #[test]
    fn snapshot_maps_to_controls() {
        let mut s = snapshot();
        s.buttons[0] = true;
        s.hats[0] = HatDirection::Left.mask();
        s.axes[1] = 0.1;

        let mut c = Controls::default();
        c.start = true;
        JoystickBindings::default().apply(&s, 0.25, &mut c);

        assert!(c.jump && c.left);
        assert!(!c.down);
        assert!(!c.start);
        assert_eq!(c.analog_y, 0.0);
    }

    #[test]
    fn axis_outside_the_dead_zone_is_rescaled() {
        let mut s = snapshot();
        s.axes[0] = -1.0;
        s.axes[1] = 0.625;
        assert_eq!(s.axis(0, 0.25), -1.0);
        assert_eq!(s.axis(1, 0.25), 0.5);
        assert!(s.is_active(JoyInput::Axis { index: 1, positive: true }, 0.25));
        assert!(!s.is_active(JoyInput::Axis { index: 7, positive: true }, 0.25));
    }

    #[test]
    fn poll_binding_captures_the_first_active_input() {
        let mut s = snapshot();
        s.axes[2] = -0.9;
        s.hats[0] = HatDirection::Down.mask();
        let mut pads = Pads(vec![Some(snapshot()), Some(s), None]);

        assert_eq!(poll_binding(&mut pads, 0, 0.25), None);
        assert_eq!(poll_binding(&mut pads, 1, 0.25), Some(JoyInput::Axis { index: 2, positive: false }));
        assert_eq!(poll_binding(&mut pads, 2, 0.25), None);
        assert_eq!(poll_binding(&mut pads, 9, 0.25), None);
    }
}
