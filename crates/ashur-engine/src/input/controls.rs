use std::fmt;
use std::str::FromStr;

/// Gameplay commands a player can hold.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum ControlCommand {
    Up,
    Down,
    Left,
    Right,
    Jump,
    AltJump,
    Run,
    AltRun,
    Drop,
    Start,
}

impl ControlCommand {
    pub const ALL: [ControlCommand; 10] = [
        ControlCommand::Up,
        ControlCommand::Down,
        ControlCommand::Left,
        ControlCommand::Right,
        ControlCommand::Jump,
        ControlCommand::AltJump,
        ControlCommand::Run,
        ControlCommand::AltRun,
        ControlCommand::Drop,
        ControlCommand::Start,
    ];

    /// Name used in config files.
    pub fn name(self) -> &'static str {
        match self {
            ControlCommand::Up => "up",
            ControlCommand::Down => "down",
            ControlCommand::Left => "left",
            ControlCommand::Right => "right",
            ControlCommand::Jump => "jump",
            ControlCommand::AltJump => "alt_jump",
            ControlCommand::Run => "run",
            ControlCommand::AltRun => "alt_run",
            ControlCommand::Drop => "drop",
            ControlCommand::Start => "start",
        }
    }
}

impl fmt::Display for ControlCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ControlCommand {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        ControlCommand::ALL
            .into_iter()
            .find(|c| c.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown control command `{s}`"))
    }
}

/// One player's control state for the current tick.
///
/// Input front-ends write it once per poll; gameplay reads it.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Controls {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    pub jump: bool,
    pub alt_jump: bool,
    pub run: bool,
    pub alt_run: bool,
    pub drop: bool,
    pub start: bool,
    /// Analog stick in [-1, 1], +X right, +Y down.
    pub analog_x: f32,
    pub analog_y: f32,
}

impl Controls {
    pub fn get(&self, cmd: ControlCommand) -> bool {
        match cmd {
            ControlCommand::Up => self.up,
            ControlCommand::Down => self.down,
            ControlCommand::Left => self.left,
            ControlCommand::Right => self.right,
            ControlCommand::Jump => self.jump,
            ControlCommand::AltJump => self.alt_jump,
            ControlCommand::Run => self.run,
            ControlCommand::AltRun => self.alt_run,
            ControlCommand::Drop => self.drop,
            ControlCommand::Start => self.start,
        }
    }

    pub fn set(&mut self, cmd: ControlCommand, on: bool) {
        let field = match cmd {
            ControlCommand::Up => &mut self.up,
            ControlCommand::Down => &mut self.down,
            ControlCommand::Left => &mut self.left,
            ControlCommand::Right => &mut self.right,
            ControlCommand::Jump => &mut self.jump,
            ControlCommand::AltJump => &mut self.alt_jump,
            ControlCommand::Run => &mut self.run,
            ControlCommand::AltRun => &mut self.alt_run,
            ControlCommand::Drop => &mut self.drop,
            ControlCommand::Start => &mut self.start,
        };
        *field = on;
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn any_held(&self) -> bool {
        ControlCommand::ALL.into_iter().any(|c| self.get(c))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_round_trip_through_names() {
        for cmd in ControlCommand::ALL {
            assert_eq!(cmd.to_string().parse::<ControlCommand>(), Ok(cmd));
        }
        assert_eq!(" ALT_RUN ".parse::<ControlCommand>(), Ok(ControlCommand::AltRun));
        assert!("fly".parse::<ControlCommand>().is_err());
    }

    #[test]
    fn get_and_set_address_the_same_field() {
        let mut c = Controls::default();
        for cmd in ControlCommand::ALL {
            c.set(cmd, true);
            assert!(c.get(cmd));
            assert_eq!(ControlCommand::ALL.into_iter().filter(|&o| c.get(o)).count(), 1);
            c.set(cmd, false);
        }
        assert!(!c.any_held());
    }
}
