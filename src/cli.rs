use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use clap::{Parser, Subcommand};
use git_version::git_version;

use crate::api::{Actuator, Position};
use crate::console::Mode;
use crate::drive::{HoldPolicy, PulseTiming};
use crate::store::{Documents, Snapshot};

const GIT_VERSION: &str = git_version!(args = ["--always", "--dirty=-modified"], fallback = "unknown");

/// Interactive controller for a six servo robotic arm.
#[derive(Parser, Debug)]
#[clap(name = "Roboarm", version = GIT_VERSION)]
pub struct Opts {
    /// Written on exit, restored on startup
    #[clap(long, env = "ROBOARM_RECENT_FILE", default_value = "recent_servo_states.yaml")]
    pub recent_file: PathBuf,

    /// Written only by explicit saves
    #[clap(long, env = "ROBOARM_STATE_FILE", default_value = "servo_states.yaml")]
    pub state_file: PathBuf,

    /// Position of servos with nothing saved: mid or off
    #[clap(long, env = "ROBOARM_DEFAULT_POSITION", default_value = "off")]
    pub default_position: DefaultPosition,

    /// Let each move settle, then hold it
    #[clap(long)]
    pub hold_after_move: bool,

    #[clap(long, default_value = "500")]
    pub settle_ms: u64,

    #[clap(long, default_value = "20")]
    pub period_ms: u64,

    #[clap(long, default_value = "500")]
    pub pulse_min_us: u64,

    #[clap(long, default_value = "2500")]
    pub pulse_max_us: u64,

    #[clap(long, default_value = "17")]
    pub claw_pin: u8,

    #[clap(long, default_value = "18")]
    pub wrist_pin: u8,

    #[clap(long, default_value = "22")]
    pub lower_arm_pin: u8,

    #[clap(long, default_value = "23")]
    pub upper_arm_pin: u8,

    #[clap(long, default_value = "24")]
    pub shoulder_pin: u8,

    #[clap(long, default_value = "25")]
    pub base_pin: u8,

    /// Run without GPIO
    #[clap(long)]
    pub simulate: bool,

    /// Top-level menu input: key or line
    #[clap(long, default_value = "key")]
    pub menu_input: MenuInput,

    #[clap(subcommand)]
    pub command: Option<Cmd>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cmd {
    /// Control a specific servo
    Control { actuator: Actuator },
    /// Save the most recent servo positions to the state file
    SaveAll,
}

impl Opts {
    pub fn documents(&self) -> Documents {
        Documents {
            recent: self.recent_file.clone(),
            named: self.state_file.clone(),
        }
    }

    pub fn defaults(&self) -> Snapshot {
        Snapshot::uniform(self.default_position.into())
    }

    pub fn hold_policy(&self) -> HoldPolicy {
        HoldPolicy {
            hold_after_move: self.hold_after_move,
            settle: Duration::from_millis(self.settle_ms),
        }
    }

    pub fn timing(&self) -> PulseTiming {
        PulseTiming {
            period: Duration::from_millis(self.period_ms),
            min: Duration::from_micros(self.pulse_min_us),
            max: Duration::from_micros(self.pulse_max_us),
        }
    }

    pub fn pin(&self, actuator: Actuator) -> u8 {
        match actuator {
            Actuator::Claw => self.claw_pin,
            Actuator::Wrist => self.wrist_pin,
            Actuator::LowerArm => self.lower_arm_pin,
            Actuator::UpperArm => self.upper_arm_pin,
            Actuator::Shoulder => self.shoulder_pin,
            Actuator::Base => self.base_pin,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultPosition {
    Mid,
    Off,
}

impl FromStr for DefaultPosition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mid" => Ok(DefaultPosition::Mid),
            "off" => Ok(DefaultPosition::Off),
            unsupported => Err(format!("{} is not a default position, use mid or off", unsupported)),
        }
    }
}

impl From<DefaultPosition> for Position {
    fn from(d: DefaultPosition) -> Self {
        match d {
            DefaultPosition::Mid => Position::MID,
            DefaultPosition::Off => Position::Off,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuInput {
    Key,
    Line,
}

impl FromStr for MenuInput {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "key" => Ok(MenuInput::Key),
            "line" => Ok(MenuInput::Line),
            unsupported => Err(format!("{} is not a menu input, use key or line", unsupported)),
        }
    }
}

impl From<MenuInput> for Mode {
    fn from(i: MenuInput) -> Self {
        match i {
            MenuInput::Key => Mode::Key,
            MenuInput::Line => Mode::Line,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_stock_harness() {
        let opts = Opts::try_parse_from(["roboarm"]).expect("parse");
        for actuator in Actuator::ALL {
            assert_eq!(opts.pin(actuator), actuator.default_pin());
        }
        assert_eq!(opts.timing(), PulseTiming::default());
        assert_eq!(opts.defaults(), Snapshot::uniform(Position::Off));
        assert!(!opts.hold_policy().hold_after_move);
        assert_eq!(opts.command, None);
    }

    #[test]
    fn parses_policies_and_subcommands() {
        let opts = Opts::try_parse_from([
            "roboarm",
            "--default-position",
            "mid",
            "--hold-after-move",
            "--menu-input",
            "line",
            "control",
            "lower_arm",
        ])
        .expect("parse");
        assert_eq!(opts.defaults(), Snapshot::uniform(Position::MID));
        assert!(opts.hold_policy().hold_after_move);
        assert_eq!(Mode::from(opts.menu_input), Mode::Line);
        assert_eq!(
            opts.command,
            Some(Cmd::Control {
                actuator: Actuator::LowerArm
            })
        );

        let opts = Opts::try_parse_from(["roboarm", "save-all"]).expect("parse");
        assert_eq!(opts.command, Some(Cmd::SaveAll));
    }

    #[test]
    fn rejects_unknown_values() {
        assert!(Opts::try_parse_from(["roboarm", "--default-position", "low"]).is_err());
        assert!(Opts::try_parse_from(["roboarm", "control", "elbow"]).is_err());
    }
}
