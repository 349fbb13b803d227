use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};

use crate::{Error, Result};

/// The six servos of the arm, in wiring order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Actuator {
    Claw,
    Wrist,
    LowerArm,
    UpperArm,
    Shoulder,
    Base,
}

impl Actuator {
    pub const ALL: [Actuator; 6] = [
        Actuator::Claw,
        Actuator::Wrist,
        Actuator::LowerArm,
        Actuator::UpperArm,
        Actuator::Shoulder,
        Actuator::Base,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Menu numbering starts at 1.
    pub fn from_menu_number(n: usize) -> Option<Actuator> {
        n.checked_sub(1).and_then(|i| Actuator::ALL.get(i).copied())
    }

    pub fn name(self) -> &'static str {
        match self {
            Actuator::Claw => "claw",
            Actuator::Wrist => "wrist",
            Actuator::LowerArm => "lower_arm",
            Actuator::UpperArm => "upper_arm",
            Actuator::Shoulder => "shoulder",
            Actuator::Base => "base",
        }
    }

    /// BCM pin the servo signal wire is soldered to on the stock harness.
    pub fn default_pin(self) -> u8 {
        match self {
            Actuator::Claw => 17,     // purple
            Actuator::Wrist => 18,    // blue
            Actuator::LowerArm => 22, // green
            Actuator::UpperArm => 23, // yellow
            Actuator::Shoulder => 24, // orange
            Actuator::Base => 25,     // red
        }
    }
}

impl Display for Actuator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Actuator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        if let Ok(n) = wanted.parse::<usize>() {
            return Actuator::from_menu_number(n).ok_or_else(|| Error::UnknownActuator(s.to_string()));
        }
        Actuator::ALL
            .into_iter()
            .find(|a| a.name() == wanted)
            .ok_or_else(|| Error::UnknownActuator(s.to_string()))
    }
}

/// Logical servo target: 0-100, or unpowered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    Off,
    At(u8),
}

impl Position {
    pub const MAX: u8 = 100;
    pub const MID: Position = Position::At(50);

    /// Rejects an `At` beyond 100.
    pub fn validate(self) -> Result<Self> {
        match self {
            Position::At(v) if v > Position::MAX => Err(Error::PositionOutOfRange(u64::from(v))),
            p => Ok(p),
        }
    }

    /// Maps 0..=100 linearly onto -1.0..=1.0 with 50 at 0.0. `None` for `Off`.
    pub fn normalized(self) -> Option<f64> {
        match self {
            Position::Off => None,
            Position::At(v) => Some((f64::from(v) - 50.0) / 50.0),
        }
    }
}

impl TryFrom<u64> for Position {
    type Error = Error;

    fn try_from(v: u64) -> Result<Self> {
        if v <= u64::from(Position::MAX) {
            Ok(Position::At(v as u8))
        } else {
            Err(Error::PositionOutOfRange(v))
        }
    }
}

impl FromStr for Position {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("off") {
            return Ok(Position::Off);
        }
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::InvalidPosition(s.to_string()));
        }
        let v = s
            .parse::<u64>()
            .map_err(|_| Error::PositionOutOfRange(u64::MAX))?;
        Position::try_from(v)
    }
}

impl Display for Position {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Position::Off => f.write_str("off"),
            Position::At(v) => write!(f, "{}", v),
        }
    }
}

impl Serialize for Position {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Position::Off => serializer.serialize_str("off"),
            Position::At(v) => serializer.serialize_u8(*v),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawPosition {
    Number(u64),
    Word(String),
}

impl<'de> Deserialize<'de> for Position {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        match RawPosition::deserialize(deserializer)? {
            RawPosition::Number(v) => Position::try_from(v).map_err(de::Error::custom),
            RawPosition::Word(w) => w.parse().map_err(de::Error::custom),
        }
    }
}

/// What a channel is doing right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Uninitialized,
    Holding(u8),
    Released,
}

/// A line typed while controlling one servo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Move(Position),
    Save,
    SaveAll,
    Exit,
}

impl FromStr for Command {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "save" => Ok(Command::Save),
            "save_all" => Ok(Command::SaveAll),
            "exit" | "q" | "quit" | "back" => Ok(Command::Exit),
            _ => match s.parse::<Position>() {
                Ok(p) => Ok(Command::Move(p)),
                Err(Error::InvalidPosition(_)) => Err(Error::UnknownCommand(s.trim().to_string())),
                Err(e) => Err(e),
            },
        }
    }
}

/// A selection from the top-level menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    Select(Actuator),
    SaveAll,
    Quit,
}

impl Choice {
    pub fn from_key(key: char) -> Result<Self> {
        match key.to_ascii_lowercase() {
            's' => Ok(Choice::SaveAll),
            'q' => Ok(Choice::Quit),
            d => d
                .to_digit(10)
                .and_then(|n| Actuator::from_menu_number(n as usize))
                .map(Choice::Select)
                .ok_or_else(|| Error::UnknownChoice(key.to_string())),
        }
    }
}

impl FromStr for Choice {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "s" | "save" | "save_all" => Ok(Choice::SaveAll),
            "q" | "quit" | "exit" => Ok(Choice::Quit),
            other => other
                .parse::<Actuator>()
                .map(Choice::Select)
                .map_err(|_| Error::UnknownChoice(s.trim().to_string())),
        }
    }
}
