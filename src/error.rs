use core::result;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = result::Result<T, Error>;

/// An Error that can occur in this crate
#[derive(Error, Debug)]
pub enum Error {
    #[error("{0}")]
    GpioError(#[from] rppal::gpio::Error),

    #[error("{0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("{0}")]
    SignalError(#[from] ctrlc::Error),

    #[error("{0}")]
    IoError(#[from] io::Error),

    #[error("Failed to write {path}: {source}")]
    WriteError { path: PathBuf, source: io::Error },

    #[error("'{0}' is not a position. Type a number between 0-100 or 'off'")]
    InvalidPosition(String),

    #[error("{0} is out of range. Type a number between 0-100 or 'off'")]
    PositionOutOfRange(u64),

    #[error("'{0}' is not a servo. Choose one of claw, wrist, lower_arm, upper_arm, shoulder, base")]
    UnknownActuator(String),

    #[error("Invalid command '{0}'. Type a number between 0-100, 'off', 'save', 'save_all' or 'exit'")]
    UnknownCommand(String),

    #[error("Invalid choice '{0}'. Pick a servo 1-6, 's' to save all or 'q' to quit")]
    UnknownChoice(String),

    #[error("Operator input closed")]
    InputClosed,
}

impl Error {
    /// Errors the operator can correct at the prompt.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidPosition(_)
                | Error::PositionOutOfRange(_)
                | Error::UnknownActuator(_)
                | Error::UnknownCommand(_)
                | Error::UnknownChoice(_)
        )
    }
}
