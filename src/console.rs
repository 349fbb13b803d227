//! Operator input.
//!
//! Stdin is read on its own thread so that Ctrl-C, SIGTERM and SIGHUP can be
//! delivered to the control loop as just another input, in order, while a
//! read is blocked.

use std::io::{self, BufRead, Read, Stdin};
use std::os::fd::AsFd;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use nix::sys::termios::{self, LocalFlags, SetArg, SpecialCharacterIndices, Termios};
use tracing::{debug, warn};

use crate::{Error, Result};

const CTRL_C: u8 = 0x03;
const CTRL_D: u8 = 0x04;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// One keystroke, no echo, no Enter needed.
    Key,
    /// A full line.
    Line,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Key(char),
    Line(String),
    Interrupt,
    Closed,
}

pub trait Prompt {
    fn read(&mut self, mode: Mode) -> Result<Input>;
}

/// The controlling terminal.
///
/// When stdin is not a terminal, key reads fall back to line reads.
pub struct Terminal {
    modes: Sender<Mode>,
    inputs: Receiver<Input>,
    cooked: Option<Termios>,
}

impl Terminal {
    /// Starts the reader thread and installs the interrupt handler.
    pub fn open() -> Result<Self> {
        let (modes, mode_rx) = mpsc::channel();
        let (tx, inputs) = mpsc::channel();

        let cooked = terminal_settings(io::stdin());

        let interrupt = tx.clone();
        ctrlc::set_handler(move || {
            let _ = interrupt.send(Input::Interrupt);
        })?;

        let settings = cooked.clone();
        thread::spawn(move || read_stdin(mode_rx, tx, settings));

        Ok(Self {
            modes,
            inputs,
            cooked,
        })
    }
}

impl Prompt for Terminal {
    fn read(&mut self, mode: Mode) -> Result<Input> {
        self.modes.send(mode).map_err(|_| Error::InputClosed)?;
        self.inputs.recv().map_err(|_| Error::InputClosed)
    }
}

impl Drop for Terminal {
    fn drop(&mut self) {
        if let Some(cooked) = &self.cooked {
            let _ = termios::tcsetattr(io::stdin(), SetArg::TCSANOW, cooked);
        }
    }
}

fn terminal_settings<Fd: AsFd>(fd: Fd) -> Option<Termios> {
    match termios::tcgetattr(fd) {
        Ok(settings) => Some(settings),
        Err(e) => {
            debug!(error = %e, "stdin is not a terminal, reading lines only");
            None
        }
    }
}

fn read_stdin(modes: Receiver<Mode>, tx: Sender<Input>, cooked: Option<Termios>) {
    let stdin = io::stdin();
    for mode in modes {
        let input = match (mode, &cooked) {
            (Mode::Key, Some(cooked)) => read_key(&stdin, cooked),
            _ => read_line(&mut stdin.lock()),
        }
        .unwrap_or_else(|e| {
            warn!(error = %e, "stdin read failed");
            Input::Closed
        });

        let closed = input == Input::Closed;
        if tx.send(input).is_err() || closed {
            break;
        }
    }
    debug!("stdin reader exiting...");
}

/// Bytes that are not UTF-8 still make a line; the parser rejects it later.
fn read_line(reader: &mut impl BufRead) -> io::Result<Input> {
    let mut line = Vec::new();
    if reader.read_until(b'\n', &mut line)? == 0 {
        return Ok(Input::Closed);
    }
    let line = String::from_utf8_lossy(&line);
    Ok(Input::Line(line.trim_end_matches(&['\r', '\n'][..]).to_string()))
}

fn read_key(stdin: &Stdin, cooked: &Termios) -> io::Result<Input> {
    let mut raw = cooked.clone();
    raw.local_flags
        .remove(LocalFlags::ICANON | LocalFlags::ECHO | LocalFlags::ISIG);
    raw.control_chars[SpecialCharacterIndices::VMIN as usize] = 1;
    raw.control_chars[SpecialCharacterIndices::VTIME as usize] = 0;

    termios::tcsetattr(stdin, SetArg::TCSANOW, &raw)?;
    let mut byte = [0u8; 1];
    let read = stdin.lock().read(&mut byte);
    termios::tcsetattr(stdin, SetArg::TCSANOW, cooked)?;

    Ok(match (read?, byte[0]) {
        (0, _) | (_, CTRL_D) => Input::Closed,
        (_, CTRL_C) => Input::Interrupt,
        (_, b) => Input::Key(char::from(b)),
    })
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn lines_are_read_until_eof() {
        let mut input = Cursor::new(b"1\r\n30\nexit".to_vec());
        assert_eq!(read_line(&mut input).unwrap(), Input::Line("1".to_string()));
        assert_eq!(read_line(&mut input).unwrap(), Input::Line("30".to_string()));
        assert_eq!(read_line(&mut input).unwrap(), Input::Line("exit".to_string()));
        assert_eq!(read_line(&mut input).unwrap(), Input::Closed);
    }

    #[test]
    fn invalid_utf8_is_a_line_not_the_end() {
        let mut input = Cursor::new(b"\xff\xfe\n30\n".to_vec());
        assert_eq!(
            read_line(&mut input).unwrap(),
            Input::Line("\u{FFFD}\u{FFFD}".to_string())
        );
        assert_eq!(read_line(&mut input).unwrap(), Input::Line("30".to_string()));
    }

    #[test]
    fn regular_file_has_no_terminal_settings() {
        let file = tempfile::tempfile().expect("tempfile");
        assert!(terminal_settings(&file).is_none());
    }
}
