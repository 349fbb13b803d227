use std::io::Write;

use tracing::{info, warn};

use crate::api::{Actuator, Choice, Command, Position};
use crate::console::{Input, Mode, Prompt};
use crate::drive::{Arm, Channel};
use crate::store::{Documents, PositionStore};
use crate::Result;

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Operator quit, or input ran out.
    Quit,
    /// Ctrl-C.
    Interrupted,
}

/// Everything one operator session works on. Built once in `main`.
pub struct Session<C, P, W> {
    store: PositionStore,
    arm: Arm<C>,
    prompt: P,
    out: W,
    documents: Documents,
    menu_mode: Mode,
}

impl<C: Channel, P: Prompt, W: Write> Session<C, P, W> {
    pub fn new(
        store: PositionStore,
        arm: Arm<C>,
        prompt: P,
        out: W,
        documents: Documents,
        menu_mode: Mode,
    ) -> Self {
        Self {
            store,
            arm,
            prompt,
            out,
            documents,
            menu_mode,
        }
    }

    pub fn store(&self) -> &PositionStore {
        &self.store
    }

    pub fn arm(&self) -> &Arm<C> {
        &self.arm
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    /// Puts every servo where the store says it is.
    pub fn start(&mut self) -> Result<()> {
        self.arm.restore(self.store.snapshot())?;
        info!("restored all servo positions");
        Ok(())
    }

    /// Top-level menu until the operator quits.
    pub fn run(&mut self) -> Result<Outcome> {
        loop {
            self.print_menu()?;
            let choice = match self.prompt.read(self.menu_mode)? {
                Input::Key(key) if key.is_whitespace() => continue,
                Input::Key(key) => {
                    writeln!(self.out, "{}", key)?;
                    Choice::from_key(key)
                }
                Input::Line(line) if line.trim().is_empty() => continue,
                Input::Line(line) => line.parse(),
                Input::Interrupt => return Ok(Outcome::Interrupted),
                Input::Closed => return Ok(Outcome::Quit),
            };

            match choice {
                Ok(Choice::Select(actuator)) => {
                    if let Some(outcome) = self.control_loop(actuator)? {
                        return Ok(outcome);
                    }
                }
                Ok(Choice::SaveAll) => self.save_all()?,
                Ok(Choice::Quit) => return Ok(Outcome::Quit),
                Err(e) if e.is_input_error() => writeln!(self.out, "{}", e)?,
                Err(e) => return Err(e),
            }
        }
    }

    /// Controls one servo. Leaving it ends the session.
    pub fn control(&mut self, actuator: Actuator) -> Result<Outcome> {
        Ok(self.control_loop(actuator)?.unwrap_or(Outcome::Quit))
    }

    /// Exit-time persistence. After an interrupt this is best-effort.
    pub fn finish(&mut self, outcome: Outcome) -> Result<()> {
        match outcome {
            Outcome::Quit => {
                self.store.save_all(&self.documents.recent)?;
                info!(path = %self.documents.recent.display(), "saved recent positions");
            }
            Outcome::Interrupted => {
                let _ = writeln!(self.out, "\nExiting. Holding all servos in position.");
                if let Err(e) = self.arm.hold_all() {
                    warn!(error = %e, "failed to hold servos");
                }
                if let Err(e) = self.store.save_all(&self.documents.recent) {
                    warn!(error = %e, "failed to save recent positions");
                }
            }
        }
        Ok(())
    }

    /// `None` when the operator goes back to the menu.
    fn control_loop(&mut self, actuator: Actuator) -> Result<Option<Outcome>> {
        writeln!(
            self.out,
            "Selected {}. Type values between 0-100 to move it, 'off' to release it, \
             'save' to save its position, 'save_all' to save all positions or 'exit' to go back.",
            actuator
        )?;

        loop {
            write!(self.out, "{} > ", actuator)?;
            self.out.flush()?;

            let line = match self.prompt.read(Mode::Line)? {
                Input::Line(line) => line,
                Input::Key(key) => key.to_string(),
                Input::Interrupt => {
                    writeln!(self.out, "\nExiting control mode for {}.", actuator)?;
                    return Ok(Some(Outcome::Interrupted));
                }
                Input::Closed => return Ok(Some(Outcome::Quit)),
            };
            if line.trim().is_empty() {
                continue;
            }

            match line.parse::<Command>() {
                Ok(Command::Move(position)) => self.move_to(actuator, position)?,
                Ok(Command::Save) => {
                    writeln!(
                        self.out,
                        "Saving {} position ({}) to {}.",
                        actuator,
                        self.store.get(actuator),
                        self.documents.named.display()
                    )?;
                    self.store.save_one(actuator, &self.documents.named)?;
                }
                Ok(Command::SaveAll) => self.save_all()?,
                Ok(Command::Exit) => return Ok(None),
                Err(e) if e.is_input_error() => writeln!(self.out, "{}", e)?,
                Err(e) => return Err(e),
            }
        }
    }

    fn move_to(&mut self, actuator: Actuator, position: Position) -> Result<()> {
        self.arm.apply(actuator, position)?;
        self.store.set(actuator, position)
    }

    fn save_all(&mut self) -> Result<()> {
        writeln!(
            self.out,
            "Saving all servo positions to {}.",
            self.documents.named.display()
        )?;
        self.store.save_all(&self.documents.named)?;
        writeln!(self.out, "All positions saved.")?;
        Ok(())
    }

    fn print_menu(&mut self) -> Result<()> {
        writeln!(self.out, "Servos:")?;
        for (n, (actuator, position)) in self.store.snapshot().iter().enumerate() {
            writeln!(self.out, "  {}) {} ({})", n + 1, actuator, position)?;
        }
        writeln!(self.out, "  s) save all  q) quit")?;
        write!(self.out, "> ")?;
        self.out.flush()?;
        Ok(())
    }
}
