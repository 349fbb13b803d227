use std::io;
use std::process;

use clap::Parser;
use rppal::gpio::Gpio;
use tracing::error;

use roboarm::cli::{Cmd, Opts};
use roboarm::console::Terminal;
use roboarm::drive::{Arm, Channel, ServoChannel, SimulatedChannel};
use roboarm::session::{Outcome, Session};
use roboarm::store::PositionStore;
use roboarm::{logging, Result};

/// # Roboarm
/// Interactive controller for a six servo arm on Raspberry Pi GPIO.
///
/// Positions are restored from the most recent document on startup and
/// written back to it on exit, Ctrl-C included.
fn main() {
    logging::init();
    let opts = Opts::parse();

    match run(opts) {
        Ok(Outcome::Quit) => {}
        Ok(Outcome::Interrupted) => process::exit(130),
        Err(e) => {
            error!(error = %e, "fatal");
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}

fn run(opts: Opts) -> Result<Outcome> {
    let documents = opts.documents();
    let store = PositionStore::load(&documents.recent, &opts.defaults());

    if let Some(Cmd::SaveAll) = opts.command {
        println!("Saving all servo positions to {}.", documents.named.display());
        store.save_all(&documents.named)?;
        println!("All positions saved.");
        return Ok(Outcome::Quit);
    }

    if opts.simulate {
        let arm = Arm::new(opts.hold_policy(), |a| Ok(SimulatedChannel::new(a)))?;
        operate(&opts, store, arm)
    } else {
        let gpio = Gpio::new()?;
        let timing = opts.timing();
        let arm = Arm::new(opts.hold_policy(), |a| {
            ServoChannel::new(&gpio, a, opts.pin(a), timing)
        })?;
        operate(&opts, store, arm)
    }
}

fn operate<C: Channel>(opts: &Opts, store: PositionStore, arm: Arm<C>) -> Result<Outcome> {
    let terminal = Terminal::open()?;
    let mut session = Session::new(
        store,
        arm,
        terminal,
        io::stdout(),
        opts.documents(),
        opts.menu_input.into(),
    );

    session.start()?;
    let outcome = match opts.command {
        Some(Cmd::Control { actuator }) => session.control(actuator)?,
        _ => session.run()?,
    };
    session.finish(outcome)?;
    Ok(outcome)
}
