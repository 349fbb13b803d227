use std::thread;
use std::time::Duration;

use nix::sys::signal::{raise, Signal};

use roboarm::console::{Input, Mode, Prompt, Terminal};

#[test]
fn termination_signal_arrives_as_interrupt() {
    let mut terminal = Terminal::open().expect("terminal");

    raise(Signal::SIGTERM).expect("raise");
    // the handler runs on ctrlc's own thread
    thread::sleep(Duration::from_millis(300));

    assert_eq!(terminal.read(Mode::Line).expect("read"), Input::Interrupt);
}
