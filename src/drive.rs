use std::thread;
use std::time::Duration;

use rppal::gpio::{Gpio, OutputPin};
use tracing::{debug, info};

use crate::api::{Actuator, Position, State};
use crate::store::Snapshot;
use crate::Result;

/// One servo signal line.
pub trait Channel {
    /// Starts (or changes) the signal for a command in -1.0..=1.0.
    fn drive(&mut self, command: f64) -> Result<()>;

    /// Re-asserts the last command so the servo keeps its torque.
    fn hold(&mut self) -> Result<()>;

    /// Stops the signal. The servo goes limp.
    fn release(&mut self) -> Result<()>;
}

/// Servo pulse train: one pulse per `period`, `min` wide at -1, `max` wide at +1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PulseTiming {
    pub period: Duration,
    pub min: Duration,
    pub max: Duration,
}

impl Default for PulseTiming {
    fn default() -> Self {
        Self {
            period: Duration::from_millis(20),
            min: Duration::from_micros(500),
            max: Duration::from_micros(2500),
        }
    }
}

impl PulseTiming {
    pub fn pulse_width(&self, command: f64) -> Duration {
        let min = self.min.as_micros() as f64;
        let max = self.max.as_micros() as f64;
        let us = min + (command.clamp(-1.0, 1.0) + 1.0) / 2.0 * (max - min);
        Duration::from_micros(us.round() as u64)
    }
}

/// Software PWM on a GPIO pin.
pub struct ServoChannel {
    actuator: Actuator,
    pin: OutputPin,
    timing: PulseTiming,
    pulse: Option<Duration>,
}

impl ServoChannel {
    pub fn new(gpio: &Gpio, actuator: Actuator, pin: u8, timing: PulseTiming) -> Result<Self> {
        let pin = gpio.get(pin)?.into_output_low();
        Ok(Self {
            actuator,
            pin,
            timing,
            pulse: None,
        })
    }
}

impl Channel for ServoChannel {
    fn drive(&mut self, command: f64) -> Result<()> {
        let pulse = self.timing.pulse_width(command);
        self.pin.set_pwm(self.timing.period, pulse)?;
        self.pulse = Some(pulse);
        debug!(servo = %self.actuator, command, pulse_us = pulse.as_micros() as u64, "pwm set");
        Ok(())
    }

    fn hold(&mut self) -> Result<()> {
        if let Some(pulse) = self.pulse {
            self.pin.set_pwm(self.timing.period, pulse)?;
        }
        Ok(())
    }

    fn release(&mut self) -> Result<()> {
        self.pin.clear_pwm()?;
        self.pin.set_low();
        self.pulse = None;
        debug!(servo = %self.actuator, "pwm cleared");
        Ok(())
    }
}

impl Drop for ServoChannel {
    fn drop(&mut self) {
        debug!(servo = %self.actuator, "dropping channel");
        let _ = self.pin.clear_pwm();
    }
}

/// Stands in for a servo when no GPIO is available.
#[derive(Debug)]
pub struct SimulatedChannel {
    actuator: Actuator,
    command: Option<f64>,
    holds: usize,
}

impl SimulatedChannel {
    pub fn new(actuator: Actuator) -> Self {
        Self {
            actuator,
            command: None,
            holds: 0,
        }
    }

    /// Last command driven, `None` while released.
    pub fn command(&self) -> Option<f64> {
        self.command
    }

    pub fn holds(&self) -> usize {
        self.holds
    }
}

impl Channel for SimulatedChannel {
    fn drive(&mut self, command: f64) -> Result<()> {
        info!(servo = %self.actuator, command, "simulated drive");
        self.command = Some(command);
        Ok(())
    }

    fn hold(&mut self) -> Result<()> {
        if self.command.is_some() {
            self.holds += 1;
        }
        Ok(())
    }

    fn release(&mut self) -> Result<()> {
        info!(servo = %self.actuator, "simulated release");
        self.command = None;
        Ok(())
    }
}

/// Whether to let a servo settle and then explicitly hold after every move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HoldPolicy {
    pub hold_after_move: bool,
    pub settle: Duration,
}

impl Default for HoldPolicy {
    fn default() -> Self {
        Self {
            hold_after_move: false,
            settle: Duration::from_millis(500),
        }
    }
}

/// The six channels and what each one is doing.
pub struct Arm<C> {
    channels: Vec<C>,
    states: [State; 6],
    policy: HoldPolicy,
}

impl<C: Channel> Arm<C> {
    /// Opens one channel per servo, in `Actuator::ALL` order.
    pub fn new(policy: HoldPolicy, open: impl FnMut(Actuator) -> Result<C>) -> Result<Self> {
        let channels = Actuator::ALL
            .into_iter()
            .map(open)
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            channels,
            states: [State::Uninitialized; 6],
            policy,
        })
    }

    pub fn state(&self, actuator: Actuator) -> State {
        self.states[actuator.index()]
    }

    pub fn channel(&self, actuator: Actuator) -> &C {
        &self.channels[actuator.index()]
    }

    /// Out of range positions are rejected before the channel is touched.
    pub fn apply(&mut self, actuator: Actuator, position: Position) -> Result<()> {
        let position = position.validate()?;
        let channel = &mut self.channels[actuator.index()];
        let state = match position {
            Position::Off => {
                channel.release()?;
                State::Released
            }
            Position::At(v) => {
                // normalized() is only None for Off
                let command = position.normalized().unwrap_or_default();
                channel.drive(command)?;
                if self.policy.hold_after_move {
                    thread::sleep(self.policy.settle);
                    channel.hold()?;
                }
                State::Holding(v)
            }
        };

        debug!(servo = %actuator, from = ?self.states[actuator.index()], to = ?state, "applied");
        self.states[actuator.index()] = state;
        Ok(())
    }

    /// Drives every servo to its position in `snapshot`.
    pub fn restore(&mut self, snapshot: &Snapshot) -> Result<()> {
        for (actuator, position) in snapshot.iter() {
            self.apply(actuator, position)?;
        }
        Ok(())
    }

    /// Re-asserts every holding servo. Released ones stay released.
    pub fn hold_all(&mut self) -> Result<()> {
        for actuator in Actuator::ALL {
            if let State::Holding(_) = self.states[actuator.index()] {
                self.channels[actuator.index()].hold()?;
            }
        }
        Ok(())
    }
}
