// THEORY:
// Drives two DC motors through an H-bridge wired to four Raspberry Pi GPIO
// lines (BCM numbering). Each motor has a forward and a backward line; driving
// exactly one of them high spins the motor, driving both low lets it coast.
//
//   command              left fwd  left back  right fwd  right back
//   FORWARD              high      low        high       low
//   ROTATE(clockwise)    high      low        low        high
//   ROTATE(counter)      low       high       high       low
//   STOP                 low       low        low        low
//
// Lines are claimed in `acquire` and dropped in `release`; dropping an rppal
// `OutputPin` returns the line to its original mode.

use crate::actuator::{Actuator, ActuatorCommand, ActuatorError, Direction};
use fish_vision::config::MotorPins;
use rppal::gpio::{Gpio, OutputPin};
use tracing::{debug, info};

struct Lines {
    left_forward: OutputPin,
    left_backward: OutputPin,
    right_forward: OutputPin,
    right_backward: OutputPin,
}

impl Lines {
    fn drive(&mut self, levels: [bool; 4]) {
        let pins = [
            &mut self.left_forward,
            &mut self.left_backward,
            &mut self.right_forward,
            &mut self.right_backward,
        ];
        for (pin, high) in pins.into_iter().zip(levels) {
            if high {
                pin.set_high();
            } else {
                pin.set_low();
            }
        }
    }
}

pub struct GpioActuator {
    pins: MotorPins,
    lines: Option<Lines>,
}

impl GpioActuator {
    pub fn new(pins: MotorPins) -> Self {
        Self { pins, lines: None }
    }

    fn drive(&mut self, command: ActuatorCommand) -> Result<(), ActuatorError> {
        let levels = match command {
            ActuatorCommand::Forward => [true, false, true, false],
            ActuatorCommand::Rotate(Direction::Clockwise) => [true, false, false, true],
            ActuatorCommand::Rotate(Direction::CounterClockwise) => [false, true, true, false],
            ActuatorCommand::Stop => [false, false, false, false],
        };
        let lines = self.lines.as_mut().ok_or(ActuatorError::NotAcquired)?;
        lines.drive(levels);
        debug!("GPIO {command}");
        Ok(())
    }
}

impl Actuator for GpioActuator {
    fn acquire(&mut self) -> Result<(), ActuatorError> {
        if self.lines.is_some() {
            return Ok(());
        }
        let gpio = Gpio::new().map_err(|err| ActuatorError::Acquire(err.to_string()))?;
        let claim = |pin: u8| -> Result<OutputPin, ActuatorError> {
            gpio.get(pin)
                .map(|p| p.into_output_low())
                .map_err(|err| ActuatorError::Acquire(format!("BCM {pin}: {err}")))
        };
        // Pins claimed before a failure are dropped (and reset) on the `?`.
        let lines = Lines {
            left_forward: claim(self.pins.left_forward)?,
            left_backward: claim(self.pins.left_backward)?,
            right_forward: claim(self.pins.right_forward)?,
            right_backward: claim(self.pins.right_backward)?,
        };
        self.lines = Some(lines);
        info!("GPIO motor lines {:?} acquired", self.pins.all());
        Ok(())
    }

    fn forward(&mut self) -> Result<(), ActuatorError> {
        self.drive(ActuatorCommand::Forward)
    }

    fn rotate(&mut self, direction: Direction) -> Result<(), ActuatorError> {
        self.drive(ActuatorCommand::Rotate(direction))
    }

    fn stop(&mut self) -> Result<(), ActuatorError> {
        self.drive(ActuatorCommand::Stop)
    }

    fn release(&mut self) -> Result<(), ActuatorError> {
        if let Some(mut lines) = self.lines.take() {
            lines.drive([false; 4]);
            info!("GPIO motor lines released");
        }
        Ok(())
    }
}
