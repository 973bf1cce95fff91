// THEORY:
// The `actuator` module models the robot's drive train as an explicitly owned
// resource. Nothing in the control loop touches hardware directly; it holds an
// `ActuatorHandle`, and the handle is the only thing that can move the motors.
//
// Key architectural principles:
// 1.  **Three commands**: Forward, rotate in place (clockwise or counter-clockwise)
//     and stop. The `Actuator` trait exposes one method per command plus the
//     `acquire`/`release` lifecycle of the underlying pins.
// 2.  **Scoped ownership**: `ActuatorHandle::acquire` is the only way in. Its exit
//     path, STOP then release, runs exactly once: on `shutdown`, or on drop if the
//     owner never got that far (error, panic, cancelled future).
// 3.  **Release always runs**: A failed STOP does not skip release, and a failed
//     `acquire` is followed by a release of whatever was partially claimed.
//     Implementations must make `release` idempotent.

use std::fmt;
use tracing::{error, info};

/// Sense of an in-place rotation, as seen from above.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Clockwise,
    CounterClockwise,
}

/// A discrete drive command, issued immediately with no queuing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorCommand {
    Forward,
    Rotate(Direction),
    Stop,
}

impl fmt::Display for ActuatorCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActuatorCommand::Forward => write!(f, "FORWARD"),
            ActuatorCommand::Rotate(Direction::Clockwise) => write!(f, "ROTATE(clockwise)"),
            ActuatorCommand::Rotate(Direction::CounterClockwise) => write!(f, "ROTATE(counter-clockwise)"),
            ActuatorCommand::Stop => write!(f, "STOP"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ActuatorError {
    #[error("failed to acquire actuator: {0}")]
    Acquire(String),
    #[error("failed to drive {command}: {reason}")]
    Drive { command: ActuatorCommand, reason: String },
    #[error("failed to release actuator: {0}")]
    Release(String),
    #[error("actuator used before acquire")]
    NotAcquired,
}

/// Hardware (or stand-in) that can execute drive commands.
pub trait Actuator {
    fn acquire(&mut self) -> Result<(), ActuatorError>;
    fn forward(&mut self) -> Result<(), ActuatorError>;
    fn rotate(&mut self, direction: Direction) -> Result<(), ActuatorError>;
    fn stop(&mut self) -> Result<(), ActuatorError>;
    /// Frees the underlying resources. Must be safe to call more than once and
    /// after a partially failed `acquire`.
    fn release(&mut self) -> Result<(), ActuatorError>;

    fn apply(&mut self, command: ActuatorCommand) -> Result<(), ActuatorError> {
        match command {
            ActuatorCommand::Forward => self.forward(),
            ActuatorCommand::Rotate(direction) => self.rotate(direction),
            ActuatorCommand::Stop => self.stop(),
        }
    }
}

impl<A: Actuator + ?Sized> Actuator for Box<A> {
    fn acquire(&mut self) -> Result<(), ActuatorError> {
        (**self).acquire()
    }
    fn forward(&mut self) -> Result<(), ActuatorError> {
        (**self).forward()
    }
    fn rotate(&mut self, direction: Direction) -> Result<(), ActuatorError> {
        (**self).rotate(direction)
    }
    fn stop(&mut self) -> Result<(), ActuatorError> {
        (**self).stop()
    }
    fn release(&mut self) -> Result<(), ActuatorError> {
        (**self).release()
    }
}

/// Exclusive, scoped ownership of an acquired actuator.
pub struct ActuatorHandle<A: Actuator> {
    actuator: A,
    finished: bool,
}

impl<A: Actuator> ActuatorHandle<A> {
    /// Acquires `actuator`. On failure the partially acquired resources are
    /// released before the error is returned.
    pub fn acquire(mut actuator: A) -> Result<Self, ActuatorError> {
        if let Err(err) = actuator.acquire() {
            if let Err(release_err) = actuator.release() {
                error!("Release after failed acquire also failed: {release_err}");
            }
            return Err(err);
        }
        Ok(Self {
            actuator,
            finished: false,
        })
    }

    pub fn issue(&mut self, command: ActuatorCommand) -> Result<(), ActuatorError> {
        if self.finished {
            return Err(ActuatorError::NotAcquired);
        }
        self.actuator.apply(command)
    }

    /// Issues STOP and releases the actuator. Returns the first failure; both
    /// steps are always attempted.
    pub fn shutdown(mut self) -> Result<(), ActuatorError> {
        self.finish()
    }

    fn finish(&mut self) -> Result<(), ActuatorError> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;

        let stopped = self.actuator.stop();
        if let Err(err) = &stopped {
            error!("STOP during shutdown failed: {err}");
        }
        let released = self.actuator.release();
        if let Err(err) = &released {
            error!("{err}");
        }
        info!("Actuator stopped and released");
        stopped.and(released)
    }
}

impl<A: Actuator> Drop for ActuatorHandle<A> {
    fn drop(&mut self) {
        // Best effort; errors were already logged by `finish`.
        let _ = self.finish();
    }
}

/// Dry-run actuator that only logs what it would do.
#[derive(Debug, Default)]
pub struct LogActuator {
    acquired: bool,
}

impl LogActuator {
    pub fn new() -> Self {
        Self::default()
    }

    fn log(&self, command: ActuatorCommand) -> Result<(), ActuatorError> {
        if !self.acquired {
            return Err(ActuatorError::NotAcquired);
        }
        info!("[dry run] {command}");
        Ok(())
    }
}

impl Actuator for LogActuator {
    fn acquire(&mut self) -> Result<(), ActuatorError> {
        self.acquired = true;
        info!("[dry run] actuator acquired");
        Ok(())
    }

    fn forward(&mut self) -> Result<(), ActuatorError> {
        self.log(ActuatorCommand::Forward)
    }

    fn rotate(&mut self, direction: Direction) -> Result<(), ActuatorError> {
        self.log(ActuatorCommand::Rotate(direction))
    }

    fn stop(&mut self) -> Result<(), ActuatorError> {
        self.log(ActuatorCommand::Stop)
    }

    fn release(&mut self) -> Result<(), ActuatorError> {
        if self.acquired {
            self.acquired = false;
            info!("[dry run] actuator released");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Default)]
    struct Calls {
        acquire: usize,
        commands: Vec<ActuatorCommand>,
        release: usize,
    }

    /// Records every call; optionally fails acquire or stop.
    #[derive(Clone, Default)]
    struct Recorder {
        calls: Arc<Mutex<Calls>>,
        fail_acquire: bool,
        fail_stop: bool,
    }

    impl Actuator for Recorder {
        fn acquire(&mut self) -> Result<(), ActuatorError> {
            self.calls.lock().unwrap().acquire += 1;
            if self.fail_acquire {
                return Err(ActuatorError::Acquire("pin 17 busy".to_string()));
            }
            Ok(())
        }
        fn forward(&mut self) -> Result<(), ActuatorError> {
            self.calls.lock().unwrap().commands.push(ActuatorCommand::Forward);
            Ok(())
        }
        fn rotate(&mut self, direction: Direction) -> Result<(), ActuatorError> {
            self.calls.lock().unwrap().commands.push(ActuatorCommand::Rotate(direction));
            Ok(())
        }
        fn stop(&mut self) -> Result<(), ActuatorError> {
            self.calls.lock().unwrap().commands.push(ActuatorCommand::Stop);
            if self.fail_stop {
                return Err(ActuatorError::Drive {
                    command: ActuatorCommand::Stop,
                    reason: "line stuck".to_string(),
                });
            }
            Ok(())
        }
        fn release(&mut self) -> Result<(), ActuatorError> {
            self.calls.lock().unwrap().release += 1;
            Ok(())
        }
    }

    #[test]
    fn shutdown_stops_then_releases_once() {
        let recorder = Recorder::default();
        let calls = Arc::clone(&recorder.calls);

        let mut handle = ActuatorHandle::acquire(recorder).unwrap();
        handle.issue(ActuatorCommand::Forward).unwrap();
        handle.shutdown().unwrap();

        let calls = calls.lock().unwrap();
        assert_eq!(calls.commands, vec![ActuatorCommand::Forward, ActuatorCommand::Stop]);
        assert_eq!(calls.release, 1);
    }

    #[test]
    fn dropping_the_handle_runs_the_exit_path() {
        let recorder = Recorder::default();
        let calls = Arc::clone(&recorder.calls);

        {
            let mut handle = ActuatorHandle::acquire(recorder).unwrap();
            handle.issue(ActuatorCommand::Rotate(Direction::Clockwise)).unwrap();
        }

        let calls = calls.lock().unwrap();
        assert_eq!(calls.commands.last(), Some(&ActuatorCommand::Stop));
        assert_eq!(calls.release, 1);
    }

    #[test]
    fn failed_acquire_still_releases() {
        let recorder = Recorder {
            fail_acquire: true,
            ..Recorder::default()
        };
        let calls = Arc::clone(&recorder.calls);

        assert!(matches!(ActuatorHandle::acquire(recorder), Err(ActuatorError::Acquire(_))));

        let calls = calls.lock().unwrap();
        assert_eq!(calls.acquire, 1);
        assert_eq!(calls.release, 1);
        assert!(calls.commands.is_empty());
    }

    #[test]
    fn failed_stop_does_not_skip_release() {
        let recorder = Recorder {
            fail_stop: true,
            ..Recorder::default()
        };
        let calls = Arc::clone(&recorder.calls);

        let handle = ActuatorHandle::acquire(recorder).unwrap();
        assert!(matches!(handle.shutdown(), Err(ActuatorError::Drive { .. })));

        let calls = calls.lock().unwrap();
        assert_eq!(calls.commands, vec![ActuatorCommand::Stop]);
        assert_eq!(calls.release, 1);
    }

    #[test]
    fn log_actuator_refuses_commands_when_not_acquired() {
        let mut actuator = LogActuator::new();
        assert!(actuator.forward().is_err());
        actuator.acquire().unwrap();
        assert!(actuator.forward().is_ok());
        actuator.release().unwrap();
        actuator.release().unwrap();
        assert!(actuator.stop().is_err());
    }
}
