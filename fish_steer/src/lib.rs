// THEORY:
// `fish_steer` turns the per-frame heading reported by `fish_vision` into drive
// commands for a two-motor robot, once per cycle, until told to stop.
//
// Key architectural principles:
// 1.  **Hardware behind traits**: Frames come from any `FrameSource` and commands
//     go to any `Actuator`, so the loop runs unchanged against a camera and GPIO
//     pins, a folder of snapshots, or test doubles.
// 2.  **One owner for the motors**: The loop holds the only `ActuatorHandle`; its
//     STOP-then-release exit path runs exactly once however the loop ends.
// 3.  **Optional hardware**: The OpenCV camera (`camera` feature) and the
//     Raspberry Pi GPIO driver (`gpio` feature) are compiled only on request.

pub mod actuator;
#[cfg(feature = "camera")]
pub mod camera;
pub mod control;
#[cfg(feature = "gpio")]
pub mod gpio;

pub use actuator::{Actuator, ActuatorCommand, ActuatorError, ActuatorHandle, Direction, LogActuator};
pub use control::{ControlLoop, ControlState, LoopSummary, Steering, StopReason};
