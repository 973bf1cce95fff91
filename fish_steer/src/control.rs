// THEORY:
// The `control` module closes the loop between what the camera sees and what
// the wheels do. Each cycle is strictly sequential: capture a frame (blocking),
// run the perception pipeline in-line, map the result to one drive command,
// issue it, then wait for the next tick. Frame N+1 is never captured before
// cycle N's command has gone out.
//
// State machine (initial state `Searching`):
//
//   signal                           command                  next state
//   no detection / capture failure   STOP                     Searching
//   heading >  +tolerance            ROTATE(clockwise)        Aligning
//   heading <  -tolerance            ROTATE(counter-clock.)   Aligning
//   |heading| <= tolerance           FORWARD                  Advancing
//
// The transition depends only on the current signal, never on the previous
// state. `Stopped` is terminal and reached only through the shutdown path
// (cancellation, exhausted source, or an actuator failure), which issues STOP
// and releases the actuator exactly once. A cycle already in progress when the
// cancel arrives still completes, so a cycle that itself ends in STOP is
// followed by the shutdown STOP.

use crate::actuator::{Actuator, ActuatorCommand, ActuatorError, ActuatorHandle, Direction};
use fish_vision::{Detection, FrameSource, VisionPipeline};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlState {
    Searching,
    Aligning,
    Advancing,
    Stopped,
}

/// Maps a detection (or its absence) to a command and the state it leads to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Steering {
    tolerance_degrees: f64,
}

impl Default for Steering {
    fn default() -> Self {
        Self { tolerance_degrees: 10.0 }
    }
}

impl Steering {
    pub fn new(tolerance_degrees: f64) -> Self {
        Self { tolerance_degrees }
    }

    pub fn decide(&self, detection: Option<&Detection>) -> (ActuatorCommand, ControlState) {
        let Some(detection) = detection else {
            return (ActuatorCommand::Stop, ControlState::Searching);
        };
        let heading = detection.heading_degrees;
        if heading > self.tolerance_degrees {
            (ActuatorCommand::Rotate(Direction::Clockwise), ControlState::Aligning)
        } else if heading < -self.tolerance_degrees {
            (ActuatorCommand::Rotate(Direction::CounterClockwise), ControlState::Aligning)
        } else {
            (ActuatorCommand::Forward, ControlState::Advancing)
        }
    }
}

/// What happened during one cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleOutcome {
    pub heading_degrees: Option<f64>,
    pub command: ActuatorCommand,
    pub state: ControlState,
}

/// Why the loop ended without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Cancelled,
    SourceExhausted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopSummary {
    pub cycles: u64,
    pub detections: u64,
    pub reason: StopReason,
}

/// Owns everything one steering session needs: the frame source, the pipeline,
/// the acquired actuator and the state machine.
pub struct ControlLoop<S: FrameSource, A: Actuator> {
    source: S,
    pipeline: VisionPipeline,
    actuator: ActuatorHandle<A>,
    steering: Steering,
    interval: Duration,
    state: ControlState,
    cycles: u64,
    detections: u64,
}

enum CycleResult {
    Completed(CycleOutcome),
    Exhausted,
}

impl<S: FrameSource, A: Actuator> ControlLoop<S, A> {
    pub fn new(
        source: S,
        pipeline: VisionPipeline,
        actuator: ActuatorHandle<A>,
        steering: Steering,
        interval: Duration,
    ) -> Self {
        Self {
            source,
            pipeline,
            actuator,
            steering,
            interval,
            state: ControlState::Searching,
            cycles: 0,
            detections: 0,
        }
    }

    pub fn state(&self) -> ControlState {
        self.state
    }

    /// One capture, process, act iteration. `Ok(None)` means the source is used up.
    pub fn cycle(&mut self) -> Result<Option<CycleOutcome>, ActuatorError> {
        match self.step()? {
            CycleResult::Completed(outcome) => Ok(Some(outcome)),
            CycleResult::Exhausted => Ok(None),
        }
    }

    fn step(&mut self) -> Result<CycleResult, ActuatorError> {
        let detection = match self.source.next_frame() {
            Ok(Some(frame)) => self.pipeline.detect(&frame),
            Ok(None) => return Ok(CycleResult::Exhausted),
            Err(err) => {
                warn!("Acquisition failed: {err}");
                None
            }
        };

        self.cycles += 1;
        let (command, next) = self.steering.decide(detection.as_ref());
        match &detection {
            Some(d) => {
                self.detections += 1;
                info!("Angle from horizontal: {:.2} deg -> {command}", d.heading_degrees);
            }
            None => info!("Fish not detected -> {command}"),
        }

        self.actuator.issue(command)?;
        self.state = next;
        Ok(CycleResult::Completed(CycleOutcome {
            heading_degrees: detection.map(|d| d.heading_degrees),
            command,
            state: next,
        }))
    }

    /// Runs cycles on a fixed cadence until `shutdown` flips to `true`, the
    /// source runs out, or the actuator fails. Always finishes by issuing STOP
    /// and releasing the actuator. The in-flight cycle is never cut short; the
    /// exactly-once guarantee covers the shutdown STOP and the release, not
    /// STOPs the cycle itself issued.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> Result<LoopSummary, ActuatorError> {
        let outcome = loop {
            if *shutdown.borrow_and_update() {
                break Ok(StopReason::Cancelled);
            }

            match self.step() {
                Ok(CycleResult::Completed(_)) => {}
                Ok(CycleResult::Exhausted) => break Ok(StopReason::SourceExhausted),
                Err(err) => {
                    error!("Actuator failure, shutting down: {err}");
                    break Err(err);
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                changed = shutdown.changed() => {
                    // A dropped sender can no longer cancel; treat it as a cancel.
                    if changed.is_err() || *shutdown.borrow() {
                        break Ok(StopReason::Cancelled);
                    }
                }
            }
        };

        self.state = ControlState::Stopped;
        let summary = self.finish(outcome)?;
        info!(
            "Control loop {:?} ({:?}) after {} cycle(s), {} detection(s)",
            ControlState::Stopped, summary.reason, summary.cycles, summary.detections
        );
        Ok(summary)
    }

    fn finish(self, outcome: Result<StopReason, ActuatorError>) -> Result<LoopSummary, ActuatorError> {
        let Self {
            actuator,
            cycles,
            detections,
            ..
        } = self;
        let released = actuator.shutdown();
        let reason = outcome?;
        released?;
        Ok(LoopSummary {
            cycles,
            detections,
            reason,
        })
    }
}

/// Returns a receiver that flips to `true` on the first Ctrl-C.
///
/// Must be called from inside a tokio runtime.
pub fn cancel_on_ctrl_c() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Ctrl-C received, stopping"),
            Err(err) => error!("Unable to listen for Ctrl-C: {err}"),
        }
        let _ = tx.send(true);
    });
    rx
}
