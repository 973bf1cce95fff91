// THEORY:
// This file is the main entry point for the `fish_vision` library crate. It
// exports the perception engine that finds a single colored fish in a frame and
// reports its box, head, tail, heading and center.
//
// The layers, leaves first:
// - `core_modules::frame`: where frames come from (`FrameSource`).
// - `core_modules::segmenter`: color threshold in HSV plus morphological closing.
// - `core_modules::blob_selector`: largest outer boundary, or nothing.
// - `core_modules::orientation`: hull, dominant axis, head/tail, heading.
// - `pipeline`: the three stages above behind one `VisionPipeline::analyze` call.
// - `batch` and `plot`: the offline mode (annotated frames, center log, scatter plot).
//
// The real-time steering loop lives in the `fish_steer` crate and consumes the
// same `VisionPipeline`.

pub mod batch;
pub mod config;
pub mod core_modules;
pub mod pipeline;
pub mod plot;

pub use config::{Config, ConfigError};
pub use core_modules::frame::{AcquisitionError, DirectorySource, Frame, FrameSource};
pub use pipeline::{Detection, Orientation, Report, VisionPipeline};
