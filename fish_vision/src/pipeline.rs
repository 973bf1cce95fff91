// THEORY:
// The `pipeline` module is the top-level API of the perception engine. It chains
// the core layers (segmenter, blob selector, orientation estimator) into a single
// call that takes a raw frame and answers: is the fish in view, and if so where
// is it and which way is it pointing?
//
// Key architectural principles:
// 1.  **Single frame, single object**: Each call is independent. There is no memory
//     between frames, no prediction and no identity.
// 2.  **Absence is a report, not an error**: Every way of not finding the fish
//     (empty mask, no boundary, degenerate geometry) becomes a
//     `Report::NotFound` with the reason attached, so callers can log it and carry
//     on without matching on error types.
// 3.  **Shared by both modes**: The batch aggregator and the steering loop call the
//     exact same `analyze`, so offline plots describe what the robot would see.

use crate::config::PipelineConfig;
use crate::core_modules::blob_selector;
use crate::core_modules::frame::Frame;
use crate::core_modules::orientation::{self, EstimateError};
use crate::core_modules::segmenter;
use image::RgbImage;
use tracing::debug;

pub use crate::core_modules::orientation::{Detection, Orientation};

/// Why a frame produced no detection.
#[derive(Debug, Clone, PartialEq)]
pub enum NotFoundReason {
    /// No pixel fell inside the color range.
    EmptyMask,
    /// Pixels matched but no outer boundary could be traced.
    NoContour,
    /// A boundary was found but its geometry cannot carry an orientation.
    Degenerate(EstimateError),
}

/// The primary output of the vision pipeline for a single frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Report {
    NotFound(NotFoundReason),
    Detected(Detection),
}

impl Report {
    pub fn detection(&self) -> Option<&Detection> {
        match self {
            Report::Detected(detection) => Some(detection),
            Report::NotFound(_) => None,
        }
    }

    pub fn into_detection(self) -> Option<Detection> {
        match self {
            Report::Detected(detection) => Some(detection),
            Report::NotFound(_) => None,
        }
    }
}

/// A report together with the working-resolution frame it describes.
#[derive(Debug, Clone)]
pub struct FrameAnalysis {
    /// The input resized to the working resolution; all report coordinates
    /// refer to this image.
    pub working_frame: RgbImage,
    pub report: Report,
}

/// The main, top-level struct for the perception engine.
#[derive(Debug, Clone, Default)]
pub struct VisionPipeline {
    config: PipelineConfig,
}

impl VisionPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn analyze(&self, frame: &Frame) -> FrameAnalysis {
        let working_frame = segmenter::normalize(frame.image()).into_owned();
        let report = self.report_for(&working_frame);
        match &report {
            Report::Detected(detection) => debug!(
                "{}: heading {:.2} deg, center ({}, {})",
                frame.label(),
                detection.heading_degrees,
                detection.center.x,
                detection.center.y
            ),
            Report::NotFound(reason) => debug!("{}: no detection ({:?})", frame.label(), reason),
        }
        FrameAnalysis { working_frame, report }
    }

    /// Shorthand for callers that only need the detection.
    pub fn detect(&self, frame: &Frame) -> Option<Detection> {
        self.analyze(frame).report.into_detection()
    }

    fn report_for(&self, working_frame: &RgbImage) -> Report {
        // Stage 1: Segmentation
        let mask = segmenter::segment_normalized(working_frame, &self.config.color_range, &self.config.closing);
        if segmenter::is_empty(&mask) {
            return Report::NotFound(NotFoundReason::EmptyMask);
        }

        // Stage 2: Blob selection
        let Some(contour) = blob_selector::select(&mask) else {
            return Report::NotFound(NotFoundReason::NoContour);
        };

        // Stage 3: Orientation
        match orientation::estimate(&contour) {
            Ok(detection) => Report::Detected(detection),
            Err(err) => Report::NotFound(NotFoundReason::Degenerate(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::frame::{FRAME_HEIGHT, FRAME_WIDTH};
    use image::Rgb;
    use imageproc::drawing::{draw_filled_ellipse_mut, draw_filled_rect_mut};
    use imageproc::rect::Rect;

    const ORANGE: Rgb<u8> = Rgb([255, 100, 0]);

    fn frame_with_fish(center: (i32, i32), radii: (i32, i32)) -> Frame {
        let mut image = RgbImage::new(FRAME_WIDTH, FRAME_HEIGHT);
        draw_filled_ellipse_mut(&mut image, center, radii.0, radii.1, ORANGE);
        Frame::new("synthetic", image)
    }

    #[test]
    fn blank_frame_reports_empty_mask() {
        let frame = Frame::new("blank", RgbImage::new(FRAME_WIDTH, FRAME_HEIGHT));
        let analysis = VisionPipeline::default().analyze(&frame);
        assert_eq!(analysis.report, Report::NotFound(NotFoundReason::EmptyMask));
    }

    #[test]
    fn wide_fish_heads_right() {
        let detection = VisionPipeline::default()
            .detect(&frame_with_fish((400, 300), (120, 40)))
            .unwrap();
        assert_eq!(detection.orientation, Orientation::Horizontal);
        assert!(detection.heading_degrees.abs() < 2.0, "heading {}", detection.heading_degrees);
        assert!((detection.center.x - 400).abs() <= 2);
        assert!((detection.center.y - 300).abs() <= 2);
        assert!(detection.head.x > detection.tail.x);
    }

    #[test]
    fn tall_fish_heads_down() {
        let detection = VisionPipeline::default()
            .detect(&frame_with_fish((250, 300), (30, 90)))
            .unwrap();
        assert_eq!(detection.orientation, Orientation::Vertical);
        assert!((detection.heading_degrees - 90.0).abs() < 2.0, "heading {}", detection.heading_degrees);
    }

    #[test]
    fn heading_survives_translation() {
        let pipeline = VisionPipeline::default();
        let here = pipeline.detect(&frame_with_fish((300, 250), (100, 35))).unwrap();
        let there = pipeline.detect(&frame_with_fish((500, 380), (100, 35))).unwrap();
        assert!((here.heading_degrees - there.heading_degrees).abs() < 1e-9);
        assert_eq!(there.center.x - here.center.x, 200);
        assert_eq!(there.center.y - here.center.y, 130);
    }

    #[test]
    fn smaller_distractor_is_ignored() {
        let mut frame = frame_with_fish((500, 300), (150, 50)).into_image();
        draw_filled_rect_mut(&mut frame, Rect::at(50, 50).of_size(30, 30), ORANGE);
        let detection = VisionPipeline::default()
            .detect(&Frame::new("two blobs", frame))
            .unwrap();
        assert!((detection.center.x - 500).abs() <= 2);
    }

    #[test]
    fn off_size_frames_are_resized_first() {
        // Half-size frame: coordinates double on the way in.
        let mut image = RgbImage::new(FRAME_WIDTH / 2, FRAME_HEIGHT / 2);
        draw_filled_ellipse_mut(&mut image, (200, 150), 60, 20, ORANGE);
        let analysis = VisionPipeline::default().analyze(&Frame::new("small", image));
        assert_eq!(analysis.working_frame.dimensions(), (FRAME_WIDTH, FRAME_HEIGHT));
        let detection = analysis.report.detection().unwrap();
        assert!((detection.center.x - 400).abs() <= 4);
        assert!((detection.center.y - 300).abs() <= 4);
    }
}
