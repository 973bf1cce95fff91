// THEORY:
// Live frames from a V4L2/USB camera through OpenCV's `videoio`. The device is
// opened once and kept open; each `next_frame` blocks until the driver hands
// over a new image. A camera never runs out, so this source never returns
// `Ok(None)`: every failure is a per-cycle `AcquisitionError::Capture`.

use fish_vision::{AcquisitionError, Frame, FrameSource};
use image::RgbImage;
use opencv::{
    core::Mat,
    imgproc,
    prelude::*,
    videoio::{self, VideoCapture},
};
use tracing::info;

pub struct CameraSource {
    capture: VideoCapture,
    index: i32,
    sequence: u64,
}

fn capture_error(err: opencv::Error) -> AcquisitionError {
    AcquisitionError::Capture(err.to_string())
}

impl CameraSource {
    pub fn open(index: i32) -> Result<Self, AcquisitionError> {
        let capture = VideoCapture::new(index, videoio::CAP_ANY).map_err(capture_error)?;
        if !capture.is_opened().map_err(capture_error)? {
            return Err(AcquisitionError::Capture(format!("camera {index} could not be opened")));
        }
        info!("Camera {index} opened");
        Ok(Self {
            capture,
            index,
            sequence: 0,
        })
    }
}

impl FrameSource for CameraSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, AcquisitionError> {
        let mut bgr = Mat::default();
        if !self.capture.read(&mut bgr).map_err(capture_error)? || bgr.empty() {
            return Err(AcquisitionError::Capture(format!("camera {} returned no frame", self.index)));
        }

        // Convert the OpenCV Mat (BGR) to a packed RGB buffer.
        let mut rgb = Mat::default();
        imgproc::cvt_color(&bgr, &mut rgb, imgproc::COLOR_BGR2RGB, 0).map_err(capture_error)?;
        let (width, height) = (rgb.cols() as u32, rgb.rows() as u32);
        let bytes = rgb.data_bytes().map_err(capture_error)?.to_vec();
        let image = RgbImage::from_raw(width, height, bytes)
            .ok_or_else(|| AcquisitionError::Capture("frame buffer size mismatch".to_string()))?;

        self.sequence += 1;
        Ok(Some(Frame::new(format!("camera{}-{:06}", self.index, self.sequence), image)))
    }
}
