// THEORY:
// The finished `CenterLog` is the trajectory of the fish over a batch. This
// module renders it as a scatter plot: a framed plot area spanning the working
// frame's coordinate range, light grid lines every 100 px, and a red dot per
// center. The y axis points up, as in an ordinary chart, so the picture is the
// frame flipped vertically.
//
// The plot carries no title or axis labels. Drawing text would need a font
// rasterizer and a bundled font, and the caption ("Fish Centers in Images",
// "X Position", "Y Position") is left to whatever displays the PNG.

use crate::batch::CenterLog;
use crate::core_modules::frame::{FRAME_HEIGHT, FRAME_WIDTH};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect;
use std::path::{Path, PathBuf};
use tracing::info;

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const AXIS: Rgb<u8> = Rgb([0, 0, 0]);
const GRID: Rgb<u8> = Rgb([220, 220, 220]);
const POINT: Rgb<u8> = Rgb([255, 0, 0]);
const GRID_STEP: u32 = 100;

#[derive(Debug, thiserror::Error)]
pub enum PlotError {
    #[error("failed to create plot directory {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write plot {path}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// Consumer of a finalized center log.
pub trait PlotSink {
    fn plot(&mut self, centers: &CenterLog) -> Result<(), PlotError>;
}

/// Renders centers into a PNG scatter plot.
#[derive(Debug, Clone)]
pub struct ScatterPlot {
    path: PathBuf,
    width: u32,
    height: u32,
    margin: u32,
    point_radius: i32,
}

impl ScatterPlot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            width: FRAME_WIDTH,
            height: FRAME_HEIGHT,
            margin: 40,
            point_radius: 4,
        }
    }

    /// Overrides the canvas size. The margin is shrunk until the plot area
    /// keeps at least one pixel in each direction.
    pub fn with_canvas(mut self, width: u32, height: u32, margin: u32) -> Self {
        self.width = width.max(1);
        self.height = height.max(1);
        let fits = (self.width.min(self.height) - 1) / 2;
        self.margin = margin.min(fits);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Width and height of the framed area inside the margins.
    fn plot_area(&self) -> (u32, u32) {
        (
            self.width.saturating_sub(2 * self.margin).max(1),
            self.height.saturating_sub(2 * self.margin).max(1),
        )
    }

    /// Maps a working-frame coordinate into canvas pixels.
    fn to_canvas(&self, x: f32, y: f32) -> (f32, f32) {
        let (plot_w, plot_h) = self.plot_area();
        let (plot_w, plot_h) = (plot_w as f32, plot_h as f32);
        let cx = self.margin as f32 + x * plot_w / FRAME_WIDTH as f32;
        let cy = (self.margin as f32 + plot_h) - y * plot_h / FRAME_HEIGHT as f32;
        (cx, cy)
    }

    pub fn render(&self, centers: &CenterLog) -> RgbImage {
        let mut canvas = RgbImage::from_pixel(self.width, self.height, BACKGROUND);

        for gx in (GRID_STEP..FRAME_WIDTH).step_by(GRID_STEP as usize) {
            let top = self.to_canvas(gx as f32, FRAME_HEIGHT as f32);
            let bottom = self.to_canvas(gx as f32, 0.0);
            draw_line_segment_mut(&mut canvas, top, bottom, GRID);
        }
        for gy in (GRID_STEP..FRAME_HEIGHT).step_by(GRID_STEP as usize) {
            let left = self.to_canvas(0.0, gy as f32);
            let right = self.to_canvas(FRAME_WIDTH as f32, gy as f32);
            draw_line_segment_mut(&mut canvas, left, right, GRID);
        }

        let (plot_w, plot_h) = self.plot_area();
        let frame = Rect::at(self.margin as i32, self.margin as i32).of_size(plot_w, plot_h);
        draw_hollow_rect_mut(&mut canvas, frame, AXIS);

        for center in centers.iter() {
            let (cx, cy) = self.to_canvas(center.x as f32, center.y as f32);
            draw_filled_circle_mut(&mut canvas, (cx.round() as i32, cy.round() as i32), self.point_radius, POINT);
        }
        canvas
    }
}

impl PlotSink for ScatterPlot {
    fn plot(&mut self, centers: &CenterLog) -> Result<(), PlotError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| PlotError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        self.render(centers).save(&self.path).map_err(|source| PlotError::Encode {
            path: self.path.clone(),
            source,
        })?;
        info!("Center plot with {} point(s) saved at {}", centers.len(), self.path.display());
        Ok(())
    }
}
