// THEORY:
// The `batch` module is the offline mode. It walks a folder of snapshots, runs
// the perception pipeline on each one, writes an annotated copy of every frame
// in which the fish was found, and collects the fish centers into a `CenterLog`
// for plotting.
//
// Key architectural principles:
// 1.  **Skip, never abort**: A frame that cannot be decoded, a frame without a
//     detection, and an annotated frame that cannot be written are each logged and
//     counted. None of them stops the batch.
// 2.  **Single writer**: The `CenterLog` is appended only by the code that consumes
//     results, one at a time, in input order. The parallel variant fans the heavy
//     work (decode + perception) out to blocking workers but still consumes their
//     results sequentially, so it produces exactly the same log as a sequential run.
// 3.  **Collaborators behind traits**: Where annotated frames go (`ImageWriter`) and
//     what happens to the finished log (`crate::plot::PlotSink`) are external
//     concerns. Tests plug in in-memory versions.

use crate::core_modules::annotate::annotate;
use crate::core_modules::frame::{AcquisitionError, FrameSource, load_frame};
use crate::core_modules::geometry::PixelPoint;
use crate::pipeline::{FrameAnalysis, Report, VisionPipeline};
use futures::StreamExt;
use image::RgbImage;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Append-only, ordered record of fish centers across a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CenterLog {
    centers: Vec<PixelPoint>,
}

impl CenterLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, center: PixelPoint) {
        self.centers.push(center);
    }

    pub fn as_slice(&self) -> &[PixelPoint] {
        &self.centers
    }

    pub fn len(&self) -> usize {
        self.centers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.centers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PixelPoint> {
        self.centers.iter()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error("failed to create output directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {path}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// Destination for annotated frames.
pub trait ImageWriter {
    fn write(&mut self, label: &str, image: &RgbImage) -> Result<(), WriteError>;
}

/// Writes each frame to `<dir>/<label>`, creating `dir` on first use.
#[derive(Debug, Clone)]
pub struct DirectoryWriter {
    dir: PathBuf,
}

impl DirectoryWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ImageWriter for DirectoryWriter {
    fn write(&mut self, label: &str, image: &RgbImage) -> Result<(), WriteError> {
        std::fs::create_dir_all(&self.dir).map_err(|source| WriteError::CreateDir {
            path: self.dir.clone(),
            source,
        })?;
        let path = self.dir.join(label);
        image
            .save(&path)
            .map_err(|source| WriteError::Encode { path: path.clone(), source })?;
        info!("Processed image saved at {}", path.display());
        Ok(())
    }
}

/// Tally of one batch run. `centers` is final once the run returns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub centers: CenterLog,
    pub frames_seen: usize,
    pub acquisition_failures: usize,
    pub not_found: usize,
    pub written: usize,
    pub write_failures: usize,
}

impl BatchReport {
    fn absorb<W: ImageWriter + ?Sized>(&mut self, label: &str, analysis: FrameAnalysis, writer: &mut W) {
        let FrameAnalysis { mut working_frame, report } = analysis;
        let detection = match report {
            Report::Detected(detection) => detection,
            Report::NotFound(reason) => {
                info!("{label}: fish not detected ({reason:?}), skipping");
                self.not_found += 1;
                return;
            }
        };

        self.centers.push(detection.center);
        annotate(&mut working_frame, &detection);
        match writer.write(label, &working_frame) {
            Ok(()) => self.written += 1,
            Err(err) => {
                warn!("{label}: {err}");
                self.write_failures += 1;
            }
        }
    }

    fn acquisition_failed(&mut self, err: &AcquisitionError) {
        warn!("Skipping frame: {err}");
        self.acquisition_failures += 1;
    }
}

/// Runs the pipeline over every frame of a source, in source order.
pub struct BatchAggregator<'a> {
    pipeline: &'a VisionPipeline,
}

impl<'a> BatchAggregator<'a> {
    pub fn new(pipeline: &'a VisionPipeline) -> Self {
        Self { pipeline }
    }

    pub fn run_batch<S, W>(&self, source: &mut S, writer: &mut W) -> BatchReport
    where
        S: FrameSource + ?Sized,
        W: ImageWriter + ?Sized,
    {
        let mut report = BatchReport::default();
        loop {
            match source.next_frame() {
                Ok(Some(frame)) => {
                    report.frames_seen += 1;
                    let analysis = self.pipeline.analyze(&frame);
                    report.absorb(frame.label(), analysis, writer);
                }
                Ok(None) => break,
                Err(err) => {
                    report.frames_seen += 1;
                    report.acquisition_failed(&err);
                }
            }
        }
        summarize(&report);
        report
    }
}

/// Same contract as `BatchAggregator::run_batch` over a list of image files, with
/// decoding and perception spread over one blocking worker per CPU. Results are
/// consumed in input order.
pub async fn run_batch_parallel<W>(pipeline: Arc<VisionPipeline>, paths: Vec<PathBuf>, writer: &mut W) -> BatchReport
where
    W: ImageWriter + ?Sized,
{
    let workers = num_cpus::get().max(1);
    info!("Analyzing {} frame(s) on {workers} worker(s)", paths.len());

    let mut results = futures::stream::iter(paths.into_iter().map(|path| {
        let pipeline = Arc::clone(&pipeline);
        tokio::task::spawn_blocking(move || {
            let frame = load_frame(&path)?;
            let analysis = pipeline.analyze(&frame);
            Ok::<_, AcquisitionError>((frame.label().to_string(), analysis))
        })
    }))
    .buffered(workers);

    let mut report = BatchReport::default();
    while let Some(joined) = results.next().await {
        report.frames_seen += 1;
        match joined {
            Ok(Ok((label, analysis))) => report.absorb(&label, analysis, writer),
            Ok(Err(err)) => report.acquisition_failed(&err),
            Err(join_err) => {
                error!("Worker failed: {join_err}");
                report.acquisition_failures += 1;
            }
        }
    }
    summarize(&report);
    report
}

fn summarize(report: &BatchReport) {
    info!(
        "Batch complete: {} frame(s), {} center(s), {} unreadable, {} without fish, {} write failure(s)",
        report.frames_seen,
        report.centers.len(),
        report.acquisition_failures,
        report.not_found,
        report.write_failures
    );
}
