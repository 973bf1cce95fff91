// THEORY:
// The `frame` module is the boundary between the outside world and the
// perception stack. A `Frame` is a "dumb" data container: an RGB raster and a
// label saying where it came from. Everything that produces frames implements
// `FrameSource`, so the batch aggregator and the control loop never need to know
// whether pixels came from a folder of snapshots or a live camera.
//
// Key architectural principles:
// 1.  **Failure is data**: `next_frame` returns `Err(AcquisitionError)` for a frame
//     that could not be obtained and `Ok(None)` when a finite source is used up.
//     Callers log the former and carry on; only the latter ends a run.
// 2.  **Deterministic enumeration**: `DirectorySource` lists its folder once, sorted
//     by file name, and replays that snapshot. `rewind` restarts it, so a batch can
//     be re-run against the exact same sequence.
// 3.  **Lazy decode**: Files are decoded one at a time on request. Only the frame
//     currently being processed is held in memory.

use image::RgbImage;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Width of the canonical working resolution.
pub const FRAME_WIDTH: u32 = 800;
/// Height of the canonical working resolution.
pub const FRAME_HEIGHT: u32 = 600;

/// A single color image plus a human-readable origin label.
#[derive(Debug, Clone)]
pub struct Frame {
    label: String,
    image: RgbImage,
}

impl Frame {
    pub fn new(label: impl Into<String>, image: RgbImage) -> Self {
        Self {
            label: label.into(),
            image,
        }
    }

    /// File name for directory frames, sequence tag for camera frames.
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn into_image(self) -> RgbImage {
        self.image
    }
}

/// Why a frame could not be obtained.
#[derive(Debug, thiserror::Error)]
pub enum AcquisitionError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("camera capture failed: {0}")]
    Capture(String),
}

/// Anything that hands out frames one at a time.
pub trait FrameSource {
    /// The next frame, `Ok(None)` once a finite source is exhausted.
    fn next_frame(&mut self) -> Result<Option<Frame>, AcquisitionError>;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn next_frame(&mut self) -> Result<Option<Frame>, AcquisitionError> {
        (**self).next_frame()
    }
}

/// Reads a single image file into a labelled frame.
pub fn load_frame(path: &Path) -> Result<Frame, AcquisitionError> {
    let image = image::open(path).map_err(|source| match source {
        image::ImageError::IoError(source) => AcquisitionError::Io {
            path: path.to_path_buf(),
            source,
        },
        source => AcquisitionError::Decode {
            path: path.to_path_buf(),
            source,
        },
    })?;
    let label = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok(Frame::new(label, image.to_rgb8()))
}

/// A finite, restartable source over the still images in one directory.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    paths: Vec<PathBuf>,
    cursor: usize,
}

impl DirectorySource {
    /// Snapshots the files directly inside `dir` whose extension matches one of
    /// `extensions` (case-insensitive), sorted by file name.
    pub fn open(dir: impl AsRef<Path>, extensions: &[String]) -> Result<Self, AcquisitionError> {
        let dir = dir.as_ref();
        let mut paths = Vec::new();
        for entry in WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|err| AcquisitionError::Io {
                path: dir.to_path_buf(),
                source: err.into(),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let matches = entry
                .path()
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| extensions.iter().any(|want| want.eq_ignore_ascii_case(ext)));
            if matches {
                paths.push(entry.into_path());
            }
        }
        debug!("Found {} frame(s) in {}", paths.len(), dir.display());
        Ok(Self { paths, cursor: 0 })
    }

    pub fn from_paths(paths: Vec<PathBuf>) -> Self {
        Self { paths, cursor: 0 }
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Restarts enumeration from the first file of the snapshot.
    pub fn rewind(&mut self) {
        self.cursor = 0;
    }
}

impl FrameSource for DirectorySource {
    fn next_frame(&mut self) -> Result<Option<Frame>, AcquisitionError> {
        let Some(path) = self.paths.get(self.cursor) else {
            return Ok(None);
        };
        self.cursor += 1;
        load_frame(path).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use std::fs;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("fish_vision_frame_{}_{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn directory_source_is_sorted_filtered_and_restartable() {
        let dir = scratch_dir("sorted");
        let image = RgbImage::from_pixel(4, 3, Rgb([10, 20, 30]));
        image.save(dir.join("b.png")).unwrap();
        image.save(dir.join("a.png")).unwrap();
        fs::write(dir.join("notes.txt"), "not a frame").unwrap();

        let mut source = DirectorySource::open(&dir, &["png".to_string()]).unwrap();
        assert_eq!(source.len(), 2);

        let first = source.next_frame().unwrap().unwrap();
        let second = source.next_frame().unwrap().unwrap();
        assert_eq!(first.label(), "a.png");
        assert_eq!(second.label(), "b.png");
        assert_eq!(first.image().dimensions(), (4, 3));
        assert!(source.next_frame().unwrap().is_none());

        source.rewind();
        assert_eq!(source.next_frame().unwrap().unwrap().label(), "a.png");

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn unreadable_file_is_an_acquisition_error_not_the_end() {
        let dir = scratch_dir("corrupt");
        fs::write(dir.join("a.png"), b"definitely not a png").unwrap();
        RgbImage::new(2, 2).save(dir.join("b.png")).unwrap();

        let mut source = DirectorySource::open(&dir, &["png".to_string()]).unwrap();
        assert!(source.next_frame().is_err());
        assert_eq!(source.next_frame().unwrap().unwrap().label(), "b.png");

        fs::remove_dir_all(&dir).unwrap();
    }
}
