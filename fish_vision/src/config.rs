// THEORY:
// One YAML file configures both binaries. Every section and every field has a
// built-in default, so an empty file (or no file at all) reproduces the stock
// tuning. Validation happens here, at load time: an inverted color range or a
// nonsensical control cadence stops the program before any frame is touched.

use crate::core_modules::color_range::ColorRange;
use crate::core_modules::segmenter::Closing;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Errors raised while loading configuration. All of them are fatal.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub pipeline: PipelineConfig,
    pub batch: BatchConfig,
    pub control: ControlConfig,
}

/// Configuration for the perception stack.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// HSV box that counts as fish.
    pub color_range: ColorRange,
    /// Denoising applied to every mask.
    pub closing: Closing,
}

/// Configuration for the offline batch run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub input_dir: PathBuf,
    /// Annotated frames are written here under their original file names.
    pub output_dir: PathBuf,
    /// Where the scatter plot of all centers is rendered.
    pub plot_path: PathBuf,
    /// File extensions picked up from `input_dir`, without the dot.
    pub extensions: Vec<String>,
    /// Decode and analyze frames on a pool of blocking workers.
    pub parallel: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("snaps"),
            output_dir: PathBuf::from("output"),
            plot_path: PathBuf::from("output/centerplot.png"),
            extensions: vec!["png".to_string()],
            parallel: false,
        }
    }
}

/// BCM pin numbers of the two H-bridge channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotorPins {
    pub left_forward: u8,
    pub left_backward: u8,
    pub right_forward: u8,
    pub right_backward: u8,
}

impl Default for MotorPins {
    fn default() -> Self {
        Self {
            left_forward: 17,
            left_backward: 27,
            right_forward: 22,
            right_backward: 23,
        }
    }
}

impl MotorPins {
    pub fn all(&self) -> [u8; 4] {
        [self.left_forward, self.left_backward, self.right_forward, self.right_backward]
    }
}

/// Configuration for the real-time steering loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    /// Pause between the end of one cycle and the next capture.
    pub interval_ms: u64,
    /// Headings within +/- this many degrees count as aligned.
    pub heading_tolerance_degrees: f64,
    /// Index handed to the camera backend.
    pub camera_index: i32,
    pub pins: MotorPins,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            interval_ms: 1000,
            heading_tolerance_degrees: 10.0,
            camera_index: 0,
            pins: MotorPins::default(),
        }
    }
}

impl ControlConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_yaml(&contents).map_err(|err| match err {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })?;
        Ok(config)
    }

    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        // An empty document deserializes to unit, not to an empty map.
        let config: Config = if contents.trim().is_empty() {
            Config::default()
        } else {
            serde_yaml::from_str(contents).map_err(|source| ConfigError::Parse {
                path: PathBuf::from("<inline>"),
                source,
            })?
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let tolerance = self.control.heading_tolerance_degrees;
        if !(0.0..180.0).contains(&tolerance) {
            return Err(ConfigError::Invalid(format!(
                "heading tolerance {tolerance} must be in [0, 180)"
            )));
        }
        if self.control.interval_ms == 0 {
            return Err(ConfigError::Invalid("control.interval_ms must be at least 1".to_string()));
        }
        if self.pipeline.closing.kernel_size % 2 == 0 {
            return Err(ConfigError::Invalid(format!(
                "closing kernel size {} must be odd",
                self.pipeline.closing.kernel_size
            )));
        }
        let pins = self.control.pins.all();
        for (i, pin) in pins.iter().enumerate() {
            if pins[..i].contains(pin) {
                return Err(ConfigError::Invalid(format!("motor pin {pin} is assigned twice")));
            }
        }
        if self.batch.extensions.is_empty() {
            return Err(ConfigError::Invalid("batch.extensions is empty".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::color_range::Hsv;

    #[test]
    fn empty_document_is_stock_tuning() {
        let config = Config::from_yaml("").unwrap();
        assert_eq!(config.pipeline.color_range, ColorRange::REDDISH_ORANGE);
        assert_eq!(config.pipeline.closing, Closing { kernel_size: 5, iterations: 3 });
        assert_eq!(config.control.interval(), Duration::from_secs(1));
        assert_eq!(config.control.pins.all(), [17, 27, 22, 23]);
        assert_eq!(config.batch.extensions, vec!["png".to_string()]);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let yaml = "
pipeline:
  color_range:
    lower: { hue: 5, saturation: 80, value: 90 }
    upper: { hue: 25, saturation: 255, value: 255 }
control:
  interval_ms: 250
";
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.pipeline.color_range.lower(), Hsv::new(5, 80, 90));
        assert_eq!(config.pipeline.closing.iterations, 3);
        assert_eq!(config.control.interval_ms, 250);
        assert_eq!(config.control.heading_tolerance_degrees, 10.0);
    }

    #[test]
    fn inverted_color_range_is_fatal() {
        let yaml = "
pipeline:
  color_range:
    lower: { hue: 0, saturation: 100, value: 200 }
    upper: { hue: 20, saturation: 255, value: 100 }
";
        assert!(matches!(Config::from_yaml(yaml), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn duplicate_pins_are_rejected() {
        let yaml = "
control:
  pins: { left_forward: 17, left_backward: 17 }
";
        assert!(matches!(Config::from_yaml(yaml), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn tolerance_outside_half_turn_is_rejected() {
        for tolerance in ["-1.0", "180.0", "360", ".nan"] {
            let yaml = format!("control:\n  heading_tolerance_degrees: {tolerance}\n");
            assert!(
                matches!(Config::from_yaml(&yaml), Err(ConfigError::Invalid(_))),
                "tolerance {tolerance}"
            );
        }
        assert!(Config::from_yaml("control:\n  heading_tolerance_degrees: 0.0\n").is_ok());
    }

    #[test]
    fn zero_interval_is_rejected() {
        let err = Config::from_yaml("control:\n  interval_ms: 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(msg) if msg.contains("interval_ms")));
        assert!(Config::from_yaml("control:\n  interval_ms: 1\n").is_ok());
    }

    #[test]
    fn even_closing_kernel_is_rejected() {
        let yaml = "pipeline:\n  closing: { kernel_size: 4, iterations: 3 }\n";
        assert!(matches!(Config::from_yaml(yaml), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn empty_extension_list_is_rejected() {
        let yaml = "batch:\n  extensions: []\n";
        assert!(matches!(Config::from_yaml(yaml), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = Config::load("/definitely/not/here.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
