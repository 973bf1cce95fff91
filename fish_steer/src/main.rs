// Real-time runner: capture, detect, steer, repeat until Ctrl-C.
//
// Usage: fish_steer [--config <file.yaml>] [--replay <snapshot_dir>]
//
// Without `--replay` frames come from the camera (`camera` feature). Motors are
// driven over GPIO with the `gpio` feature, otherwise commands are only logged.

use anyhow::{Context, Result};
use fish_steer::control::cancel_on_ctrl_c;
use fish_steer::{Actuator, ActuatorHandle, ControlLoop, Steering};
use fish_vision::config::ControlConfig;
use fish_vision::{Config, DirectorySource, FrameSource, VisionPipeline};
use std::env;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn open_source(replay: Option<PathBuf>, config: &Config) -> Result<Box<dyn FrameSource + Send>> {
    if let Some(dir) = replay {
        let source = DirectorySource::open(&dir, &config.batch.extensions)
            .with_context(|| format!("listing {}", dir.display()))?;
        info!("Replaying {} frame(s) from {}", source.len(), dir.display());
        return Ok(Box::new(source));
    }
    open_camera(&config.control)
}

#[cfg(feature = "camera")]
fn open_camera(control: &ControlConfig) -> Result<Box<dyn FrameSource + Send>> {
    let camera = fish_steer::camera::CameraSource::open(control.camera_index)?;
    Ok(Box::new(camera))
}

#[cfg(not(feature = "camera"))]
fn open_camera(_control: &ControlConfig) -> Result<Box<dyn FrameSource + Send>> {
    anyhow::bail!("built without the `camera` feature; pass --replay <dir>")
}

#[cfg(feature = "gpio")]
fn open_actuator(control: &ControlConfig) -> Box<dyn Actuator + Send> {
    Box::new(fish_steer::gpio::GpioActuator::new(control.pins))
}

#[cfg(not(feature = "gpio"))]
fn open_actuator(_control: &ControlConfig) -> Box<dyn Actuator + Send> {
    Box::new(fish_steer::LogActuator::new())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("fish_steer=info,fish_vision=info")),
        )
        .init();

    // --- 1. Argument Parsing & Setup ---
    let mut config_path: Option<PathBuf> = None;
    let mut replay: Option<PathBuf> = None;
    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => config_path = Some(args.next().context("--config needs a path")?.into()),
            "--replay" => replay = Some(args.next().context("--replay needs a directory")?.into()),
            "-h" | "--help" => {
                println!("Usage: fish_steer [--config <file.yaml>] [--replay <snapshot_dir>]");
                return Ok(());
            }
            other => anyhow::bail!("unexpected argument {other:?}"),
        }
    }
    let config = match &config_path {
        Some(path) => Config::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => Config::default(),
    };

    // --- 2. Hardware ---
    let source = open_source(replay, &config)?;
    let actuator = ActuatorHandle::acquire(open_actuator(&config.control)).context("acquiring motors")?;

    // --- 3. Control loop ---
    let control = ControlLoop::new(
        source,
        VisionPipeline::new(config.pipeline.clone()),
        actuator,
        Steering::new(config.control.heading_tolerance_degrees),
        config.control.interval(),
    );
    let summary = control.run(cancel_on_ctrl_c()).await.context("control loop failed")?;
    info!("{summary:?}");
    Ok(())
}
