// Offline runner: analyzes a folder of snapshots, writes annotated copies and
// renders the scatter plot of fish centers.
//
// Usage: fish_vision [--config <file.yaml>] [<input_dir> <output_dir>]

use anyhow::{Context, Result, bail};
use fish_vision::batch::{BatchAggregator, DirectoryWriter, run_batch_parallel};
use fish_vision::plot::{PlotSink, ScatterPlot};
use fish_vision::{Config, DirectorySource, VisionPipeline};
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("fish_vision=info")))
        .init();

    // --- 1. Argument Parsing & Setup ---
    let mut config_path: Option<PathBuf> = None;
    let mut positional = Vec::new();
    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => config_path = Some(args.next().context("--config needs a path")?.into()),
            "-h" | "--help" => {
                println!("Usage: fish_vision [--config <file.yaml>] [<input_dir> <output_dir>]");
                return Ok(());
            }
            _ => positional.push(PathBuf::from(arg)),
        }
    }

    let mut config = match &config_path {
        Some(path) => Config::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => Config::default(),
    };
    match positional.as_slice() {
        [] => {}
        [input, output] => {
            config.batch.input_dir = input.clone();
            config.batch.output_dir = output.clone();
            config.batch.plot_path = output.join("centerplot.png");
        }
        _ => bail!("expected both <input_dir> and <output_dir>, or neither"),
    }
    let batch = &config.batch;

    // --- 2. Frame enumeration ---
    let mut source = DirectorySource::open(&batch.input_dir, &batch.extensions)
        .with_context(|| format!("listing {}", batch.input_dir.display()))?;
    if source.is_empty() {
        error!("No frames found in {}", batch.input_dir.display());
        return Ok(());
    }
    info!("Found {} frame(s) in {}", source.len(), batch.input_dir.display());

    // --- 3. Analysis ---
    let pipeline = VisionPipeline::new(config.pipeline.clone());
    let mut writer = DirectoryWriter::new(&batch.output_dir);
    let report = if batch.parallel {
        run_batch_parallel(Arc::new(pipeline), source.paths().to_vec(), &mut writer).await
    } else {
        BatchAggregator::new(&pipeline).run_batch(&mut source, &mut writer)
    };

    // --- 4. Visualization ---
    if let Err(err) = ScatterPlot::new(&batch.plot_path).plot(&report.centers) {
        error!("{err}");
    }
    Ok(())
}
