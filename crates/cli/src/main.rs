use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Args, Parser, Subcommand};
use tempfile::NamedTempFile;

use gifswap_core::pipeline::pipeline_logger::StdoutPipelineLogger;
use gifswap_core::shared::constants::{
    DEFAULT_DETECTION_CONFIDENCE, DEFAULT_ENCODER_SPEED, DEFAULT_STRIDE, DEFAULT_WORKERS,
};
use gifswap_core::{ErrorClass, FaceSwapService, ModelPaths, SwapConfig, SwapError};

const EXIT_INTERNAL: i32 = 1;
const EXIT_BAD_INPUT: i32 = 2;

/// Swap a reference face into every face of an animated GIF.
#[derive(Parser)]
#[command(name = "gifswap")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Replace every face in GIF with the face from FACE and write OUTPUT.
    Swap {
        /// Input animated GIF.
        gif: PathBuf,
        /// Reference image containing the face to swap in.
        face: PathBuf,
        /// Output GIF path.
        output: PathBuf,
        #[command(flatten)]
        options: PipelineOptions,
    },
    /// Print the faces detected in IMAGE as JSON.
    Faces {
        image: PathBuf,
        #[command(flatten)]
        options: PipelineOptions,
    },
    /// Load the models and print the health report as JSON.
    Health {
        #[command(flatten)]
        options: PipelineOptions,
    },
}

#[derive(Args)]
struct PipelineOptions {
    /// Run full inference on every Nth frame (1 = every frame).
    #[arg(long, default_value_t = DEFAULT_STRIDE)]
    stride: usize,

    /// Number of frame worker threads.
    #[arg(long, default_value_t = DEFAULT_WORKERS)]
    workers: usize,

    /// Face detection confidence threshold (0.0-1.0).
    #[arg(long, default_value_t = DEFAULT_DETECTION_CONFIDENCE)]
    confidence: f64,

    /// GIF encoder speed (1 = best quality, 30 = fastest).
    #[arg(long, default_value_t = DEFAULT_ENCODER_SPEED)]
    speed: i32,

    /// Face detector ONNX model (skips the cache and download).
    #[arg(long)]
    detector_model: Option<PathBuf>,

    /// ArcFace embedder ONNX model.
    #[arg(long)]
    embedder_model: Option<PathBuf>,

    /// Inswapper ONNX model.
    #[arg(long)]
    swapper_model: Option<PathBuf>,
}

impl PipelineOptions {
    fn config(&self) -> SwapConfig {
        SwapConfig {
            stride: self.stride,
            workers: self.workers,
            detection_confidence: self.confidence,
            encoder_speed: self.speed,
        }
    }

    fn model_paths(&self) -> ModelPaths {
        ModelPaths {
            detector: self.detector_model.clone(),
            embedder: self.embedder_model.clone(),
            swapper: self.swapper_model.clone(),
        }
    }
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(exit_code(e.as_ref()));
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    match Cli::parse().command {
        Command::Swap {
            gif,
            face,
            output,
            options,
        } => run_swap(&gif, &face, &output, &options),
        Command::Faces { image, options } => run_faces(&image, &options),
        Command::Health { options } => run_health(&options),
    }
}

fn run_swap(
    gif: &Path,
    face: &Path,
    output: &Path,
    options: &PipelineOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let gif_bytes = read_input(gif)?;
    let face_bytes = read_input(face)?;
    let service = load_service(options)?;

    let mut logger = StdoutPipelineLogger::default();
    let encoded = service.swap_faces_with_logger(&gif_bytes, &face_bytes, &mut logger)?;

    write_atomically(output, &encoded)?;
    log::info!("Output written to {}", output.display());
    Ok(())
}

fn run_faces(image: &Path, options: &PipelineOptions) -> Result<(), Box<dyn std::error::Error>> {
    let bytes = read_input(image)?;
    let service = load_service(options)?;
    let faces = service.list_faces(&bytes)?;
    println!("{}", serde_json::to_string_pretty(&faces)?);
    Ok(())
}

fn run_health(options: &PipelineOptions) -> Result<(), Box<dyn std::error::Error>> {
    let service = load_service(options)?;
    let report = service.health();
    println!("{}", serde_json::to_string_pretty(&report)?);
    if report.models_loaded {
        Ok(())
    } else {
        Err(SwapError::ModelUnavailable(report.detail.unwrap_or_default()).into())
    }
}

fn load_service(options: &PipelineOptions) -> Result<FaceSwapService, SwapError> {
    let service = FaceSwapService::load(
        &options.model_paths(),
        options.config(),
        Some(&download_progress),
    )?;
    eprintln!();
    Ok(service)
}

fn read_input(path: &Path) -> Result<Vec<u8>, SwapError> {
    if !path.is_file() {
        return Err(SwapError::InvalidInput(format!(
            "Input file not found: {}",
            path.display()
        )));
    }
    fs::read(path)
        .map_err(|e| SwapError::InvalidInput(format!("Failed to read {}: {e}", path.display())))
}

/// Stages `bytes` next to `output` and renames it into place, so a failed
/// run never leaves a truncated GIF behind.
fn write_atomically(output: &Path, bytes: &[u8]) -> Result<(), Box<dyn std::error::Error>> {
    let dir = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut staged = NamedTempFile::new_in(dir)?;
    staged.write_all(bytes)?;
    staged.flush()?;
    staged.persist(output)?;
    Ok(())
}

fn exit_code(error: &(dyn std::error::Error + 'static)) -> i32 {
    match error.downcast_ref::<SwapError>().map(SwapError::class) {
        Some(ErrorClass::BadInput) => EXIT_BAD_INPUT,
        _ => EXIT_INTERNAL,
    }
}

fn download_progress(model: &str, downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading {model}... {pct}%");
    } else {
        eprint!("\rDownloading {model}... {downloaded} bytes");
    }
}
