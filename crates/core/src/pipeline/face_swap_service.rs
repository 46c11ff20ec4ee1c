use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;

use crate::animation::infrastructure::gif_reader::GifReader;
use crate::animation::infrastructure::gif_writer::GifWriter;
use crate::animation::infrastructure::image_crate_reader::ImageCrateReader;
use crate::detection::domain::face_detector::FaceDetector;
use crate::detection::infrastructure::onnx_yolo_detector::OnnxYoloDetector;
use crate::identity::domain::face_embedder::FaceEmbedder;
use crate::identity::domain::identity_extractor::IdentityExtractor;
use crate::identity::infrastructure::onnx_arcface_embedder::OnnxArcFaceEmbedder;
use crate::pipeline::frame_processor::FrameProcessor;
use crate::pipeline::frame_sampler::FrameSampler;
use crate::pipeline::infrastructure::worker_pool_dispatcher::WorkerPoolDispatcher;
use crate::pipeline::list_faces_use_case::{FaceSummary, ListFacesUseCase};
use crate::pipeline::pipeline_logger::{NullPipelineLogger, PipelineLogger};
use crate::pipeline::swap_faces_use_case::SwapFacesUseCase;
use crate::shared::constants::{
    DEFAULT_DETECTION_CONFIDENCE, DEFAULT_ENCODER_SPEED, DEFAULT_STRIDE, DEFAULT_WORKERS,
};
use crate::shared::model_resolver::{
    self, ModelSpec, ProgressFn, DETECTOR_MODEL, EMBEDDER_MODEL, SWAPPER_MODEL,
};
use crate::shared::swap_error::{DynError, SwapError};
use crate::swapping::domain::face_swapper::FaceSwapper;
use crate::swapping::infrastructure::onnx_inswapper::OnnxInswapper;

/// Tunables for one service instance.
#[derive(Clone, Debug, PartialEq)]
pub struct SwapConfig {
    /// Run full inference on every `stride`-th frame.
    pub stride: usize,
    /// Size of the process-wide frame worker pool.
    pub workers: usize,
    pub detection_confidence: f64,
    /// GIF quantizer speed, 1 (best) to 30 (fastest).
    pub encoder_speed: i32,
}

impl Default for SwapConfig {
    fn default() -> Self {
        Self {
            stride: DEFAULT_STRIDE,
            workers: DEFAULT_WORKERS,
            detection_confidence: DEFAULT_DETECTION_CONFIDENCE,
            encoder_speed: DEFAULT_ENCODER_SPEED,
        }
    }
}

impl SwapConfig {
    pub fn validate(&self) -> Result<(), SwapError> {
        if self.stride < 1 {
            return Err(SwapError::InvalidInput("stride must be >= 1".into()));
        }
        if self.workers < 1 {
            return Err(SwapError::InvalidInput("workers must be >= 1".into()));
        }
        if !(0.0..=1.0).contains(&self.detection_confidence) {
            return Err(SwapError::InvalidInput(format!(
                "detection confidence {} is outside 0..=1",
                self.detection_confidence
            )));
        }
        if !(1..=30).contains(&self.encoder_speed) {
            return Err(SwapError::InvalidInput(format!(
                "encoder speed {} is outside 1..=30",
                self.encoder_speed
            )));
        }
        Ok(())
    }
}

/// Optional explicit model files; `None` means resolve from the cache or
/// download.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ModelPaths {
    pub detector: Option<PathBuf>,
    pub embedder: Option<PathBuf>,
    pub swapper: Option<PathBuf>,
}

/// The three inference capabilities the pipeline consumes.
#[derive(Clone)]
pub struct FaceModels {
    pub detector: Arc<dyn FaceDetector>,
    pub embedder: Arc<dyn FaceEmbedder>,
    pub swapper: Arc<dyn FaceSwapper>,
}

impl FaceModels {
    /// Resolves and loads the ONNX backends. Any failure leaves the service
    /// without models, so it is reported as [`SwapError::ModelUnavailable`].
    pub fn load(
        paths: &ModelPaths,
        config: &SwapConfig,
        progress: Option<ProgressFn<'_>>,
    ) -> Result<Self, SwapError> {
        let resolve = |spec: &ModelSpec, path: &Option<PathBuf>| {
            model_resolver::resolve(spec, path.as_deref(), progress)
                .map_err(|e| SwapError::ModelUnavailable(e.to_string()))
        };
        let unavailable = |what: &str, e: DynError| {
            SwapError::ModelUnavailable(format!("{what}: {e}"))
        };

        let detector_path = resolve(&DETECTOR_MODEL, &paths.detector)?;
        let embedder_path = resolve(&EMBEDDER_MODEL, &paths.embedder)?;
        let swapper_path = resolve(&SWAPPER_MODEL, &paths.swapper)?;

        let detector =
            OnnxYoloDetector::new(&detector_path, config.detection_confidence, config.workers)
                .map_err(|e| unavailable("face detector", e))?;
        let embedder = OnnxArcFaceEmbedder::new(&embedder_path, config.workers)
            .map_err(|e| unavailable("face embedder", e))?;
        let swapper = OnnxInswapper::new(&swapper_path, config.workers)
            .map_err(|e| unavailable("face swapper", e))?;

        log::info!("Face models loaded");
        Ok(Self {
            detector: Arc::new(detector),
            embedder: Arc::new(embedder),
            swapper: Arc::new(swapper),
        })
    }
}

/// Whether the service could initialize its models.
pub enum ModelState {
    Ready(FaceModels),
    Unavailable(String),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HealthReport {
    pub status: String,
    pub models_loaded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

enum Backend {
    Ready {
        swap: SwapFacesUseCase,
        list: ListFacesUseCase,
    },
    Unavailable(String),
}

/// Entry point for callers: swap, inspect, and health.
///
/// Owns the single worker pool shared by every request made through it.
/// A service whose models failed to load still answers `health()` and
/// fails every other call with [`SwapError::ModelUnavailable`].
pub struct FaceSwapService {
    backend: Backend,
    config: SwapConfig,
}

impl FaceSwapService {
    pub fn new(state: ModelState, config: SwapConfig) -> Result<Self, SwapError> {
        config.validate()?;

        let backend = match state {
            ModelState::Ready(models) => {
                let image_reader = Arc::new(ImageCrateReader::new());
                let dispatcher = Arc::new(WorkerPoolDispatcher::new(config.workers)?);
                let swap = SwapFacesUseCase::new(
                    Arc::new(GifReader::new()),
                    image_reader.clone(),
                    Arc::new(GifWriter::new(config.encoder_speed)),
                    IdentityExtractor::new(models.detector.clone(), models.embedder.clone()),
                    Arc::new(FrameProcessor::new(
                        models.detector.clone(),
                        models.swapper.clone(),
                    )),
                    dispatcher,
                    FrameSampler::new(config.stride)?,
                );
                let list = ListFacesUseCase::new(image_reader, models.detector);
                Backend::Ready { swap, list }
            }
            ModelState::Unavailable(reason) => {
                log::error!("Face models unavailable: {reason}");
                Backend::Unavailable(reason)
            }
        };

        Ok(Self { backend, config })
    }

    /// Loads the ONNX models and builds the service. A model failure does
    /// not fail construction; it is reported by `health()` instead.
    pub fn load(
        paths: &ModelPaths,
        config: SwapConfig,
        progress: Option<ProgressFn<'_>>,
    ) -> Result<Self, SwapError> {
        config.validate()?;
        let state = match FaceModels::load(paths, &config, progress) {
            Ok(models) => ModelState::Ready(models),
            Err(e) => ModelState::Unavailable(e.to_string()),
        };
        Self::new(state, config)
    }

    pub fn config(&self) -> &SwapConfig {
        &self.config
    }

    pub fn swap_faces(
        &self,
        animation_bytes: &[u8],
        reference_bytes: &[u8],
    ) -> Result<Vec<u8>, SwapError> {
        self.swap_faces_with_logger(animation_bytes, reference_bytes, &mut NullPipelineLogger)
    }

    pub fn swap_faces_with_logger(
        &self,
        animation_bytes: &[u8],
        reference_bytes: &[u8],
        logger: &mut dyn PipelineLogger,
    ) -> Result<Vec<u8>, SwapError> {
        match &self.backend {
            Backend::Ready { swap, .. } => swap.execute(animation_bytes, reference_bytes, logger),
            Backend::Unavailable(reason) => Err(SwapError::ModelUnavailable(reason.clone())),
        }
    }

    pub fn list_faces(&self, image_bytes: &[u8]) -> Result<Vec<FaceSummary>, SwapError> {
        match &self.backend {
            Backend::Ready { list, .. } => list.execute(image_bytes),
            Backend::Unavailable(reason) => Err(SwapError::ModelUnavailable(reason.clone())),
        }
    }

    pub fn health(&self) -> HealthReport {
        match &self.backend {
            Backend::Ready { .. } => HealthReport {
                status: "ok".into(),
                models_loaded: true,
                detail: None,
            },
            Backend::Unavailable(reason) => HealthReport {
                status: "unavailable".into(),
                models_loaded: false,
                detail: Some(reason.clone()),
            },
        }
    }
}
