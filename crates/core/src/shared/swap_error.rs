use thiserror::Error;

/// Error type for collaborator calls that may cross worker threads.
pub type DynError = Box<dyn std::error::Error + Send + Sync>;

/// Which side of the service boundary a failure belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorClass {
    /// The caller sent something unusable; resubmitting the same input fails again.
    BadInput,
    /// The service itself could not complete the request.
    Internal,
}

/// Request-level failures. Per-face and per-frame failures never reach this
/// type: they are absorbed as degraded frames by the pipeline.
#[derive(Error, Debug)]
pub enum SwapError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("failed to load image: {0}")]
    ImageLoad(String),
    #[error("no face detected in reference image")]
    NoFaceDetected,
    #[error("face models unavailable: {0}")]
    ModelUnavailable(String),
    #[error("inference failed: {0}")]
    Inference(String),
    #[error("failed to encode animation: {0}")]
    Encode(String),
    #[error("internal pipeline error: {0}")]
    Internal(String),
}

impl SwapError {
    pub fn class(&self) -> ErrorClass {
        match self {
            SwapError::InvalidInput(_) | SwapError::ImageLoad(_) | SwapError::NoFaceDetected => {
                ErrorClass::BadInput
            }
            SwapError::ModelUnavailable(_)
            | SwapError::Inference(_)
            | SwapError::Encode(_)
            | SwapError::Internal(_) => ErrorClass::Internal,
        }
    }
}
