use std::path::Path;

use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;

use crate::shared::swap_error::DynError;

/// Return the preferred ONNX execution providers for the current platform.
///
/// Falls back to CPU if the platform-specific provider is unavailable.
pub fn preferred_execution_providers() -> Vec<ort::execution_providers::ExecutionProviderDispatch> {
    #[cfg(target_os = "macos")]
    {
        vec![ort::execution_providers::CoreMLExecutionProvider::default().build()]
    }
    #[cfg(target_os = "windows")]
    {
        vec![ort::execution_providers::DirectMLExecutionProvider::default().build()]
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        vec![]
    }
}

/// Opens an ONNX model with the settings every backend here shares.
///
/// Each session is used by one worker at a time (callers hold it behind a
/// mutex), so inter-op parallelism stays at 1 and intra-op threads are
/// split across the frame workers.
pub fn build_session(model_path: &Path, workers: usize) -> Result<Session, DynError> {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    let intra_threads = (cores / workers.max(1)).max(1);

    let session = Session::builder()?
        .with_optimization_level(GraphOptimizationLevel::Level3)?
        .with_inter_threads(1)?
        .with_intra_threads(intra_threads)?
        .with_execution_providers(preferred_execution_providers())?
        .commit_from_file(model_path)?;

    log::debug!(
        "Loaded {} ({intra_threads} intra-op thread(s))",
        model_path.display()
    );
    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_model_file_errors() {
        let result = build_session(Path::new("/nonexistent/model.onnx"), 4);
        assert!(result.is_err());
    }

    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    #[test]
    fn test_cpu_only_elsewhere() {
        assert!(preferred_execution_providers().is_empty());
    }
}
