//! The two pretrained networks behind face detection, loaded once per process.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use ort::session::Session;
use thiserror::Error;

use crate::shared::constants::{DETECTOR_MODEL_NAME, LANDMARK_MODEL_NAME};

use super::model_resolver::{self, ModelLocation, ModelResolveError, ProgressFn};
use super::model_store::ModelStore;

/// Fallback landmark network input when the model shape is dynamic.
const DEFAULT_LANDMARK_INPUT_SIZE: u32 = 112;

#[derive(Error, Debug)]
pub enum ModelLoadError {
    #[error(transparent)]
    Resolve(#[from] ModelResolveError),
    #[error("failed to load {path}: {message}")]
    Session { path: PathBuf, message: String },
}

/// Download progress shared across both artifacts: `(bytes_downloaded, total_bytes)`.
pub type SharedProgressFn = Arc<dyn Fn(u64, u64) + Send + Sync>;

/// Runtime sessions for the detector and the 68-point landmark network.
///
/// Sessions need exclusive access to run, so each sits behind its own mutex;
/// detection and landmarking never block each other.
pub struct FaceModels {
    detector: Mutex<Session>,
    landmarker: Mutex<Session>,
    landmark_input_size: u32,
    location: ModelLocation,
}

static FACE_MODELS: ModelStore<FaceModels> = ModelStore::new();

/// Loads both models from `location` on first use and returns the shared
/// instance on every later call.
///
/// Once loaded, the location argument of later calls is ignored.
pub fn load_models(
    location: &ModelLocation,
    progress: Option<SharedProgressFn>,
) -> Result<Arc<FaceModels>, ModelLoadError> {
    FACE_MODELS.get_or_load(|| FaceModels::load(location, progress))
}

/// The shared models if [`load_models`] has already succeeded.
pub fn loaded_models() -> Option<Arc<FaceModels>> {
    FACE_MODELS.get()
}

impl FaceModels {
    /// Resolves and loads both artifacts, bypassing the process-wide store.
    pub fn load(
        location: &ModelLocation,
        progress: Option<SharedProgressFn>,
    ) -> Result<Self, ModelLoadError> {
        log::info!("Loading face models from {location}");
        let detector_path =
            model_resolver::resolve(DETECTOR_MODEL_NAME, location, forward(&progress))?;
        let landmark_path =
            model_resolver::resolve(LANDMARK_MODEL_NAME, location, forward(&progress))?;

        let detector = build_session(&detector_path)?;
        let landmarker = build_session(&landmark_path)?;
        let landmark_input_size =
            square_input_size(&landmarker).unwrap_or(DEFAULT_LANDMARK_INPUT_SIZE);
        log::debug!("Landmark network input: {landmark_input_size}px");

        Ok(Self {
            detector: Mutex::new(detector),
            landmarker: Mutex::new(landmarker),
            landmark_input_size,
            location: location.clone(),
        })
    }

    pub(crate) fn detector(&self) -> &Mutex<Session> {
        &self.detector
    }

    pub(crate) fn landmarker(&self) -> &Mutex<Session> {
        &self.landmarker
    }

    pub fn landmark_input_size(&self) -> u32 {
        self.landmark_input_size
    }

    pub fn location(&self) -> &ModelLocation {
        &self.location
    }
}

fn forward(progress: &Option<SharedProgressFn>) -> Option<ProgressFn> {
    progress.as_ref().map(|cb| {
        let cb = cb.clone();
        Box::new(move |downloaded, total| cb(downloaded, total)) as ProgressFn
    })
}

fn build_session(path: &Path) -> Result<Session, ModelLoadError> {
    let fail = |e: &dyn std::fmt::Display| ModelLoadError::Session {
        path: path.to_path_buf(),
        message: e.to_string(),
    };
    Session::builder()
        .map_err(|e| fail(&e))?
        .with_execution_providers(preferred_execution_providers())
        .map_err(|e| fail(&e))?
        .commit_from_file(path)
        .map_err(|e| fail(&e))
}

/// Height of an NCHW `[1, C, H, W]` input, if the model declares it.
fn square_input_size(session: &Session) -> Option<u32> {
    session.inputs().first().and_then(|input| {
        if let ort::value::ValueType::Tensor { ref shape, .. } = input.dtype() {
            (shape.len() >= 4 && shape[2] > 0).then(|| shape[2] as u32)
        } else {
            None
        }
    })
}

/// Platform accelerators, falling back to CPU when unavailable.
fn preferred_execution_providers() -> Vec<ort::execution_providers::ExecutionProviderDispatch> {
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

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_fails_when_artifacts_missing() {
        let tmp = TempDir::new().unwrap();
        let location = ModelLocation::Directory(tmp.path().to_path_buf());

        let result = FaceModels::load(&location, None);

        assert!(matches!(
            result,
            Err(ModelLoadError::Resolve(ModelResolveError::NotFound(_)))
        ));
    }

    #[test]
    fn test_load_rejects_corrupt_artifacts() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join(DETECTOR_MODEL_NAME), b"not onnx").unwrap();
        std::fs::write(tmp.path().join(LANDMARK_MODEL_NAME), b"not onnx").unwrap();
        let location = ModelLocation::Directory(tmp.path().to_path_buf());

        let result = FaceModels::load(&location, None);

        assert!(matches!(result, Err(ModelLoadError::Session { .. })));
    }

    #[test]
    fn test_forward_relays_progress() {
        use std::sync::atomic::{AtomicU64, Ordering};
        let seen = Arc::new(AtomicU64::new(0));
        let sink = seen.clone();
        let shared: SharedProgressFn = Arc::new(move |d, _| sink.store(d, Ordering::SeqCst));

        let boxed = forward(&Some(shared)).unwrap();
        boxed(42, 100);

        assert_eq!(seen.load(Ordering::SeqCst), 42);
        assert!(forward(&None).is_none());
    }
}
