use std::sync::Arc;
use std::thread;

use crossbeam_channel::{Receiver, Sender};

use facegate_core::detection::domain::detector_options::DetectorOptions;
use facegate_core::detection::domain::face_detector::FaceDetector;
use facegate_core::detection::infrastructure::detector_factory::create_detector;
use facegate_core::detection::infrastructure::face_models::{load_models, SharedProgressFn};
use facegate_core::detection::infrastructure::model_resolver::ModelLocation;
use facegate_core::shared::constants::DEFAULT_INPUT_SIZE;
use facegate_core::video::domain::frame_source::FrameSource;
use facegate_core::video::infrastructure::ffmpeg_camera::{CameraConfig, FfmpegCamera};

pub enum StartupMessage {
    DownloadProgress(u64, u64),
    OpeningCamera,
    Ready {
        camera: Arc<dyn FrameSource>,
        detector: Box<dyn FaceDetector>,
    },
    Error(String),
}

pub struct StartupParams {
    pub model_base: String,
    pub score_threshold: f64,
    pub camera: CameraConfig,
}

/// Loads the face models, then opens the camera, off the UI thread.
pub fn spawn(params: StartupParams) -> Receiver<StartupMessage> {
    let (tx, rx) = crossbeam_channel::unbounded::<StartupMessage>();

    thread::spawn(move || {
        if let Err(e) = run_startup(&tx, params) {
            log::error!("Startup failed: {e}");
            let _ = tx.send(StartupMessage::Error(e.to_string()));
        }
    });

    rx
}

fn run_startup(
    tx: &Sender<StartupMessage>,
    params: StartupParams,
) -> Result<(), Box<dyn std::error::Error>> {
    let options = DetectorOptions::new(DEFAULT_INPUT_SIZE, params.score_threshold)?;
    let location = ModelLocation::parse(&params.model_base);

    let tx_progress = tx.clone();
    let progress: SharedProgressFn = Arc::new(move |downloaded, total| {
        let _ = tx_progress.send(StartupMessage::DownloadProgress(downloaded, total));
    });
    let models = load_models(&location, Some(progress))?;
    // Landmarks are always computed; the overlay setting only hides them.
    let detector = create_detector(models, options, true);

    let _ = tx.send(StartupMessage::OpeningCamera);
    let camera: Arc<dyn FrameSource> = Arc::new(FfmpegCamera::open(params.camera)?);

    let _ = tx.send(StartupMessage::Ready { camera, detector });
    Ok(())
}
