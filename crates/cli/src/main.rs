use std::path::{Path, PathBuf};
use std::process;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use clap::{Args, Parser, Subcommand};

use facegate_core::detection::domain::detector_options::DetectorOptions;
use facegate_core::detection::domain::face_detector::FaceDetector;
use facegate_core::detection::infrastructure::detector_factory::create_detector;
use facegate_core::detection::infrastructure::face_models::{load_models, SharedProgressFn};
use facegate_core::detection::infrastructure::model_resolver::ModelLocation;
use facegate_core::login::login_view::{LoginView, TickOutcome};
use facegate_core::login::overlay::composite;
use facegate_core::login::polling_session::{PollingSession, POLL_INTERVAL};
use facegate_core::shared::constants::{
    DEFAULT_INPUT_SIZE, DEFAULT_MODEL_BASE, DEFAULT_SCORE_THRESHOLD, IMAGE_EXTENSIONS,
};
use facegate_core::video::domain::frame_source::FrameSource;
use facegate_core::video::infrastructure::ffmpeg_camera::{CameraConfig, FfmpegCamera};
use facegate_core::video::infrastructure::image_file_source::ImageFileSource;

/// Face presence detection and face-region capture.
#[derive(Parser)]
#[command(name = "facegate")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    detection: DetectionArgs,
}

#[derive(Args)]
struct DetectionArgs {
    /// Model directory or http(s) base URL.
    #[arg(long, global = true, default_value = DEFAULT_MODEL_BASE)]
    models: String,

    /// Detector input resolution (multiple of 32).
    #[arg(long, global = true, default_value_t = DEFAULT_INPUT_SIZE)]
    input_size: u32,

    /// Minimum detection score (0.0-1.0].
    #[arg(long, global = true, default_value_t = DEFAULT_SCORE_THRESHOLD)]
    score_threshold: f64,

    /// Also locate 68 facial landmarks.
    #[arg(long, global = true)]
    landmarks: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Print the most confident face in an image.
    Detect {
        input: PathBuf,
    },
    /// Crop an image to its face (or keep it whole) and write a PNG.
    Capture {
        input: PathBuf,
        /// Output PNG (required unless --data-url is used).
        output: Option<PathBuf>,
        /// Print the capture as a data URL instead of writing a file.
        #[arg(long)]
        data_url: bool,
    },
    /// Write an image with the detection overlay drawn on top.
    Overlay {
        input: PathBuf,
        output: PathBuf,
    },
    /// Poll a live camera and report when a face appears or leaves.
    Watch {
        /// Capture device, e.g. /dev/video0.
        #[arg(long)]
        device: Option<String>,
        /// FFmpeg capture format, e.g. v4l2, avfoundation, dshow.
        #[arg(long)]
        format: Option<String>,
        /// Stop after this many seconds (runs until killed otherwise).
        #[arg(long)]
        seconds: Option<u64>,
    },
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;

    let detector = build_detector(&cli.detection)?;
    let show_landmarks = cli.detection.landmarks;

    match cli.command {
        Command::Detect { input } => run_detect(&input, detector),
        Command::Capture {
            input,
            output,
            data_url,
        } => run_capture(&input, output.as_deref(), data_url, detector),
        Command::Overlay { input, output } => {
            run_overlay(&input, &output, detector, show_landmarks)
        }
        Command::Watch {
            device,
            format,
            seconds,
        } => run_watch(device, format, seconds, detector),
    }
}

fn run_detect(
    input: &Path,
    mut detector: Box<dyn FaceDetector>,
) -> Result<(), Box<dyn std::error::Error>> {
    let source = ImageFileSource::open(input)?;
    match detector.detect_single(source.frame())? {
        Some(det) => {
            let b = det.bbox;
            println!(
                "Face at x={:.1} y={:.1} width={:.1} height={:.1} score={:.3}",
                b.x, b.y, b.width, b.height, det.score
            );
            if let Some(lm) = det.landmarks {
                let (ex, ey) = lm.eye_center();
                println!("{} landmarks, eye center ({ex:.1}, {ey:.1})", lm.points().len());
            }
        }
        None => println!("No face detected"),
    }
    Ok(())
}

fn run_capture(
    input: &Path,
    output: Option<&Path>,
    data_url: bool,
    mut detector: Box<dyn FaceDetector>,
) -> Result<(), Box<dyn std::error::Error>> {
    let source = ImageFileSource::open(input)?;
    let mut view = LoginView::new();
    if view.tick(&source, &mut *detector)? == TickOutcome::NoFace {
        log::info!("No face detected, capturing the full frame");
    }
    let captured = view.capture_from(&source)?;

    if data_url {
        println!("{}", captured.data_url());
    } else if let Some(output) = output {
        std::fs::write(output, captured.png())?;
        log::info!(
            "{}x{} capture written to {}",
            captured.width(),
            captured.height(),
            output.display()
        );
    }
    Ok(())
}

fn run_overlay(
    input: &Path,
    output: &Path,
    mut detector: Box<dyn FaceDetector>,
    show_landmarks: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let source = ImageFileSource::open(input)?;
    let mut view = LoginView::new();
    view.set_show_landmarks(show_landmarks);
    view.tick(&source, &mut *detector)?;

    let canvas = view
        .overlay()
        .canvas()
        .ok_or("No overlay was rendered")?;
    let out = composite(source.frame(), canvas).ok_or("Input is not an RGB image")?;
    // Composite is opaque; dropping alpha keeps JPEG outputs writable.
    image::DynamicImage::ImageRgba8(out).to_rgb8().save(output)?;
    log::info!("Overlay written to {}", output.display());
    Ok(())
}

fn run_watch(
    device: Option<String>,
    format: Option<String>,
    seconds: Option<u64>,
    detector: Box<dyn FaceDetector>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = CameraConfig::default();
    if let Some(device) = device {
        config.device = device;
    }
    if let Some(format) = format {
        config.format = format;
    }
    let camera: Arc<dyn FrameSource> = Arc::new(FfmpegCamera::open(config)?);

    let view = Arc::new(Mutex::new(LoginView::new()));
    let mut session = PollingSession::start(&view, camera, detector, POLL_INTERVAL);
    let deadline = seconds.map(|s| Instant::now() + Duration::from_secs(s));

    let mut was_detected = false;
    while deadline.map_or(true, |d| Instant::now() < d) {
        thread::sleep(POLL_INTERVAL);
        while let Ok(e) = session.errors().try_recv() {
            eprintln!("Detection error: {e}");
        }
        let view = view.lock().unwrap_or_else(PoisonError::into_inner);
        let state = view.state();
        if state.is_face_detected != was_detected {
            was_detected = state.is_face_detected;
            if was_detected {
                let b = state.face_location;
                println!(
                    "Face at x={:.0} y={:.0} {:.0}x{:.0}",
                    b.x, b.y, b.width, b.height
                );
            } else {
                println!("No face");
            }
        }
    }

    session.unmount();
    let stats = session.stats();
    log::info!(
        "{} ticks, {} detections, {} skipped (no frame), {} skipped (busy), {} errors",
        stats.ticks,
        stats.detections,
        stats.skipped_no_frame,
        stats.skipped_in_flight,
        stats.errors
    );
    Ok(())
}

fn build_detector(
    args: &DetectionArgs,
) -> Result<Box<dyn FaceDetector>, Box<dyn std::error::Error>> {
    let options = DetectorOptions::new(args.input_size, args.score_threshold)?;
    let location = ModelLocation::parse(&args.models);
    let progress: SharedProgressFn = Arc::new(download_progress);
    let models = load_models(&location, Some(progress))?;
    Ok(create_detector(models, options, args.landmarks))
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let input = match &cli.command {
        Command::Detect { input }
        | Command::Capture { input, .. }
        | Command::Overlay { input, .. } => Some(input),
        Command::Watch { .. } => None,
    };
    if let Some(input) = input {
        if !input.exists() {
            return Err(format!("Input file not found: {}", input.display()).into());
        }
        if !is_image(input) {
            return Err(format!(
                "Input must be an image ({}), got {}",
                IMAGE_EXTENSIONS.join(", "),
                input.display()
            )
            .into());
        }
    }
    if let Command::Capture {
        output: None,
        data_url: false,
        ..
    } = cli.command
    {
        return Err("Output file is required unless --data-url is used".into());
    }
    Ok(())
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading face models... {pct}%");
    } else {
        eprint!("\rDownloading face models... {downloaded} bytes");
    }
}
