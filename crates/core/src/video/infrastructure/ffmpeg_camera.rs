use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use thiserror::Error;

use crate::shared::frame::Frame;
use crate::video::domain::frame_source::FrameSource;

#[derive(Error, Debug)]
pub enum CameraError {
    #[error("ffmpeg initialization failed: {0}")]
    Init(String),
    #[error("capture format '{0}' is not available")]
    FormatNotFound(String),
    #[error("failed to open camera {device}: {message}")]
    Open { device: String, message: String },
    #[error("camera {0} has no video stream")]
    NoVideoStream(String),
    #[error("camera decoder setup failed: {0}")]
    Decoder(String),
    #[error("camera thread exited before reporting")]
    ThreadExited,
}

/// Which capture device to open and how.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CameraConfig {
    /// FFmpeg input device format, e.g. `v4l2`.
    pub format: String,
    /// Device name within that format, e.g. `/dev/video0`.
    pub device: String,
    pub framerate: Option<u32>,
    /// `WIDTHxHEIGHT`, passed through to the device.
    pub video_size: Option<String>,
}

impl Default for CameraConfig {
    fn default() -> Self {
        #[cfg(target_os = "macos")]
        let (format, device) = ("avfoundation", "0");
        #[cfg(target_os = "windows")]
        let (format, device) = ("dshow", "video=Integrated Camera");
        #[cfg(not(any(target_os = "macos", target_os = "windows")))]
        let (format, device) = ("v4l2", "/dev/video0");

        Self {
            format: format.to_string(),
            device: device.to_string(),
            framerate: None,
            video_size: None,
        }
    }
}

/// Live camera feed decoded on a background thread.
///
/// The capture thread owns every ffmpeg object and publishes only the latest
/// decoded RGB frame; readers never wait on the device.
pub struct FfmpegCamera {
    latest: Arc<Mutex<Option<Frame>>>,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
    config: CameraConfig,
}

impl FfmpegCamera {
    /// Opens the device and starts decoding. Returns once the device is open
    /// or has failed to open; frames arrive asynchronously afterwards.
    pub fn open(config: CameraConfig) -> Result<Self, CameraError> {
        let latest = Arc::new(Mutex::new(None));
        let stop = Arc::new(AtomicBool::new(false));
        let (ready_tx, ready_rx) = crossbeam_channel::bounded(1);

        let handle = {
            let latest = latest.clone();
            let stop = stop.clone();
            let config = config.clone();
            thread::Builder::new()
                .name("camera".into())
                .spawn(move || {
                    let capture = match Capture::open(&config) {
                        Ok(c) => {
                            let _ = ready_tx.send(Ok(()));
                            c
                        }
                        Err(e) => {
                            let _ = ready_tx.send(Err(e));
                            return;
                        }
                    };
                    capture.run(&latest, &stop);
                })
                .map_err(|e| CameraError::Init(e.to_string()))?
        };

        match ready_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                let _ = handle.join();
                return Err(e);
            }
            Err(_) => {
                let _ = handle.join();
                return Err(CameraError::ThreadExited);
            }
        }
        log::info!("Camera {} ({}) opened", config.device, config.format);

        Ok(Self {
            latest,
            stop,
            handle: Some(handle),
            config,
        })
    }

    pub fn config(&self) -> &CameraConfig {
        &self.config
    }

    /// Stops the capture thread and waits for it to release the device.
    pub fn close(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
            log::debug!("Camera {} closed", self.config.device);
        }
    }
}

impl FrameSource for FfmpegCamera {
    fn dimensions(&self) -> Option<(u32, u32)> {
        self.latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(Frame::dimensions)
    }

    fn snapshot(&self) -> Option<Frame> {
        self.latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Drop for FfmpegCamera {
    fn drop(&mut self) {
        self.close();
    }
}

/// Decoder state living on the capture thread.
struct Capture {
    ictx: ffmpeg_next::format::context::Input,
    decoder: ffmpeg_next::decoder::Video,
    scaler: ffmpeg_next::software::scaling::Context,
    stream_index: usize,
    width: u32,
    height: u32,
}

impl Capture {
    fn open(config: &CameraConfig) -> Result<Self, CameraError> {
        ffmpeg_next::init().map_err(|e| CameraError::Init(e.to_string()))?;

        let format = ffmpeg_next::device::input::video()
            .find(|f| f.name() == config.format)
            .ok_or_else(|| CameraError::FormatNotFound(config.format.clone()))?;

        let mut options = ffmpeg_next::Dictionary::new();
        if let Some(fps) = config.framerate {
            options.set("framerate", &fps.to_string());
        }
        if let Some(ref size) = config.video_size {
            options.set("video_size", size);
        }

        let ictx = ffmpeg_next::format::open_with(config.device.as_str(), &format, options)
            .map_err(|e| CameraError::Open {
                device: config.device.clone(),
                message: e.to_string(),
            })?
            .input();

        let stream = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or_else(|| CameraError::NoVideoStream(config.device.clone()))?;
        let stream_index = stream.index();
        let decoder = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())
            .and_then(|ctx| ctx.decoder().video())
            .map_err(|e| CameraError::Decoder(e.to_string()))?;

        let width = decoder.width();
        let height = decoder.height();
        let scaler = ffmpeg_next::software::scaling::Context::get(
            decoder.format(),
            width,
            height,
            ffmpeg_next::format::Pixel::RGB24,
            width,
            height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )
        .map_err(|e| CameraError::Decoder(e.to_string()))?;

        Ok(Self {
            ictx,
            decoder,
            scaler,
            stream_index,
            width,
            height,
        })
    }

    fn run(mut self, latest: &Mutex<Option<Frame>>, stop: &AtomicBool) {
        let mut index = 0usize;
        let mut decoded = ffmpeg_next::util::frame::video::Video::empty();
        let mut rgb = ffmpeg_next::util::frame::video::Video::empty();

        for (stream, packet) in self.ictx.packets() {
            if stop.load(Ordering::SeqCst) {
                break;
            }
            if stream.index() != self.stream_index {
                continue;
            }
            if let Err(e) = self.decoder.send_packet(&packet) {
                log::debug!("Dropping camera packet: {e}");
                continue;
            }
            while self.decoder.receive_frame(&mut decoded).is_ok() {
                if let Err(e) = self.scaler.run(&decoded, &mut rgb) {
                    log::warn!("Camera frame conversion failed: {e}");
                    continue;
                }
                let pixels = extract_rgb_pixels(&rgb, self.width, self.height);
                let frame = Frame::new(pixels, self.width, self.height, 3, index);
                index += 1;
                *latest.lock().unwrap_or_else(PoisonError::into_inner) = Some(frame);
            }
        }
        log::trace!("Camera capture loop ended after {index} frames");
    }
}

/// Copies pixel data from an ffmpeg frame into a contiguous RGB buffer,
/// dropping any row padding.
fn extract_rgb_pixels(
    rgb_frame: &ffmpeg_next::util::frame::video::Video,
    width: u32,
    height: u32,
) -> Vec<u8> {
    let stride = rgb_frame.stride(0);
    let data = rgb_frame.data(0);
    let w = width as usize;
    let h = height as usize;

    let mut pixels = Vec::with_capacity(w * h * 3);
    for row in 0..h {
        let row_start = row * stride;
        pixels.extend_from_slice(&data[row_start..row_start + w * 3]);
    }
    pixels
}
