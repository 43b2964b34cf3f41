use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};

use crate::detection::domain::face_detector::{DetectionError, FaceDetector};
use crate::shared::constants::POLL_INTERVAL_MS;
use crate::shared::frame::Frame;
use crate::video::domain::frame_source::FrameSource;

use super::login_view::LoginView;

/// Default tick period.
pub const POLL_INTERVAL: Duration = Duration::from_millis(POLL_INTERVAL_MS);

/// Counters since the session started.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PollStats {
    pub ticks: u64,
    pub detections: u64,
    pub skipped_no_frame: u64,
    pub skipped_in_flight: u64,
    pub errors: u64,
}

#[derive(Default)]
struct Counters {
    ticks: AtomicU64,
    detections: AtomicU64,
    skipped_no_frame: AtomicU64,
    skipped_in_flight: AtomicU64,
    errors: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> PollStats {
        PollStats {
            ticks: self.ticks.load(Ordering::Relaxed),
            detections: self.detections.load(Ordering::Relaxed),
            skipped_no_frame: self.skipped_no_frame.load(Ordering::Relaxed),
            skipped_in_flight: self.skipped_in_flight.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

/// Drives face detection on a [`LoginView`] at a fixed interval.
///
/// Layout: `ticker → worker [detect → apply to view]`
///
/// The ticker samples the frame source and hands frames to a single
/// detection worker. While a detection is running further ticks are skipped,
/// so detection calls never overlap. Dropping the session tears it down.
pub struct PollingSession {
    view: Weak<Mutex<LoginView>>,
    stop_tx: Option<Sender<()>>,
    ticker: Option<JoinHandle<()>>,
    worker: Option<JoinHandle<()>>,
    counters: Arc<Counters>,
    error_rx: Receiver<DetectionError>,
}

impl PollingSession {
    /// Attaches `view` and starts ticking every `interval`.
    pub fn start(
        view: &Arc<Mutex<LoginView>>,
        source: Arc<dyn FrameSource>,
        detector: Box<dyn FaceDetector>,
        interval: Duration,
    ) -> Self {
        let weak = Arc::downgrade(view);
        let counters = Arc::new(Counters::default());
        let in_flight = Arc::new(AtomicBool::new(false));
        let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(0);
        let (frame_tx, frame_rx) = crossbeam_channel::bounded::<Frame>(1);
        let (error_tx, error_rx) = crossbeam_channel::unbounded();

        let attached = view
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .attach();
        if attached {
            log::debug!("Polling every {}ms", interval.as_millis());
        } else {
            log::warn!("Polling requested on an unmounted view");
        }

        let ticker = spawn_ticker(
            source,
            frame_tx,
            stop_rx,
            interval,
            in_flight.clone(),
            counters.clone(),
        );
        let worker = spawn_worker(
            detector,
            frame_rx,
            weak.clone(),
            error_tx,
            in_flight,
            counters.clone(),
        );

        Self {
            view: weak,
            stop_tx: Some(stop_tx),
            ticker: Some(ticker),
            worker: Some(worker),
            counters,
            error_rx,
        }
    }

    /// Starts with the default 100 ms interval.
    pub fn start_default(
        view: &Arc<Mutex<LoginView>>,
        source: Arc<dyn FrameSource>,
        detector: Box<dyn FaceDetector>,
    ) -> Self {
        Self::start(view, source, detector, POLL_INTERVAL)
    }

    pub fn stats(&self) -> PollStats {
        self.counters.snapshot()
    }

    /// Detection failures, in order. Polling keeps going after each one.
    pub fn errors(&self) -> &Receiver<DetectionError> {
        &self.error_rx
    }

    pub fn is_running(&self) -> bool {
        self.ticker.is_some()
    }

    /// Unmounts the view, stops ticking and waits for an in-flight detection
    /// to finish. No detection starts after this returns.
    ///
    /// Must not be called while holding the view's lock.
    pub fn unmount(&mut self) {
        if let Some(view) = self.view.upgrade() {
            view.lock().unwrap_or_else(PoisonError::into_inner).unmount();
        }
        // Disconnecting the stop channel wakes the ticker.
        drop(self.stop_tx.take());
        if let Some(handle) = self.ticker.take() {
            let _ = handle.join();
        }
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for PollingSession {
    fn drop(&mut self) {
        self.unmount();
    }
}

fn spawn_ticker(
    source: Arc<dyn FrameSource>,
    frame_tx: Sender<Frame>,
    stop_rx: Receiver<()>,
    interval: Duration,
    in_flight: Arc<AtomicBool>,
    counters: Arc<Counters>,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        let ticks = crossbeam_channel::tick(interval);
        loop {
            crossbeam_channel::select! {
                recv(stop_rx) -> _ => break,
                recv(ticks) -> _ => {}
            }
            counters.ticks.fetch_add(1, Ordering::Relaxed);

            if source.dimensions().is_none() {
                counters.skipped_no_frame.fetch_add(1, Ordering::Relaxed);
                log::trace!("Tick skipped: camera not ready");
                continue;
            }
            if in_flight.swap(true, Ordering::SeqCst) {
                counters.skipped_in_flight.fetch_add(1, Ordering::Relaxed);
                log::trace!("Tick skipped: detection in flight");
                continue;
            }
            let Some(frame) = source.snapshot() else {
                in_flight.store(false, Ordering::SeqCst);
                counters.skipped_no_frame.fetch_add(1, Ordering::Relaxed);
                continue;
            };
            log::trace!("Tick: frame {}", frame.index());
            if frame_tx.send(frame).is_err() {
                break;
            }
        }
    })
}

fn spawn_worker(
    mut detector: Box<dyn FaceDetector>,
    frame_rx: Receiver<Frame>,
    view: Weak<Mutex<LoginView>>,
    error_tx: Sender<DetectionError>,
    in_flight: Arc<AtomicBool>,
    counters: Arc<Counters>,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        for frame in frame_rx {
            if !still_polling(&view) {
                in_flight.store(false, Ordering::SeqCst);
                break;
            }

            match detector.detect_single(&frame) {
                Ok(detection) => {
                    if let Some(view) = view.upgrade() {
                        let mut view = view.lock().unwrap_or_else(PoisonError::into_inner);
                        if view.is_polling() {
                            view.apply_detection(frame.dimensions(), detection);
                        }
                    }
                    counters.detections.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    counters.errors.fetch_add(1, Ordering::Relaxed);
                    log::error!("Face detection failed: {e}");
                    let _ = error_tx.send(e);
                }
            }
            in_flight.store(false, Ordering::SeqCst);
        }
    })
}

fn still_polling(view: &Weak<Mutex<LoginView>>) -> bool {
    view.upgrade().is_some_and(|v| {
        v.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_polling()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::domain::detection::Detection;
    use crate::login::login_view::tests::{face, ScriptedDetector, StubSource};
    use crate::login::view_state::PollPhase;
    use crate::shared::bounding_box::BoundingBox;
    use std::sync::atomic::AtomicUsize;
    use std::thread;
    use std::time::Instant;

    const FAST: Duration = Duration::from_millis(10);

    fn new_view() -> Arc<Mutex<LoginView>> {
        Arc::new(Mutex::new(LoginView::new()))
    }

    fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if cond() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        cond()
    }

    /// Counts calls and concurrent calls; optionally slow or failing.
    struct TimedDetector {
        calls: Arc<AtomicUsize>,
        active: Arc<AtomicUsize>,
        max_active: Arc<AtomicUsize>,
        delay: Duration,
        fail: bool,
    }

    impl TimedDetector {
        fn new(delay: Duration, fail: bool) -> (Self, Arc<AtomicUsize>, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            let max_active = Arc::new(AtomicUsize::new(0));
            let timed = Self {
                calls: calls.clone(),
                active: Arc::new(AtomicUsize::new(0)),
                max_active: max_active.clone(),
                delay,
                fail,
            };
            (timed, calls, max_active)
        }
    }

    impl FaceDetector for TimedDetector {
        fn detect(&mut self, _frame: &Frame) -> Result<Vec<Detection>, DetectionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(now, Ordering::SeqCst);
            thread::sleep(self.delay);
            self.active.fetch_sub(1, Ordering::SeqCst);
            if self.fail {
                return Err(DetectionError::Inference("session crashed".into()));
            }
            Ok(vec![Detection::new(BoundingBox::new(5.0, 5.0, 20.0, 20.0), 0.9)])
        }
    }

    #[test]
    fn test_start_attaches_view() {
        let view = new_view();
        let source = Arc::new(StubSource::default());
        let session = PollingSession::start(
            &view,
            source,
            Box::new(ScriptedDetector::new(vec![None])),
            FAST,
        );

        assert!(session.is_running());
        assert_eq!(view.lock().unwrap().phase(), PollPhase::Polling);
    }

    #[test]
    fn test_no_detection_until_camera_has_frames() {
        let view = new_view();
        let source = Arc::new(StubSource::default());
        let (timed, calls, _) = TimedDetector::new(Duration::ZERO, false);
        let mut session = PollingSession::start(&view, source.clone(), Box::new(timed), FAST);

        assert!(wait_until(Duration::from_secs(2), || session
            .stats()
            .skipped_no_frame
            >= 3));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(view.lock().unwrap().state().video_dimensions.as_tuple(), (0, 0));

        source.set(200, 150);
        assert!(wait_until(Duration::from_secs(2), || view
            .lock()
            .unwrap()
            .state()
            .is_face_detected));
        session.unmount();
    }

    #[test]
    fn test_face_then_no_face() {
        let view = new_view();
        let source = Arc::new(StubSource::with_frame(200, 150));
        let detector = ScriptedDetector::new(vec![face(10.0, 10.0, 50.0, 60.0), None]);
        let mut session = PollingSession::start(&view, source, Box::new(detector), FAST);

        assert!(wait_until(Duration::from_secs(2), || session.stats().detections >= 2));
        session.unmount();

        let view = view.lock().unwrap();
        assert!(!view.state().is_face_detected);
        assert_eq!(
            view.state().face_location,
            BoundingBox::new(10.0, 10.0, 50.0, 60.0)
        );
        assert_eq!(view.state().video_dimensions.as_tuple(), (200, 150));
    }

    #[test]
    fn test_detections_never_overlap() {
        let view = new_view();
        let source = Arc::new(StubSource::with_frame(64, 48));
        let (timed, calls, max_active) = TimedDetector::new(Duration::from_millis(60), false);
        let mut session = PollingSession::start(&view, source, Box::new(timed), FAST);

        assert!(wait_until(Duration::from_secs(3), || calls.load(Ordering::SeqCst) >= 3));
        session.unmount();

        assert_eq!(max_active.load(Ordering::SeqCst), 1);
        assert!(session.stats().skipped_in_flight > 0);
    }

    #[test]
    fn test_unmount_stops_detection() {
        let view = new_view();
        let source = Arc::new(StubSource::with_frame(64, 48));
        let (timed, calls, _) = TimedDetector::new(Duration::ZERO, false);
        let mut session = PollingSession::start(&view, source, Box::new(timed), FAST);
        assert!(wait_until(Duration::from_secs(2), || calls.load(Ordering::SeqCst) >= 2));

        session.unmount();
        let after_unmount = calls.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(100));

        assert_eq!(calls.load(Ordering::SeqCst), after_unmount);
        assert!(!session.is_running());
        let view = view.lock().unwrap();
        assert_eq!(view.phase(), PollPhase::Unmounted);
        assert!(view.overlay().canvas().is_none());
    }

    #[test]
    fn test_errors_are_forwarded_and_polling_continues() {
        let view = new_view();
        let source = Arc::new(StubSource::with_frame(64, 48));
        let (timed, _, _) = TimedDetector::new(Duration::ZERO, true);
        let mut session = PollingSession::start(&view, source, Box::new(timed), FAST);

        for _ in 0..3 {
            let err = session
                .errors()
                .recv_timeout(Duration::from_secs(2))
                .unwrap();
            assert_eq!(err, DetectionError::Inference("session crashed".into()));
        }
        session.unmount();

        assert!(session.stats().errors >= 3);
        assert!(!view.lock().unwrap().state().is_face_detected);
    }

    #[test]
    fn test_dropping_view_ends_worker_quietly() {
        let view = new_view();
        let source = Arc::new(StubSource::with_frame(64, 48));
        let (timed, _, _) = TimedDetector::new(Duration::ZERO, false);
        let session = PollingSession::start(&view, source, Box::new(timed), FAST);

        drop(view);
        thread::sleep(Duration::from_millis(50));
        drop(session);
    }
}
