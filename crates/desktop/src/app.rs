use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use crossbeam_channel::Receiver;
use iced::widget::{button, column, container, image, row, scrollable, text};
use iced::{Element, Length, Subscription, Task, Theme};

use facegate_core::login::login_view::LoginView;
use facegate_core::login::overlay::OverlayStyle;
use facegate_core::login::polling_session::{PollingSession, POLL_INTERVAL};
use facegate_core::login::view_state::ViewState;
use facegate_core::video::domain::frame_source::FrameSource;

use crate::settings::{Appearance, Settings};
use crate::tabs;
use crate::theme;
use crate::workers::startup_worker::{self, StartupMessage, StartupParams};

// ---------------------------------------------------------------------------
// Tab enum
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Login,
    Settings,
}

impl Tab {
    const ALL: &[Tab] = &[Tab::Login, Tab::Settings];

    fn label(self) -> &'static str {
        match self {
            Tab::Login => "Login",
            Tab::Settings => "Settings",
        }
    }
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub enum Message {
    TabSelected(Tab),
    UsernameChanged(String),
    PasswordChanged(String),
    LoginPressed,
    CapturePressed,
    SaveCapture,
    SaveTargetSelected(Option<PathBuf>),
    Poll,
    CameraFormatChanged(String),
    CameraDeviceChanged(String),
    ModelBaseChanged(String),
    ThresholdChanged(u32),
    ShowLandmarksChanged(bool),
    Restart,
    AppearanceChanged(Appearance),
    HighContrastChanged(bool),
    FontScaleChanged(f32),
}

/// Where startup currently stands.
#[derive(Debug, Clone, PartialEq)]
pub enum Status {
    LoadingModels { downloaded: u64, total: u64 },
    OpeningCamera,
    Live,
    Failed(String),
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::LoadingModels { total: 0, .. } => write!(f, "Loading face models..."),
            Status::LoadingModels { downloaded, total } => write!(
                f,
                "Downloading face models... {}%",
                (*downloaded as f64 / *total as f64 * 100.0) as u32
            ),
            Status::OpeningCamera => write!(f, "Opening camera..."),
            Status::Live => write!(f, "Camera live"),
            Status::Failed(e) => write!(f, "Error: {e}"),
        }
    }
}

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

pub struct App {
    active_tab: Tab,
    pub settings: Settings,
    view: Arc<Mutex<LoginView>>,
    /// Copy of the view state taken after every update, for rendering.
    pub state: ViewState,
    session: Option<PollingSession>,
    camera: Option<Arc<dyn FrameSource>>,
    startup: Option<Receiver<StartupMessage>>,
    /// Base passed to the running startup, then the one models came from.
    starting_model_base: String,
    loaded_model_base: Option<String>,
    pub status: Status,
    pub preview: Option<image::Handle>,
    pub overlay: Option<image::Handle>,
    overlay_generation: u64,
    pub captured: Option<image::Handle>,
    pub notice: Option<String>,
}

impl App {
    pub fn new() -> (Self, Task<Message>) {
        let settings = Settings::load();
        let view = LoginView::with_style(overlay_style(&settings));
        let mut app = Self {
            active_tab: Tab::Login,
            settings,
            view: Arc::new(Mutex::new(view)),
            state: ViewState::default(),
            session: None,
            camera: None,
            startup: None,
            starting_model_base: String::new(),
            loaded_model_base: None,
            status: Status::LoadingModels {
                downloaded: 0,
                total: 0,
            },
            preview: None,
            overlay: None,
            overlay_generation: 0,
            captured: None,
            notice: None,
        };
        app.start();
        (app, Task::none())
    }

    pub fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::TabSelected(tab) => {
                self.active_tab = tab;
            }
            Message::UsernameChanged(value) => {
                self.lock_view().set_username(value);
            }
            Message::PasswordChanged(value) => {
                self.lock_view().set_password(value);
            }
            Message::LoginPressed => {
                self.lock_view().login();
            }
            Message::CapturePressed => self.capture(),
            Message::SaveCapture => {
                return Task::perform(
                    async {
                        rfd::AsyncFileDialog::new()
                            .set_title("Save capture as")
                            .add_filter("PNG Image", &["png"])
                            .set_file_name("capture.png")
                            .save_file()
                            .await
                            .map(|h| h.path().to_path_buf())
                    },
                    Message::SaveTargetSelected,
                );
            }
            Message::SaveTargetSelected(Some(path)) => self.save_capture(path),
            Message::SaveTargetSelected(None) => {}
            Message::Poll => self.poll(),
            Message::CameraFormatChanged(value) => {
                self.settings.camera_format = value;
                self.settings.save();
            }
            Message::CameraDeviceChanged(value) => {
                self.settings.camera_device = value;
                self.settings.save();
            }
            Message::ModelBaseChanged(value) => {
                self.settings.model_base = value;
                self.settings.save();
            }
            Message::ThresholdChanged(value) => {
                self.settings.score_threshold = value.clamp(1, 100);
                self.settings.save();
            }
            Message::ShowLandmarksChanged(show) => {
                self.settings.show_landmarks = show;
                self.settings.save();
                self.lock_view().set_show_landmarks(show);
            }
            Message::Restart => {
                self.start();
                self.active_tab = Tab::Login;
            }
            Message::AppearanceChanged(appearance) => {
                self.settings.appearance = appearance;
                self.settings.save();
            }
            Message::HighContrastChanged(enabled) => {
                self.settings.high_contrast = enabled;
                self.settings.save();
            }
            Message::FontScaleChanged(scale) => {
                self.settings.font_scale = scale;
                self.settings.save();
            }
        }
        self.refresh();
        Task::none()
    }

    pub fn view(&self) -> Element<'_, Message> {
        let fs = self.settings.font_scale;

        // Tab bar
        let tab_bar = row(Tab::ALL
            .iter()
            .map(|&tab| {
                let label = text(tab.label()).size(scaled(13.0, fs));
                let btn = button(label)
                    .on_press(Message::TabSelected(tab))
                    .padding([6, 14]);
                if tab == self.active_tab {
                    btn.style(button::primary).into()
                } else {
                    btn.style(button::text).into()
                }
            })
            .collect::<Vec<_>>())
        .spacing(2);

        // Tab content
        let content: Element<'_, Message> = match self.active_tab {
            Tab::Login => tabs::login_tab::view(self),
            Tab::Settings => {
                tabs::settings_tab::view(&self.settings, self.loaded_model_base.as_deref())
            }
        };

        let tab_content = container(scrollable(content).height(Length::Fill))
            .padding(16)
            .height(Length::Fill);

        let footer = container(text(self.status.to_string()).size(scaled(11.0, fs)))
            .width(Length::Fill)
            .center_x(Length::Fill)
            .padding([4, 0]);

        column![tab_bar, tab_content, footer]
            .spacing(0)
            .height(Length::Fill)
            .into()
    }

    pub fn theme(&self) -> Theme {
        theme::resolve_theme(self.settings.appearance, self.settings.high_contrast)
    }

    /// The poll timer doubles as the redraw for camera frames and the
    /// system theme.
    pub fn subscription(&self) -> Subscription<Message> {
        iced::time::every(POLL_INTERVAL).map(|_| Message::Poll)
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// (Re)starts models, camera and polling from the current settings.
    ///
    /// An unmounted view cannot be revived, so a restart swaps in a fresh
    /// one that keeps the typed credentials.
    fn start(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.unmount();
            let old = self.state.clone();
            let mut view = LoginView::with_style(overlay_style(&self.settings));
            view.set_username(old.username);
            view.set_password(old.password);
            self.view = Arc::new(Mutex::new(view));
        }
        self.camera = None;
        self.preview = None;
        self.overlay = None;
        self.overlay_generation = 0;
        self.notice = None;
        self.status = Status::LoadingModels {
            downloaded: 0,
            total: 0,
        };
        self.starting_model_base = self.settings.model_base.clone();
        self.startup = Some(startup_worker::spawn(StartupParams {
            model_base: self.settings.model_base.clone(),
            score_threshold: self.settings.score_threshold(),
            camera: self.settings.camera_config(),
        }));
    }

    fn poll(&mut self) {
        self.drain_startup();

        if let Some(ref session) = self.session {
            while let Ok(e) = session.errors().try_recv() {
                self.notice = Some(format!("Detection error: {e}"));
            }
        }

        if let Some(ref camera) = self.camera {
            if let Some(rgba) = camera.snapshot().and_then(|f| f.to_rgba_image()) {
                let (w, h) = rgba.dimensions();
                self.preview = Some(image::Handle::from_rgba(w, h, rgba.into_raw()));
            }
        }
    }

    fn drain_startup(&mut self) {
        let Some(ref rx) = self.startup else {
            return;
        };
        let mut finished = false;
        while let Ok(msg) = rx.try_recv() {
            match msg {
                StartupMessage::DownloadProgress(downloaded, total) => {
                    self.status = Status::LoadingModels { downloaded, total };
                }
                StartupMessage::OpeningCamera => {
                    if self.loaded_model_base.is_none() {
                        self.loaded_model_base = Some(self.starting_model_base.clone());
                    }
                    self.status = Status::OpeningCamera;
                }
                StartupMessage::Ready { camera, detector } => {
                    self.session = Some(PollingSession::start(
                        &self.view,
                        camera.clone(),
                        detector,
                        POLL_INTERVAL,
                    ));
                    self.camera = Some(camera);
                    self.status = Status::Live;
                    finished = true;
                }
                StartupMessage::Error(e) => {
                    self.status = Status::Failed(e);
                    finished = true;
                }
            }
        }
        if finished {
            self.startup = None;
        }
    }

    // -----------------------------------------------------------------------
    // Actions
    // -----------------------------------------------------------------------

    fn capture(&mut self) {
        let frame = self.camera.as_ref().and_then(|c| c.snapshot());
        let result = self
            .lock_view()
            .capture(frame.as_ref())
            .map(|c| c.png().to_vec());
        match result {
            Ok(png) => {
                self.captured = Some(image::Handle::from_bytes(png));
                self.notice = None;
            }
            Err(e) => self.notice = Some(format!("Capture failed: {e}")),
        }
    }

    fn save_capture(&mut self, path: PathBuf) {
        let Some(ref captured) = self.state.captured_image else {
            return;
        };
        self.notice = Some(match std::fs::write(&path, captured.png()) {
            Ok(()) => format!("Saved {}", path.display()),
            Err(e) => format!("Could not save {}: {e}", path.display()),
        });
    }

    /// Copies view state and a changed overlay canvas out for rendering.
    fn refresh(&mut self) {
        let view = self.view.lock().unwrap_or_else(PoisonError::into_inner);
        self.state = view.state().clone();

        let overlay = view.overlay();
        if overlay.generation() != self.overlay_generation {
            self.overlay_generation = overlay.generation();
            self.overlay = overlay
                .canvas()
                .map(|c| image::Handle::from_rgba(c.width(), c.height(), c.as_raw().clone()));
        }
    }

    fn lock_view(&self) -> std::sync::MutexGuard<'_, LoginView> {
        self.view.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn overlay_style(settings: &Settings) -> OverlayStyle {
    OverlayStyle {
        show_landmarks: settings.show_landmarks,
        ..OverlayStyle::default()
    }
}

/// Scale a base font size by the user's font_scale setting.
pub fn scaled(base: f32, font_scale: f32) -> f32 {
    (base * font_scale).round()
}
