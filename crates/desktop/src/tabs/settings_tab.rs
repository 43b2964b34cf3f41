use iced::widget::{button, checkbox, column, pick_list, row, slider, text, text_input, Space};
use iced::Element;

use crate::app::{scaled, Message};
use crate::settings::{Appearance, Settings};

pub fn view<'a>(settings: &'a Settings, loaded_model_base: Option<&str>) -> Element<'a, Message> {
    let fs = settings.font_scale;

    let model_note: Element<'a, Message> = if settings.model_base_needs_relaunch(loaded_model_base) {
        text("Face models are already loaded; a new model location takes effect on the next launch.")
            .size(scaled(12.0, fs))
            .style(text::secondary)
            .into()
    } else {
        Space::new().height(0).into()
    };

    column![
        text("Camera").size(scaled(16.0, fs)),
        Space::new().height(8),
        labeled(
            "Format",
            text_input("v4l2", &settings.camera_format).on_input(Message::CameraFormatChanged),
            fs
        ),
        Space::new().height(6),
        labeled(
            "Device",
            text_input("/dev/video0", &settings.camera_device)
                .on_input(Message::CameraDeviceChanged),
            fs
        ),
        Space::new().height(20),
        text("Detection").size(scaled(16.0, fs)),
        Space::new().height(8),
        labeled(
            "Models",
            text_input("models or https://...", &settings.model_base)
                .on_input(Message::ModelBaseChanged),
            fs
        ),
        model_note,
        Space::new().height(6),
        row![
            text("Threshold").size(scaled(13.0, fs)),
            slider(1..=100, settings.score_threshold, Message::ThresholdChanged),
            text(format!("{}%", settings.score_threshold)).size(scaled(13.0, fs)),
        ]
        .spacing(12)
        .align_y(iced::Alignment::Center),
        Space::new().height(8),
        checkbox(settings.show_landmarks)
            .label("Draw facial landmarks")
            .on_toggle(Message::ShowLandmarksChanged)
            .text_size(scaled(13.0, fs)),
        Space::new().height(12),
        button(text("Apply and restart camera").size(scaled(13.0, fs)))
            .on_press(Message::Restart)
            .padding([8, 16]),
        Space::new().height(20),
        text("Theme").size(scaled(16.0, fs)),
        Space::new().height(8),
        row![
            text("Mode").size(scaled(13.0, fs)),
            pick_list(Appearance::ALL, Some(settings.appearance), |a| {
                Message::AppearanceChanged(a)
            })
            .text_size(scaled(13.0, fs)),
        ]
        .spacing(12)
        .align_y(iced::Alignment::Center),
        Space::new().height(12),
        checkbox(settings.high_contrast)
            .label("High contrast")
            .on_toggle(Message::HighContrastChanged)
            .text_size(scaled(13.0, fs)),
        Space::new().height(12),
        row![
            text("Font size").size(scaled(13.0, fs)),
            slider(0.8..=1.5, settings.font_scale, Message::FontScaleChanged).step(0.05),
            text(format!("{:.0}%", settings.font_scale * 100.0)).size(scaled(13.0, fs)),
        ]
        .spacing(12)
        .align_y(iced::Alignment::Center),
    ]
    .spacing(0)
    .into()
}

fn labeled<'a>(
    label: &'a str,
    input: text_input::TextInput<'a, Message>,
    fs: f32,
) -> Element<'a, Message> {
    row![
        text(label).size(scaled(13.0, fs)).width(70),
        input.size(scaled(13.0, fs)).padding(6),
    ]
    .spacing(12)
    .align_y(iced::Alignment::Center)
    .into()
}
