use iced::widget::{column, text};
use iced::Element;

use facegate_core::login::view_state::ViewState;

use crate::app::{scaled, Message};

/// Detection status: presence, box, score and video size.
pub fn view<'a>(state: &ViewState, fs: f32) -> Element<'a, Message> {
    let dims = state.video_dimensions;
    let size = if dims.is_known() {
        format!("Video: {}x{}", dims.width, dims.height)
    } else {
        "Video: waiting for camera".to_string()
    };

    let presence = match state.last_score {
        Some(score) if state.is_face_detected => {
            format!("Face detected ({:.0}%)", score * 100.0)
        }
        _ => "No face detected".to_string(),
    };

    let b = state.face_location;
    let location = if b.is_empty() {
        "Location: none yet".to_string()
    } else {
        format!(
            "Location: x={:.0} y={:.0} {:.0}x{:.0}",
            b.x, b.y, b.width, b.height
        )
    };

    column![
        text(presence).size(scaled(14.0, fs)),
        text(location).size(scaled(12.0, fs)),
        text(size).size(scaled(12.0, fs)),
    ]
    .spacing(4)
    .into()
}
