use iced::widget::{container, image, stack, text};
use iced::border::Border;
use iced::{Color, ContentFit, Element, Length, Theme};

use crate::app::{scaled, Message};

const PREVIEW_HEIGHT: f32 = 300.0;
const CORNER_RADIUS: f32 = 8.0;
const DETECTED_BORDER_WIDTH: f32 = 3.0;

/// Camera preview with the detection overlay stacked on top.
///
/// Both layers are the video size and scaled with the same fit, so the
/// overlay box lines up with the face. The frame turns the theme's success
/// colour while a face is detected.
pub fn view<'a>(
    preview: Option<&image::Handle>,
    overlay: Option<&image::Handle>,
    face_detected: bool,
    placeholder: &str,
    fs: f32,
) -> Element<'a, Message> {
    let content: Element<'a, Message> = match preview {
        Some(frame) => {
            let mut layers: Vec<Element<'a, Message>> = vec![layer(frame.clone())];
            if let Some(canvas) = overlay {
                layers.push(layer(canvas.clone()));
            }
            stack(layers).into()
        }
        None => text(placeholder.to_string()).size(scaled(13.0, fs)).into(),
    };

    container(content)
        .width(Length::Fill)
        .height(PREVIEW_HEIGHT)
        .center_x(Length::Fill)
        .center_y(PREVIEW_HEIGHT)
        .style(move |theme: &Theme| preview_style(theme, face_detected))
        .into()
}

fn preview_style(theme: &Theme, face_detected: bool) -> container::Style {
    let border = if face_detected {
        Border {
            color: theme.extended_palette().success.base.color,
            width: DETECTED_BORDER_WIDTH,
            radius: CORNER_RADIUS.into(),
        }
    } else {
        Border {
            radius: CORNER_RADIUS.into(),
            ..Border::default()
        }
    };
    container::Style {
        background: Some(Color::BLACK.into()),
        border,
        ..container::Style::default()
    }
}

fn layer<'a>(handle: image::Handle) -> Element<'a, Message> {
    image(handle)
        .width(Length::Fill)
        .height(Length::Fill)
        .content_fit(ContentFit::Contain)
        .into()
}
