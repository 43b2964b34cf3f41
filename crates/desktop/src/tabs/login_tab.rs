use iced::widget::{button, column, image, row, text, text_input, Space};
use iced::{ContentFit, Element, Length};

use crate::app::{scaled, App, Message, Status};
use crate::widgets::{camera_view, face_panel};

const CAPTURE_HEIGHT: f32 = 160.0;

pub fn view(app: &App) -> Element<'_, Message> {
    let fs = app.settings.font_scale;
    let state = &app.state;

    let credentials = column![
        text_input("Username", &state.username)
            .on_input(Message::UsernameChanged)
            .size(scaled(14.0, fs))
            .padding(8),
        text_input("Password", &state.password)
            .on_input(Message::PasswordChanged)
            .on_submit(Message::LoginPressed)
            .secure(true)
            .size(scaled(14.0, fs))
            .padding(8),
    ]
    .spacing(8);

    let placeholder = match app.status {
        Status::Failed(_) => "Camera unavailable".to_string(),
        ref status => status.to_string(),
    };
    let camera = camera_view::view(
        app.preview.as_ref(),
        app.overlay.as_ref(),
        state.is_face_detected,
        &placeholder,
        fs,
    );

    let mut save = button(text("Save capture").size(scaled(13.0, fs))).padding([8, 16]);
    if state.captured_image.is_some() {
        save = save.on_press(Message::SaveCapture);
    }
    let actions = row![
        button(text("Login").size(scaled(13.0, fs)))
            .on_press(Message::LoginPressed)
            .padding([8, 16])
            .style(button::primary),
        button(text("Capture").size(scaled(13.0, fs)))
            .on_press(Message::CapturePressed)
            .padding([8, 16]),
        save,
    ]
    .spacing(8);

    let mut content = column![
        text("Sign in").size(scaled(20.0, fs)),
        Space::new().height(12),
        credentials,
        Space::new().height(12),
        camera,
        Space::new().height(12),
        actions,
        Space::new().height(12),
        face_panel::view(state, fs),
    ]
    .spacing(0);

    if let Some(ref notice) = app.notice {
        content = content.push(Space::new().height(8));
        content = content.push(text(notice.clone()).size(scaled(12.0, fs)));
    }

    if let Some(ref handle) = app.captured {
        let (w, h) = state
            .captured_image
            .as_ref()
            .map(|c| c.dimensions())
            .unwrap_or_default();
        content = content.push(Space::new().height(16));
        content = content.push(text(format!("Captured {w}x{h}")).size(scaled(13.0, fs)));
        content = content.push(Space::new().height(6));
        content = content.push(
            image(handle.clone())
                .height(CAPTURE_HEIGHT)
                .width(Length::Shrink)
                .content_fit(ContentFit::Contain),
        );
    }

    content.into()
}
