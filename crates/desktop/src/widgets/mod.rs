pub mod camera_view;
pub mod face_panel;
