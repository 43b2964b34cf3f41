//! Face presence detection and face-region capture for a camera login view.
//!
//! The [`detection`] module loads the pretrained models once and detects the
//! single most confident face in a frame. The [`login`] module holds the view
//! state, the overlay surface, the capture action and the polling session
//! that drives detection on a fixed interval.

pub mod detection {
    pub mod domain {
        pub mod detection;
        pub mod detector_options;
        pub mod face_detector;
        pub mod face_landmarker;
        pub mod face_landmarks;
    }
    pub mod infrastructure;
}

pub mod login {
    pub mod capture;
    pub mod login_view;
    pub mod overlay;
    pub mod polling_session;
    pub mod view_state;
}

pub mod shared {
    pub mod bounding_box;
    pub mod constants;
    pub mod frame;
}

pub mod video {
    pub mod domain {
        pub mod frame_source;
    }
    pub mod infrastructure {
        pub mod ffmpeg_camera;
        pub mod image_file_source;
    }
}
