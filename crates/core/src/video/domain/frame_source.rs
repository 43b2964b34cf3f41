use crate::shared::frame::Frame;

/// A live or still source of frames that the login view samples.
///
/// Sources are shared between the UI and the polling session, so both
/// methods take `&self` and must be cheap enough to call every tick.
pub trait FrameSource: Send + Sync {
    /// Pixel size of the current frame; `None` while the source is still
    /// initializing and has produced nothing.
    fn dimensions(&self) -> Option<(u32, u32)>;

    /// Copy of the most recent frame.
    fn snapshot(&self) -> Option<Frame>;
}
