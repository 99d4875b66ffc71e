mod decoder;
mod event;
mod notice;

pub use decoder::{Frame, FrameDecoder};
pub use event::{StreamEvent, HTTP_ERROR, STREAM_ERROR};
pub use notice::VibeNotice;
