//! FFmpeg-backed video plumbing: a pull-based camera source decoding to raw
//! BGR frames, and a virtual camera sink re-encoding raw frames into a v4l2
//! loopback device. Both sides are long-lived ffmpeg child processes speaking
//! headerless `bgr24` over pipes; framing is implicit from the configured
//! resolution.

pub use camera::{FfmpegCamera, FrameSource};
pub use types::{CaptureError, Frame, FrameFormat};
pub use virtual_cam::{FfmpegSink, FrameSink, SinkError};

pub mod camera;
pub mod types;
pub mod virtual_cam;
