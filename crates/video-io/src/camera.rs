//! Pull-based camera capture through an ffmpeg child process.

use std::{
    io::Read,
    process::{Child, ChildStdout, Command, Stdio},
};

use anyhow::anyhow;
use chrono::Utc;

use crate::types::{CaptureError, Frame, FrameFormat};

/// Source of raw frames, read one at a time on demand.
pub trait FrameSource {
    fn read(&mut self) -> Result<Frame, CaptureError>;
}

/// FFmpeg child process decoding a capture device (or any ffmpeg-readable
/// URI) to headerless `bgr24` on its stdout. One frame per [`read`] call;
/// the decoder backpressures through the pipe while no frame is requested.
///
/// [`read`]: FrameSource::read
pub struct FfmpegCamera {
    child: Child,
    stdout: ChildStdout,
    width: i32,
    height: i32,
}

impl FfmpegCamera {
    /// Launch the capture process for `uri` at the requested geometry.
    ///
    /// `/dev/videoN` paths and bare indices select v4l2 input; anything else
    /// is handed to ffmpeg unchanged (files, network streams).
    pub fn open(uri: &str, target_size: (i32, i32), fps: u32) -> Result<Self, CaptureError> {
        Self::from_command(capture_command(uri, target_size, fps), uri, target_size)
    }

    fn from_command(
        mut cmd: Command,
        uri: &str,
        target_size: (i32, i32),
    ) -> Result<Self, CaptureError> {
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());

        let mut child = cmd.spawn().map_err(|err| {
            CaptureError::Other(
                anyhow!(err).context(format!("failed to launch capture process for {uri}")),
            )
        })?;
        let stdout = child.stdout.take().ok_or_else(|| CaptureError::Open {
            uri: uri.to_string(),
        })?;

        Ok(Self {
            child,
            stdout,
            width: target_size.0,
            height: target_size.1,
        })
    }
}

impl FrameSource for FfmpegCamera {
    fn read(&mut self) -> Result<Frame, CaptureError> {
        let frame_bytes = (self.width as usize) * (self.height as usize) * 3;
        let mut data = vec![0u8; frame_bytes];

        match self.stdout.read_exact(&mut data) {
            Ok(()) => Ok(Frame {
                data,
                width: self.width,
                height: self.height,
                timestamp_ms: Utc::now().timestamp_millis(),
                format: FrameFormat::Bgr8,
            }),
            Err(err) if err.kind() == std::io::ErrorKind::UnexpectedEof => Err(CaptureError::Eof),
            Err(err) => Err(CaptureError::Other(err.into())),
        }
    }
}

impl Drop for FfmpegCamera {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Parse a `/dev/videoX` style URI and return the zero-based index if present.
fn parse_device_index(uri: &str) -> Option<i32> {
    if let Ok(index) = uri.parse::<i32>() {
        return Some(index);
    }
    if let Some(stripped) = uri.strip_prefix("/dev/video") {
        if stripped.chars().all(|c| c.is_ascii_digit()) {
            if let Ok(index) = stripped.parse::<i32>() {
                return Some(index);
            }
        }
    }
    None
}

fn capture_command(uri: &str, target_size: (i32, i32), fps: u32) -> Command {
    let (target_w, target_h) = target_size;
    let (is_v4l, input_uri) = if let Some(index) = parse_device_index(uri) {
        (true, format!("/dev/video{index}"))
    } else if uri.starts_with("/dev/video") {
        (true, uri.to_string())
    } else {
        (false, uri.to_string())
    };

    let mut cmd = Command::new("ffmpeg");
    cmd.arg("-hide_banner").arg("-loglevel").arg("error");

    if is_v4l {
        cmd.arg("-f")
            .arg("video4linux2")
            .arg("-framerate")
            .arg(fps.to_string())
            .arg("-video_size")
            .arg(format!("{target_w}x{target_h}"));
    }

    cmd.arg("-i")
        .arg(&input_uri)
        .arg("-vf")
        .arg(format!("scale={target_w}:{target_h}"))
        .arg("-pix_fmt")
        .arg("bgr24")
        .arg("-f")
        .arg("rawvideo")
        .arg("-");

    cmd
}
