//! Virtual camera output through an ffmpeg child process.
//!
//! The encoder consumes headerless `bgr24` frames on stdin and writes
//! `yuyv422` to a v4l2 loopback device. It is launched once and expected to
//! outlive every session; a dead pipe ends the session that hit it, never the
//! process.

use std::{
    io::Write,
    process::{Child, ChildStdin, Command, Stdio},
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("failed to launch encoder process for {device:?}")]
    Spawn {
        device: String,
        #[source]
        source: std::io::Error,
    },
    #[error("encoder frame length mismatch: expected {expected} bytes, got {got}")]
    FrameLength { expected: usize, got: usize },
    #[error("encoder pipe write failed")]
    Io(#[from] std::io::Error),
}

/// Sink accepting one fixed-format frame per call.
pub trait FrameSink {
    fn write_frame(&mut self, data: &[u8]) -> Result<(), SinkError>;
}

pub struct FfmpegSink {
    child: Child,
    stdin: ChildStdin,
    frame_len: usize,
}

impl FfmpegSink {
    /// Launch the encoder writing to `device` at the configured geometry.
    pub fn spawn(device: &str, size: (i32, i32), fps: u32) -> Result<Self, SinkError> {
        Self::from_command(encode_command(device, size, fps), device, size)
    }

    fn from_command(mut cmd: Command, device: &str, size: (i32, i32)) -> Result<Self, SinkError> {
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit());

        let mut child = cmd.spawn().map_err(|source| SinkError::Spawn {
            device: device.to_string(),
            source,
        })?;
        let stdin = child.stdin.take().ok_or_else(|| SinkError::Spawn {
            device: device.to_string(),
            source: std::io::Error::new(std::io::ErrorKind::BrokenPipe, "encoder stdin unavailable"),
        })?;

        Ok(Self {
            child,
            stdin,
            frame_len: (size.0 as usize) * (size.1 as usize) * 3,
        })
    }
}

impl FrameSink for FfmpegSink {
    fn write_frame(&mut self, data: &[u8]) -> Result<(), SinkError> {
        // A mismatched frame would silently shear every frame after it;
        // reject before the pipe sees a single byte.
        if data.len() != self.frame_len {
            return Err(SinkError::FrameLength {
                expected: self.frame_len,
                got: data.len(),
            });
        }
        self.stdin.write_all(data)?;
        self.stdin.flush()?;
        Ok(())
    }
}

impl Drop for FfmpegSink {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

fn encode_command(device: &str, size: (i32, i32), fps: u32) -> Command {
    let mut cmd = Command::new("ffmpeg");
    cmd.arg("-y")
        .arg("-hide_banner")
        .arg("-loglevel")
        .arg("error")
        .arg("-f")
        .arg("rawvideo")
        .arg("-pix_fmt")
        .arg("bgr24")
        .arg("-s")
        .arg(format!("{}x{}", size.0, size.1))
        .arg("-r")
        .arg(fps.to_string())
        .arg("-i")
        .arg("-")
        .arg("-f")
        .arg("v4l2")
        .arg("-pix_fmt")
        .arg("yuyv422")
        .arg(device);
    cmd
}
