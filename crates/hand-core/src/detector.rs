//! Hand landmark detection through a MediaPipe helper subprocess.
//!
//! The helper (`scripts/hand_detect.py`) owns the model; this side only
//! ships frames and parses results. Wire format: a `READY` line once at
//! startup, then per frame a 12-byte little-endian header (width, height,
//! channels) followed by raw RGB bytes on stdin, answered by exactly one
//! JSON line on stdout.

use std::{
    io::{BufRead, BufReader, Write},
    path::Path,
    process::{Child, ChildStdin, ChildStdout, Command, Stdio},
};

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::landmarks::{HandLandmarks, Landmark, LANDMARK_COUNT};

/// Seam for landmark detection. Input is tightly packed RGB.
///
/// Returns every detected hand in the model's order; an empty vector means
/// no hand was found, which is not an error.
pub trait LandmarkDetector {
    fn detect(&mut self, rgb: &[u8], width: u32, height: u32) -> Result<Vec<HandLandmarks>>;
}

#[derive(Deserialize)]
struct LandmarkJson {
    x: f32,
    y: f32,
    #[serde(default)]
    z: f32,
}

#[derive(Deserialize)]
struct HandJson {
    handedness: String,
    score: f32,
    landmarks: Vec<LandmarkJson>,
}

#[derive(Deserialize)]
struct DetectionLine {
    hands: Vec<HandJson>,
    #[serde(default)]
    error: Option<String>,
}

/// MediaPipe hand landmarker driven over pipes.
pub struct MediapipeDetector {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

impl MediapipeDetector {
    /// Start the helper and wait for its `READY` handshake.
    pub fn spawn(python: &str, script: &Path, model: &Path) -> Result<Self> {
        let mut child = Command::new(python)
            .arg(script)
            .arg("--model")
            .arg(model)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .with_context(|| format!("failed to start hand detector {python} {}", script.display()))?;

        let stdin = child
            .stdin
            .take()
            .context("hand detector stdin unavailable")?;
        let stdout = child
            .stdout
            .take()
            .context("hand detector stdout unavailable")?;
        let mut stdout = BufReader::new(stdout);

        let mut ready = String::new();
        stdout
            .read_line(&mut ready)
            .context("hand detector exited before handshake")?;
        if ready.trim() != "READY" {
            bail!("hand detector did not signal ready, got {ready:?}");
        }
        debug!("hand detector ready");

        Ok(Self {
            child,
            stdin,
            stdout,
        })
    }
}

impl LandmarkDetector for MediapipeDetector {
    fn detect(&mut self, rgb: &[u8], width: u32, height: u32) -> Result<Vec<HandLandmarks>> {
        self.stdin
            .write_all(&width.to_le_bytes())
            .and_then(|_| self.stdin.write_all(&height.to_le_bytes()))
            .and_then(|_| self.stdin.write_all(&3u32.to_le_bytes()))
            .and_then(|_| self.stdin.write_all(rgb))
            .and_then(|_| self.stdin.flush())
            .context("failed to send frame to hand detector")?;

        let mut response = String::new();
        self.stdout
            .read_line(&mut response)
            .context("failed to read hand detector response")?;
        if response.is_empty() {
            bail!("hand detector closed its pipe");
        }

        parse_detection_line(&response)
    }
}

impl Drop for MediapipeDetector {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Parse one JSON response line into the detected hands, preserving order.
fn parse_detection_line(line: &str) -> Result<Vec<HandLandmarks>> {
    let result: DetectionLine = serde_json::from_str(line)
        .with_context(|| format!("failed to parse hand detector response: {}", line.trim()))?;

    if let Some(error) = result.error {
        bail!("hand detector reported: {error}");
    }

    let mut hands = Vec::with_capacity(result.hands.len());
    for hand in result.hands {
        if hand.landmarks.len() != LANDMARK_COUNT {
            warn!(
                "expected {LANDMARK_COUNT} landmarks, got {}; skipping hand",
                hand.landmarks.len()
            );
            continue;
        }
        let mut landmarks = [Landmark::default(); LANDMARK_COUNT];
        for (slot, lm) in landmarks.iter_mut().zip(hand.landmarks.iter()) {
            *slot = Landmark {
                x: lm.x,
                y: lm.y,
                z: lm.z,
            };
        }
        hands.push(HandLandmarks {
            landmarks,
            confidence: hand.score,
            handedness: hand.handedness,
        });
    }

    Ok(hands)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn landmark_array(n: usize) -> String {
        let point = r#"{"x":0.5,"y":0.5,"z":0.0}"#;
        let points: Vec<&str> = std::iter::repeat(point).take(n).collect();
        format!("[{}]", points.join(","))
    }

    #[test]
    fn parses_hands_in_order() {
        let line = format!(
            r#"{{"hands":[{{"handedness":"Left","score":0.9,"landmarks":{lm}}},{{"handedness":"Right","score":0.8,"landmarks":{lm}}}]}}"#,
            lm = landmark_array(21)
        );
        let hands = parse_detection_line(&line).expect("parse");
        assert_eq!(hands.len(), 2);
        assert_eq!(hands[0].handedness, "Left");
        assert_eq!(hands[1].handedness, "Right");
        assert!((hands[0].confidence - 0.9).abs() < f32::EPSILON);
    }

    #[test]
    fn empty_result_is_no_hands() {
        let hands = parse_detection_line(r#"{"hands":[]}"#).expect("parse");
        assert!(hands.is_empty());
    }

    #[test]
    fn reported_error_propagates() {
        let err = parse_detection_line(r#"{"hands":[],"error":"model not loaded"}"#)
            .expect_err("error line must fail");
        assert!(err.to_string().contains("model not loaded"));
    }

    #[test]
    fn malformed_hand_is_skipped() {
        let line = format!(
            r#"{{"hands":[{{"handedness":"Left","score":0.9,"landmarks":{short}}},{{"handedness":"Right","score":0.8,"landmarks":{full}}}]}}"#,
            short = landmark_array(5),
            full = landmark_array(21)
        );
        let hands = parse_detection_line(&line).expect("parse");
        assert_eq!(hands.len(), 1);
        assert_eq!(hands[0].handedness, "Right");
    }
}
