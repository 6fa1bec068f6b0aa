use std::{net::ToSocketAddrs, path::PathBuf, time::Duration};

use anyhow::{anyhow, bail, Context, Result};
use hand_core::HandPolicy;

const STREAM_USAGE: &str = "Usage: fingercast stream [--source <uri>] [--width <px>] [--height <px>] \
[--fps <n>] [--output <device>] [--listen <addr:port>] [--python <bin>] \
[--detector-script <path>] [--model <path>] [--hand-policy <last|max>] [--verbose]\n\nDefaults \
mirror the classic setup: /dev/video0 at 640x480@30 into /dev/video10, counts on 127.0.0.1:8765.";

#[derive(Clone, Debug)]
pub struct StreamConfig {
    pub camera_uri: String,
    pub width: i32,
    pub height: i32,
    pub fps: u32,
    pub video_device: String,
    pub listen_addr: String,
    pub python_bin: String,
    pub detector_script: PathBuf,
    pub model_path: PathBuf,
    pub hand_policy: HandPolicy,
    pub verbose: bool,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            camera_uri: "/dev/video0".to_string(),
            width: 640,
            height: 480,
            fps: 30,
            video_device: "/dev/video10".to_string(),
            listen_addr: "127.0.0.1:8765".to_string(),
            python_bin: "python3".to_string(),
            detector_script: PathBuf::from("scripts/hand_detect.py"),
            model_path: PathBuf::from("models/hand_landmarker.task"),
            hand_policy: HandPolicy::LastHand,
            verbose: false,
        }
    }
}

impl StreamConfig {
    /// Parse `fingercast stream [...flags...]`; every flag has a default.
    pub fn from_args(args: &[String]) -> Result<Self> {
        let mut config = StreamConfig::default();

        let mut idx = 2;
        while idx < args.len() {
            match args[idx].as_str() {
                "--source" => {
                    idx += 1;
                    config.camera_uri = args
                        .get(idx)
                        .ok_or_else(|| anyhow!("--source requires a value"))?
                        .clone();
                    idx += 1;
                }
                "--width" => {
                    idx += 1;
                    config.width = args
                        .get(idx)
                        .ok_or_else(|| anyhow!("--width requires a value"))?
                        .parse::<i32>()
                        .with_context(|| "--width must be an integer".to_string())?;
                    idx += 1;
                }
                "--height" => {
                    idx += 1;
                    config.height = args
                        .get(idx)
                        .ok_or_else(|| anyhow!("--height requires a value"))?
                        .parse::<i32>()
                        .with_context(|| "--height must be an integer".to_string())?;
                    idx += 1;
                }
                "--fps" => {
                    idx += 1;
                    config.fps = args
                        .get(idx)
                        .ok_or_else(|| anyhow!("--fps requires a value"))?
                        .parse::<u32>()
                        .with_context(|| "--fps must be a positive integer".to_string())?;
                    idx += 1;
                }
                "--output" => {
                    idx += 1;
                    config.video_device = args
                        .get(idx)
                        .ok_or_else(|| anyhow!("--output requires a value"))?
                        .clone();
                    idx += 1;
                }
                "--listen" => {
                    idx += 1;
                    config.listen_addr = args
                        .get(idx)
                        .ok_or_else(|| anyhow!("--listen requires a value"))?
                        .clone();
                    idx += 1;
                }
                "--python" => {
                    idx += 1;
                    config.python_bin = args
                        .get(idx)
                        .ok_or_else(|| anyhow!("--python requires a value"))?
                        .clone();
                    idx += 1;
                }
                "--detector-script" => {
                    idx += 1;
                    let value = args
                        .get(idx)
                        .ok_or_else(|| anyhow!("--detector-script requires a value"))?;
                    config.detector_script = PathBuf::from(value);
                    idx += 1;
                }
                "--model" => {
                    idx += 1;
                    let value = args
                        .get(idx)
                        .ok_or_else(|| anyhow!("--model requires a value"))?;
                    config.model_path = PathBuf::from(value);
                    idx += 1;
                }
                "--hand-policy" => {
                    idx += 1;
                    let value = args
                        .get(idx)
                        .ok_or_else(|| anyhow!("--hand-policy requires a value"))?;
                    config.hand_policy = HandPolicy::parse(value)
                        .ok_or_else(|| anyhow!("--hand-policy must be `last` or `max`"))?;
                    idx += 1;
                }
                "--verbose" => {
                    config.verbose = true;
                    idx += 1;
                }
                "--help" => {
                    bail!(STREAM_USAGE);
                }
                arg => {
                    bail!("Unrecognised flag: {arg}\n\n{STREAM_USAGE}");
                }
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Target duration of one loop iteration.
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.fps as f64)
    }

    fn validate(&self) -> Result<()> {
        if self.width <= 0 || self.height <= 0 {
            bail!("resolution must be positive, got {}x{}", self.width, self.height);
        }
        if !(1..=240).contains(&self.fps) {
            bail!("--fps must be between 1 and 240, got {}", self.fps);
        }
        if self.video_device.is_empty() {
            bail!("--output device path must not be empty");
        }
        self.listen_addr
            .to_socket_addrs()
            .with_context(|| format!("--listen address {:?} is not resolvable", self.listen_addr))?
            .next()
            .ok_or_else(|| anyhow!("--listen address {:?} resolved to nothing", self.listen_addr))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> Vec<String> {
        let mut all = vec!["fingercast".to_string(), "stream".to_string()];
        all.extend(extra.iter().map(|s| s.to_string()));
        all
    }

    #[test]
    fn defaults_match_the_classic_setup() {
        let config = StreamConfig::from_args(&args(&[])).expect("defaults");
        assert_eq!(config.camera_uri, "/dev/video0");
        assert_eq!((config.width, config.height, config.fps), (640, 480, 30));
        assert_eq!(config.video_device, "/dev/video10");
        assert_eq!(config.listen_addr, "127.0.0.1:8765");
        assert_eq!(config.hand_policy, HandPolicy::LastHand);
        assert!(!config.verbose);
    }

    #[test]
    fn flags_override_defaults() {
        let config = StreamConfig::from_args(&args(&[
            "--source",
            "2",
            "--width",
            "320",
            "--height",
            "240",
            "--fps",
            "15",
            "--output",
            "/dev/video42",
            "--listen",
            "0.0.0.0:9000",
            "--hand-policy",
            "max",
            "--verbose",
        ]))
        .expect("parse");
        assert_eq!(config.camera_uri, "2");
        assert_eq!((config.width, config.height, config.fps), (320, 240, 15));
        assert_eq!(config.video_device, "/dev/video42");
        assert_eq!(config.listen_addr, "0.0.0.0:9000");
        assert_eq!(config.hand_policy, HandPolicy::MaxCount);
        assert!(config.verbose);
    }

    #[test]
    fn zero_fps_is_rejected() {
        assert!(StreamConfig::from_args(&args(&["--fps", "0"])).is_err());
    }

    #[test]
    fn negative_resolution_is_rejected() {
        assert!(StreamConfig::from_args(&args(&["--width", "-640"])).is_err());
    }

    #[test]
    fn unknown_policy_is_rejected() {
        assert!(StreamConfig::from_args(&args(&["--hand-policy", "first"])).is_err());
    }

    #[test]
    fn unresolvable_listen_address_is_rejected() {
        assert!(StreamConfig::from_args(&args(&["--listen", "not-an-address"])).is_err());
    }

    #[test]
    fn frame_interval_tracks_fps() {
        let config = StreamConfig::from_args(&args(&["--fps", "25"])).expect("parse");
        assert_eq!(config.frame_interval(), Duration::from_millis(40));
    }
}
