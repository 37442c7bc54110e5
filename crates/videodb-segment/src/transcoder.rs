//! ffmpeg-backed [`Transcoder`].
//!
//! The process runs on a private single-worker runtime so callers stay
//! synchronous; the timeout drops the child, and `kill_on_drop` terminates it.
//! Do not call from inside another tokio runtime.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use videodb_core::config::{expand_path, FrameSampling, FrameSettings, Resolution};
use videodb_core::traits::Transcoder;
use videodb_core::{Error, Result};

/// Name pattern of frames written by [`FfmpegTranscoder::extract_frames`].
pub const FRAME_PATTERN: &str = "frame_%05d.png";

pub struct FfmpegTranscoder {
    binary: PathBuf,
    timeout: Duration,
    runtime: tokio::runtime::Runtime,
}

impl FfmpegTranscoder {
    pub fn new(binary: impl Into<PathBuf>, timeout: Duration) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("videodb-ffmpeg")
            .enable_all()
            .build()
            .map_err(|e| Error::InvalidConfiguration(format!("failed to start transcoder runtime: {e}")))?;
        Ok(Self { binary: binary.into(), timeout, runtime })
    }

    pub fn from_settings(settings: &FrameSettings) -> Result<Self> {
        Self::new(expand_path(&settings.ffmpeg), Duration::from_secs(settings.timeout_secs))
    }

    pub fn frame_args(source: &Path, sampling: FrameSampling, resolution: Resolution, out_dir: &Path) -> Vec<String> {
        let scale = format!("scale={}:{}", resolution.width, resolution.height);
        // showinfo reports each keyframe's pts_time, logged at info level.
        let loglevel = if sampling == FrameSampling::KeyframesOnly { "info" } else { "error" };
        let mut args = base_args(loglevel);
        match sampling {
            FrameSampling::Fps(fps) => {
                args.extend(["-i".to_string(), source.to_string_lossy().to_string()]);
                args.extend(["-vf".to_string(), format!("fps={fps},{scale}")]);
            }
            FrameSampling::KeyframesOnly => {
                // Decoder option, so it has to precede the input.
                args.extend(["-skip_frame".to_string(), "nokey".to_string()]);
                args.extend(["-i".to_string(), source.to_string_lossy().to_string()]);
                args.extend(["-vf".to_string(), format!("{scale},showinfo"), "-vsync".to_string(), "vfr".to_string()]);
            }
        }
        args.extend(["-f".to_string(), "image2".to_string()]);
        args.push(out_dir.join(FRAME_PATTERN).to_string_lossy().to_string());
        args
    }

    pub fn audio_args(source: &Path, sample_rate: u32, out_file: &Path) -> Vec<String> {
        let mut args = base_args("error");
        args.extend(["-i".to_string(), source.to_string_lossy().to_string()]);
        args.extend(
            ["-vn", "-ac", "1", "-ar", &sample_rate.to_string(), "-acodec", "pcm_s16le", "-f", "wav"]
                .map(String::from),
        );
        args.push(out_file.to_string_lossy().to_string());
        args
    }

    /// Runs the binary to completion and returns its stderr.
    fn run(&self, args: Vec<String>) -> Result<String> {
        tracing::debug!(binary = %self.binary.display(), ?args, "running transcoder");
        self.runtime.block_on(async {
            let child = tokio::process::Command::new(&self.binary)
                .args(&args)
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::piped())
                .kill_on_drop(true)
                .spawn()
                .map_err(|e| Error::Transcoding(format!("failed to spawn {}: {e}", self.binary.display())))?;

            let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
                Ok(result) => result.map_err(|e| Error::Transcoding(format!("failed to wait for transcoder: {e}")))?,
                Err(_) => {
                    return Err(Error::Transcoding(format!("timed out after {}s", self.timeout.as_secs())));
                }
            };
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            if !output.status.success() {
                let lines: Vec<&str> = stderr.lines().collect();
                let tail = lines[lines.len().saturating_sub(5)..].join("\n");
                return Err(Error::Transcoding(format!("{} exited with {}: {}", self.binary.display(), output.status, tail.trim())));
            }
            Ok(stderr)
        })
    }
}

fn base_args(loglevel: &str) -> Vec<String> {
    ["-hide_banner", "-loglevel", loglevel, "-nostdin", "-y"].map(String::from).to_vec()
}

/// Collects `pts_time` values from ffmpeg `showinfo` log lines, in order.
pub fn parse_showinfo_times(stderr: &str) -> Vec<f64> {
    stderr
        .lines()
        .filter(|line| line.contains("showinfo"))
        .filter_map(|line| line.split_once("pts_time:"))
        .filter_map(|(_, rest)| rest.split_whitespace().next()?.parse().ok())
        .collect()
}

impl Transcoder for FfmpegTranscoder {
    fn extract_frames(
        &self,
        source: &Path,
        sampling: FrameSampling,
        resolution: Resolution,
        out_dir: &Path,
    ) -> Result<Vec<f64>> {
        let stderr = self.run(Self::frame_args(source, sampling, resolution, out_dir))?;
        Ok(match sampling {
            FrameSampling::Fps(_) => Vec::new(),
            FrameSampling::KeyframesOnly => parse_showinfo_times(&stderr),
        })
    }

    fn extract_audio(&self, source: &Path, sample_rate: u32, out_file: &Path) -> Result<()> {
        self.run(Self::audio_args(source, sample_rate, out_file)).map(|_| ())
    }
}
