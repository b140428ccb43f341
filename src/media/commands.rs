use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::config::MediaConfig;
use crate::error::{PromptCutError, Result};

/// Canonical profile every clip is normalized to before concatenation.
pub const CANONICAL_WIDTH: u32 = 1280;
pub const CANONICAL_HEIGHT: u32 = 720;
pub const CANONICAL_FPS: u32 = 30;
pub const CANONICAL_AUDIO_RATE: u32 = 48_000;
pub const CANONICAL_AUDIO_CHANNELS: u32 = 2;

/// Sample rate and channel count the speech model expects.
pub const SPEECH_AUDIO_RATE: u32 = 16_000;
pub const SPEECH_AUDIO_CHANNELS: u32 = 1;

const STDERR_TAIL_LINES: usize = 15;

/// External tool a command runs; decides which error kind a failure becomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    Ffmpeg,
    Ffprobe,
    Transcriber,
}

/// Abstract media processing command representation
#[derive(Debug, Clone)]
pub struct MediaCommand {
    pub binary_path: String,
    pub args: Vec<String>,
    pub description: String,
    pub tool: Tool,
    pub timeout: Option<Duration>,
}

impl MediaCommand {
    /// Create a new media processing command
    pub fn new<S1: Into<String>, S2: Into<String>>(binary_path: S1, description: S2, tool: Tool) -> Self {
        Self {
            binary_path: binary_path.into(),
            args: Vec::new(),
            description: description.into(),
            tool,
            timeout: None,
        }
    }

    /// Add an argument
    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(|s| s.into()));
        self
    }

    /// Kill the process and fail if it runs longer than `timeout`
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Add input file
    pub fn input<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg("-i").arg(path.as_ref().to_string_lossy().to_string())
    }

    /// Add output file
    pub fn output<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg(path.as_ref().to_string_lossy().to_string())
    }

    /// Force overwrite output
    pub fn overwrite(self) -> Self {
        self.arg("-y")
    }

    /// Set video codec
    pub fn video_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-c:v").arg(codec)
    }

    /// Set audio codec
    pub fn audio_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-c:a").arg(codec)
    }

    /// Copy every stream without re-encoding
    pub fn copy_streams(self) -> Self {
        self.arg("-c").arg("copy")
    }

    /// Disable video
    pub fn no_video(self) -> Self {
        self.arg("-vn")
    }

    /// Set audio sample rate
    pub fn audio_sample_rate(self, rate: u32) -> Self {
        self.arg("-ar").arg(rate.to_string())
    }

    /// Set audio channels
    pub fn audio_channels(self, channels: u32) -> Self {
        self.arg("-ac").arg(channels.to_string())
    }

    /// Set pixel format
    pub fn pixel_format<S: Into<String>>(self, format: S) -> Self {
        self.arg("-pix_fmt").arg(format)
    }

    /// Add video filter
    pub fn video_filter<S: Into<String>>(self, filter: S) -> Self {
        self.arg("-vf").arg(filter)
    }

    /// Add audio filter
    pub fn audio_filter<S: Into<String>>(self, filter: S) -> Self {
        self.arg("-af").arg(filter)
    }

    fn failure(&self, message: String) -> PromptCutError {
        match self.tool {
            Tool::Ffmpeg => PromptCutError::Media(message),
            Tool::Ffprobe => PromptCutError::Probe(message),
            Tool::Transcriber => PromptCutError::Subtitle(message),
        }
    }

    /// Run the command and return its captured output.
    ///
    /// A non-zero exit is an error carrying the tail of stderr.
    pub async fn run(&self) -> Result<Output> {
        debug!("Executing media processing command: {} {:?}", self.binary_path, self.args);
        debug!("Description: {}", self.description);

        let child = Command::new(&self.binary_path)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| self.failure(format!("Failed to execute {}: {}", self.binary_path, e)))?;

        let waited = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait_with_output()).await {
                Ok(waited) => waited,
                Err(_) => {
                    // Dropping the wait future drops the child, which kills it.
                    warn!("{} timed out after {:?}, killing process", self.description, limit);
                    return Err(PromptCutError::Timeout {
                        description: self.description.clone(),
                        secs: limit.as_secs(),
                    });
                }
            },
            None => child.wait_with_output().await,
        };

        let output = waited
            .map_err(|e| self.failure(format!("Failed to wait for {}: {}", self.binary_path, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(self.failure(format!(
                "{} failed ({}): {}",
                self.description,
                output.status,
                stderr_tail(&stderr)
            )));
        }

        Ok(output)
    }

    /// Execute the command
    pub async fn execute(&self) -> Result<()> {
        self.run().await.map(|_| ())
    }

    /// Execute the command and return its standard output as text
    pub async fn execute_capture(&self) -> Result<String> {
        let output = self.run().await?;
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

fn stderr_tail(stderr: &str) -> String {
    let lines: Vec<&str> = stderr.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}

/// Contents of a concat-demuxer playlist, one `file '<path>'` line per clip.
pub fn concat_playlist(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| format!("file '{}'\n", p.to_string_lossy().replace('\'', "'\\''")))
        .collect()
}

/// Builder for the pipeline's ffmpeg/ffprobe invocations
pub struct MediaCommandBuilder {
    ffmpeg_path: String,
    ffprobe_path: String,
    timeout: Duration,
}

impl MediaCommandBuilder {
    /// Create a new command builder
    pub fn new(config: &MediaConfig) -> Self {
        Self {
            ffmpeg_path: config.ffmpeg_path.clone(),
            ffprobe_path: config.ffprobe_path.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    fn ffmpeg<S: Into<String>>(&self, description: S) -> MediaCommand {
        MediaCommand::new(&self.ffmpeg_path, description, Tool::Ffmpeg).with_timeout(self.timeout)
    }

    /// Build duration probe command; prints the container duration in seconds
    pub fn probe_duration<P: AsRef<Path>>(&self, path: P) -> MediaCommand {
        MediaCommand::new(&self.ffprobe_path, "Duration probe", Tool::Ffprobe)
            .with_timeout(self.timeout)
            .args(["-v", "error"])
            .args(["-show_entries", "format=duration"])
            .args(["-of", "default=noprint_wrappers=1:nokey=1"])
            .output(path)
    }

    /// Build normalization command: letterboxed 1280x720, square pixels,
    /// constant 30 fps, H.264 high@4.1 yuv420p, 48 kHz stereo AAC
    pub fn normalize<P: AsRef<Path>>(&self, input_path: P, output_path: P) -> MediaCommand {
        let video_filter = format!(
            "scale={w}:{h}:force_original_aspect_ratio=decrease,pad={w}:{h}:(ow-iw)/2:(oh-ih)/2,setsar=1,fps={fps}",
            w = CANONICAL_WIDTH,
            h = CANONICAL_HEIGHT,
            fps = CANONICAL_FPS,
        );

        self.ffmpeg("Normalization")
            .overwrite()
            .input(input_path)
            .video_filter(video_filter)
            .audio_filter(format!("aresample={},asetpts=PTS-STARTPTS", CANONICAL_AUDIO_RATE))
            .video_codec("libx264")
            .args(["-profile:v", "high", "-level:v", "4.1"])
            .pixel_format("yuv420p")
            .arg("-r").arg(CANONICAL_FPS.to_string())
            .audio_codec("aac")
            .audio_sample_rate(CANONICAL_AUDIO_RATE)
            .audio_channels(CANONICAL_AUDIO_CHANNELS)
            .output(output_path)
    }

    /// Build stream-copy concatenation command over a playlist file
    pub fn concat<P: AsRef<Path>>(&self, list_path: P, output_path: P) -> MediaCommand {
        self.ffmpeg("Concatenation")
            .overwrite()
            .args(["-f", "concat", "-safe", "0"])
            .input(list_path)
            .copy_streams()
            .output(output_path)
    }

    /// Build audio extraction command
    pub fn extract_audio<P: AsRef<Path>>(&self, video_path: P, audio_path: P) -> MediaCommand {
        self.ffmpeg("Audio extraction")
            .input(video_path)
            .no_video()
            .audio_codec("pcm_s16le")
            .audio_sample_rate(SPEECH_AUDIO_RATE)
            .audio_channels(SPEECH_AUDIO_CHANNELS)
            .overwrite()
            .output(audio_path)
    }

    /// Build final encode command applying the compiled filter expression
    pub fn encode<P: AsRef<Path>>(
        &self,
        input_path: P,
        filter_expression: &str,
        output_path: P,
        preset: &str,
        crf: u8,
        additional_options: &[String],
    ) -> MediaCommand {
        let mut cmd = self
            .ffmpeg("Final encode")
            .overwrite()
            .input(input_path)
            .video_filter(filter_expression)
            .video_codec("libx264")
            .arg("-preset").arg(preset)
            .arg("-crf").arg(crf.to_string())
            .pixel_format("yuv420p")
            .audio_codec("aac")
            .arg("-movflags").arg("+faststart");

        // Add user-specified additional options
        for option in additional_options {
            cmd = cmd.arg(option);
        }

        cmd.output(output_path)
    }

    /// Build version check command
    pub fn version_check(&self, tool: Tool) -> MediaCommand {
        let binary = match tool {
            Tool::Ffprobe => &self.ffprobe_path,
            _ => &self.ffmpeg_path,
        };
        MediaCommand::new(binary, "Version check", tool)
            .with_timeout(Duration::from_secs(30))
            .arg("-version")
    }
}
