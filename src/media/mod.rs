// Media processing stages
//
// - Commands: ffmpeg/ffprobe command builders and the process runner
// - Processor: the pipeline stages (probe, normalize, concat, audio, encode)

pub mod commands;
pub mod processor;

use async_trait::async_trait;
use std::path::{Path, PathBuf};

pub use commands::*;
pub use processor::*;

use crate::config::MediaConfig;
use crate::error::Result;

/// Transcoding stages the pipeline drives. Each is a function of the paths it is given.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaProcessorTrait: Send + Sync {
    /// Duration of a media file in seconds
    async fn probe_duration(&self, path: &Path) -> Result<f64>;

    /// Re-encode a clip to the canonical concatenation profile
    async fn normalize(&self, input_path: &Path, output_path: &Path) -> Result<()>;

    /// Join normalized clips in order without re-encoding
    async fn concat(&self, input_paths: &[PathBuf], list_path: &Path, output_path: &Path) -> Result<()>;

    /// Extract mono 16 kHz audio for speech recognition
    async fn extract_audio(&self, video_path: &Path, audio_path: &Path) -> Result<()>;

    /// Apply the filter expression and write the distributable MP4
    async fn encode(&self, input_path: &Path, filter_expression: &str, output_path: &Path) -> Result<()>;

    /// Check ffmpeg and ffprobe are runnable; returns their version lines
    async fn check_availability(&self) -> Result<Vec<String>>;
}

/// Factory for creating media processor instances
pub struct MediaProcessorFactory;

impl MediaProcessorFactory {
    /// Create the default media processor implementation (FFmpeg-based)
    pub fn create_processor(config: MediaConfig) -> Box<dyn MediaProcessorTrait> {
        Box::new(processor::MediaProcessorImpl::new(config))
    }
}
