use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, debug};

use crate::config::MediaConfig;
use crate::error::{Result, PromptCutError};
use crate::probe;
use super::{MediaProcessorTrait, MediaCommandBuilder, Tool, concat_playlist};

/// Concrete implementation of media processor (FFmpeg-based)
pub struct MediaProcessorImpl {
    config: MediaConfig,
    command_builder: MediaCommandBuilder,
}

impl MediaProcessorImpl {
    /// Create a new media processor implementation
    pub fn new(config: MediaConfig) -> Self {
        let command_builder = MediaCommandBuilder::new(&config);

        Self {
            config,
            command_builder,
        }
    }
}

#[async_trait]
impl MediaProcessorTrait for MediaProcessorImpl {
    async fn probe_duration(&self, path: &Path) -> Result<f64> {
        probe::probe_duration(&self.command_builder, path).await
    }

    async fn normalize(&self, input_path: &Path, output_path: &Path) -> Result<()> {
        info!("Normalizing {} -> {}", input_path.display(), output_path.display());

        self.command_builder
            .normalize(input_path, output_path)
            .execute()
            .await?;

        info!("Normalization of {} completed", input_path.display());
        Ok(())
    }

    async fn concat(&self, input_paths: &[PathBuf], list_path: &Path, output_path: &Path) -> Result<()> {
        if input_paths.is_empty() {
            return Err(PromptCutError::Media("Nothing to concatenate".to_string()));
        }

        info!("Concatenating {} clips into {}", input_paths.len(), output_path.display());

        let playlist = concat_playlist(input_paths);
        debug!("Concat playlist:\n{}", playlist);
        fs::write(list_path, playlist).await?;

        self.command_builder
            .concat(list_path, output_path)
            .execute()
            .await?;

        info!("Concatenation completed");
        Ok(())
    }

    async fn extract_audio(&self, video_path: &Path, audio_path: &Path) -> Result<()> {
        info!("Extracting audio from {} to {}", video_path.display(), audio_path.display());

        self.command_builder
            .extract_audio(video_path, audio_path)
            .execute()
            .await?;

        info!("Audio extraction completed");
        Ok(())
    }

    async fn encode(&self, input_path: &Path, filter_expression: &str, output_path: &Path) -> Result<()> {
        info!("Encoding {} -> {}", input_path.display(), output_path.display());
        debug!("Filter expression: {}", filter_expression);

        self.command_builder
            .encode(
                input_path,
                filter_expression,
                output_path,
                &self.config.preset,
                self.config.crf,
                &self.config.encode_options,
            )
            .execute()
            .await?;

        info!("Final encode completed");
        Ok(())
    }

    async fn check_availability(&self) -> Result<Vec<String>> {
        let mut versions = Vec::new();

        for tool in [Tool::Ffmpeg, Tool::Ffprobe] {
            let stdout = self.command_builder.version_check(tool).execute_capture().await?;
            // The first line carries the version
            let first_line = stdout.lines().next().unwrap_or("Unknown version");
            versions.push(first_line.to_string());
        }

        info!("Media tools are available");
        Ok(versions)
    }
}
