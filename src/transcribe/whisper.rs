use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::config::TranscriberConfig;
use crate::error::{PromptCutError, Result};
use crate::media::{MediaCommand, Tool};
use super::TranscriberTrait;

/// openai-whisper CLI transcriber
pub struct WhisperTranscriber {
    config: TranscriberConfig,
}

impl WhisperTranscriber {
    pub fn new(config: TranscriberConfig) -> Self {
        Self { config }
    }

    fn build_command(&self, audio_path: &Path, output_dir: &Path) -> MediaCommand {
        let mut cmd = MediaCommand::new(&self.config.binary_path, "Transcription", Tool::Transcriber)
            .with_timeout(Duration::from_secs(self.config.timeout_secs))
            .arg(audio_path.to_string_lossy().to_string())
            .arg("--model").arg(&self.config.model)
            .arg("--task").arg(&self.config.task)
            .arg("--output_dir").arg(output_dir.to_string_lossy().to_string())
            .arg("--output_format").arg(&self.config.output_format);

        // Source language hint; the translate task always emits English
        if let Some(lang) = &self.config.source_language {
            cmd = cmd.arg("--language").arg(lang);
        }

        cmd
    }

    /// Where the engine writes its result: `<output_dir>/<audio stem>.<format>`
    fn expected_output(&self, audio_path: &Path, output_dir: &Path) -> Result<PathBuf> {
        let stem = audio_path
            .file_stem()
            .ok_or_else(|| PromptCutError::Subtitle("Invalid audio filename".to_string()))?;
        Ok(output_dir.join(format!("{}.{}", stem.to_string_lossy(), self.config.output_format)))
    }

    async fn attempt(&self, audio_path: &Path, output_dir: &Path, expected: &Path) -> Result<()> {
        // A leftover file from an earlier attempt must not mask a failure
        if fs::try_exists(expected).await? {
            fs::remove_file(expected).await?;
        }

        self.build_command(audio_path, output_dir).execute().await?;

        if !fs::try_exists(expected).await? {
            return Err(PromptCutError::Subtitle(format!(
                "Transcriber exited successfully but wrote no {}",
                expected.display()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl TranscriberTrait for WhisperTranscriber {
    async fn transcribe(&self, audio_path: &Path, subtitle_path: &Path) -> Result<()> {
        let output_dir = subtitle_path
            .parent()
            .ok_or_else(|| PromptCutError::Subtitle("Subtitle path has no parent directory".to_string()))?;
        let expected = self.expected_output(audio_path, output_dir)?;

        info!(
            "Transcribing {} with model {} (task: {})",
            audio_path.display(),
            self.config.model,
            self.config.task
        );

        let attempts = self.config.max_retries + 1;
        let mut last_error = None;
        for attempt in 1..=attempts {
            match self.attempt(audio_path, output_dir, &expected).await {
                Ok(()) => {
                    last_error = None;
                    break;
                }
                Err(e) => {
                    warn!("Transcription attempt {}/{} failed: {}", attempt, attempts, e);
                    last_error = Some(e);
                }
            }
        }
        if let Some(e) = last_error {
            return Err(e);
        }

        if expected != subtitle_path {
            debug!("Moving {} to {}", expected.display(), subtitle_path.display());
            fs::rename(&expected, subtitle_path).await?;
        }

        info!("Subtitles written to {}", subtitle_path.display());
        Ok(())
    }

    async fn check_availability(&self) -> Result<()> {
        MediaCommand::new(&self.config.binary_path, "Transcriber check", Tool::Transcriber)
            .with_timeout(Duration::from_secs(60))
            .arg("--help")
            .execute()
            .await?;

        info!("Transcriber {} is available", self.config.binary_path);
        Ok(())
    }
}
