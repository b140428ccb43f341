use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;

use crate::error::{PromptCutError, Result};
use crate::media::MediaProcessorTrait;
use crate::transcribe::TranscriberTrait;
use crate::workspace::Workspace;

/// Produce an English subtitle track for `video_path` inside the workspace.
///
/// Extracts mono 16 kHz audio, runs the transcriber in translate mode and
/// checks the subtitle file is really there afterwards.
pub async fn generate_subtitles(
    media: &dyn MediaProcessorTrait,
    transcriber: &dyn TranscriberTrait,
    video_path: &Path,
    workspace: &Workspace,
) -> Result<PathBuf> {
    let audio_path = workspace.audio();
    let subtitle_path = workspace.subtitles();

    media.extract_audio(video_path, &audio_path).await?;
    transcriber.transcribe(&audio_path, &subtitle_path).await?;

    if !fs::try_exists(&subtitle_path).await? {
        return Err(PromptCutError::Subtitle(format!(
            "Expected subtitle file {} is missing",
            subtitle_path.display()
        )));
    }

    let content = fs::read_to_string(&subtitle_path).await?;
    info!("Generated {} subtitle cues", count_cues(&content));

    Ok(subtitle_path)
}

/// Number of timed cues in an SRT document.
pub fn count_cues(srt: &str) -> usize {
    srt.lines().filter(|line| line.contains(" --> ")).count()
}
