// Speech-to-text engines
//
// - Whisper: openai-whisper command-line tool, run in translate mode so the
//   subtitle track is always English
//
// To add another engine, implement TranscriberTrait and extend
// TranscriberImplementation and the factory.

pub mod whisper;

use async_trait::async_trait;
use std::path::Path;

use crate::config::TranscriberConfig;
use crate::error::Result;

/// Main trait for transcription operations
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TranscriberTrait: Send + Sync {
    /// Transcribe `audio_path` and write a timed subtitle file to `subtitle_path`.
    ///
    /// Fails if the engine fails or leaves no subtitle file behind.
    async fn transcribe(&self, audio_path: &Path, subtitle_path: &Path) -> Result<()>;

    /// Check the engine is runnable
    async fn check_availability(&self) -> Result<()>;
}

/// Transcriber implementation type
#[derive(Debug, Clone)]
pub enum TranscriberImplementation {
    Whisper,
}

/// Factory for creating transcriber instances
pub struct TranscriberFactory;

impl TranscriberFactory {
    /// Create a transcriber based on implementation type
    pub fn create_transcriber(
        implementation: TranscriberImplementation,
        config: TranscriberConfig,
    ) -> Box<dyn TranscriberTrait> {
        match implementation {
            TranscriberImplementation::Whisper => Box::new(whisper::WhisperTranscriber::new(config)),
        }
    }

    pub fn create_default(config: TranscriberConfig) -> Box<dyn TranscriberTrait> {
        Self::create_transcriber(TranscriberImplementation::Whisper, config)
    }
}
