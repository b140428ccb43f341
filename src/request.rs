use std::path::Path;
use chrono::Utc;

use crate::error::{PromptCutError, Result};

/// One uploaded clip.
#[derive(Debug, Clone)]
pub struct MediaAsset {
    /// Form field name, `video1` or `video2`
    pub name: String,
    /// Extension of the uploaded file, used when persisting it
    pub extension: String,
    pub data: Vec<u8>,
}

impl MediaAsset {
    pub fn new<S: Into<String>>(name: S, extension: &str, data: Vec<u8>) -> Self {
        let extension = extension.trim_start_matches('.').to_lowercase();
        Self {
            name: name.into(),
            extension: if extension.is_empty() { "mp4".to_string() } else { extension },
            data,
        }
    }

    /// Load an asset from a local file, keeping its extension.
    pub async fn from_file<S: Into<String>>(name: S, path: &Path) -> Result<Self> {
        let name = name.into();
        if !path.is_file() {
            return Err(PromptCutError::MissingAsset(format!("{} ({})", name, path.display())));
        }

        let data = tokio::fs::read(path).await?;
        let extension = path
            .extension()
            .map(|ext| ext.to_string_lossy().to_string())
            .unwrap_or_default();

        Ok(Self::new(name, &extension, data))
    }

    pub fn size_bytes(&self) -> u64 {
        self.data.len() as u64
    }
}

/// A prompt plus one mandatory and one optional clip.
#[derive(Debug, Clone)]
pub struct EditRequest {
    pub primary: Option<MediaAsset>,
    pub secondary: Option<MediaAsset>,
    pub prompt: String,
}

impl EditRequest {
    pub fn new(primary: MediaAsset, secondary: Option<MediaAsset>, prompt: impl Into<String>) -> Self {
        Self {
            primary: Some(primary),
            secondary,
            prompt: prompt.into(),
        }
    }

    /// Assets in timeline order. Fails when the mandatory first clip is absent.
    pub fn assets(&self) -> Result<Vec<&MediaAsset>> {
        let primary = self
            .primary
            .as_ref()
            .ok_or_else(|| PromptCutError::MissingAsset("video1".to_string()))?;

        let mut assets = vec![primary];
        assets.extend(self.secondary.as_ref());
        Ok(assets)
    }
}

/// Final rendered artifact.
#[derive(Debug, Clone)]
pub struct RenderOutput {
    pub data: Vec<u8>,
    pub filename: String,
    pub content_type: &'static str,
}

impl RenderOutput {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            filename: generated_filename(),
            content_type: "video/mp4",
        }
    }

    pub fn content_disposition(&self) -> String {
        format!("attachment; filename=\"{}\"", self.filename)
    }
}

/// `promptcut-<unix millis>.mp4`
pub fn generated_filename() -> String {
    format!("promptcut-{}.mp4", Utc::now().timestamp_millis())
}
