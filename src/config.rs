use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use crate::error::{Result, PromptCutError};
use crate::intent::ColorStyle;

fn default_lut_opacity() -> f64 {
    0.25
}

fn default_font_scale() -> u32 {
    12
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub media: MediaConfig,
    pub limits: LimitsConfig,
    pub transcriber: TranscriberConfig,
    pub luts: LutConfig,
    pub intent: IntentConfig,
    pub workspace: WorkspaceConfig,
    pub overlay: OverlayConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Path to ffmpeg binary
    pub ffmpeg_path: String,
    /// Path to ffprobe binary
    pub ffprobe_path: String,
    /// Upper bound for any single probe or transcode process
    pub timeout_secs: u64,
    /// x264 preset used for the final encode
    pub preset: String,
    /// x264 constant rate factor used for the final encode
    pub crf: u8,
    /// Additional options appended to the final encode, e.g. ["-tune", "film"]
    pub encode_options: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Maximum accepted upload size in MiB
    pub max_size_mb: u64,
    /// Maximum accepted clip duration in seconds
    pub max_duration_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriberConfig {
    /// Path to transcriber binary (openai-whisper CLI)
    pub binary_path: String,
    /// Model tier, smaller is faster
    pub model: String,
    /// "translate" always produces English output regardless of source language
    pub task: String,
    /// Spoken language hint; auto-detected when unset
    pub source_language: Option<String>,
    /// Subtitle file format written by the engine
    pub output_format: String,
    /// Extra attempts after a failed transcription
    pub max_retries: u32,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LutEntry {
    /// File name inside the LUT directory
    pub file: String,
    /// Blend opacity of the graded branch over the original picture
    #[serde(default = "default_lut_opacity")]
    pub opacity: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LutConfig {
    /// Directory holding the .cube files
    pub directory: PathBuf,
    pub cinematic: LutEntry,
    pub blue: LutEntry,
    pub green: LutEntry,
    pub golden: LutEntry,
    pub warm: LutEntry,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentConfig {
    /// Recognise nature/green keywords as a color style
    pub enable_nature_style: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    /// Parent directory for per-request scratch directories; system temp dir when unset
    pub root: Option<PathBuf>,
    /// Keep scratch directories after the request finishes
    pub keep: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayConfig {
    pub font_file: Option<PathBuf>,
    pub font_color: String,
    /// Font size is frame height divided by this value
    #[serde(default = "default_font_scale")]
    pub font_scale: u32,
    /// Opacity of the box drawn behind the title, 0 disables it
    pub box_opacity: f64,
}

impl LutConfig {
    /// LUT settings for a graded style. Black and white is a plain filter and has none.
    pub fn entry(&self, style: ColorStyle) -> Option<&LutEntry> {
        match style {
            ColorStyle::Bw => None,
            ColorStyle::Cinematic => Some(&self.cinematic),
            ColorStyle::Blue => Some(&self.blue),
            ColorStyle::Green => Some(&self.green),
            ColorStyle::Golden => Some(&self.golden),
            ColorStyle::Warm => Some(&self.warm),
        }
    }
}

impl WorkspaceConfig {
    pub fn root_dir(&self) -> PathBuf {
        self.root.clone().unwrap_or_else(|| std::env::temp_dir().join("promptcut"))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            media: MediaConfig {
                ffmpeg_path: "ffmpeg".to_string(),
                ffprobe_path: "ffprobe".to_string(),
                timeout_secs: 600,
                preset: "fast".to_string(),
                crf: 23,
                encode_options: vec![],
            },
            limits: LimitsConfig {
                max_size_mb: 50,
                max_duration_secs: 60,
            },
            transcriber: TranscriberConfig {
                binary_path: "whisper".to_string(),
                model: "tiny".to_string(),
                task: "translate".to_string(),
                source_language: None,
                output_format: "srt".to_string(),
                max_retries: 1,
                timeout_secs: 900,
            },
            luts: LutConfig {
                directory: PathBuf::from("luts"),
                cinematic: LutEntry { file: "cinematic.cube".to_string(), opacity: 0.28 },
                blue: LutEntry { file: "blue.cube".to_string(), opacity: 0.30 },
                green: LutEntry { file: "green.cube".to_string(), opacity: 0.25 },
                golden: LutEntry { file: "golden.cube".to_string(), opacity: 0.25 },
                warm: LutEntry { file: "warm.cube".to_string(), opacity: 0.22 },
            },
            intent: IntentConfig {
                enable_nature_style: true,
            },
            workspace: WorkspaceConfig {
                root: None,
                keep: false,
            },
            overlay: OverlayConfig {
                font_file: None,
                font_color: "white".to_string(),
                font_scale: 12,
                box_opacity: 0.45,
            },
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| PromptCutError::Config(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| PromptCutError::Config(format!("Failed to parse config file: {}", e)))
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| PromptCutError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| PromptCutError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_round_trips_through_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("promptcut.toml");

        Config::default().save_to_file(&path).unwrap();
        let loaded = Config::from_file(&path).unwrap();

        assert_eq!(loaded.limits.max_size_mb, 50);
        assert_eq!(loaded.limits.max_duration_secs, 60);
        assert_eq!(loaded.transcriber.task, "translate");
        assert_eq!(loaded.luts.warm.opacity, 0.22);
    }

    #[test]
    fn test_missing_opacity_uses_default() {
        let entry: LutEntry = toml::from_str(r#"file = "custom.cube""#).unwrap();
        assert_eq!(entry.opacity, 0.25);
    }

    #[test]
    fn test_bw_has_no_lut() {
        let config = Config::default();
        assert!(config.luts.entry(ColorStyle::Bw).is_none());
        assert_eq!(config.luts.entry(ColorStyle::Blue).unwrap().opacity, 0.30);
        assert_eq!(config.luts.entry(ColorStyle::Cinematic).unwrap().file, "cinematic.cube");
    }

    #[test]
    fn test_invalid_config_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "media = 3").unwrap();

        let err = Config::from_file(&path).unwrap_err();
        assert!(matches!(err, PromptCutError::Config(_)));
    }
}
