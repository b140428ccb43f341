//! Filter graph compilation.
//!
//! An [`EditIntent`] becomes an ordered list of [`FilterStage`]s which render
//! into one ffmpeg `-vf` expression. Stages always render in the order
//! color grade, subtitle burn-in, text overlay, so the title sits above the
//! subtitles and both sit above the graded picture.

use std::path::{Path, PathBuf};
use tracing::debug;

use crate::config::{LutConfig, OverlayConfig};
use crate::error::{PromptCutError, Result};
use crate::intent::{ColorStyle, EditIntent, Overlay};

/// Expression for "leave the picture alone".
pub const IDENTITY_FILTER: &str = "null";

#[derive(Debug, Clone, PartialEq)]
pub enum FilterStage {
    Grayscale,
    /// Blend a LUT-graded copy of the picture over the original
    LutBlend {
        lut_path: PathBuf,
        opacity: f64,
    },
    Subtitles {
        path: PathBuf,
    },
    TextOverlay {
        overlay: Overlay,
        style: OverlayConfig,
    },
}

impl FilterStage {
    fn order(&self) -> u8 {
        match self {
            FilterStage::Grayscale | FilterStage::LutBlend { .. } => 0,
            FilterStage::Subtitles { .. } => 1,
            FilterStage::TextOverlay { .. } => 2,
        }
    }

    pub fn render(&self) -> String {
        match self {
            FilterStage::Grayscale => "hue=s=0".to_string(),
            FilterStage::LutBlend { lut_path, opacity, .. } => format!(
                "split[pc_base][pc_grade];[pc_grade]lut3d=file={}[pc_graded];[pc_graded][pc_base]blend=all_mode=normal:all_opacity={:.2}",
                escape_filter_path(lut_path),
                opacity
            ),
            FilterStage::Subtitles { path } => {
                format!("subtitles=filename={}", escape_filter_path(path))
            }
            FilterStage::TextOverlay { overlay, style } => render_text_overlay(overlay, style),
        }
    }
}

fn render_text_overlay(overlay: &Overlay, style: &OverlayConfig) -> String {
    let mut filter = format!(
        "drawtext=text={}:expansion=none:fontcolor={}:fontsize=h/{}:x=(w-text_w)/2:y=(h-text_h)/2",
        escape_filter_value(&overlay.text),
        escape_filter_value(&style.font_color),
        style.font_scale.max(1)
    );

    if let Some(font_file) = &style.font_file {
        filter.push_str(&format!(":fontfile={}", escape_filter_path(font_file)));
    }

    if style.box_opacity > 0.0 {
        filter.push_str(&format!(
            ":box=1:boxcolor=black@{:.2}:boxborderw=20",
            style.box_opacity.min(1.0)
        ));
    }

    filter.push_str(&format!(
        ":enable='between(t,{},{})'",
        overlay.start_seconds, overlay.end_seconds
    ));
    filter
}

/// Escape untrusted text for use as a filter option value inside a filtergraph.
///
/// Two levels apply: the option parser (`\ ' :`) and the filtergraph parser
/// (`\ ' [ ] , ;`). Nothing is quoted, so the result can be embedded as-is.
pub fn escape_filter_value(raw: &str) -> String {
    let mut option_level = String::with_capacity(raw.len() + 8);
    for ch in raw.chars() {
        if matches!(ch, '\\' | '\'' | ':') {
            option_level.push('\\');
        }
        option_level.push(ch);
    }

    let mut graph_level = String::with_capacity(option_level.len() + 8);
    for ch in option_level.chars() {
        if matches!(ch, '\\' | '\'' | '[' | ']' | ',' | ';') {
            graph_level.push('\\');
        }
        graph_level.push(ch);
    }
    graph_level
}

/// Escape a file path for a filter option, normalizing Windows separators.
pub fn escape_filter_path(path: &Path) -> String {
    escape_filter_value(&path.to_string_lossy().replace('\\', "/"))
}

/// Ordered filter stages for one render.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterGraph {
    stages: Vec<FilterStage>,
}

impl FilterGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a stage at its fixed position, whatever order stages are pushed in.
    pub fn push(&mut self, stage: FilterStage) {
        let index = self
            .stages
            .iter()
            .position(|existing| existing.order() > stage.order())
            .unwrap_or(self.stages.len());
        self.stages.insert(index, stage);
    }

    pub fn with_subtitles(mut self, path: &Path) -> Self {
        self.push(FilterStage::Subtitles { path: path.to_path_buf() });
        self
    }

    pub fn stages(&self) -> &[FilterStage] {
        &self.stages
    }

    pub fn render(&self) -> String {
        if self.stages.is_empty() {
            return IDENTITY_FILTER.to_string();
        }

        self.stages
            .iter()
            .map(FilterStage::render)
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Compiles intents into filter graphs against the configured LUTs and overlay style.
#[derive(Debug, Clone)]
pub struct FilterGraphCompiler {
    luts: LutConfig,
    overlay_style: OverlayConfig,
}

impl FilterGraphCompiler {
    pub fn new(luts: LutConfig, overlay_style: OverlayConfig) -> Self {
        Self { luts, overlay_style }
    }

    /// Color and overlay stages for an intent. Resolves the LUT file, so a
    /// missing resource surfaces before any transcoding starts.
    pub fn plan(&self, intent: &EditIntent) -> Result<FilterGraph> {
        self.check_resources(intent)?;
        Ok(self.preview(intent))
    }

    /// Same stages as [`plan`](Self::plan) without looking at the LUT files.
    pub fn preview(&self, intent: &EditIntent) -> FilterGraph {
        let mut graph = FilterGraph::new();

        if let Some(style) = intent.color_style {
            graph.push(self.color_stage(style));
        }

        if let Some(overlay) = &intent.overlay {
            graph.push(FilterStage::TextOverlay {
                overlay: overlay.clone(),
                style: self.overlay_style.clone(),
            });
        }

        debug!("Planned {} filter stages", graph.stages().len());
        graph
    }

    /// Fails with `MissingLut` when the intent's color style has no LUT file on disk.
    pub fn check_resources(&self, intent: &EditIntent) -> Result<()> {
        let Some(style) = intent.color_style else {
            return Ok(());
        };
        let Some(lut_path) = self.lut_path(style) else {
            return Ok(());
        };

        if !lut_path.is_file() {
            return Err(PromptCutError::MissingLut {
                style: style.to_string(),
                path: lut_path.display().to_string(),
            });
        }
        Ok(())
    }

    /// Full expression for an intent plus an optional generated subtitle file.
    pub fn compile(&self, intent: &EditIntent, subtitle_path: Option<&Path>) -> Result<String> {
        let mut graph = self.plan(intent)?;
        if let Some(path) = subtitle_path {
            graph = graph.with_subtitles(path);
        }
        Ok(graph.render())
    }

    fn lut_path(&self, style: ColorStyle) -> Option<PathBuf> {
        self.luts.entry(style).map(|entry| self.luts.directory.join(&entry.file))
    }

    fn color_stage(&self, style: ColorStyle) -> FilterStage {
        match (self.luts.entry(style), self.lut_path(style)) {
            (Some(entry), Some(lut_path)) => FilterStage::LutBlend {
                lut_path,
                opacity: entry.opacity,
            },
            _ => FilterStage::Grayscale,
        }
    }
}
