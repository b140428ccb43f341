//! Prompt interpretation.
//!
//! Turns free text into an [`EditIntent`] using a fixed title pattern and
//! keyword tables. Pure and deterministic: the same prompt always yields the
//! same intent, and a prompt that matches nothing yields an empty intent.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

/// Length of the window during which a title overlay stays on screen.
pub const OVERLAY_DISPLAY_SECS: u32 = 3;

static TITLE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)add\s+title\s*:\s*(.+?)\s+at\s+(\d{1,3}):([0-5]?\d)\b")
        .expect("title pattern is a valid regex")
});

const SUBTITLE_TERMS: &[&str] = &["subtitle", "subtitles", "caption", "captions"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorStyle {
    Bw,
    Cinematic,
    Blue,
    Green,
    Golden,
    Warm,
}

impl ColorStyle {
    pub fn name(self) -> &'static str {
        match self {
            ColorStyle::Bw => "bw",
            ColorStyle::Cinematic => "cinematic",
            ColorStyle::Blue => "blue",
            ColorStyle::Green => "green",
            ColorStyle::Golden => "golden",
            ColorStyle::Warm => "warm",
        }
    }
}

impl fmt::Display for ColorStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Keyword sets in priority order. The first set with a hit decides the style.
const COLOR_KEYWORDS: &[(ColorStyle, &[&str])] = &[
    (
        ColorStyle::Bw,
        &["black and white", "black & white", "b&w", "b/w", "monochrome", "grayscale", "greyscale", "noir"],
    ),
    (
        ColorStyle::Cinematic,
        &["cinematic", "cinema", "filmic", "film look", "movie", "moody", "dramatic", "teal and orange"],
    ),
    (ColorStyle::Blue, &["blue", "cool", "cold", "icy", "teal"]),
    (ColorStyle::Green, &["green", "nature", "natural", "forest", "lush"]),
    (ColorStyle::Golden, &["golden", "gold", "golden hour", "sunset"]),
    (ColorStyle::Warm, &["warm", "warmer", "cozy", "sunny", "orange"]),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Overlay {
    pub text: String,
    pub start_seconds: u32,
    pub end_seconds: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EditIntent {
    pub overlay: Option<Overlay>,
    pub color_style: Option<ColorStyle>,
    pub wants_subtitles: bool,
}

impl EditIntent {
    /// True when nothing was requested and the pipeline is a pass-through.
    pub fn is_empty(&self) -> bool {
        self.overlay.is_none() && self.color_style.is_none() && !self.wants_subtitles
    }
}

#[derive(Debug, Clone)]
pub struct PromptInterpreter {
    enable_nature_style: bool,
}

impl Default for PromptInterpreter {
    fn default() -> Self {
        Self { enable_nature_style: true }
    }
}

impl PromptInterpreter {
    pub fn new(enable_nature_style: bool) -> Self {
        Self { enable_nature_style }
    }

    pub fn interpret(&self, prompt: &str) -> EditIntent {
        EditIntent {
            overlay: extract_overlay(prompt),
            color_style: self.detect_color_style(prompt),
            wants_subtitles: detect_subtitles(prompt),
        }
    }

    fn detect_color_style(&self, prompt: &str) -> Option<ColorStyle> {
        let lowered = prompt.to_lowercase();

        COLOR_KEYWORDS
            .iter()
            .filter(|(style, _)| self.enable_nature_style || *style != ColorStyle::Green)
            .find(|(_, terms)| terms.iter().any(|term| contains_term(&lowered, term)))
            .map(|(style, _)| *style)
    }
}

/// Interpret a prompt with the default keyword tables.
pub fn interpret(prompt: &str) -> EditIntent {
    PromptInterpreter::default().interpret(prompt)
}

fn extract_overlay(prompt: &str) -> Option<Overlay> {
    let captures = TITLE_PATTERN.captures(prompt)?;

    let text = captures.get(1)?.as_str().trim();
    if text.is_empty() {
        return None;
    }

    let minutes: u32 = captures.get(2)?.as_str().parse().ok()?;
    let seconds: u32 = captures.get(3)?.as_str().parse().ok()?;
    let start_seconds = minutes * 60 + seconds;

    Some(Overlay {
        text: text.to_string(),
        start_seconds,
        end_seconds: start_seconds + OVERLAY_DISPLAY_SECS,
    })
}

fn detect_subtitles(prompt: &str) -> bool {
    let lowered = prompt.to_lowercase();
    SUBTITLE_TERMS.iter().any(|term| lowered.contains(term))
}

/// Whole-word containment, so "cool" does not fire on "school".
fn contains_term(haystack: &str, term: &str) -> bool {
    haystack.match_indices(term).any(|(start, matched)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + matched.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}
