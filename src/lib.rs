//! PromptCut - prompt-driven video editing
//!
//! Takes one or two short clips and a free-text prompt, interprets the prompt
//! into a small set of edits (color look, subtitles, a timed title) and renders
//! a single MP4 with ffmpeg and the whisper CLI.

pub mod cli;
pub mod config;
pub mod error;
pub mod filter;
pub mod intent;
pub mod media;
pub mod probe;
pub mod request;
pub mod subtitle;
pub mod transcribe;
pub mod validate;
pub mod workflow;
pub mod workspace;
