//! Duration probing via ffprobe.

use std::path::Path;
use tracing::debug;

use crate::error::{PromptCutError, Result};
use crate::media::MediaCommandBuilder;

/// Probe the container duration of `path` in seconds.
///
/// There is no fallback duration: a failed or unparsable probe is an error.
pub async fn probe_duration(builder: &MediaCommandBuilder, path: &Path) -> Result<f64> {
    let stdout = builder.probe_duration(path).execute_capture().await?;
    let duration = parse_duration(&stdout)?;
    debug!("Probed {}: {:.3}s", path.display(), duration);
    Ok(duration)
}

/// Parse the single number ffprobe prints for `format=duration`.
pub fn parse_duration(stdout: &str) -> Result<f64> {
    let value = stdout
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .ok_or_else(|| PromptCutError::Probe("ffprobe returned no duration".to_string()))?;

    match value.parse::<f64>() {
        Ok(duration) if duration.is_finite() && duration >= 0.0 => Ok(duration),
        _ => Err(PromptCutError::Probe(format!("Unparsable duration: {:?}", value))),
    }
}
