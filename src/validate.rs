use tracing::debug;

use crate::config::LimitsConfig;
use crate::error::Rejection;
use crate::request::MediaAsset;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Size and duration policy applied to every asset before any transcoding.
#[derive(Debug, Clone)]
pub struct ValidationGate {
    max_size_mb: u64,
    max_duration_secs: u64,
}

impl ValidationGate {
    pub fn new(limits: &LimitsConfig) -> Self {
        Self {
            max_size_mb: limits.max_size_mb,
            max_duration_secs: limits.max_duration_secs,
        }
    }

    /// Check the upload size alone; runs before the asset is probed.
    pub fn check_size(&self, asset: &MediaAsset) -> Result<(), Rejection> {
        let size_mb = asset.size_bytes() as f64 / BYTES_PER_MB;
        if size_mb > self.max_size_mb as f64 {
            return Err(Rejection::TooLarge {
                name: asset.name.clone(),
                size_mb,
                limit_mb: self.max_size_mb,
            });
        }
        Ok(())
    }

    pub fn validate(&self, asset: &MediaAsset, probed_duration: f64) -> Result<(), Rejection> {
        self.check_size(asset)?;

        if probed_duration > self.max_duration_secs as f64 {
            return Err(Rejection::TooLong {
                name: asset.name.clone(),
                duration_secs: probed_duration,
                limit_secs: self.max_duration_secs,
            });
        }

        debug!(
            "{} accepted: {} bytes, {:.2}s",
            asset.name,
            asset.size_bytes(),
            probed_duration
        );
        Ok(())
    }
}
