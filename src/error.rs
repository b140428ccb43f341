use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PromptCutError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Missing required asset: {0}")]
    MissingAsset(String),

    #[error(transparent)]
    Rejected(#[from] Rejection),

    #[error("LUT file for style '{style}' not found at {path}")]
    MissingLut { style: String, path: String },

    #[error("Media probe error: {0}")]
    Probe(String),

    #[error("Media processing error: {0}")]
    Media(String),

    #[error("Subtitle generation error: {0}")]
    Subtitle(String),

    #[error("{description} timed out after {secs} seconds")]
    Timeout { description: String, secs: u64 },

    #[error("Workspace error: {0}")]
    Workspace(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Reasons the validation gate turns an asset away.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Rejection {
    #[error("{name} is {size_mb:.1} MB, the limit is {limit_mb} MB")]
    TooLarge {
        name: String,
        size_mb: f64,
        limit_mb: u64,
    },

    #[error("{name} is {duration_secs:.1} seconds long, the limit is {limit_secs} seconds")]
    TooLong {
        name: String,
        duration_secs: f64,
        limit_secs: u64,
    },
}

/// Failure classes as seen by a caller of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// User-correctable: missing, oversized or overlong asset.
    Input,
    /// Operator-correctable: deployment is missing a resource such as a LUT.
    Resource,
    /// A probe, transcode or transcription process failed.
    ExternalTool,
    Internal,
}

impl ErrorClass {
    pub fn status_code(self) -> u16 {
        match self {
            ErrorClass::Input => 400,
            ErrorClass::Resource | ErrorClass::ExternalTool | ErrorClass::Internal => 500,
        }
    }
}

/// Error body returned to the client: `{ "error": "..." }`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ErrorPayload {
    pub error: String,
}

impl PromptCutError {
    pub fn class(&self) -> ErrorClass {
        match self {
            PromptCutError::MissingAsset(_) | PromptCutError::Rejected(_) => ErrorClass::Input,
            PromptCutError::MissingLut { .. } => ErrorClass::Resource,
            PromptCutError::Probe(_)
            | PromptCutError::Media(_)
            | PromptCutError::Subtitle(_)
            | PromptCutError::Timeout { .. } => ErrorClass::ExternalTool,
            PromptCutError::Io(_)
            | PromptCutError::Workspace(_)
            | PromptCutError::Config(_) => ErrorClass::Internal,
        }
    }

    pub fn status_code(&self) -> u16 {
        self.class().status_code()
    }

    /// Message safe to hand back to the client. Tool diagnostics stay in the logs.
    pub fn payload(&self) -> ErrorPayload {
        let error = match self.class() {
            ErrorClass::Input | ErrorClass::Resource => self.to_string(),
            ErrorClass::ExternalTool => "Video processing failed".to_string(),
            ErrorClass::Internal => "Internal error".to_string(),
        };
        ErrorPayload { error }
    }
}

pub type Result<T> = std::result::Result<T, PromptCutError>;
