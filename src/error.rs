// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Error types for shotsort

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for shotsort operations
pub type Result<T> = std::result::Result<T, ShotsortError>;

/// shotsort error types
#[derive(Error, Debug)]
pub enum ShotsortError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No classification backend available: {0}")]
    ModelUnavailable(String),

    /// Raised inside a signal backend; the pipeline downgrades it to "no opinion"
    #[error("Signal extraction failed ({source_name}): {message}")]
    SignalExtraction {
        source_name: &'static str,
        message: String,
    },

    #[error("Failed to transfer {path:?}: {source}")]
    FileTransfer {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("File system error: {0}")]
    FileSystem(#[from] std::io::Error),

    #[error("API error: {0}")]
    Api(#[from] reqwest::Error),

    #[error("Ollama not available: {0}")]
    OllamaUnavailable(String),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ShotsortError {
    pub(crate) fn transfer(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileTransfer {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn signal(source_name: &'static str, message: impl Into<String>) -> Self {
        Self::SignalExtraction {
            source_name,
            message: message.into(),
        }
    }
}
