// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! OCR text extraction through the Tesseract command-line tool

use async_trait::async_trait;
use std::path::Path;
use tokio::process::Command;
use tracing::debug;

use super::TextSignalExtractor;
use crate::{Result, ShotsortError};

/// Runs `tesseract <image> stdout -l <language>`
pub struct TesseractExtractor {
    program: String,
    language: String,
}

impl TesseractExtractor {
    pub fn new(program: &str, language: &str) -> Self {
        Self {
            program: program.to_string(),
            language: language.to_string(),
        }
    }

    /// Check that the binary runs; returns its version line
    pub async fn probe(&self) -> Result<String> {
        let output = Command::new(&self.program)
            .arg("--version")
            .output()
            .await
            .map_err(|e| {
                ShotsortError::signal("tesseract", format!("cannot run {:?}: {}", self.program, e))
            })?;

        if !output.status.success() {
            return Err(ShotsortError::signal(
                "tesseract",
                format!("{:?} --version exited with {}", self.program, output.status),
            ));
        }

        // Older releases print the version on stderr
        let text = if output.stdout.is_empty() {
            output.stderr
        } else {
            output.stdout
        };
        Ok(String::from_utf8_lossy(&text)
            .lines()
            .next()
            .unwrap_or_default()
            .trim()
            .to_string())
    }
}

#[async_trait]
impl TextSignalExtractor for TesseractExtractor {
    fn name(&self) -> &'static str {
        "tesseract"
    }

    async fn extract(&self, path: &Path) -> Result<String> {
        debug!("Running OCR on {:?}", path);

        let output = Command::new(&self.program)
            .arg(path)
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .output()
            .await
            .map_err(|e| ShotsortError::signal("tesseract", e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ShotsortError::signal(
                "tesseract",
                format!("exited with {}: {}", output.status, stderr.trim()),
            ));
        }

        Ok(normalize_text(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// Collapse whitespace and lowercase
pub(crate) fn normalize_text(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
