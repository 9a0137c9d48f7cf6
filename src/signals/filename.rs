// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Model-free text signal taken from the file name

use async_trait::async_trait;
use std::path::Path;

use super::tesseract::normalize_text;
use super::TextSignalExtractor;
use crate::Result;

/// Treats the file stem as the extracted text, so `python_error_log.png`
/// yields `python error log`. Handy for trying shotsort without OCR or a
/// vision model installed.
pub struct FilenameExtractor;

impl FilenameExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for FilenameExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TextSignalExtractor for FilenameExtractor {
    fn name(&self) -> &'static str {
        "filename"
    }

    async fn extract(&self, path: &Path) -> Result<String> {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy())
            .unwrap_or_default();
        Ok(normalize_text(&stem.replace(['_', '-', '.'], " ")))
    }
}
