// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Text and visual signal sources
//!
//! Backends are acquired once, up front, by [`Capabilities::acquire`]. After
//! that every call goes through the capability boundary, which turns backend
//! failures into "no opinion" (empty text, [`VisualSignal::none`]) so a single
//! bad image never aborts a run.

pub mod filename;
pub mod ollama_visual;
pub mod tesseract;

use async_trait::async_trait;
use serde::Serialize;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::{AppConfig, CategoryMap, TextBackend, VisualBackend};
use crate::{Result, ShotsortError};

/// Category suggested by the visual classifier, with its probability
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisualSignal {
    pub category: Option<String>,
    pub confidence: f64,
}

impl VisualSignal {
    pub fn new(category: impl Into<String>, confidence: f64) -> Self {
        Self {
            category: Some(category.into()),
            confidence,
        }
    }

    /// No opinion
    pub fn none() -> Self {
        Self {
            category: None,
            confidence: 0.0,
        }
    }
}

/// Extracts text from an image
#[async_trait]
pub trait TextSignalExtractor: Send + Sync {
    /// Name of this backend
    fn name(&self) -> &'static str;

    /// Extracted text, lowercased with whitespace collapsed to single spaces
    async fn extract(&self, path: &Path) -> Result<String>;
}

/// Scores an image against a closed set of categories
#[async_trait]
pub trait VisualSignalClassifier: Send + Sync {
    /// Name of this backend
    fn name(&self) -> &'static str;

    /// Best category among `categories` and its probability
    async fn classify(&self, path: &Path, categories: &CategoryMap) -> Result<VisualSignal>;
}

/// The signal backends available for a run
pub struct Capabilities {
    text: Option<Box<dyn TextSignalExtractor>>,
    visual: Option<Box<dyn VisualSignalClassifier>>,
}

impl std::fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Capabilities")
            .field("text", &self.text.as_ref().map(|t| t.name()))
            .field("visual", &self.visual.as_ref().map(|v| v.name()))
            .finish()
    }
}

impl Capabilities {
    /// Bundle backends; at least one must be present
    pub fn new(
        text: Option<Box<dyn TextSignalExtractor>>,
        visual: Option<Box<dyn VisualSignalClassifier>>,
    ) -> Result<Self> {
        if text.is_none() && visual.is_none() {
            return Err(ShotsortError::ModelUnavailable(
                "neither a text nor a visual signal backend is available; \
                 install tesseract, start Ollama, or set text_signal.backend to \"filename\""
                    .to_string(),
            ));
        }
        Ok(Self { text, visual })
    }

    /// Probe and initialize every configured backend.
    ///
    /// A configured backend that cannot be reached is logged and left out;
    /// having none at all is fatal.
    pub async fn acquire(config: &AppConfig) -> Result<Self> {
        let text = match acquire_text(config).await {
            Ok(text) => text,
            Err(e) => {
                warn!("Text signal unavailable: {}", e);
                None
            }
        };
        let visual = match acquire_visual(config).await {
            Ok(visual) => visual,
            Err(e) => {
                warn!("Visual signal unavailable: {}", e);
                None
            }
        };

        let capabilities = Self::new(text, visual)?;
        info!(
            "Signal backends: text={}, visual={}",
            capabilities.text_backend().unwrap_or("none"),
            capabilities.visual_backend().unwrap_or("none")
        );
        Ok(capabilities)
    }

    pub fn text_backend(&self) -> Option<&'static str> {
        self.text.as_ref().map(|t| t.name())
    }

    pub fn visual_backend(&self) -> Option<&'static str> {
        self.visual.as_ref().map(|v| v.name())
    }

    /// Extracted text, or an empty string if there is no backend or it failed
    pub async fn extract_text(&self, path: &Path) -> String {
        let Some(text) = &self.text else {
            return String::new();
        };

        match text.extract(path).await {
            Ok(extracted) => extracted,
            Err(e) => {
                warn!("Text extraction failed for {:?}: {}", path, e);
                String::new()
            }
        }
    }

    /// Visual opinion, or [`VisualSignal::none`] if there is no backend, it
    /// failed, or it answered outside the configured categories.
    pub async fn classify_visual(&self, path: &Path, categories: &CategoryMap) -> VisualSignal {
        let Some(visual) = &self.visual else {
            return VisualSignal::none();
        };

        match visual.classify(path, categories).await {
            Ok(signal) => sanitize_visual(signal, categories),
            Err(e) => {
                warn!("Visual classification failed for {:?}: {}", path, e);
                VisualSignal::none()
            }
        }
    }
}

fn sanitize_visual(signal: VisualSignal, categories: &CategoryMap) -> VisualSignal {
    match signal.category {
        Some(ref category) if !categories.contains(category) => {
            debug!("Ignoring visual category outside the configured set: {}", category);
            VisualSignal::none()
        }
        Some(_) if signal.confidence.is_nan() => VisualSignal::none(),
        Some(category) => VisualSignal::new(category, signal.confidence.clamp(0.0, 1.0)),
        None => VisualSignal::none(),
    }
}

/// Build the configured text backend. `Ok(None)` means disabled.
pub async fn acquire_text(config: &AppConfig) -> Result<Option<Box<dyn TextSignalExtractor>>> {
    let settings = &config.text_signal;
    match settings.backend {
        TextBackend::Disabled => Ok(None),
        TextBackend::Filename => Ok(Some(Box::new(filename::FilenameExtractor::new()))),
        TextBackend::Tesseract => {
            let extractor =
                tesseract::TesseractExtractor::new(&settings.tesseract_path, &settings.language);
            let version = extractor.probe().await?;
            info!("Tesseract available: {}", version);
            Ok(Some(Box::new(extractor)))
        }
    }
}

/// Build the configured visual backend. `Ok(None)` means disabled.
pub async fn acquire_visual(
    config: &AppConfig,
) -> Result<Option<Box<dyn VisualSignalClassifier>>> {
    let settings = &config.visual_signal;
    match settings.backend {
        VisualBackend::Disabled => Ok(None),
        VisualBackend::Ollama => {
            let classifier = ollama_visual::OllamaVisualClassifier::new(
                &settings.url,
                &settings.model,
                &settings.prompt,
                Duration::from_secs(settings.timeout_secs),
            )?;
            classifier.probe().await?;
            info!("Vision model '{}' available", settings.model);
            Ok(Some(Box::new(classifier)))
        }
    }
}
