// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Visual classification with a vision model served by Ollama

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use image::{DynamicImage, GenericImageView};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

use super::{VisualSignal, VisualSignalClassifier};
use crate::config::CategoryMap;
use crate::ollama::OllamaClient;
use crate::{Result, ShotsortError};

/// Longest side sent to the model
const MAX_DIMENSION: u32 = 1024;

/// Asks a vision model to score every category, then normalizes the scores
/// into a probability distribution over the configured set.
pub struct OllamaVisualClassifier {
    client: OllamaClient,
    model: String,
    prompt: String,
}

impl OllamaVisualClassifier {
    pub fn new(url: &str, model: &str, prompt: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: OllamaClient::new(url, timeout)?,
            model: model.to_string(),
            prompt: prompt.to_string(),
        })
    }

    /// Fail unless Ollama answers and has the model pulled
    pub async fn probe(&self) -> Result<()> {
        self.client.health_check().await?;
        if !self.client.model_available(&self.model).await? {
            return Err(ShotsortError::OllamaUnavailable(format!(
                "model '{}' is not installed (try: ollama pull {})",
                self.model, self.model
            )));
        }
        Ok(())
    }

    /// Resize large images and re-encode as JPEG for the API
    fn prepare_image(img: DynamicImage) -> Result<Vec<u8>> {
        let img = if img.width() > MAX_DIMENSION || img.height() > MAX_DIMENSION {
            img.resize(MAX_DIMENSION, MAX_DIMENSION, image::imageops::FilterType::Triangle)
        } else {
            img
        };

        // JPEG has no alpha channel
        let img = DynamicImage::ImageRgb8(img.to_rgb8());

        let mut buffer = Vec::new();
        let mut cursor = std::io::Cursor::new(&mut buffer);
        img.write_to(&mut cursor, image::ImageFormat::Jpeg)?;

        Ok(buffer)
    }

    fn render_prompt(&self, categories: &CategoryMap) -> String {
        let names = categories.names().collect::<Vec<_>>().join(", ");
        self.prompt.replace("{categories}", &names)
    }
}

#[async_trait]
impl VisualSignalClassifier for OllamaVisualClassifier {
    fn name(&self) -> &'static str {
        "ollama"
    }

    async fn classify(&self, path: &Path, categories: &CategoryMap) -> Result<VisualSignal> {
        let img = image::open(path)?;
        let (width, height) = img.dimensions();
        debug!("Classifying {:?} ({}x{}) with {}", path, width, height, self.model);

        let image_data = general_purpose::STANDARD.encode(Self::prepare_image(img)?);
        let prompt = self.render_prompt(categories);

        let response = self
            .client
            .generate_json_with_image(&self.model, &prompt, &image_data)
            .await?;

        let signal = scores_to_signal(&response, categories)?;
        info!(
            "Vision model suggests {} ({:.2})",
            signal.category.as_deref().unwrap_or("-"),
            signal.confidence
        );
        Ok(signal)
    }
}

/// Turn a `{"Category": score, ...}` reply into the arg-max category and its
/// normalized probability. Category names are matched case-insensitively,
/// unknown names and negative scores are ignored, and ties go to the category
/// declared first.
pub fn scores_to_signal(response: &str, categories: &CategoryMap) -> Result<VisualSignal> {
    let json = extract_json_object(response).ok_or_else(|| {
        ShotsortError::signal("ollama", format!("reply is not a JSON object: {:?}", response))
    })?;
    let raw: HashMap<String, serde_json::Value> = serde_json::from_str(json)
        .map_err(|e| ShotsortError::signal("ollama", format!("unparsable scores: {}", e)))?;

    let by_name: HashMap<String, f64> = raw
        .into_iter()
        .filter_map(|(name, value)| Some((name.to_lowercase(), value.as_f64()?)))
        .collect();

    let scores: Vec<(&str, f64)> = categories
        .names()
        .map(|name| {
            let score = by_name.get(&name.to_lowercase()).copied().unwrap_or(0.0);
            (name, if score.is_finite() { score.max(0.0) } else { 0.0 })
        })
        .collect();

    let total: f64 = scores.iter().map(|(_, s)| s).sum();
    if total <= 0.0 {
        return Err(ShotsortError::signal("ollama", "no category received a positive score"));
    }

    let mut best: Option<(&str, f64)> = None;
    for &(name, score) in &scores {
        if best.map_or(true, |(_, top)| score > top) {
            best = Some((name, score));
        }
    }

    Ok(match best {
        Some((name, score)) => VisualSignal::new(name, score / total),
        None => VisualSignal::none(),
    })
}

/// Models sometimes wrap JSON in prose or code fences
fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}
