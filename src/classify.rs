// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Category resolution from text and visual signals
//!
//! Trust order: an exact keyword hit in the extracted text beats a visual
//! guess, unless the vision model is at least [`VISUAL_OVERRIDE_THRESHOLD`]
//! sure of a different category. A visual guess on its own must clear the
//! configured `min_confidence`. Anything else lands in [`UNCATEGORIZED`].

use serde::Serialize;
use std::path::Path;
use tracing::{debug, info};

use crate::config::CategoryMap;
use crate::signals::{Capabilities, VisualSignal};

/// Category for images neither signal could place
pub const UNCATEGORIZED: &str = "Uncategorized";

/// Visual confidence needed to overrule a disagreeing keyword match.
///
/// Fixed, and separate from `min_confidence` (default 0.3), which gates a
/// visual signal that has no keyword match to compete with.
pub const VISUAL_OVERRIDE_THRESHOLD: f64 = 0.5;

/// Outcome of classifying one image
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationResult {
    /// Resolved category, never empty
    pub category: String,
    /// Extracted text, possibly empty
    pub text: String,
    /// Category suggested by keywords
    pub text_match: Option<String>,
    /// Visual classifier opinion
    pub visual: VisualSignal,
}

/// First category, in map order, with a keyword contained in `text`
pub fn match_keywords<'a>(text: &str, categories: &'a CategoryMap) -> Option<&'a str> {
    if text.is_empty() {
        return None;
    }
    categories
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| text.contains(k.as_str())))
        .map(|(name, _)| name)
}

/// Combine the two signals into one category
pub fn resolve_category(
    text_match: Option<&str>,
    visual_match: Option<&str>,
    visual_confidence: f64,
    min_confidence: f64,
) -> String {
    let resolved = match (text_match, visual_match) {
        (Some(text), Some(visual)) if text == visual => text,
        (Some(text), Some(_)) if visual_confidence < VISUAL_OVERRIDE_THRESHOLD => text,
        (Some(_), Some(visual)) => visual,
        (Some(text), None) => text,
        (None, Some(visual)) if visual_confidence > min_confidence => visual,
        _ => UNCATEGORIZED,
    };
    resolved.to_string()
}

/// Run both signal sources on an image and resolve its category.
///
/// Never fails: signal errors are absorbed by the capability boundary.
pub async fn classify_image(
    path: &Path,
    capabilities: &Capabilities,
    categories: &CategoryMap,
    min_confidence: f64,
) -> ClassificationResult {
    info!("Analyzing: {:?}", path);

    let text = capabilities.extract_text(path).await;
    let text_match = match_keywords(&text, categories);
    if !text.is_empty() {
        debug!("Extracted text: {}", preview(&text, 100));
    }
    if let Some(category) = text_match {
        debug!("Keywords suggest: {}", category);
    }

    let visual = capabilities.classify_visual(path, categories).await;
    if let Some(ref category) = visual.category {
        debug!("Vision suggests: {} (confidence: {:.2})", category, visual.confidence);
    }

    let category = resolve_category(
        text_match,
        visual.category.as_deref(),
        visual.confidence,
        min_confidence,
    );
    info!("Category: {}", category);

    ClassificationResult {
        category,
        text_match: text_match.map(String::from),
        text,
        visual,
    }
}

fn preview(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
