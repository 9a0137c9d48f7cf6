// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Configuration management for shotsort
//!
//! The configuration is a single JSON object. Every key is optional: missing
//! keys take their default, unknown keys are ignored, and a user-supplied key
//! replaces the default for that key wholesale.

mod categories;

pub use categories::CategoryMap;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::{Result, ShotsortError};

/// Main application configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct AppConfig {
    /// Folder scanned for screenshots
    pub source_folder: PathBuf,

    /// Root of the organized tree
    pub destination_folder: PathBuf,

    /// Categories and their keywords, in matching order
    pub categories: CategoryMap,

    /// Add a `YYYY-MM` folder below each category
    pub organize_by_date: bool,

    /// Rename files from their extracted text
    pub rename_files: bool,

    /// Move or copy files into the tree
    pub move_or_copy: TransferMode,

    /// File suffixes treated as images (also matched in upper case)
    pub image_extensions: Vec<String>,

    /// Visual confidence required when the visual signal stands alone
    pub min_confidence: f64,

    /// Text signal backend
    pub text_signal: TextSignalConfig,

    /// Visual signal backend
    pub visual_signal: VisualSignalConfig,

    /// Watch mode settings
    pub watch: WatchConfig,
}

/// How files reach the destination tree
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransferMode {
    #[default]
    Move,
    Copy,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TextBackend {
    /// Tesseract OCR command-line tool
    #[default]
    Tesseract,
    /// Use the file name itself as the text signal
    Filename,
    Disabled,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum VisualBackend {
    /// Vision model served by a local Ollama instance
    #[default]
    Ollama,
    Disabled,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TextSignalConfig {
    #[serde(default)]
    pub backend: TextBackend,
    #[serde(default = "default_tesseract_path")]
    pub tesseract_path: String,
    #[serde(default = "default_ocr_language")]
    pub language: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct VisualSignalConfig {
    #[serde(default)]
    pub backend: VisualBackend,
    #[serde(default = "default_ollama_url")]
    pub url: String,
    #[serde(default = "default_vision_model")]
    pub model: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Prompt sent with each image; `{categories}` is replaced with the category list
    #[serde(default = "default_visual_prompt")]
    pub prompt: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WatchConfig {
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_stable_wait")]
    pub stable_wait_secs: u64,
}

// Default value functions
fn default_tesseract_path() -> String { "tesseract".to_string() }
fn default_ocr_language() -> String { "eng".to_string() }
fn default_ollama_url() -> String { "http://localhost:11434".to_string() }
fn default_vision_model() -> String { "llava".to_string() }
fn default_timeout() -> u64 { 120 }
fn default_poll_interval() -> u64 { 5 }
fn default_stable_wait() -> u64 { 10 }

fn default_visual_prompt() -> String {
    "Classify this screenshot into exactly one of these categories: {categories}. \
     Reply with ONLY a JSON object mapping every category name to a score between \
     0 and 1, for example {\"Code\": 0.8, \"Memes\": 0.1}.".to_string()
}

fn default_categories() -> CategoryMap {
    [
        ("Code", vec!["code", "terminal", "programming", "script", "console", "editor"]),
        ("Documents", vec!["document", "text", "pdf", "article", "paper"]),
        ("Memes", vec!["meme", "funny", "comic", "joke"]),
        ("Chats", vec!["chat", "message", "conversation", "whatsapp", "telegram"]),
        ("Design", vec!["design", "ui", "mockup", "figma", "sketch"]),
        ("Diagrams", vec!["diagram", "chart", "graph", "flowchart", "architecture"]),
        ("Receipts", vec!["receipt", "bill", "invoice", "payment"]),
        ("Errors", vec!["error", "exception", "traceback", "warning", "failed"]),
    ]
    .into_iter()
    .collect()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            source_folder: PathBuf::from("."),
            destination_folder: PathBuf::from("./Organized_Screenshots"),
            categories: default_categories(),
            organize_by_date: true,
            rename_files: true,
            move_or_copy: TransferMode::Move,
            image_extensions: [".png", ".jpg", ".jpeg", ".gif", ".bmp"]
                .into_iter()
                .map(String::from)
                .collect(),
            min_confidence: 0.3,
            text_signal: TextSignalConfig::default(),
            visual_signal: VisualSignalConfig::default(),
            watch: WatchConfig::default(),
        }
    }
}

impl Default for TextSignalConfig {
    fn default() -> Self {
        Self {
            backend: TextBackend::default(),
            tesseract_path: default_tesseract_path(),
            language: default_ocr_language(),
        }
    }
}

impl Default for VisualSignalConfig {
    fn default() -> Self {
        Self {
            backend: VisualBackend::default(),
            url: default_ollama_url(),
            model: default_vision_model(),
            timeout_secs: default_timeout(),
            prompt: default_visual_prompt(),
        }
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            stable_wait_secs: default_stable_wait(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a JSON file, falling back to defaults if it is absent
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Self::from_json(&content)
        } else {
            tracing::info!("Config file not found at {:?}, using defaults", path);
            Ok(Self::default())
        }
    }

    /// Parse, normalize and validate a JSON configuration
    pub fn from_json(content: &str) -> Result<Self> {
        let mut config: Self = serde_json::from_str(content)
            .map_err(|e| ShotsortError::Config(format!("Failed to parse config: {}", e)))?;
        config.normalize();
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Lowercase keywords (text is matched lowercased) and give every
    /// extension a leading dot.
    pub fn normalize(&mut self) {
        for keyword in self.categories.keywords_mut() {
            *keyword = keyword.to_lowercase();
        }
        for ext in &mut self.image_extensions {
            if !ext.starts_with('.') {
                ext.insert(0, '.');
            }
        }
    }

    /// Reject configurations that would leave the run inconsistent
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(ShotsortError::Config(format!(
                "min_confidence must be between 0 and 1, got {}",
                self.min_confidence
            )));
        }

        if self.categories.is_empty() {
            return Err(ShotsortError::Config("categories must not be empty".to_string()));
        }

        for (name, keywords) in self.categories.iter() {
            if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
                return Err(ShotsortError::Config(format!(
                    "category {:?} is not usable as a folder name",
                    name
                )));
            }
            if keywords.iter().any(|k| k.is_empty()) {
                return Err(ShotsortError::Config(format!(
                    "category {:?} has an empty keyword",
                    name
                )));
            }
        }

        if self.image_extensions.is_empty() || self.image_extensions.iter().any(|e| e.len() < 2) {
            return Err(ShotsortError::Config(
                "image_extensions must list at least one non-empty suffix".to_string(),
            ));
        }

        if self.watch.poll_interval_secs == 0 {
            return Err(ShotsortError::Config(
                "watch.poll_interval_secs must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}
