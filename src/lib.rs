// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! shotsort: AI-powered screenshot organizer
//!
//! Classifies screenshots from two independent signals, OCR text and a
//! vision model, reconciles them into one category and files each image into
//! `destination/Category/YYYY-MM/` under a descriptive, collision-free name.

pub mod classify;
pub mod config;
pub mod error;
pub mod naming;
pub mod ollama;
pub mod organizer;
pub mod shutdown;
pub mod signals;
pub mod watcher;

pub use config::AppConfig;
pub use error::{Result, ShotsortError};
