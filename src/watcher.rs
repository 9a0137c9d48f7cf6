// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Source folder scanning for batch and polling watch modes

use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

use crate::Result;

/// Image files directly inside `folder` whose name ends with one of
/// `extensions` or its upper-case form. Each file is listed once; hidden and
/// partially downloaded files are skipped. Names need not be valid UTF-8.
/// Order is not significant.
pub fn find_images(folder: &Path, extensions: &[String]) -> Result<Vec<PathBuf>> {
    let suffixes: Vec<(String, String)> = extensions
        .iter()
        .map(|e| (e.clone(), e.to_uppercase()))
        .collect();

    let mut images = BTreeSet::new();
    for entry in std::fs::read_dir(folder)? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry in {:?}: {}", folder, e);
                continue;
            }
        };

        let path = entry.path();
        if !path.is_file() || !should_process(&path) {
            continue;
        }

        let Some(name) = path.file_name().map(|n| n.to_string_lossy()) else {
            continue;
        };
        if suffixes
            .iter()
            .any(|(lower, upper)| name.ends_with(lower.as_str()) || name.ends_with(upper.as_str()))
        {
            images.insert(path);
        }
    }

    Ok(images.into_iter().collect())
}

/// Check if a file should be processed
pub fn should_process(path: &Path) -> bool {
    let filename = match path.file_name() {
        Some(n) => n.to_string_lossy(),
        None => return false,
    };

    // Skip hidden files
    if filename.starts_with('.') {
        return false;
    }

    // Skip temporary files
    let temp_extensions = [".tmp", ".part", ".crdownload", ".partial", ".download"];
    for ext in temp_extensions {
        if filename.ends_with(ext) {
            return false;
        }
    }

    true
}

/// Paths already handled during a watch session.
///
/// Each scan's listing replaces the previous one, so a path that disappears
/// (moved away) and later reappears is treated as new again.
#[derive(Debug, Default)]
pub struct SeenSet {
    paths: HashSet<PathBuf>,
}

impl SeenSet {
    pub fn new(initial: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            paths: initial.into_iter().collect(),
        }
    }

    /// Record the current listing and return the paths not seen before
    pub fn update(&mut self, current: Vec<PathBuf>) -> Vec<PathBuf> {
        let fresh: Vec<PathBuf> = current
            .iter()
            .filter(|p| !self.paths.contains(*p))
            .cloned()
            .collect();
        self.paths = current.into_iter().collect();
        fresh
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// Wait for a file's size to stop changing (it may still be being written).
/// Returns false if the file disappeared.
pub async fn wait_for_stable(path: &Path, max_wait: Duration) -> bool {
    let check_interval = Duration::from_millis(500);
    let start = std::time::Instant::now();

    let mut last_size = match std::fs::metadata(path) {
        Ok(m) => m.len(),
        Err(_) => return false,
    };

    loop {
        tokio::time::sleep(check_interval).await;

        let current_size = match std::fs::metadata(path) {
            Ok(m) => m.len(),
            Err(_) => return false,
        };

        if current_size == last_size {
            return true;
        }

        if start.elapsed() > max_wait {
            warn!("File stability check timed out for {:?}", path);
            return true;
        }

        last_size = current_size;
        debug!("File {:?} still being written, size: {}", path, current_size);
    }
}
