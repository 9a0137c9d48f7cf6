// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! The organization pipeline: classify, name, place, count

use chrono::{DateTime, Local};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::fs::{self, FileTimes};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::classify::{classify_image, ClassificationResult};
use crate::config::{AppConfig, TransferMode};
use crate::naming::{build_destination, synthesize_filename};
use crate::shutdown::ShutdownListener;
use crate::signals::Capabilities;
use crate::watcher::{find_images, wait_for_stable, SeenSet};
use crate::{Result, ShotsortError};

/// Counters for one batch run or one watch session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunStatistics {
    pub total: usize,
    pub processed: usize,
    pub failed: usize,
    /// Files per resolved category, sorted by name
    pub categories: BTreeMap<String, usize>,
}

impl RunStatistics {
    fn record_category(&mut self, category: &str) {
        *self.categories.entry(category.to_string()).or_default() += 1;
    }

    /// Sum of the per-category counts; equals `total` since every file is
    /// counted under its category before it is transferred
    pub fn categorized(&self) -> usize {
        self.categories.values().sum()
    }
}

impl fmt::Display for RunStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:=<50}", "")?;
        writeln!(f, "ORGANIZATION SUMMARY")?;
        writeln!(f, "{:=<50}", "")?;
        writeln!(f, "Total images found: {}", self.total)?;
        writeln!(f, "Successfully processed: {}", self.processed)?;
        writeln!(f, "Failed: {}", self.failed)?;
        writeln!(f)?;
        writeln!(f, "Categories:")?;
        for (category, count) in &self.categories {
            writeln!(f, "  {}: {}", category, count)?;
        }
        write!(f, "{:=<50}", "")
    }
}

/// What happened to one file
#[derive(Debug)]
pub enum FileOutcome {
    Organized {
        source: PathBuf,
        destination: PathBuf,
        classification: ClassificationResult,
    },
    Failed {
        source: PathBuf,
        category: String,
        error: ShotsortError,
    },
}

impl FileOutcome {
    pub fn source(&self) -> &Path {
        match self {
            Self::Organized { source, .. } | Self::Failed { source, .. } => source,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Organized { .. })
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Organized {
                source,
                destination,
                classification,
            } => serde_json::json!({
                "status": "organized",
                "source": source.to_string_lossy(),
                "destination": destination.to_string_lossy(),
                "category": classification.category,
                "text_match": classification.text_match,
                "visual": classification.visual,
            }),
            Self::Failed {
                source,
                category,
                error,
            } => serde_json::json!({
                "status": "failed",
                "source": source.to_string_lossy(),
                "category": category,
                "error": error.to_string(),
            }),
        }
    }
}

/// Runs files through classification and into the destination tree.
///
/// Processing is sequential; statistics cover everything this organizer has
/// seen since it was created.
pub struct Organizer {
    config: AppConfig,
    capabilities: Capabilities,
    stats: RunStatistics,
}

impl Organizer {
    pub fn new(config: AppConfig, capabilities: Capabilities) -> Self {
        Self {
            config,
            capabilities,
            stats: RunStatistics::default(),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn stats(&self) -> &RunStatistics {
        &self.stats
    }

    pub fn into_stats(self) -> RunStatistics {
        self.stats
    }

    /// Classify one image and move or copy it into place. Failures are
    /// counted and returned, never propagated.
    pub async fn process_one(&mut self, path: &Path) -> FileOutcome {
        self.stats.total += 1;

        let classification = classify_image(
            path,
            &self.capabilities,
            &self.config.categories,
            self.config.min_confidence,
        )
        .await;

        self.stats.record_category(&classification.category);

        match self.place(path, &classification) {
            Ok(destination) => {
                self.stats.processed += 1;
                let verb = match self.config.move_or_copy {
                    TransferMode::Move => "Moved",
                    TransferMode::Copy => "Copied",
                };
                info!("{} to: {:?}", verb, destination);
                FileOutcome::Organized {
                    source: path.to_path_buf(),
                    destination,
                    classification,
                }
            }
            Err(e) => {
                self.stats.failed += 1;
                error!("Failed to organize {:?}: {}", path, e);
                FileOutcome::Failed {
                    source: path.to_path_buf(),
                    category: classification.category,
                    error: e,
                }
            }
        }
    }

    fn place(&self, path: &Path, classification: &ClassificationResult) -> Result<PathBuf> {
        let modified: DateTime<Local> = fs::metadata(path)
            .and_then(|m| m.modified())
            .map_err(|e| ShotsortError::transfer(path, e))?
            .into();

        let original = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                ShotsortError::transfer(
                    path,
                    io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"),
                )
            })?;

        let candidate = synthesize_filename(
            &original,
            &classification.category,
            &classification.text,
            &modified,
            self.config.rename_files,
        );

        let destination = build_destination(
            &self.config.destination_folder,
            &classification.category,
            &candidate,
            &modified,
            self.config.organize_by_date,
        )
        .map_err(|e| ShotsortError::transfer(path, e))?;

        transfer_file(path, &destination, self.config.move_or_copy)
            .map_err(|e| ShotsortError::transfer(path, e))?;

        Ok(destination)
    }

    /// One pass over every image in `source`, stopping early (between files)
    /// if `shutdown` fires.
    pub async fn organize_once(
        &mut self,
        source: &Path,
        shutdown: &ShutdownListener,
    ) -> Result<Vec<FileOutcome>> {
        info!("Source: {:?}", source);
        info!("Destination: {:?}", self.config.destination_folder);

        let images = find_images(source, &self.config.image_extensions)?;
        if images.is_empty() {
            warn!("No images found in {:?}", source);
            return Ok(Vec::new());
        }
        info!("Found {} images", images.len());

        let count = images.len();
        let mut outcomes = Vec::with_capacity(count);
        for (i, image) in images.into_iter().enumerate() {
            if shutdown.is_requested() {
                warn!("Stopped before {} remaining file(s)", count - i);
                break;
            }
            info!("[{}/{}]", i + 1, count);
            outcomes.push(self.process_one(&image).await);
        }

        Ok(outcomes)
    }

    /// Poll `source` for new images until `shutdown` fires. Images already
    /// present when watching starts are left alone.
    pub async fn watch(&mut self, source: &Path, mut shutdown: ShutdownListener) -> Result<()> {
        let interval = Duration::from_secs(self.config.watch.poll_interval_secs);
        let stable_wait = Duration::from_secs(self.config.watch.stable_wait_secs);

        let mut seen = SeenSet::new(find_images(source, &self.config.image_extensions)?);
        info!("Watching: {:?} ({} existing images ignored)", source, seen.len());
        info!("Destination: {:?}", self.config.destination_folder);

        loop {
            tokio::select! {
                _ = shutdown.requested() => break,
                _ = tokio::time::sleep(interval) => {}
            }

            let current = match find_images(source, &self.config.image_extensions) {
                Ok(current) => current,
                Err(e) => {
                    warn!("Scan of {:?} failed: {}", source, e);
                    continue;
                }
            };

            let fresh = seen.update(current);
            if fresh.is_empty() {
                continue;
            }
            info!("Found {} new image(s)", fresh.len());

            for path in fresh {
                if shutdown.is_requested() {
                    break;
                }
                if !wait_for_stable(&path, stable_wait).await {
                    debug!("File disappeared before processing: {:?}", path);
                    continue;
                }
                self.process_one(&path).await;
            }
        }

        info!("Stopped watching");
        Ok(())
    }
}

/// Move or copy `source` to `destination`; exactly one of the two happens.
///
/// A move that cannot be done by renaming (for example across filesystems)
/// becomes copy-then-delete. A failed transfer never leaves a partial file at
/// `destination`.
pub fn transfer_file(source: &Path, destination: &Path, mode: TransferMode) -> io::Result<()> {
    match mode {
        TransferMode::Copy => copy_with_metadata(source, destination),
        TransferMode::Move => match fs::rename(source, destination) {
            Ok(()) => Ok(()),
            Err(e) if !source.exists() => Err(e),
            Err(e) => {
                debug!("rename failed ({}), falling back to copy and delete", e);
                move_by_copy(source, destination)
            }
        },
    }
}

fn move_by_copy(source: &Path, destination: &Path) -> io::Result<()> {
    copy_with_metadata(source, destination)?;
    if let Err(e) = fs::remove_file(source) {
        let _ = fs::remove_file(destination);
        return Err(e);
    }
    Ok(())
}

/// Copy contents and permissions, then carry over access and modification times
fn copy_with_metadata(source: &Path, destination: &Path) -> io::Result<()> {
    let metadata = fs::metadata(source)?;

    discard_on_error(destination, || {
        fs::copy(source, destination)?;

        let mut times = FileTimes::new().set_modified(metadata.modified()?);
        if let Ok(accessed) = metadata.accessed() {
            times = times.set_accessed(accessed);
        }

        let file = fs::OpenOptions::new()
            .write(true)
            .open(destination)
            .or_else(|_| fs::File::open(destination))?;
        file.set_times(times)
    })
}

/// Run `write`, which creates `destination`. If it fails, whatever it left
/// behind is removed (a file that was already there is not touched).
fn discard_on_error(destination: &Path, write: impl FnOnce() -> io::Result<()>) -> io::Result<()> {
    let preexisting = fs::symlink_metadata(destination).is_ok();
    let result = write();

    if result.is_err() && !preexisting {
        match fs::remove_file(destination) {
            Ok(()) => debug!("Removed partial file {:?}", destination),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!("Could not remove partial file {:?}: {}", destination, e),
        }
    }
    result
}
