// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! End-to-end pipeline tests with stub signal backends

use async_trait::async_trait;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use shotsort::classify::UNCATEGORIZED;
use shotsort::config::{AppConfig, CategoryMap, TransferMode};
use shotsort::organizer::{FileOutcome, Organizer};
use shotsort::shutdown::Shutdown;
use shotsort::signals::{Capabilities, TextSignalExtractor, VisualSignal, VisualSignalClassifier};
use shotsort::{Result, ShotsortError};

/// Text keyed by file name; unknown files have no text
struct StubText(HashMap<String, String>);

#[async_trait]
impl TextSignalExtractor for StubText {
    fn name(&self) -> &'static str {
        "stub-text"
    }

    async fn extract(&self, path: &Path) -> Result<String> {
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        Ok(self.0.get(&name).cloned().unwrap_or_default())
    }
}

/// Visual signal keyed by file name; unknown files make the backend fail
struct StubVisual(HashMap<String, VisualSignal>);

#[async_trait]
impl VisualSignalClassifier for StubVisual {
    fn name(&self) -> &'static str {
        "stub-visual"
    }

    async fn classify(&self, path: &Path, _categories: &CategoryMap) -> Result<VisualSignal> {
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        self.0
            .get(&name)
            .cloned()
            .ok_or_else(|| ShotsortError::SignalExtraction {
                source_name: "stub-visual",
                message: format!("cannot decode {}", name),
            })
    }
}

fn text_backend(entries: &[(&str, &str)]) -> Option<Box<dyn TextSignalExtractor>> {
    Some(Box::new(StubText(
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
    )))
}

fn visual_backend(entries: &[(&str, &str, f64)]) -> Option<Box<dyn VisualSignalClassifier>> {
    Some(Box::new(StubVisual(
        entries
            .iter()
            .map(|(k, c, p)| (k.to_string(), VisualSignal::new(*c, *p)))
            .collect(),
    )))
}

struct Workspace {
    _root: tempfile::TempDir,
    source: PathBuf,
    dest: PathBuf,
}

impl Workspace {
    fn new() -> Self {
        let root = tempfile::tempdir().expect("Failed to create temp dir");
        let source = root.path().join("inbox");
        let dest = root.path().join("sorted");
        fs::create_dir_all(&source).unwrap();
        Self {
            _root: root,
            source,
            dest,
        }
    }

    fn add_image(&self, name: &str) -> PathBuf {
        let path = self.source.join(name);
        fs::write(&path, name.as_bytes()).unwrap();
        // 2025-01-15 around noon UTC
        let mtime = SystemTime::UNIX_EPOCH + Duration::from_secs(1_736_942_400);
        fs::File::options()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(mtime)
            .unwrap();
        path
    }

    fn config(&self) -> AppConfig {
        AppConfig {
            source_folder: self.source.clone(),
            destination_folder: self.dest.clone(),
            ..AppConfig::default()
        }
    }
}

fn month_dir() -> String {
    let mtime = SystemTime::UNIX_EPOCH + Duration::from_secs(1_736_942_400);
    chrono::DateTime::<chrono::Local>::from(mtime)
        .format("%Y-%m")
        .to_string()
}

fn date_str() -> String {
    let mtime = SystemTime::UNIX_EPOCH + Duration::from_secs(1_736_942_400);
    chrono::DateTime::<chrono::Local>::from(mtime)
        .format("%Y-%m-%d")
        .to_string()
}

#[tokio::test]
async fn test_text_signal_wins_by_map_order() {
    let ws = Workspace::new();
    let image = ws.add_image("shot.png");

    let mut config = ws.config();
    config.categories = [("Code", vec!["error"]), ("Memes", vec!["funny"])]
        .into_iter()
        .collect();

    let caps = Capabilities::new(
        text_backend(&[("shot.png", "funny error")]),
        visual_backend(&[("shot.png", "Memes", 0.2)]),
    )
    .unwrap();

    let mut organizer = Organizer::new(config, caps);
    let outcome = organizer.process_one(&image).await;

    match outcome {
        FileOutcome::Organized {
            destination,
            classification,
            ..
        } => {
            assert_eq!(classification.category, "Code");
            assert_eq!(classification.text_match.as_deref(), Some("Code"));
            assert_eq!(
                destination,
                ws.dest
                    .join("Code")
                    .join(month_dir())
                    .join(format!("funny_error_{}.png", date_str()))
            );
            assert!(destination.exists());
        }
        FileOutcome::Failed { error, .. } => panic!("unexpected failure: {}", error),
    }
    assert!(!image.exists(), "move mode removes the source");
}

#[tokio::test]
async fn test_confident_visual_overrides_disagreeing_text() {
    let ws = Workspace::new();
    let image = ws.add_image("chat.png");

    let caps = Capabilities::new(
        text_backend(&[("chat.png", "meme of a chat")]),
        visual_backend(&[("chat.png", "Chats", 0.5)]),
    )
    .unwrap();

    let mut organizer = Organizer::new(ws.config(), caps);
    let outcome = organizer.process_one(&image).await;
    assert!(outcome.is_success());
    assert_eq!(organizer.stats().categories.get("Chats"), Some(&1));
}

#[tokio::test]
async fn test_ten_files_two_transfer_failures() {
    let ws = Workspace::new();
    let mut texts = Vec::new();
    for i in 0..10 {
        let name = format!("img_{}.png", i);
        ws.add_image(&name);
        let text = if i < 2 { "receipt total" } else { "terminal session" };
        texts.push((name, text));
    }
    let texts: Vec<(&str, &str)> = texts.iter().map(|(n, t)| (n.as_str(), *t)).collect();

    // Receipts cannot be created as a folder, so those transfers fail
    fs::create_dir_all(&ws.dest).unwrap();
    fs::write(ws.dest.join("Receipts"), b"in the way").unwrap();

    let caps = Capabilities::new(text_backend(&texts), None).unwrap();
    let mut organizer = Organizer::new(ws.config(), caps);
    let shutdown = Shutdown::new();
    let listener = shutdown.listener();
    let outcomes = organizer.organize_once(&ws.source, &listener).await.unwrap();

    let stats = organizer.stats();
    assert_eq!(outcomes.len(), 10);
    assert_eq!(stats.total, 10);
    assert_eq!(stats.processed, 8);
    assert_eq!(stats.failed, 2);
    assert_eq!(stats.categorized(), 10);
    assert_eq!(stats.categories.get("Receipts"), Some(&2));
    assert_eq!(stats.categories.get("Code"), Some(&8));

    for outcome in outcomes.iter().filter(|o| !o.is_success()) {
        match outcome {
            FileOutcome::Failed { category, error, source } => {
                assert_eq!(category, "Receipts");
                assert!(matches!(error, ShotsortError::FileTransfer { .. }));
                assert!(source.exists(), "failed files stay in the source folder");
            }
            FileOutcome::Organized { .. } => unreachable!(),
        }
    }
}

#[tokio::test]
async fn test_signal_failures_fall_back_to_uncategorized() {
    let ws = Workspace::new();
    let image = ws.add_image("mystery.png");

    // no text for this file, and the visual stub errors on unknown names
    let caps = Capabilities::new(text_backend(&[]), visual_backend(&[])).unwrap();
    let mut organizer = Organizer::new(ws.config(), caps);
    let outcome = organizer.process_one(&image).await;

    match outcome {
        FileOutcome::Organized {
            destination,
            classification,
            ..
        } => {
            assert_eq!(classification.category, UNCATEGORIZED);
            assert_eq!(
                destination.file_name().unwrap().to_string_lossy(),
                format!("uncategorized_{}.png", date_str())
            );
        }
        FileOutcome::Failed { error, .. } => panic!("unexpected failure: {}", error),
    }
}

#[tokio::test]
async fn test_weak_visual_only_is_uncategorized() {
    let ws = Workspace::new();
    let weak = ws.add_image("weak.png");
    let strong = ws.add_image("strong.png");

    let caps = Capabilities::new(
        None,
        visual_backend(&[("weak.png", "Memes", 0.3), ("strong.png", "Memes", 0.31)]),
    )
    .unwrap();
    let mut organizer = Organizer::new(ws.config(), caps);
    organizer.process_one(&weak).await;
    organizer.process_one(&strong).await;

    let stats = organizer.stats();
    assert_eq!(stats.categories.get(UNCATEGORIZED), Some(&1));
    assert_eq!(stats.categories.get("Memes"), Some(&1));
}

#[tokio::test]
async fn test_copy_mode_rerun_accumulates_renamed_copies() {
    let ws = Workspace::new();
    let image = ws.add_image("IMG_001.png");

    let mut config = ws.config();
    config.move_or_copy = TransferMode::Copy;
    config.organize_by_date = false;

    let make_caps = || {
        Capabilities::new(text_backend(&[("IMG_001.png", "python traceback in editor")]), None)
            .unwrap()
    };

    let shutdown = Shutdown::new();
    let listener = shutdown.listener();
    for _ in 0..3 {
        let mut organizer = Organizer::new(config.clone(), make_caps());
        let outcomes = organizer.organize_once(&ws.source, &listener).await.unwrap();
        assert_eq!(outcomes.len(), 1);
        assert_eq!(organizer.stats().processed, 1);
        assert_eq!(organizer.stats().failed, 0);
    }

    assert!(image.exists(), "copy mode keeps the source");
    let dir = ws.dest.join("Code");
    let base = format!("python_traceback_editor_{}", date_str());
    for name in [
        format!("{}.png", base),
        format!("{}_1.png", base),
        format!("{}_2.png", base),
    ] {
        assert!(dir.join(&name).exists(), "missing {}", name);
    }
}

#[tokio::test]
async fn test_rename_disabled_keeps_original_name() {
    let ws = Workspace::new();
    let image = ws.add_image("Screenshot 2025-01-15.png");

    let mut config = ws.config();
    config.rename_files = false;
    config.organize_by_date = false;

    let caps = Capabilities::new(
        text_backend(&[("Screenshot 2025-01-15.png", "whatsapp conversation")]),
        None,
    )
    .unwrap();
    let mut organizer = Organizer::new(config, caps);
    organizer.process_one(&image).await;

    assert!(ws.dest.join("Chats").join("Screenshot 2025-01-15.png").exists());
}

#[tokio::test]
async fn test_copy_preserves_mtime_for_date_folders() {
    let ws = Workspace::new();
    let image = ws.add_image("diagram.png");
    let original_mtime = fs::metadata(&image).unwrap().modified().unwrap();

    let mut config = ws.config();
    config.move_or_copy = TransferMode::Copy;
    let caps = Capabilities::new(text_backend(&[("diagram.png", "architecture diagram")]), None)
        .unwrap();
    let mut organizer = Organizer::new(config, caps);

    match organizer.process_one(&image).await {
        FileOutcome::Organized { destination, .. } => {
            assert!(destination.starts_with(ws.dest.join("Diagrams").join(month_dir())));
            assert_eq!(fs::metadata(&destination).unwrap().modified().unwrap(), original_mtime);
        }
        FileOutcome::Failed { error, .. } => panic!("unexpected failure: {}", error),
    }
}

#[tokio::test]
async fn test_vanished_source_counts_as_failure() {
    let ws = Workspace::new();
    let image = ws.add_image("gone.png");
    fs::remove_file(&image).unwrap();

    let caps = Capabilities::new(text_backend(&[]), None).unwrap();
    let mut organizer = Organizer::new(ws.config(), caps);
    let outcome = organizer.process_one(&image).await;

    assert!(!outcome.is_success());
    assert_eq!(outcome.source(), image.as_path());
    let stats = organizer.stats();
    assert_eq!((stats.total, stats.processed, stats.failed), (1, 0, 1));
    assert_eq!(stats.categorized(), 1);
}

#[tokio::test]
async fn test_only_matching_extensions_are_processed() {
    let ws = Workspace::new();
    ws.add_image("a.png");
    ws.add_image("b.JPG");
    ws.add_image("notes.txt");

    let caps = Capabilities::new(text_backend(&[]), None).unwrap();
    let mut organizer = Organizer::new(ws.config(), caps);
    let shutdown = Shutdown::new();
    let listener = shutdown.listener();
    let outcomes = organizer.organize_once(&ws.source, &listener).await.unwrap();

    assert_eq!(outcomes.len(), 2);
    assert!(ws.source.join("notes.txt").exists());
}

#[tokio::test]
async fn test_shutdown_stops_batch_before_next_file() {
    let ws = Workspace::new();
    ws.add_image("a.png");
    ws.add_image("b.png");

    let caps = Capabilities::new(text_backend(&[]), None).unwrap();
    let mut organizer = Organizer::new(ws.config(), caps);
    let shutdown = Shutdown::new();
    let listener = shutdown.listener();
    shutdown.request();

    let outcomes = organizer.organize_once(&ws.source, &listener).await.unwrap();
    assert!(outcomes.is_empty());
    assert_eq!(organizer.stats().total, 0);
}

#[tokio::test]
async fn test_empty_source_is_not_an_error() {
    let ws = Workspace::new();
    let caps = Capabilities::new(text_backend(&[]), None).unwrap();
    let mut organizer = Organizer::new(ws.config(), caps);
    let shutdown = Shutdown::new();
    let listener = shutdown.listener();

    let outcomes = organizer.organize_once(&ws.source, &listener).await.unwrap();
    assert!(outcomes.is_empty());
    assert_eq!(organizer.into_stats().total, 0);
}

#[tokio::test]
async fn test_watch_processes_only_new_images() {
    let ws = Workspace::new();
    let existing = ws.add_image("existing.png");

    let mut config = ws.config();
    config.watch.poll_interval_secs = 1;
    config.watch.stable_wait_secs = 1;

    let caps = Capabilities::new(text_backend(&[("new.png", "funny meme")]), None).unwrap();
    let mut organizer = Organizer::new(config, caps);
    let shutdown = Shutdown::new();
    let listener = shutdown.listener();
    let source = ws.source.clone();

    let driver = async {
        tokio::time::sleep(Duration::from_millis(300)).await;
        ws.add_image("new.png");
        tokio::time::sleep(Duration::from_secs(3)).await;
        shutdown.request();
    };

    let (result, ()) = tokio::join!(organizer.watch(&source, listener), driver);
    result.unwrap();

    let stats = organizer.stats();
    assert_eq!(stats.total, 1);
    assert_eq!(stats.processed, 1);
    assert_eq!(stats.categories.get("Memes"), Some(&1));
    assert!(existing.exists(), "files present at startup are left alone");
    assert!(!ws.source.join("new.png").exists());
}

#[cfg(unix)]
#[tokio::test]
async fn test_non_utf8_name_is_organized() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let ws = Workspace::new();
    let name = OsStr::from_bytes(b"shot_\xff.png");
    let image = ws.source.join(name);
    fs::write(&image, b"x").unwrap();

    let caps = Capabilities::new(text_backend(&[("shot_\u{FFFD}.png", "terminal output")]), None)
        .unwrap();
    let mut organizer = Organizer::new(ws.config(), caps);
    let shutdown = Shutdown::new();
    let listener = shutdown.listener();
    let outcomes = organizer.organize_once(&ws.source, &listener).await.unwrap();

    assert_eq!(outcomes.len(), 1);
    assert!(outcomes[0].is_success());
    assert_eq!(organizer.stats().categories.get("Code"), Some(&1));
    assert!(!image.exists());
}
