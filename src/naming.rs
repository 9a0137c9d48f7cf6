// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Destination filenames and folders

use chrono::{DateTime, Local};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Tokens of extracted text considered for a filename
const DESCRIPTOR_TOKENS: usize = 5;
/// Tokens this short are dropped
const MIN_TOKEN_CHARS: usize = 4;
const MAX_DESCRIPTOR_CHARS: usize = 30;

/// Candidate filename for an organized screenshot.
///
/// With renaming off the original name is kept. Otherwise the name is
/// `{descriptor}_{YYYY-MM-DD}{ext}`, where the descriptor comes from the
/// extracted text, or from the category when there is no text. Uniqueness is
/// handled by [`build_destination`], not here.
pub fn synthesize_filename(
    original: &str,
    category: &str,
    text: &str,
    modified: &DateTime<Local>,
    rename: bool,
) -> String {
    if !rename {
        return original.to_string();
    }

    let (_, ext) = split_extension(original);
    let date = modified.format("%Y-%m-%d");
    let descriptor = if text.is_empty() {
        category.to_lowercase()
    } else {
        describe_text(text)
    };

    format!("{}_{}{}", descriptor, date, ext)
}

fn describe_text(text: &str) -> String {
    let joined = text
        .split_whitespace()
        .take(DESCRIPTOR_TOKENS)
        .filter(|word| word.chars().count() >= MIN_TOKEN_CHARS)
        .collect::<Vec<_>>()
        .join("_");

    joined
        .chars()
        .take(MAX_DESCRIPTOR_CHARS)
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

/// Folder a file belongs in: `root/category`, plus `YYYY-MM` when organizing by date
pub fn destination_dir(
    root: &Path,
    category: &str,
    modified: &DateTime<Local>,
    organize_by_date: bool,
) -> PathBuf {
    let dir = root.join(category);
    if organize_by_date {
        dir.join(modified.format("%Y-%m").to_string())
    } else {
        dir
    }
}

/// Create the destination folder and pick a path inside it that does not exist yet.
///
/// The existence check and the later write are not atomic; concurrent runs
/// against the same tree can race.
pub fn build_destination(
    root: &Path,
    category: &str,
    candidate: &str,
    modified: &DateTime<Local>,
    organize_by_date: bool,
) -> io::Result<PathBuf> {
    let dir = destination_dir(root, category, modified, organize_by_date);
    fs::create_dir_all(&dir)?;
    Ok(resolve_collision(&dir, candidate))
}

/// `dir/candidate`, or the first free `dir/{stem}_{n}{ext}` for n = 1, 2, ...
pub fn resolve_collision(dir: &Path, candidate: &str) -> PathBuf {
    let mut path = dir.join(candidate);
    if !occupied(&path) {
        return path;
    }

    let (stem, ext) = split_extension(candidate);
    let mut counter: u64 = 1;
    loop {
        path = dir.join(format!("{}_{}{}", stem, counter, ext));
        if !occupied(&path) {
            return path;
        }
        counter += 1;
    }
}

// Dangling symlinks count as taken
fn occupied(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

/// Split `name` into stem and extension (with its dot) at the last dot.
/// Leading dots belong to the stem, so `.hidden` has no extension.
pub fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) if name[..idx].chars().any(|c| c != '.') => name.split_at(idx),
        _ => (name, ""),
    }
}
