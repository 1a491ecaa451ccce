use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::GIF_EXTENSION;

/// File extensions treated as video sources (compared case-insensitively).
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "mkv", "webm", "flv", "wmv", "m4v"];

pub fn is_video(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| VIDEO_EXTENSIONS.iter().any(|v| v.eq_ignore_ascii_case(ext)))
}

/// Video files in `dir`, sorted by path.
///
/// Only direct children are considered unless `recursive` is set, in which
/// case the whole tree is walked. Symlinks to files count as videos;
/// symlinked directories are not descended. Entries that cannot be read are
/// skipped.
pub fn collect_videos(dir: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(Error::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("directory not found: {}", dir.display()),
        )));
    }

    let walker = if recursive {
        WalkDir::new(dir)
    } else {
        WalkDir::new(dir).max_depth(1)
    };

    let mut videos: Vec<PathBuf> = walker
        .min_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_file())
        .map(|e| e.into_path())
        .filter(|p| is_video(p))
        .collect();
    videos.sort();
    Ok(videos)
}

/// Parse a batch list: one path per line, blank lines and `#` comments skipped.
pub fn parse_batch_list(text: &str) -> Vec<PathBuf> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(PathBuf::from)
        .collect()
}

pub fn read_batch_file(path: &Path) -> Result<Vec<PathBuf>> {
    let text = fs::read_to_string(path)?;
    Ok(parse_batch_list(&text))
}

/// `<dir>/<source stem>.gif`
pub fn gif_path_in(dir: &Path, source: &Path) -> PathBuf {
    let mut name = source.file_stem().unwrap_or(source.as_os_str()).to_os_string();
    name.push(".");
    name.push(GIF_EXTENSION);
    dir.join(name)
}
