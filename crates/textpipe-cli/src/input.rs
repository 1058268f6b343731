//! Collects the primary text and attachable files from command-line input.

use std::path::{Path, PathBuf};

use textpipe_core::FileHandle;
use tracing::warn;

/// Only plain-text attachments are accepted.
pub fn is_text_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e == "txt")
}

/// Splits `paths` into plain-text handles and rejected paths, keeping order.
pub fn text_file_handles(paths: &[PathBuf]) -> (Vec<FileHandle>, Vec<PathBuf>) {
    let mut accepted = Vec::new();
    let mut rejected = Vec::new();
    for path in paths {
        if is_text_file(path) {
            accepted.push(FileHandle::from_path(path).with_media_type("text/plain"));
        } else {
            warn!(event = "cli.file_skipped", domain = "cli", path = %path.display());
            rejected.push(path.clone());
        }
    }
    (accepted, rejected)
}

/// Primary text from `--text`, `--text-file`, or nothing.
pub fn primary_text(
    text: Option<String>,
    text_file: Option<&Path>,
) -> Result<String, Box<dyn std::error::Error>> {
    if let Some(text) = text {
        return Ok(text);
    }
    match text_file {
        Some(path) => std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read {}: {e}", path.display()).into()),
        None => Ok(String::new()),
    }
}
