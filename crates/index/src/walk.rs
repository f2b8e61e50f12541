use std::path::{Path, PathBuf};

use tracing::warn;

use crate::language::{is_excluded_file, language_for_extension, LanguageEntry, EXCLUDED_DIRS};

/// A file worth chunking, with its resolved language entry.
pub struct DiscoveredFile {
    pub path: PathBuf,
    pub relative_path: String,
    pub language: &'static LanguageEntry,
}

/// Recursively walks `root`, skipping the fixed excluded directories and
/// files (§4.3), yielding only files whose extension is in the known
/// table.
pub fn walk_repository(root: &Path) -> Vec<DiscoveredFile> {
    let mut out = Vec::new();

    for entry in walkdir::WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| {
            if e.file_type().is_dir() {
                let name = e.file_name().to_string_lossy();
                return !EXCLUDED_DIRS.iter().any(|d| *d == name);
            }
            true
        })
    {
        let entry = match entry {
            Ok(e) => e,
            Err(err) => {
                warn!(error = %err, "skipping unreadable directory entry");
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let file_name = entry.file_name().to_string_lossy().to_string();
        if is_excluded_file(&file_name) {
            continue;
        }

        let Some(ext) = path.extension().map(|e| e.to_string_lossy().to_string()) else {
            continue;
        };
        let Some(language) = language_for_extension(&ext) else {
            continue;
        };

        let relative_path = path
            .strip_prefix(root)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/");

        out.push(DiscoveredFile {
            path: path.to_path_buf(),
            relative_path,
            language,
        });
    }

    out
}
