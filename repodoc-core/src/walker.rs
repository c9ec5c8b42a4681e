use std::fs;
use std::path::{Path, PathBuf};

/// Directory names never descended into.
pub const SKIPPED_DIRS: &[&str] = &[
    ".git",
    ".svn",
    ".hg",
    "node_modules",
    ".gradle",
    ".idea",
    "build",
    "target",
];

/// Recursively lists files under `root` whose extension is one of `extensions`
/// (compared without the leading dot, case-sensitive). The result is sorted.
///
/// Unreadable directories are logged and skipped, so this never fails; a missing root
/// yields an empty list.
pub fn find_source_files(root: &Path, extensions: &[String]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    visit_dir(root, extensions, &mut files);
    files.sort();
    files
}

fn visit_dir(dir: &Path, extensions: &[String], out: &mut Vec<PathBuf>) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(error = ?e, path = %dir.display(), "Skipping unreadable directory");
            return;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        // symlinks are not followed, which keeps the walk finite
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        if file_type.is_dir() {
            let name = entry.file_name();
            if SKIPPED_DIRS.iter().any(|skip| name == *skip) {
                continue;
            }
            visit_dir(&path, extensions, out);
        } else if file_type.is_file() && has_extension(&path, extensions) {
            out.push(path);
        }
    }
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| extensions.iter().any(|wanted| wanted == ext))
        .unwrap_or(false)
}
