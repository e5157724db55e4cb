//! Directory listing for upload: every regular file under the model directory, keyed by
//! its `/`-separated path relative to that directory.

use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

/// A file scheduled for upload.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalFile {
    /// Remote file path inside the artifact, always `/`-separated.
    pub relative_path: String,
    /// Where the bytes live on disk.
    pub path: PathBuf,
    pub size: u64,
}

/// Recursively lists all files under `root`, sorted by relative path.
///
/// Hidden files and `manifest.yaml` are included. Symlinked directories are not followed.
pub fn collect_files<P: AsRef<Path>>(root: P) -> io::Result<Vec<LocalFile>> {
    let root = root.as_ref();
    info!(path = %root.display(), "Listing files for upload");

    if !root.is_dir() {
        error!(path = %root.display(), "Model directory does not exist or is not a directory");
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!(
                "model directory {} does not exist or is not a directory",
                root.display()
            ),
        ));
    }

    fn visit_dir(dir: &Path, root: &Path, results: &mut Vec<LocalFile>) -> io::Result<()> {
        for entry_res in std::fs::read_dir(dir)? {
            let entry = entry_res?;
            let path = entry.path();
            let file_type = entry.file_type()?;
            if file_type.is_dir() {
                visit_dir(&path, root, results)?;
            } else if path.is_file() {
                let rel_path = path
                    .strip_prefix(root)
                    .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
                let relative_path = rel_path
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect::<Vec<_>>()
                    .join("/");
                // Follows symlinks, unlike `DirEntry::metadata`.
                let size = std::fs::metadata(&path)?.len();
                debug!(file = %relative_path, size, "Found file");
                results.push(LocalFile {
                    relative_path,
                    path,
                    size,
                });
            }
        }
        Ok(())
    }

    let mut files = Vec::new();
    if let Err(e) = visit_dir(root, root, &mut files) {
        error!(error = ?e, path = %root.display(), "Error while listing model directory");
        return Err(e);
    }
    files.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));

    info!(
        count = files.len(),
        total_bytes = files.iter().map(|f| f.size).sum::<u64>(),
        "Completed listing model directory"
    );
    Ok(files)
}
