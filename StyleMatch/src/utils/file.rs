//! File system helpers for caller-supplied source and destination paths
use crate::utils::error::{PipelineError, Result};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Write encoded bytes to `path`, creating parent directories first
///
/// An existing file is truncated and overwritten. Concurrent writers to the
/// same path race; the last one to finish wins.
///
/// # Errors
/// * `PipelineError::Write` - a directory or the file could not be created or written
pub fn write_output(path: &Path, bytes: &[u8]) -> Result<()> {
    let write_err = |source| PipelineError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_err)?;
    }

    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)
        .map_err(write_err)?;
    file.write_all(bytes).map_err(write_err)?;
    file.flush().map_err(write_err)?;

    tracing::debug!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

/// Fail with `NotFound` unless `path` names an existing regular file
pub fn ensure_file_exists(path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(PipelineError::NotFound(path.to_path_buf()))
    }
}

/// Natural sort comparison using natord ("top2" before "top10")
pub fn natural_sort_cmp(a: &str, b: &str) -> std::cmp::Ordering {
    natord::compare(a, b)
}

/// Expand directories into the supported image files they contain
///
/// Files are kept as given, in order. A directory contributes its image
/// entries (non-recursive) in natural order of their file names.
///
/// # Errors
/// * `PipelineError::Io` - a directory could not be listed
pub fn expand_image_inputs(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    for input in inputs {
        if !input.is_dir() {
            out.push(input.clone());
            continue;
        }

        let mut images: Vec<PathBuf> = fs::read_dir(input)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.is_file()
                    && path
                        .file_name()
                        .and_then(|n| n.to_str())
                        .is_some_and(crate::image_processor::is_image_file)
            })
            .collect();
        images.sort_by(|a, b| {
            natural_sort_cmp(&a.to_string_lossy(), &b.to_string_lossy())
        });

        tracing::debug!("Expanded {} to {} images", input.display(), images.len());
        out.extend(images);
    }
    Ok(out)
}
