// Copyright © 2024 BlogFlow. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Filesystem helpers shared by the asset pipeline and the build
//! orchestrator: byte-for-byte copies, non-clobbering merges and the final
//! publish step.

use crate::core::error::{BlogFlowError, Result};
use log::{debug, info};
use std::fs;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

/// Reads a UTF-8 file.
///
/// # Errors
///
/// Returns an `IOError` naming `path` if the file cannot be read.
pub fn read_content<P: AsRef<Path>>(path: P) -> Result<String> {
    let path = path.as_ref();
    fs::read_to_string(path)
        .map_err(|e| BlogFlowError::io_error(path.to_path_buf(), e))
}

/// Lexically normalises `.` and `..` components without touching the
/// filesystem.
pub fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push(component);
                }
            }
            other => normalized.push(other),
        }
    }
    normalized
}

/// Copies one file byte for byte, creating parent directories.
pub fn copy_file(source: &Path, destination: &Path) -> Result<u64> {
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| BlogFlowError::io_error(parent.to_path_buf(), e))?;
    }
    fs::copy(source, destination)
        .map_err(|e| BlogFlowError::io_error(source.to_path_buf(), e))
}

/// Lists every file below `root` with its path relative to `root`, sorted.
pub fn list_files(root: &Path) -> Result<Vec<(PathBuf, PathBuf)>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(root).to_path_buf();
            match e.into_io_error() {
                Some(io) => BlogFlowError::io_error(path, io),
                None => BlogFlowError::internal_error(format!(
                    "Filesystem loop at {}",
                    path.display()
                )),
            }
        })?;
        if entry.file_type().is_file() {
            let relative = entry
                .path()
                .strip_prefix(root)
                .map_err(|e| BlogFlowError::internal_error(e.to_string()))?
                .to_path_buf();
            files.push((entry.path().to_path_buf(), relative));
        }
    }
    Ok(files)
}

/// Recursively copies a directory, overwriting existing files.
///
/// Returns the number of files copied.
pub fn copy_dir_all(source: &Path, destination: &Path) -> Result<usize> {
    let files = list_files(source)?;
    for (path, relative) in &files {
        _ = copy_file(path, &destination.join(relative))?;
    }
    Ok(files.len())
}

/// Copies every file of `source` into `destination`, refusing to replace
/// a file that is already there.
///
/// Returns the number of files merged.
pub fn merge_dir(source: &Path, destination: &Path) -> Result<usize> {
    let files = list_files(source)?;
    for (path, relative) in &files {
        let target = destination.join(relative);
        if target.exists() {
            return Err(BlogFlowError::output_generation_error(
                format!(
                    "{} would overwrite a generated document",
                    path.display()
                ),
                target,
                None,
            ));
        }
        _ = copy_file(path, &target)?;
    }
    debug!(
        "Merged {} file(s) from {} into {}",
        files.len(),
        source.display(),
        destination.display()
    );
    Ok(files.len())
}

/// Replaces `output` with the finished `staging` directory.
///
/// The staging directory is renamed into place when possible and copied
/// otherwise, for example across filesystems.
pub fn publish(staging: &Path, output: &Path) -> Result<()> {
    if output.exists() {
        fs::remove_dir_all(output)
            .map_err(|e| BlogFlowError::io_error(output.to_path_buf(), e))?;
    }
    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| BlogFlowError::io_error(parent.to_path_buf(), e))?;
    }

    if fs::rename(staging, output).is_err() {
        debug!("Rename failed, copying {} instead", staging.display());
        _ = copy_dir_all(staging, output)?;
    }
    info!("Published {}", output.display());
    Ok(())
}
