// Copyright 2025 coScene
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.


// Local directory walker for bulk uploads

use super::backend::join_path;
use crate::error::{Result, StorageError};
use futures::stream::{self, TryStreamExt};
use std::future::Future;
use std::path::{Component, Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Directory names never uploaded, wherever they appear in the tree
pub const PUT_DIRECTORY_SKIP: &[&str] = &[".replicate", ".git", "venv", ".mypy_cache"];

/// A local file and the storage path it is uploaded to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTransferEntry {
    pub source: PathBuf,
    pub dest: String,
}

fn is_skipped_dir(entry: &DirEntry) -> bool {
    entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .map(|name| PUT_DIRECTORY_SKIP.contains(&name))
            .unwrap_or(false)
}

/// Enumerate the files under `local_path` and where they go under `storage_path`
///
/// Skip-listed directories are pruned with everything below them. The
/// first traversal error aborts the walk.
pub fn put_directory_files(local_path: &Path, storage_path: &str) -> Result<Vec<FileTransferEntry>> {
    let mut result = Vec::new();

    let walker = WalkDir::new(local_path)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !is_skipped_dir(entry));

    for entry in walker {
        let entry = entry?;
        if entry.file_type().is_dir() {
            continue;
        }

        if entry.file_type().is_symlink() {
            let metadata = std::fs::metadata(entry.path()).map_err(StorageError::io(entry.path()))?;
            if metadata.is_dir() {
                continue;
            }
        }

        let relative = entry
            .path()
            .strip_prefix(local_path)
            .map_err(|err| StorageError::Io {
                path: entry.path().to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::InvalidInput, err),
            })?;

        result.push(FileTransferEntry {
            source: entry.path().to_path_buf(),
            dest: join_path(storage_path, &to_slash(relative)),
        });
    }

    Ok(result)
}

/// Render a relative path with `/` separators
pub(crate) fn to_slash(path: &Path) -> String {
    path.components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Run `f` over every item with at most `max_workers` in flight
///
/// Stops at the first error.
pub(crate) async fn transfer_all<T, F, Fut>(items: Vec<T>, max_workers: usize, f: F) -> Result<()>
where
    F: FnMut(T) -> Fut,
    Fut: Future<Output = Result<()>>,
{
    stream::iter(items.into_iter().map(Ok::<T, StorageError>))
        .try_for_each_concurrent(max_workers.max(1), f)
        .await
}
