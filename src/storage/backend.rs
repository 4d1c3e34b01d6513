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


// Storage trait shared by disk and object-store backends

use super::listing::ListSink;
use super::url::Scheme;
use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;

/// Uniform storage contract
///
/// Callers hold an `Arc<dyn Storage>` from the factory and never need to
/// know which backend is behind it. All paths are relative to the
/// backend root and use `/` as separator.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Canonical URL of the backend root
    fn root_url(&self) -> String;

    /// Whether the root exists
    ///
    /// An empty root is not an error; only genuine I/O or auth failures are.
    async fn root_exists(&self) -> Result<bool>;

    /// Read an object, `StorageError::NotFound` if it is absent
    async fn get(&self, path: &str) -> Result<Vec<u8>>;

    /// Create or overwrite an object, creating intermediate structure
    async fn put(&self, path: &str, data: &[u8]) -> Result<()>;

    /// Upload a local tree to `storage_path`, skipping skip-listed directories
    async fn put_directory(&self, local_path: &Path, storage_path: &str) -> Result<()>;

    /// Download everything under `storage_path` into `local_path`
    async fn get_directory(&self, storage_path: &str, local_path: &Path) -> Result<()>;

    /// Remove an object or a whole subtree; missing paths are not an error
    async fn delete(&self, path: &str) -> Result<()>;

    /// List files in a path non-recursively
    ///
    /// Returns sorted paths, prefixed with the given path, that can be
    /// passed straight to `get`. Directories are not listed. A path that
    /// does not exist yields an empty list.
    async fn list(&self, path: &str) -> Result<Vec<String>>;

    /// List files in a path recursively into `sink`
    ///
    /// Errors on individual entries are delivered inline and do not end the
    /// listing. Returns when the walk is done or the consumer went away.
    async fn list_recursive(&self, sink: ListSink, folder: &str);

    /// Like `list_recursive`, keeping only entries whose base name is `filename`
    async fn match_filenames_recursive(&self, sink: ListSink, folder: &str, filename: &str);

    /// Environment variables (`KEY=VALUE`) a child process needs to reach
    /// this storage directly
    fn prepare_run_env(&self) -> Result<Vec<String>>;

    fn scheme(&self) -> Scheme;

    /// Whether reads are slow enough that callers should cache them locally
    fn needs_caching(&self) -> bool;
}

/// Returns true if the storage is slow and needs caching
pub fn needs_caching(storage: &dyn Storage) -> bool {
    storage.needs_caching()
}

/// Join storage path segments with `/`, ignoring empty segments
pub fn join_path(base: &str, rel: &str) -> String {
    let base = base.trim_end_matches('/');
    let rel = rel.trim_start_matches('/');
    match (base.is_empty(), rel.is_empty()) {
        (true, _) => rel.to_string(),
        (_, true) => base.to_string(),
        _ => format!("{}/{}", base, rel),
    }
}

/// Base name of a storage path
pub fn base_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}
