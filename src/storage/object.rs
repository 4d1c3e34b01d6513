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


// Object-store backend shared by S3 and GCS
//
// The wire protocols live in the `object_store` crate. This module maps
// the storage contract onto an `ObjectStore` scoped to a bucket, with an
// optional key prefix acting as the root.

use super::backend::{base_name, join_path, Storage};
use super::listing::{ListResult, ListSink};
use super::url::{Scheme, StorageUrl};
use super::walker::{put_directory_files, transfer_all};
use crate::config::StorageConfig;
use crate::error::{Result, StorageError};
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use object_store::path::Path as ObjectPath;
use object_store::{ObjectStore, PutPayload};
use std::path::Path;
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, info, warn};

/// What `prepare_run_env` hands to child processes
#[derive(Debug, Clone, Default)]
pub(crate) enum RunEnv {
    #[default]
    Empty,
    S3 {
        region: String,
        endpoint: Option<String>,
    },
    Gcs {
        service_account_path: Option<String>,
    },
}

impl RunEnv {
    fn render(&self) -> Vec<String> {
        match self {
            RunEnv::Empty => Vec::new(),
            RunEnv::S3 { region, endpoint } => super::s3::s3_run_env(region, endpoint.as_deref()),
            RunEnv::Gcs {
                service_account_path,
            } => super::gcs::gcs_run_env(service_account_path.as_deref()),
        }
    }
}

/// Storage backed by an object store bucket
pub struct ObjectStorage {
    store: Arc<dyn ObjectStore>,
    scheme: Scheme,
    bucket: String,
    root: String,
    max_workers: usize,
    run_env: RunEnv,
}

impl std::fmt::Debug for ObjectStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectStorage")
            .field("scheme", &self.scheme)
            .field("bucket", &self.bucket)
            .field("root", &self.root)
            .finish()
    }
}

impl ObjectStorage {
    /// Wrap an already configured store
    ///
    /// `root` is the key prefix every path is resolved against.
    pub fn with_store(
        scheme: Scheme,
        bucket: impl Into<String>,
        root: &str,
        store: Arc<dyn ObjectStore>,
        config: &StorageConfig,
    ) -> Self {
        Self {
            store,
            scheme,
            bucket: bucket.into(),
            root: root.trim_matches('/').to_string(),
            max_workers: config.max_workers,
            run_env: RunEnv::Empty,
        }
    }

    pub(crate) fn run_env(mut self, run_env: RunEnv) -> Self {
        self.run_env = run_env;
        self
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    /// Object key of `path`, taken verbatim without percent-encoding
    fn key(&self, path: &str) -> Result<ObjectPath> {
        let joined = join_path(&self.root, path);
        Ok(ObjectPath::parse(joined).map_err(object_store::Error::from)?)
    }

    /// Listing prefix for `path`, `None` for the whole bucket
    fn prefix(&self, path: &str) -> Result<Option<ObjectPath>> {
        if join_path(&self.root, path).is_empty() {
            return Ok(None);
        }
        self.key(path).map(Some)
    }

    /// Path of an object relative to the root, accepted back by `key`
    fn relative(&self, location: &ObjectPath) -> String {
        let location = location.as_ref();
        if self.root.is_empty() {
            return location.to_string();
        }
        location
            .strip_prefix(self.root.as_str())
            .map(|rest| rest.trim_start_matches('/'))
            .unwrap_or(location)
            .to_string()
    }

    /// Every object below `path`, relative to the root; stops at the first error
    async fn list_all(&self, path: &str) -> Result<Vec<String>> {
        let prefix = self.prefix(path)?;
        let mut stream = self.store.list(prefix.as_ref());
        let mut paths = Vec::new();
        while let Some(meta) = stream.next().await {
            paths.push(self.relative(&meta?.location));
        }
        Ok(paths)
    }

    async fn stream_into(&self, sink: ListSink, folder: &str, filter: Option<&str>) {
        let prefix = match self.prefix(folder) {
            Ok(prefix) => prefix,
            Err(err) => {
                warn!("Invalid listing prefix '{}': {}", folder, err);
                sink.send(ListResult::err(folder, err)).await;
                return;
            }
        };
        let mut stream = self.store.list(prefix.as_ref());

        while let Some(item) = stream.next().await {
            let result = match item {
                Ok(meta) => {
                    let path = self.relative(&meta.location);
                    if let Some(filename) = filter {
                        if base_name(&path) != filename {
                            continue;
                        }
                    }
                    ListResult::ok(path)
                }
                Err(err) => {
                    warn!("Failed to list under '{}': {}", folder, err);
                    ListResult::err(folder, err.into())
                }
            };

            if !sink.send(result).await {
                debug!("Listing consumer went away, stopping listing of '{}'", folder);
                return;
            }
        }
    }
}

#[async_trait]
impl Storage for ObjectStorage {
    fn root_url(&self) -> String {
        StorageUrl::new(self.scheme, self.bucket.clone(), self.root.clone()).to_string()
    }

    async fn root_exists(&self) -> Result<bool> {
        let prefix = self.prefix("")?;
        let mut stream = self.store.list(prefix.as_ref());
        match stream.next().await {
            // A reachable bucket with nothing under the root still exists
            None | Some(Ok(_)) => Ok(true),
            Some(Err(object_store::Error::NotFound { .. })) => Ok(false),
            Some(Err(err)) => Err(err.into()),
        }
    }

    async fn get(&self, path: &str) -> Result<Vec<u8>> {
        let key = self.key(path)?;
        debug!("Downloading {}/{}", self.bucket, key);
        let data = self.store.get(&key).await?.bytes().await?;
        Ok(data.to_vec())
    }

    async fn put(&self, path: &str, data: &[u8]) -> Result<()> {
        let key = self.key(path)?;
        debug!("Uploading {} bytes to {}/{}", data.len(), self.bucket, key);
        self.store
            .put(&key, PutPayload::from(Bytes::copy_from_slice(data)))
            .await?;
        Ok(())
    }

    async fn put_directory(&self, local_path: &Path, storage_path: &str) -> Result<()> {
        let local = local_path.to_path_buf();
        let dest = storage_path.to_string();
        let files = tokio::task::spawn_blocking(move || put_directory_files(&local, &dest)).await??;

        info!(
            "Uploading {} files from {} to {}",
            files.len(),
            local_path.display(),
            join_path(&self.root_url(), storage_path)
        );

        transfer_all(files, self.max_workers, |file| async move {
            let data = fs::read(&file.source)
                .await
                .map_err(StorageError::io(&file.source))?;
            self.put(&file.dest, &data).await
        })
        .await
    }

    async fn get_directory(&self, storage_path: &str, local_path: &Path) -> Result<()> {
        let paths = self.list_all(storage_path).await?;
        let prefix = storage_path.trim_matches('/').to_string();

        info!(
            "Downloading {} files from {} to {}",
            paths.len(),
            join_path(&self.root_url(), storage_path),
            local_path.display()
        );

        transfer_all(paths, self.max_workers, |path| {
            let prefix = &prefix;
            async move {
                let relative = path
                    .strip_prefix(prefix.as_str())
                    .unwrap_or(&path)
                    .trim_start_matches('/');
                let dest = local_path.join(relative);
                if let Some(parent) = dest.parent() {
                    fs::create_dir_all(parent)
                        .await
                        .map_err(StorageError::io(parent))?;
                }
                let data = self.get(&path).await?;
                fs::write(&dest, data).await.map_err(StorageError::io(&dest))?;
                Ok(())
            }
        })
        .await
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let mut paths = self.list_all(path).await?;
        // The path itself may be a single object
        let exact = path.trim_matches('/').to_string();
        if !exact.is_empty() && !paths.contains(&exact) {
            paths.push(exact);
        }

        debug!("Deleting {} objects under {}/{}", paths.len(), self.bucket, path);

        transfer_all(paths, self.max_workers, |path| async move {
            match self.store.delete(&self.key(&path)?).await {
                Ok(()) | Err(object_store::Error::NotFound { .. }) => Ok(()),
                Err(err) => Err(err.into()),
            }
        })
        .await
    }

    async fn list(&self, path: &str) -> Result<Vec<String>> {
        let prefix = self.prefix(path)?;
        let listing = match self.store.list_with_delimiter(prefix.as_ref()).await {
            Ok(listing) => listing,
            Err(object_store::Error::NotFound { .. }) => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut result: Vec<String> = listing
            .objects
            .iter()
            .map(|meta| self.relative(&meta.location))
            .collect();
        result.sort();
        Ok(result)
    }

    async fn list_recursive(&self, sink: ListSink, folder: &str) {
        self.stream_into(sink, folder, None).await;
    }

    async fn match_filenames_recursive(&self, sink: ListSink, folder: &str, filename: &str) {
        self.stream_into(sink, folder, Some(filename)).await;
    }

    fn prepare_run_env(&self) -> Result<Vec<String>> {
        Ok(self.run_env.render())
    }

    fn scheme(&self) -> Scheme {
        self.scheme
    }

    fn needs_caching(&self) -> bool {
        true
    }
}
