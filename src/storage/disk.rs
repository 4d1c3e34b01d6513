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


// Disk backend implementation

use super::backend::{base_name, join_path, Storage};
use super::listing::{list_channel, ListResult, ListSink};
use super::url::{Scheme, StorageUrl};
use super::walker::{put_directory_files, to_slash, transfer_all};
use crate::config::StorageConfig;
use crate::error::{Result, StorageError};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// File name prefix of in-flight writes, never reported by listings
const PARTIAL_PREFIX: &str = ".storage-sync-";
const PARTIAL_SUFFIX: &str = ".tmp";

fn is_partial_write(name: &str) -> bool {
    name.starts_with(PARTIAL_PREFIX) && name.ends_with(PARTIAL_SUFFIX)
}

/// Storage rooted at a local directory
#[derive(Debug, Clone)]
pub struct DiskStorage {
    root: PathBuf,
    max_workers: usize,
}

impl DiskStorage {
    pub fn new(root: impl Into<PathBuf>, config: &StorageConfig) -> Result<Self> {
        let root = root.into();

        info!("Initializing disk storage at: {}", root.display());

        Ok(Self {
            root,
            max_workers: config.max_workers,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Local path of a storage path
    fn full_path(&self, path: &str) -> PathBuf {
        let path = path.trim_start_matches('/');
        if path.is_empty() {
            self.root.clone()
        } else {
            self.root.join(path)
        }
    }

    /// Storage path of a local path below the root
    fn storage_path(&self, local: &Path) -> String {
        let relative = local.strip_prefix(&self.root).unwrap_or(local);
        to_slash(relative)
    }

    /// Blocking walk of `folder`, sending every file accepted by `filter`
    fn walk_into(&self, sink: &ListSink, folder: &str, filter: Option<&str>) {
        let start = self.full_path(folder);

        match std::fs::metadata(&start) {
            Ok(_) => {}
            Err(err) if err.kind() == ErrorKind::NotFound => return,
            Err(err) => {
                sink.blocking_send(ListResult::err(folder, StorageError::io(&start)(err)));
                return;
            }
        }

        for entry in WalkDir::new(&start).sort_by_file_name() {
            let result = match entry {
                Ok(entry) if entry.file_type().is_dir() => continue,
                Ok(entry) if is_partial_write(&entry.file_name().to_string_lossy()) => continue,
                Ok(entry) => {
                    let path = self.storage_path(entry.path());
                    if let Some(filename) = filter {
                        if base_name(&path) != filename {
                            continue;
                        }
                    }
                    ListResult::ok(path)
                }
                Err(err) => {
                    let path = err
                        .path()
                        .map(|p| self.storage_path(p))
                        .unwrap_or_else(|| folder.to_string());
                    warn!("Failed to list '{}': {}", path, err);
                    ListResult::err(path, err.into())
                }
            };

            if !sink.blocking_send(result) {
                debug!("Listing consumer went away, stopping walk of '{}'", folder);
                return;
            }
        }
    }

    async fn spawn_walk(&self, sink: ListSink, folder: &str, filter: Option<&str>) {
        let storage = self.clone();
        let folder = folder.to_string();
        let filter = filter.map(str::to_string);

        let walk = tokio::task::spawn_blocking(move || {
            storage.walk_into(&sink, &folder, filter.as_deref());
        });

        if let Err(err) = walk.await {
            warn!("Disk listing task failed: {}", err);
        }
    }
}

#[async_trait]
impl Storage for DiskStorage {
    fn root_url(&self) -> String {
        StorageUrl::new(Scheme::Disk, "", self.root.to_string_lossy()).to_string()
    }

    async fn root_exists(&self) -> Result<bool> {
        match fs::metadata(&self.root).await {
            Ok(_) => Ok(true),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(StorageError::io(&self.root)(err)),
        }
    }

    async fn get(&self, path: &str) -> Result<Vec<u8>> {
        let full_path = self.full_path(path);
        match fs::read(&full_path).await {
            Ok(data) => Ok(data),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                Err(StorageError::NotFound(full_path.display().to_string()))
            }
            Err(err) => Err(StorageError::io(&full_path)(err)),
        }
    }

    async fn put(&self, path: &str, data: &[u8]) -> Result<()> {
        let full_path = self.full_path(path);
        let dir = full_path.parent().map(Path::to_path_buf).unwrap_or_default();

        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(&dir).await.map_err(StorageError::io(&dir))?;
        }

        // Write next to the target and rename so readers never see a partial file
        let tmp_path = dir.join(format!(
            "{}{}.{}{}",
            PARTIAL_PREFIX,
            base_name(path),
            uuid::Uuid::new_v4(),
            PARTIAL_SUFFIX
        ));

        debug!("Writing {} bytes to {}", data.len(), full_path.display());

        fs::write(&tmp_path, data)
            .await
            .map_err(StorageError::io(&tmp_path))?;

        if let Err(err) = fs::rename(&tmp_path, &full_path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StorageError::io(&full_path)(err));
        }

        Ok(())
    }

    async fn put_directory(&self, local_path: &Path, storage_path: &str) -> Result<()> {
        let local = local_path.to_path_buf();
        let dest = storage_path.to_string();
        let files = tokio::task::spawn_blocking(move || put_directory_files(&local, &dest)).await??;

        info!(
            "Copying {} files from {} to {}",
            files.len(),
            local_path.display(),
            self.full_path(storage_path).display()
        );

        transfer_all(files, self.max_workers, |file| async move {
            let dest = self.full_path(&file.dest);
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)
                    .await
                    .map_err(StorageError::io(parent))?;
            }
            debug!("Copying {} to {}", file.source.display(), dest.display());
            fs::copy(&file.source, &dest)
                .await
                .map_err(StorageError::io(&file.source))?;
            Ok(())
        })
        .await
    }

    async fn get_directory(&self, storage_path: &str, local_path: &Path) -> Result<()> {
        let (sink, receiver) = list_channel(self.max_workers);
        let (_, paths) = tokio::join!(
            self.spawn_walk(sink, storage_path, None),
            receiver.collect_paths()
        );
        let paths = paths?;

        info!(
            "Copying {} files from {} to {}",
            paths.len(),
            self.full_path(storage_path).display(),
            local_path.display()
        );

        let prefix = storage_path.trim_matches('/').to_string();
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
                let source = self.full_path(&path);
                fs::copy(&source, &dest)
                    .await
                    .map_err(StorageError::io(&source))?;
                Ok(())
            }
        })
        .await
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let full_path = self.full_path(path);

        let metadata = match fs::symlink_metadata(&full_path).await {
            Ok(metadata) => metadata,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(()),
            Err(err) => return Err(StorageError::io(&full_path)(err)),
        };

        debug!("Deleting {}", full_path.display());

        let result = if metadata.is_dir() {
            fs::remove_dir_all(&full_path).await
        } else {
            fs::remove_file(&full_path).await
        };

        match result {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(StorageError::io(&full_path)(err)),
        }
    }

    async fn list(&self, path: &str) -> Result<Vec<String>> {
        let dir = self.full_path(path);

        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(StorageError::io(&dir)(err)),
        };

        let mut result = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(StorageError::io(&dir))? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if is_partial_write(&name) {
                continue;
            }

            // Follows symlinks so a link to a directory is treated as one
            let is_dir = match fs::metadata(entry.path()).await {
                Ok(metadata) => metadata.is_dir(),
                // Dangling link, listed as a file
                Err(err) if err.kind() == ErrorKind::NotFound => entry
                    .file_type()
                    .await
                    .map_err(StorageError::io(entry.path()))?
                    .is_dir(),
                Err(err) => return Err(StorageError::io(entry.path())(err)),
            };
            if is_dir {
                continue;
            }
            result.push(join_path(path, &name));
        }

        result.sort();
        Ok(result)
    }

    async fn list_recursive(&self, sink: ListSink, folder: &str) {
        self.spawn_walk(sink, folder, None).await;
    }

    async fn match_filenames_recursive(&self, sink: ListSink, folder: &str, filename: &str) {
        self.spawn_walk(sink, folder, Some(filename)).await;
    }

    fn prepare_run_env(&self) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    fn scheme(&self) -> Scheme {
        Scheme::Disk
    }

    fn needs_caching(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_storage() -> (DiskStorage, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let storage = DiskStorage::new(temp_dir.path(), &StorageConfig::default()).unwrap();
        (storage, temp_dir)
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let (storage, temp_dir) = create_test_storage();

        storage.put("a/b/c.txt", b"hello").await.unwrap();
        assert_eq!(storage.get("a/b/c.txt").await.unwrap(), b"hello");
        assert!(temp_dir.path().join("a/b/c.txt").exists());

        storage.put("a/b/c.txt", b"again").await.unwrap();
        assert_eq!(storage.get("a/b/c.txt").await.unwrap(), b"again");
    }

    #[tokio::test]
    async fn test_put_leaves_no_temp_files() {
        let (storage, temp_dir) = create_test_storage();
        storage.put("x.txt", b"x").await.unwrap();

        let names: Vec<_> = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["x.txt"]);
    }

    #[tokio::test]
    async fn test_list_skips_in_flight_writes() {
        let (storage, temp_dir) = create_test_storage();
        storage.put("dir/done.txt", b"d").await.unwrap();
        let partial = temp_dir
            .path()
            .join(format!("dir/{}done.txt.1234{}", PARTIAL_PREFIX, PARTIAL_SUFFIX));
        std::fs::write(&partial, b"half").unwrap();

        assert_eq!(storage.list("dir").await.unwrap(), vec!["dir/done.txt"]);

        let (sink, receiver) = list_channel(8);
        storage.list_recursive(sink, "dir").await;
        assert_eq!(receiver.collect_paths().await.unwrap(), vec!["dir/done.txt"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_list_keeps_dangling_symlink() {
        let (storage, temp_dir) = create_test_storage();
        storage.put("ok.txt", b"ok").await.unwrap();
        let root = temp_dir.path();
        std::os::unix::fs::symlink(root.join("gone"), root.join("dangling")).unwrap();
        std::fs::create_dir(root.join("real_dir")).unwrap();
        std::os::unix::fs::symlink(root.join("real_dir"), root.join("dir_link")).unwrap();

        assert_eq!(storage.list("").await.unwrap(), vec!["dangling", "ok.txt"]);
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let (storage, _temp_dir) = create_test_storage();
        let err = storage.get("missing.txt").await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_root_exists() {
        let (storage, temp_dir) = create_test_storage();
        assert!(storage.root_exists().await.unwrap());

        let missing =
            DiskStorage::new(temp_dir.path().join("nope"), &StorageConfig::default()).unwrap();
        assert!(!missing.root_exists().await.unwrap());
    }

    #[tokio::test]
    async fn test_list_is_flat_and_prefixed() {
        let (storage, _temp_dir) = create_test_storage();
        storage.put("dir/b.txt", b"b").await.unwrap();
        storage.put("dir/a.txt", b"a").await.unwrap();
        storage.put("dir/sub/c.txt", b"c").await.unwrap();

        let listed = storage.list("dir").await.unwrap();
        assert_eq!(listed, vec!["dir/a.txt", "dir/b.txt"]);

        for path in listed {
            assert!(storage.get(&path).await.is_ok());
        }
    }

    #[tokio::test]
    async fn test_list_missing_is_empty() {
        let (storage, _temp_dir) = create_test_storage();
        assert!(storage.list("does/not/exist").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete() {
        let (storage, temp_dir) = create_test_storage();
        storage.put("tree/a.txt", b"a").await.unwrap();
        storage.put("tree/sub/b.txt", b"b").await.unwrap();
        storage.put("single.txt", b"s").await.unwrap();

        storage.delete("single.txt").await.unwrap();
        assert!(!temp_dir.path().join("single.txt").exists());

        storage.delete("tree").await.unwrap();
        assert!(!temp_dir.path().join("tree").exists());

        storage.delete("never/existed").await.unwrap();
    }

    #[tokio::test]
    async fn test_list_recursive() {
        let (storage, _temp_dir) = create_test_storage();
        storage.put("run/a.json", b"a").await.unwrap();
        storage.put("run/x/b.json", b"b").await.unwrap();
        storage.put("other/c.json", b"c").await.unwrap();

        let (sink, receiver) = list_channel(2);
        let consumer = tokio::spawn(receiver.collect_paths());
        storage.list_recursive(sink, "run").await;

        assert_eq!(
            consumer.await.unwrap().unwrap(),
            vec!["run/a.json", "run/x/b.json"]
        );
    }

    #[tokio::test]
    async fn test_list_recursive_missing_folder_is_empty() {
        let (storage, _temp_dir) = create_test_storage();
        let (sink, receiver) = list_channel(2);
        storage.list_recursive(sink, "missing").await;
        assert!(receiver.collect().await.is_empty());
    }

    #[tokio::test]
    async fn test_match_filenames_recursive() {
        let (storage, _temp_dir) = create_test_storage();
        storage.put("exp/1/meta.json", b"1").await.unwrap();
        storage.put("exp/2/meta.json", b"2").await.unwrap();
        storage.put("exp/2/data.bin", b"d").await.unwrap();

        let (sink, receiver) = list_channel(8);
        storage.match_filenames_recursive(sink, "exp", "meta.json").await;

        assert_eq!(
            receiver.collect_paths().await.unwrap(),
            vec!["exp/1/meta.json", "exp/2/meta.json"]
        );
    }

    #[tokio::test]
    async fn test_list_recursive_stops_when_consumer_drops() {
        let (storage, _temp_dir) = create_test_storage();
        for i in 0..20 {
            storage.put(&format!("many/{}.txt", i), b"x").await.unwrap();
        }

        let (sink, mut receiver) = list_channel(1);
        let producer = {
            let storage = storage.clone();
            tokio::spawn(async move { storage.list_recursive(sink, "many").await })
        };

        assert!(receiver.recv().await.unwrap().is_ok());
        drop(receiver);

        producer.await.unwrap();
    }

    #[tokio::test]
    async fn test_put_and_get_directory() {
        let (storage, _temp_dir) = create_test_storage();
        let src = TempDir::new().unwrap();
        std::fs::write(src.path().join("foo.txt"), "hello foo").unwrap();
        std::fs::create_dir_all(src.path().join("bar")).unwrap();
        std::fs::write(src.path().join("bar/baz.txt"), "hello baz").unwrap();
        std::fs::create_dir_all(src.path().join(".git")).unwrap();
        std::fs::write(src.path().join(".git/HEAD"), "ref").unwrap();

        storage.put_directory(src.path(), "code").await.unwrap();
        assert_eq!(storage.get("code/foo.txt").await.unwrap(), b"hello foo");
        assert_eq!(storage.get("code/bar/baz.txt").await.unwrap(), b"hello baz");
        assert!(storage.get("code/.git/HEAD").await.unwrap_err().is_not_found());

        let dst = TempDir::new().unwrap();
        storage.get_directory("code", dst.path()).await.unwrap();
        assert_eq!(std::fs::read(dst.path().join("foo.txt")).unwrap(), b"hello foo");
        assert_eq!(
            std::fs::read(dst.path().join("bar/baz.txt")).unwrap(),
            b"hello baz"
        );
    }

    #[test]
    fn test_capabilities() {
        let (storage, temp_dir) = create_test_storage();
        assert!(!storage.needs_caching());
        assert_eq!(storage.scheme(), Scheme::Disk);
        assert!(storage.prepare_run_env().unwrap().is_empty());
        assert_eq!(
            storage.root_url(),
            format!("file://{}", temp_dir.path().display())
        );
    }
}
