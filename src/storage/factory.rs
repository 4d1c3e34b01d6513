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


// Backend factory for creating storage backends from URLs

use super::backend::Storage;
use super::disk::DiskStorage;
use super::object::ObjectStorage;
use super::url::{split_url, Scheme};
use crate::config::StorageConfig;
use crate::error::Result;
use std::sync::Arc;

pub struct BackendFactory;

impl BackendFactory {
    /// Create a storage backend for a storage URL
    pub fn for_url(storage_url: &str, config: &StorageConfig) -> Result<Arc<dyn Storage>> {
        let url = split_url(storage_url)?;

        match url.scheme {
            Scheme::Disk => Ok(Arc::new(DiskStorage::new(url.root, config)?)),
            Scheme::S3 => Ok(Arc::new(ObjectStorage::s3(&url.bucket, &url.root, config)?)),
            Scheme::Gcs => Ok(Arc::new(ObjectStorage::gcs(&url.bucket, &url.root, config)?)),
        }
    }
}

/// Shorthand for `BackendFactory::for_url`
pub fn for_url(storage_url: &str, config: &StorageConfig) -> Result<Arc<dyn Storage>> {
    BackendFactory::for_url(storage_url, config)
}
