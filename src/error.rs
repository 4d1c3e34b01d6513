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


// Error taxonomy for storage operations

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub type Result<T, E = StorageError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum StorageError {
    /// The URL names a backend this crate does not know about
    #[error("Unknown storage backend: {0}")]
    InvalidScheme(String),

    #[error("Malformed storage URL '{url}': {source}")]
    MalformedUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// A percent-escape in the URL path does not decode to UTF-8
    #[error("Invalid percent-encoding in storage URL '{url}': {source}")]
    InvalidEncoding {
        url: String,
        #[source]
        source: std::string::FromUtf8Error,
    },

    /// `get` on a key that does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to walk directory: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Object store error: {0}")]
    ObjectStore(#[source] object_store::Error),

    #[error("Failed to create storage backend: {0}")]
    Backend(String),

    #[error("Remote error: {0}")]
    Remote(String),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl StorageError {
    /// Build a closure mapping an `io::Error` to `StorageError::Io` for `path`
    pub fn io<P: AsRef<Path>>(path: P) -> impl FnOnce(io::Error) -> StorageError {
        let path = path.as_ref().to_path_buf();
        move |source| StorageError::Io { path, source }
    }

    pub fn is_not_found(&self) -> bool {
        match self {
            StorageError::NotFound(_) => true,
            StorageError::Io { source, .. } => source.kind() == io::ErrorKind::NotFound,
            StorageError::ObjectStore(object_store::Error::NotFound { .. }) => true,
            _ => false,
        }
    }
}

impl From<object_store::Error> for StorageError {
    fn from(err: object_store::Error) -> Self {
        match err {
            object_store::Error::NotFound { path, .. } => StorageError::NotFound(path),
            err => StorageError::ObjectStore(err),
        }
    }
}
