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


// Storage abstraction over disk, S3 and GCS
//
// This crate provides:
// - Storage URL resolution and a backend factory
// - A uniform async storage contract implemented by every backend
// - Directory upload/download with a fixed skip-list of directories
// - Streaming recursive listings over bounded channels
// - Uploading a directory tree to a remote host over ssh

pub mod config;
pub mod error;
pub mod remote;
pub mod storage;

// Re-export main types
pub use config::{load_config, load_config_with_env, AppConfig, RemoteOptions, StorageConfig};
pub use error::{Result, StorageError};
pub use remote::{upload, RemoteClient};
pub use storage::{
    for_url, needs_caching, split_url, BackendFactory, DiskStorage, FileTransferEntry,
    ListResult, ObjectStorage, Scheme, Storage, StorageUrl,
};
