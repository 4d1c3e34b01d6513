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


// Storage backend module
//
// Provides a trait-based abstraction over storage backends so callers can
// read, write and list files without knowing whether they live on local
// disk, in S3 or in GCS. Backends are selected from a storage URL:
//
//   /some/dir, file:///some/dir  -> DiskStorage
//   s3://bucket/root             -> ObjectStorage (S3)
//   gs://bucket/root             -> ObjectStorage (GCS)

pub mod backend;
pub mod disk;
pub mod factory;
pub mod gcs;
pub mod listing;
pub mod object;
pub mod s3;
pub mod url;
pub mod walker;

pub use backend::{needs_caching, Storage};
pub use disk::DiskStorage;
pub use factory::{for_url, BackendFactory};
pub use listing::{
    list_channel, spawn_list_recursive, spawn_match_filenames, ListReceiver, ListResult, ListSink,
};
pub use object::ObjectStorage;
pub use url::{split_url, Scheme, StorageUrl};
pub use walker::{put_directory_files, FileTransferEntry, PUT_DIRECTORY_SKIP};
