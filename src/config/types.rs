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


// Configuration types for storage-sync

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub storage: StorageConfig,

    /// Connection options for `upload`, absent when no remote is used
    #[serde(default)]
    pub remote: Option<RemoteOptions>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Settings passed to the backend factory
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Maximum number of file transfers in flight for directory operations
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,

    /// Capacity of the bounded channel used by recursive listings
    #[serde(default = "default_list_queue_capacity")]
    pub list_queue_capacity: usize,

    #[serde(default)]
    pub s3: S3Config,

    #[serde(default)]
    pub gcs: GcsConfig,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            max_workers: default_max_workers(),
            list_queue_capacity: default_list_queue_capacity(),
            s3: S3Config::default(),
            gcs: GcsConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct S3Config {
    /// Region, falls back to `AWS_REGION`/`AWS_DEFAULT_REGION` then us-east-1
    #[serde(default)]
    pub region: Option<String>,

    /// Custom endpoint for S3-compatible stores (MinIO, etc.)
    #[serde(default)]
    pub endpoint: Option<String>,

    #[serde(default)]
    pub allow_http: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct GcsConfig {
    /// Service account key file, falls back to `GOOGLE_APPLICATION_CREDENTIALS`
    #[serde(default)]
    pub service_account_path: Option<String>,
}

/// Connection options for the remote upload utility
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RemoteOptions {
    pub host: String,

    #[serde(default = "default_ssh_port")]
    pub port: u16,

    pub username: String,

    /// Private key files handed to ssh with `-i`
    #[serde(default)]
    pub private_keys: Vec<PathBuf>,

    #[serde(default)]
    pub strict_host_key_checking: bool,
}

impl RemoteOptions {
    pub fn new(host: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: default_ssh_port(),
            username: username.into(),
            private_keys: Vec::new(),
            strict_host_key_checking: false,
        }
    }

    /// `user@host` destination understood by ssh and rsync
    pub fn destination(&self) -> String {
        format!("{}@{}", self.username, self.host)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String, // "trace", "debug", "info", "warn", "error"
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// Default value functions
fn default_max_workers() -> usize { 128 }
fn default_list_queue_capacity() -> usize { 1024 }
fn default_ssh_port() -> u16 { 22 }
fn default_log_level() -> String { "info".to_string() }
