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


// Configuration module for storage-sync
//
// Provides:
// - YAML configuration file loading
// - Environment variable substitution
// - Configuration validation
// - Default values

pub mod types;
mod loader;

pub use types::*;
pub use loader::ConfigLoader;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a YAML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    ConfigLoader::load(path).context("Failed to load configuration")
}

/// Load configuration with environment variable overrides
pub fn load_config_with_env<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let mut config = load_config(path)?;
    apply_env_overrides(&mut config)?;
    Ok(config)
}

/// Apply `STORAGE_MAX_WORKERS`, `AWS_REGION` and `S3_ENDPOINT` on top of `config`
pub fn apply_env_overrides(config: &mut AppConfig) -> Result<()> {
    if let Ok(workers) = std::env::var("STORAGE_MAX_WORKERS") {
        config.storage.max_workers = workers
            .parse()
            .context("STORAGE_MAX_WORKERS must be a positive integer")?;
    }

    if let Ok(region) = std::env::var("AWS_REGION") {
        config.storage.s3.region = Some(region);
    }

    if let Ok(endpoint) = std::env::var("S3_ENDPOINT") {
        config.storage.s3.endpoint = Some(endpoint);
    }

    ConfigLoader::validate(config)
}
