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


// Amazon S3 (and S3-compatible) construction

use super::object::{ObjectStorage, RunEnv};
use super::url::Scheme;
use crate::config::{S3Config, StorageConfig};
use crate::error::{Result, StorageError};
use object_store::aws::AmazonS3Builder;
use std::sync::Arc;
use tracing::info;

const DEFAULT_REGION: &str = "us-east-1";

/// Credential variables forwarded verbatim to child processes when set
const FORWARDED_ENV: &[&str] = &["AWS_ACCESS_KEY_ID", "AWS_SECRET_ACCESS_KEY", "AWS_SESSION_TOKEN"];

/// Region from config, then the environment, then us-east-1
pub fn resolve_region(config: &S3Config) -> String {
    config
        .region
        .clone()
        .or_else(|| std::env::var("AWS_REGION").ok())
        .or_else(|| std::env::var("AWS_DEFAULT_REGION").ok())
        .unwrap_or_else(|| DEFAULT_REGION.to_string())
}

impl ObjectStorage {
    /// Storage in an S3 bucket, credentials taken from the environment
    pub fn s3(bucket: &str, root: &str, config: &StorageConfig) -> Result<Self> {
        let region = resolve_region(&config.s3);

        let mut builder = AmazonS3Builder::from_env()
            .with_bucket_name(bucket)
            .with_region(region.as_str());

        if let Some(endpoint) = &config.s3.endpoint {
            builder = builder.with_endpoint(endpoint.as_str());
        }
        if config.s3.allow_http {
            builder = builder.with_allow_http(true);
        }

        let store = builder
            .build()
            .map_err(|e| StorageError::Backend(format!("S3 bucket '{}': {}", bucket, e)))?;

        info!(
            "Initializing S3 storage at s3://{}/{} (region {})",
            bucket, root, region
        );

        let storage = ObjectStorage::with_store(Scheme::S3, bucket, root, Arc::new(store), config)
            .run_env(RunEnv::S3 {
                region,
                endpoint: config.s3.endpoint.clone(),
            });

        Ok(storage)
    }
}

pub(crate) fn s3_run_env(region: &str, endpoint: Option<&str>) -> Vec<String> {
    let mut env: Vec<String> = FORWARDED_ENV
        .iter()
        .filter_map(|key| {
            std::env::var(key)
                .ok()
                .map(|value| format!("{}={}", key, value))
        })
        .collect();

    env.push(format!("AWS_DEFAULT_REGION={}", region));
    if let Some(endpoint) = endpoint {
        env.push(format!("AWS_ENDPOINT_URL={}", endpoint));
    }

    env
}
