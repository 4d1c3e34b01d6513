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


// Google Cloud Storage construction

use super::object::{ObjectStorage, RunEnv};
use super::url::Scheme;
use crate::config::StorageConfig;
use crate::error::{Result, StorageError};
use object_store::gcp::GoogleCloudStorageBuilder;
use std::sync::Arc;
use tracing::info;

impl ObjectStorage {
    /// Storage in a GCS bucket, credentials taken from the environment
    pub fn gcs(bucket: &str, root: &str, config: &StorageConfig) -> Result<Self> {
        let mut builder = GoogleCloudStorageBuilder::from_env().with_bucket_name(bucket);

        if let Some(path) = &config.gcs.service_account_path {
            builder = builder.with_service_account_path(path.as_str());
        }

        let store = builder
            .build()
            .map_err(|e| StorageError::Backend(format!("GCS bucket '{}': {}", bucket, e)))?;

        info!("Initializing GCS storage at gs://{}/{}", bucket, root);

        let storage = ObjectStorage::with_store(Scheme::Gcs, bucket, root, Arc::new(store), config)
            .run_env(RunEnv::Gcs {
                service_account_path: config.gcs.service_account_path.clone(),
            });

        Ok(storage)
    }
}

pub(crate) fn gcs_run_env(service_account_path: Option<&str>) -> Vec<String> {
    let mut env = Vec::new();

    let credentials = service_account_path
        .map(str::to_string)
        .or_else(|| std::env::var("GOOGLE_APPLICATION_CREDENTIALS").ok());
    if let Some(credentials) = credentials {
        env.push(format!("GOOGLE_APPLICATION_CREDENTIALS={}", credentials));
    }

    if let Ok(project) = std::env::var("GOOGLE_CLOUD_PROJECT") {
        env.push(format!("GOOGLE_CLOUD_PROJECT={}", project));
    }

    env
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_env_uses_configured_service_account() {
        let env = gcs_run_env(Some("/secrets/sa.json"));
        assert_eq!(env[0], "GOOGLE_APPLICATION_CREDENTIALS=/secrets/sa.json");
    }
}
