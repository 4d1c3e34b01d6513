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


// Streaming recursive listings
//
// Recursive listings run as a producer writing into a bounded channel.
// A full channel blocks the producer until the consumer catches up.
// Dropping the receiver closes the channel; the producer notices on its
// next send and stops walking.

use super::backend::Storage;
use crate::error::{Result, StorageError};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::debug;

/// One entry of a recursive listing
///
/// A failure to read one entry is reported in `error` and does not end
/// the listing. Check `error` before trusting `path`.
#[derive(Debug)]
pub struct ListResult {
    pub path: String,
    pub error: Option<StorageError>,
}

impl ListResult {
    pub fn ok(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            error: None,
        }
    }

    pub fn err(path: impl Into<String>, error: StorageError) -> Self {
        Self {
            path: path.into(),
            error: Some(error),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    pub fn into_result(self) -> Result<String> {
        match self.error {
            None => Ok(self.path),
            Some(err) => Err(err),
        }
    }
}

/// Producer half of a recursive listing
#[derive(Debug, Clone)]
pub struct ListSink {
    tx: mpsc::Sender<ListResult>,
}

impl ListSink {
    /// Deliver a result, waiting while the channel is full
    ///
    /// Returns `false` once the consumer has gone away.
    pub async fn send(&self, result: ListResult) -> bool {
        self.tx.send(result).await.is_ok()
    }

    /// Blocking variant for producers running on a blocking thread
    pub fn blocking_send(&self, result: ListResult) -> bool {
        self.tx.blocking_send(result).is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Consumer half of a recursive listing
#[derive(Debug)]
pub struct ListReceiver {
    rx: mpsc::Receiver<ListResult>,
}

impl ListReceiver {
    pub async fn recv(&mut self) -> Option<ListResult> {
        self.rx.recv().await
    }

    pub fn into_stream(self) -> ReceiverStream<ListResult> {
        ReceiverStream::new(self.rx)
    }

    /// Drain the listing into a vector, keeping failed entries
    pub async fn collect(mut self) -> Vec<ListResult> {
        let mut results = Vec::new();
        while let Some(result) = self.rx.recv().await {
            results.push(result);
        }
        results
    }

    /// Drain the listing, returning sorted paths or the first entry error
    pub async fn collect_paths(self) -> Result<Vec<String>> {
        let mut paths = self
            .collect()
            .await
            .into_iter()
            .map(ListResult::into_result)
            .collect::<Result<Vec<_>>>()?;
        paths.sort();
        Ok(paths)
    }
}

/// Create a bounded listing channel
pub fn list_channel(capacity: usize) -> (ListSink, ListReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (ListSink { tx }, ListReceiver { rx })
}

/// Run `list_recursive` on a background task
pub fn spawn_list_recursive(
    storage: Arc<dyn Storage>,
    folder: impl Into<String>,
    capacity: usize,
) -> ListReceiver {
    let (sink, receiver) = list_channel(capacity);
    let folder = folder.into();

    tokio::spawn(async move {
        storage.list_recursive(sink, &folder).await;
        debug!("Recursive listing of '{}' finished", folder);
    });

    receiver
}

/// Run `match_filenames_recursive` on a background task
pub fn spawn_match_filenames(
    storage: Arc<dyn Storage>,
    folder: impl Into<String>,
    filename: impl Into<String>,
    capacity: usize,
) -> ListReceiver {
    let (sink, receiver) = list_channel(capacity);
    let folder = folder.into();
    let filename = filename.into();

    tokio::spawn(async move {
        storage
            .match_filenames_recursive(sink, &folder, &filename)
            .await;
        debug!(
            "Recursive match of '{}' under '{}' finished",
            filename, folder
        );
    });

    receiver
}
