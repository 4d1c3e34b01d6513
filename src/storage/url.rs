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


// Storage URL resolution
//
// A storage URL has the form `[scheme://][host][/path]`. Plain paths and
// `file://` URLs select the disk backend, `s3://` and `gs://` select an
// object store where the host is the bucket name.

use crate::error::{Result, StorageError};
use std::fmt;
use url::Url;

const SCHEME_SEPARATOR: &str = "://";
const FILE_PREFIX: &str = "file://";

/// Characters escaped in a rendered disk root
const DISK_RESERVED: &[char] = &['%'];
/// Characters escaped in a rendered object key prefix
const OBJECT_RESERVED: &[char] = &['%', '#', '?'];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    Disk,
    S3,
    Gcs,
}

impl Scheme {
    /// URL prefix used when rendering a storage URL
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Disk => "file",
            Scheme::S3 => "s3",
            Scheme::Gcs => "gs",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A storage URL split into its backend, bucket and root path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageUrl {
    pub scheme: Scheme,
    /// Bucket name, empty for disk
    pub bucket: String,
    pub root: String,
}

impl StorageUrl {
    pub fn new(scheme: Scheme, bucket: impl Into<String>, root: impl Into<String>) -> Self {
        Self {
            scheme,
            bucket: bucket.into(),
            root: root.into(),
        }
    }
}

impl fmt::Display for StorageUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.scheme {
            Scheme::Disk => write!(f, "{}{}", FILE_PREFIX, escape(&self.root, DISK_RESERVED)),
            Scheme::S3 | Scheme::Gcs => {
                write!(f, "{}://{}", self.scheme, self.bucket)?;
                if !self.root.is_empty() {
                    write!(f, "/{}", escape(&self.root, OBJECT_RESERVED))?;
                }
                Ok(())
            }
        }
    }
}

impl std::str::FromStr for StorageUrl {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self> {
        split_url(s)
    }
}

/// Split a storage URL into scheme, bucket and root
///
/// Examples:
/// - `some/dir` -> (Disk, "", "some/dir")
/// - `file:///abs/dir` -> (Disk, "", "/abs/dir")
/// - `s3://bucket/prefix` -> (S3, "bucket", "prefix")
pub fn split_url(storage_url: &str) -> Result<StorageUrl> {
    if !storage_url.contains(SCHEME_SEPARATOR) {
        return Ok(StorageUrl::new(Scheme::Disk, "", storage_url));
    }

    // Everything after `file://` is the path, case and all; there is no host
    if let Some(path) = storage_url.strip_prefix(FILE_PREFIX) {
        return Ok(StorageUrl::new(Scheme::Disk, "", decode(storage_url, path)?));
    }

    let url = Url::parse(storage_url).map_err(|source| StorageError::MalformedUrl {
        url: storage_url.to_string(),
        source,
    })?;

    let host = url.host_str().unwrap_or("");
    let path = decode(storage_url, url.path())?;

    match url.scheme() {
        "s3" => Ok(StorageUrl::new(
            Scheme::S3,
            host,
            path.trim_start_matches('/'),
        )),
        "gs" => Ok(StorageUrl::new(
            Scheme::Gcs,
            host,
            path.trim_start_matches('/'),
        )),
        other => Err(StorageError::InvalidScheme(other.to_string())),
    }
}

fn decode(storage_url: &str, path: &str) -> Result<String> {
    urlencoding::decode(path)
        .map(|decoded| decoded.into_owned())
        .map_err(|source| StorageError::InvalidEncoding {
            url: storage_url.to_string(),
            source,
        })
}

fn escape(path: &str, reserved: &[char]) -> String {
    let mut escaped = String::with_capacity(path.len());
    for c in path.chars() {
        if reserved.contains(&c) {
            escaped.push_str(&format!("%{:02X}", c as u32));
        } else {
            escaped.push(c);
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_path_is_disk() {
        assert_eq!(
            split_url("some/path").unwrap(),
            StorageUrl::new(Scheme::Disk, "", "some/path")
        );
        assert_eq!(
            split_url("/abs/path").unwrap(),
            StorageUrl::new(Scheme::Disk, "", "/abs/path")
        );
    }

    #[test]
    fn test_empty_url_is_disk() {
        assert_eq!(split_url("").unwrap(), StorageUrl::new(Scheme::Disk, "", ""));
    }

    #[test]
    fn test_file_urls() {
        assert_eq!(
            split_url("file://relative/path").unwrap(),
            StorageUrl::new(Scheme::Disk, "", "relative/path")
        );
        assert_eq!(
            split_url("file:///absolute/path").unwrap(),
            StorageUrl::new(Scheme::Disk, "", "/absolute/path")
        );
    }

    #[test]
    fn test_object_store_urls() {
        assert_eq!(
            split_url("s3://mybucket/some/path").unwrap(),
            StorageUrl::new(Scheme::S3, "mybucket", "some/path")
        );
        assert_eq!(
            split_url("gs://mybucket/some/path").unwrap(),
            StorageUrl::new(Scheme::Gcs, "mybucket", "some/path")
        );
        assert_eq!(
            split_url("s3://mybucket").unwrap(),
            StorageUrl::new(Scheme::S3, "mybucket", "")
        );
    }

    #[test]
    fn test_percent_encoded_path_is_decoded() {
        assert_eq!(
            split_url("file:///tmp/my%20dir").unwrap(),
            StorageUrl::new(Scheme::Disk, "", "/tmp/my dir")
        );
    }

    #[test]
    fn test_unknown_scheme() {
        let err = split_url("ftp://host/path").unwrap_err();
        assert!(matches!(err, StorageError::InvalidScheme(ref s) if s == "ftp"));
        assert!(err.to_string().contains("ftp"));
    }

    #[test]
    fn test_malformed_url() {
        let err = split_url("s3://[bad/path").unwrap_err();
        assert!(matches!(err, StorageError::MalformedUrl { .. }));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_invalid_percent_encoding() {
        let err = split_url("file:///tmp/%FF").unwrap_err();
        assert!(matches!(err, StorageError::InvalidEncoding { .. }));
    }

    #[test]
    fn test_file_url_keeps_case_and_relative_roots() {
        assert_eq!(split_url("file://").unwrap(), StorageUrl::new(Scheme::Disk, "", ""));
        assert_eq!(
            split_url("file://dir").unwrap(),
            StorageUrl::new(Scheme::Disk, "", "dir")
        );
        assert_eq!(
            split_url("file://MyDir/sub").unwrap(),
            StorageUrl::new(Scheme::Disk, "", "MyDir/sub")
        );
    }

    #[test]
    fn test_round_trip() {
        let cases = vec![
            StorageUrl::new(Scheme::Disk, "", "/abs/dir"),
            StorageUrl::new(Scheme::Disk, "", "relative/dir"),
            StorageUrl::new(Scheme::Disk, "", ""),
            StorageUrl::new(Scheme::Disk, "", "dir"),
            StorageUrl::new(Scheme::Disk, "", "MyDir/sub"),
            StorageUrl::new(Scheme::Disk, "", "/tmp/a#b?c"),
            StorageUrl::new(Scheme::Disk, "", "/tmp/100%"),
            StorageUrl::new(Scheme::S3, "bucket", "runs/a#b?c/100%"),
            StorageUrl::new(Scheme::Gcs, "bucket", "my dir/x"),
            StorageUrl::new(Scheme::S3, "bucket", "some/root"),
            StorageUrl::new(Scheme::S3, "bucket", ""),
            StorageUrl::new(Scheme::Gcs, "bucket", "root"),
        ];

        for expected in cases {
            let rendered = expected.to_string();
            let parsed: StorageUrl = rendered.parse().unwrap();
            assert_eq!(parsed, expected, "round trip of {}", rendered);
        }
    }
}
