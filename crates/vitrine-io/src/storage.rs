// Copyright 2025 eraflo
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

//! [`ObjectStorage`] over `file://`, `http://` and `https://` URLs.
//!
//! Local URLs (and bare paths) are read and written directly. Remote URLs are
//! fetched with a blocking HTTP client; storing to a remote URL is only
//! possible when a mirror directory is configured, in which case the object
//! lands under `<mirror>/<host>/<path>` and its `file://` URL is returned.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;
use url::Url;
use vitrine_core::{ObjectStorage, StorageError};

/// Where a URL points.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Location {
    Local(PathBuf),
    Remote(Url),
}

fn locate(url: &str) -> Result<Location, StorageError> {
    if !url.contains("://") {
        if url.is_empty() {
            return Err(StorageError::InvalidUrl(url.to_owned()));
        }
        return Ok(Location::Local(PathBuf::from(url)));
    }
    let parsed = Url::parse(url).map_err(|_| StorageError::InvalidUrl(url.to_owned()))?;
    match parsed.scheme() {
        "file" => parsed
            .to_file_path()
            .map(Location::Local)
            .map_err(|_| StorageError::InvalidUrl(url.to_owned())),
        "http" | "https" => Ok(Location::Remote(parsed)),
        other => Err(StorageError::UnsupportedScheme {
            scheme: other.to_owned(),
            url: url.to_owned(),
        }),
    }
}

/// Storage addressed by URL.
#[derive(Debug)]
pub struct UrlStorage {
    max_size: Option<u64>,
    timeout: Duration,
    mirror_root: Option<PathBuf>,
    client: OnceLock<reqwest::blocking::Client>,
}

impl Default for UrlStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl UrlStorage {
    /// No size limit, 60 s request timeout, no remote mirror.
    pub fn new() -> Self {
        Self {
            max_size: None,
            timeout: Duration::from_secs(60),
            mirror_root: None,
            client: OnceLock::new(),
        }
    }

    /// Refuses objects larger than `bytes`.
    pub fn with_max_size(mut self, bytes: u64) -> Self {
        self.max_size = Some(bytes);
        self
    }

    /// Sets the HTTP request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Stores objects addressed by remote URLs under `root`.
    pub fn with_mirror(mut self, root: impl Into<PathBuf>) -> Self {
        self.mirror_root = Some(root.into());
        self
    }

    fn client(&self, url: &str) -> Result<&reqwest::blocking::Client, StorageError> {
        if let Some(client) = self.client.get() {
            return Ok(client);
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| StorageError::Network {
                url: url.to_owned(),
                message: e.to_string(),
            })?;
        Ok(self.client.get_or_init(|| client))
    }

    fn check_size(&self, url: &str, size: u64) -> Result<(), StorageError> {
        match self.max_size {
            Some(limit) if size > limit => Err(StorageError::TooLarge {
                url: url.to_owned(),
                size,
                limit,
            }),
            _ => Ok(()),
        }
    }

    fn fetch_local(&self, url: &str, path: &Path) -> Result<Vec<u8>, StorageError> {
        let io = |source| StorageError::Io {
            url: url.to_owned(),
            source,
        };
        let metadata = fs::metadata(path).map_err(io)?;
        self.check_size(url, metadata.len())?;
        fs::read(path).map_err(io)
    }

    fn fetch_remote(&self, url: &str, remote: Url) -> Result<Vec<u8>, StorageError> {
        let network = |e: reqwest::Error| StorageError::Network {
            url: url.to_owned(),
            message: e.to_string(),
        };
        log::debug!("UrlStorage: GET {}", remote);
        let response = self.client(url)?.get(remote).send().map_err(network)?;
        let status = response.status();
        if !status.is_success() {
            return Err(StorageError::HttpStatus {
                url: url.to_owned(),
                status: status.as_u16(),
            });
        }
        if let Some(length) = response.content_length() {
            self.check_size(url, length)?;
        }
        let bytes = response.bytes().map_err(network)?;
        self.check_size(url, bytes.len() as u64)?;
        Ok(bytes.to_vec())
    }

    fn mirror_path(&self, remote: &Url) -> Option<PathBuf> {
        let root = self.mirror_root.as_ref()?;
        let mut path = root.join(remote.host_str().unwrap_or("unknown-host"));
        for segment in remote.path_segments()?.filter(|s| !s.is_empty() && *s != "..") {
            path.push(segment);
        }
        Some(path)
    }
}

fn write_file(url: &str, path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    let io = |source| StorageError::Io {
        url: url.to_owned(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io)?;
    }
    fs::write(path, bytes).map_err(io)
}

impl ObjectStorage for UrlStorage {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, StorageError> {
        match locate(url)? {
            Location::Local(path) => self.fetch_local(url, &path),
            Location::Remote(remote) => self.fetch_remote(url, remote),
        }
    }

    fn store(&self, url: &str, bytes: &[u8]) -> Result<String, StorageError> {
        match locate(url)? {
            Location::Local(path) => {
                write_file(url, &path, bytes)?;
                Ok(url.to_owned())
            }
            Location::Remote(remote) => {
                let path = self
                    .mirror_path(&remote)
                    .ok_or_else(|| StorageError::NotWritable(url.to_owned()))?;
                write_file(url, &path, bytes)?;
                let stored = Url::from_file_path(&path)
                    .map_err(|_| StorageError::NotWritable(url.to_owned()))?;
                log::debug!("UrlStorage: mirrored {} to {}", url, stored);
                Ok(stored.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_urls_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let url = Url::from_file_path(dir.path().join("nested/a.glb"))
            .unwrap()
            .to_string();
        let storage = UrlStorage::new();
        assert_eq!(storage.store(&url, b"glTF").unwrap(), url);
        assert_eq!(storage.fetch(&url).unwrap(), b"glTF");
    }

    #[test]
    fn size_ceiling_is_enforced_before_reading() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.glb");
        fs::write(&path, vec![0u8; 64]).unwrap();
        let storage = UrlStorage::new().with_max_size(16);
        let err = storage.fetch(path.to_str().unwrap()).unwrap_err();
        assert!(matches!(err, StorageError::TooLarge { size: 64, limit: 16, .. }));
    }

    #[test]
    fn unknown_schemes_are_rejected() {
        let err = UrlStorage::new().fetch("ftp://host/a.glb").unwrap_err();
        assert!(matches!(err, StorageError::UnsupportedScheme { .. }));
        assert!(!err.is_transient());
    }

    #[test]
    fn remote_store_needs_a_mirror() {
        let err = UrlStorage::new()
            .store("https://assets.example.com/a.glb", b"x")
            .unwrap_err();
        assert!(matches!(err, StorageError::NotWritable(_)));

        let dir = tempfile::tempdir().unwrap();
        let storage = UrlStorage::new().with_mirror(dir.path());
        let stored = storage
            .store("https://assets.example.com/m/a.lod1.glb", b"x")
            .unwrap();
        assert!(stored.starts_with("file://"));
        assert!(dir.path().join("assets.example.com/m/a.lod1.glb").exists());
        assert_eq!(storage.fetch(&stored).unwrap(), b"x");
    }
}
