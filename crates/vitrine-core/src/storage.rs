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

//! URL-addressed object storage contract.
//!
//! The pipeline only ever passes URLs around. It assumes a URL can be fetched
//! over the protocol it was given in, and that derived artifacts can be stored
//! under a sibling URL.

use thiserror::Error;

/// Errors raised while fetching or storing objects.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The URL could not be parsed or has no usable path.
    #[error("invalid url '{0}'")]
    InvalidUrl(String),
    /// The URL scheme is not handled by this storage.
    #[error("unsupported url scheme '{scheme}' in '{url}'")]
    UnsupportedScheme {
        /// The offending scheme.
        scheme: String,
        /// The full URL.
        url: String,
    },
    /// A local file operation failed.
    #[error("i/o error on '{url}': {source}")]
    Io {
        /// The URL being accessed.
        url: String,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },
    /// A network request failed before a response was received.
    #[error("network error fetching '{url}': {message}")]
    Network {
        /// The URL being fetched.
        url: String,
        /// Transport error description.
        message: String,
    },
    /// The server answered with a non-success status.
    #[error("http status {status} fetching '{url}'")]
    HttpStatus {
        /// The URL being fetched.
        url: String,
        /// The HTTP status code.
        status: u16,
    },
    /// The object is larger than the caller allows.
    #[error("object '{url}' is {size} bytes, limit is {limit}")]
    TooLarge {
        /// The URL being fetched.
        url: String,
        /// Observed size.
        size: u64,
        /// Configured ceiling.
        limit: u64,
    },
    /// The target cannot be written to.
    #[error("cannot store to '{0}'")]
    NotWritable(String),
}

impl StorageError {
    /// Whether retrying the same request later may succeed.
    ///
    /// Network failures and server-side (5xx) or throttling (429) statuses are
    /// transient; everything else is permanent.
    pub fn is_transient(&self) -> bool {
        match self {
            StorageError::Network { .. } => true,
            StorageError::HttpStatus { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

/// Fetches and stores opaque byte objects by URL.
pub trait ObjectStorage: Send + Sync {
    /// Reads the whole object at `url`.
    fn fetch(&self, url: &str) -> Result<Vec<u8>, StorageError>;

    /// Writes `bytes` so they can be fetched back, and returns the URL they
    /// are reachable at. Implementations may return a different URL than the
    /// one requested (e.g. when remote targets are mirrored locally).
    fn store(&self, url: &str, bytes: &[u8]) -> Result<String, StorageError>;
}
