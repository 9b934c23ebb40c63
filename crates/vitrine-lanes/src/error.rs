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

//! Errors raised by the codec adapters.

use thiserror::Error;
use vitrine_core::StorageError;
use vitrine_io::ContainerError;

/// Errors that can occur while running a codec adapter.
///
/// Only input problems and container fetch/parse failures reach the caller.
/// Tool and library failures are absorbed by the tier fallback and appear
/// in logs and per-item outcomes instead.
#[derive(Debug, Error)]
pub enum CodecError {
    /// An option is outside its accepted range.
    #[error("option '{name}' = {value} is outside {range}")]
    InvalidOption {
        /// Option name.
        name: &'static str,
        /// Offending value.
        value: String,
        /// Human-readable accepted range.
        range: &'static str,
    },
    /// The LOD level configuration is inconsistent.
    #[error("invalid level configuration: {0}")]
    InvalidLevels(String),
    /// The container could not be parsed or written.
    #[error(transparent)]
    Container(#[from] ContainerError),
    /// The container could not be fetched or the result stored.
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// Local file handling around a tool run failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    /// An external tool could not be started or exited unsuccessfully.
    #[error("{tool} failed: {message}")]
    Tool {
        /// Program name.
        tool: String,
        /// Exit status and the tail of its error output.
        message: String,
    },
    /// A registered codec library returned an error.
    #[error("codec library '{library}' failed: {message}")]
    Library {
        /// Library name.
        library: String,
        /// Its error message.
        message: String,
    },
    /// A tool or library produced something that is not a usable artifact.
    #[error("invalid codec output: {0}")]
    InvalidOutput(String),
}

impl CodecError {
    /// Whether running the same call again later may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, CodecError::Storage(e) if e.is_transient())
    }

    pub(crate) fn invalid(name: &'static str, value: impl ToString, range: &'static str) -> Self {
        CodecError::InvalidOption {
            name,
            value: value.to_string(),
            range,
        }
    }
}
