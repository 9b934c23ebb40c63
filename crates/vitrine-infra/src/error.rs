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

//! Errors raised by the infrastructure implementations.

use thiserror::Error;

/// Errors that can occur while loading fixtures.
#[derive(Debug, Error)]
pub enum InfraError {
    /// The fixture file could not be read.
    #[error("failed to read fixtures '{path}': {source}")]
    Io {
        /// File path.
        path: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// The fixture file is not valid fixture JSON.
    #[error("failed to parse fixtures '{path}': {source}")]
    Parse {
        /// File path.
        path: String,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },
}
