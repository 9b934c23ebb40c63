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

//! Working directories for external tools.
//!
//! Every adapter call gets its own directory under a shared root. The
//! directory is a [`tempfile::TempDir`], so it disappears when the call
//! returns, whether it succeeded or not. Directories left behind by a killed
//! process are removed by [`ScratchSpace::sweep_stale`].

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

/// Name prefix of every session directory.
pub const SESSION_PREFIX: &str = "vitrine-";

/// A root directory holding per-call scratch directories.
#[derive(Debug, Clone)]
pub struct ScratchSpace {
    root: PathBuf,
}

impl ScratchSpace {
    /// Uses `root`, creating it if needed.
    pub fn new(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// A scratch root under the system temporary directory.
    pub fn system() -> io::Result<Self> {
        Self::new(std::env::temp_dir().join("vitrine-scratch"))
    }

    /// The root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Creates a fresh directory, removed when the returned guard drops.
    pub fn session(&self) -> io::Result<TempDir> {
        tempfile::Builder::new()
            .prefix(SESSION_PREFIX)
            .tempdir_in(&self.root)
    }

    /// Removes session directories last modified more than `max_age` ago.
    /// Returns how many were removed.
    pub fn sweep_stale(&self, max_age: Duration) -> io::Result<usize> {
        let now = SystemTime::now();
        let mut removed = 0;
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let name = entry.file_name();
            if !name.to_string_lossy().starts_with(SESSION_PREFIX) {
                continue;
            }
            let metadata = entry.metadata()?;
            if !metadata.is_dir() {
                continue;
            }
            let age = metadata
                .modified()
                .ok()
                .and_then(|modified| now.duration_since(modified).ok())
                .unwrap_or_default();
            if age >= max_age {
                match fs::remove_dir_all(entry.path()) {
                    Ok(()) => removed += 1,
                    Err(e) => log::warn!(
                        "ScratchSpace: could not remove stale {}: {}",
                        entry.path().display(),
                        e
                    ),
                }
            }
        }
        if removed > 0 {
            log::info!(
                "ScratchSpace: swept {} stale directories from {}",
                removed,
                self.root.display()
            );
        }
        Ok(removed)
    }
}
