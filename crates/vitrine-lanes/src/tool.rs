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

//! External tool discovery and invocation.
//!
//! Tool availability is adapter state: each adapter owns a [`ToolSlot`] that
//! asks its [`ToolLocator`] once and caches the answer. Tests inject
//! [`NoTools`] to exercise the fallback tiers without touching `PATH`.

use crate::error::CodecError;
use serde::Serialize;
use std::collections::HashMap;
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::{Arc, OnceLock};

/// Finds external programs.
pub trait ToolLocator: Send + Sync {
    /// Returns the executable for `program`, if available.
    fn locate(&self, program: &str) -> Option<PathBuf>;
}

/// Searches `PATH`, honouring per-program overrides.
#[derive(Debug, Clone, Default)]
pub struct PathLocator {
    overrides: HashMap<String, PathBuf>,
}

impl PathLocator {
    /// A locator that only searches `PATH`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses `path` for `program` instead of searching. A relative path
    /// containing no separator is looked up on `PATH` under that name.
    pub fn with_override(mut self, program: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.overrides.insert(program.into(), path.into());
        self
    }

    fn search_path(name: &Path) -> Option<PathBuf> {
        let paths = std::env::var_os("PATH")?;
        std::env::split_paths(&paths).find_map(|dir| {
            let candidate = dir.join(name);
            if candidate.is_file() {
                return Some(candidate);
            }
            let windows = candidate.with_extension("exe");
            windows.is_file().then_some(windows)
        })
    }
}

impl ToolLocator for PathLocator {
    fn locate(&self, program: &str) -> Option<PathBuf> {
        match self.overrides.get(program) {
            Some(path) if path.components().count() > 1 => {
                path.is_file().then(|| path.clone())
            }
            Some(name) => Self::search_path(name),
            None => Self::search_path(Path::new(program)),
        }
    }
}

/// A locator that never finds anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTools;

impl ToolLocator for NoTools {
    fn locate(&self, _program: &str) -> Option<PathBuf> {
        None
    }
}

/// One external program, located lazily and at most once.
pub struct ToolSlot {
    program: String,
    locator: Arc<dyn ToolLocator>,
    located: OnceLock<Option<PathBuf>>,
}

impl fmt::Debug for ToolSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolSlot")
            .field("program", &self.program)
            .field("located", &self.located.get())
            .finish()
    }
}

impl ToolSlot {
    /// A slot for `program`, resolved through `locator` on first use.
    pub fn new(program: impl Into<String>, locator: Arc<dyn ToolLocator>) -> Self {
        Self {
            program: program.into(),
            locator,
            located: OnceLock::new(),
        }
    }

    /// The program name.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// The resolved executable, if the host has it.
    pub fn path(&self) -> Option<&Path> {
        self.located
            .get_or_init(|| {
                let found = self.locator.locate(&self.program);
                match &found {
                    Some(path) => log::info!("ToolSlot: using {} at {}", self.program, path.display()),
                    None => log::info!("ToolSlot: {} not found, CLI tier disabled", self.program),
                }
                found
            })
            .as_deref()
    }

    /// Runs the program with `args`, failing on a non-zero exit.
    pub fn run(&self, args: &[OsString]) -> Result<(), CodecError> {
        let path = self.path().ok_or_else(|| CodecError::Tool {
            tool: self.program.clone(),
            message: "not installed".into(),
        })?;
        run_tool(&self.program, path, args)
    }
}

fn run_tool(program: &str, path: &Path, args: &[OsString]) -> Result<(), CodecError> {
    log::debug!(
        "Tool: {} {}",
        path.display(),
        args.iter()
            .map(|a| a.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ")
    );
    let output = Command::new(path)
        .args(args)
        .output()
        .map_err(|e| CodecError::Tool {
            tool: program.to_owned(),
            message: format!("could not start: {e}"),
        })?;
    if output.status.success() {
        return Ok(());
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    let tail: String = stderr
        .chars()
        .rev()
        .take(400)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    Err(CodecError::Tool {
        tool: program.to_owned(),
        message: format!("{}: {}", output.status, tail.trim()),
    })
}

/// How an artifact was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    /// By the external command-line tool.
    Cli,
    /// By a registered in-process library.
    Library,
    /// By the cleanup-only fallback.
    Simulated,
    /// Nothing was done because the input already had the target encoding.
    Skipped,
}

impl Method {
    /// The method name as reported in results.
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Cli => "cli",
            Method::Library => "library",
            Method::Simulated => "simulated",
            Method::Skipped => "skipped",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The tiers to try, best first. The simulated tier always comes last.
pub(crate) fn tiers(cli_available: bool, library_available: bool) -> Vec<Method> {
    let mut tiers = Vec::with_capacity(3);
    if cli_available {
        tiers.push(Method::Cli);
    }
    if library_available {
        tiers.push(Method::Library);
    }
    tiers.push(Method::Simulated);
    tiers
}

/// Shorthand for building tool argument lists.
pub(crate) fn args<I, S>(items: I) -> Vec<OsString>
where
    I: IntoIterator<Item = S>,
    S: Into<OsString>,
{
    items.into_iter().map(Into::into).collect()
}
