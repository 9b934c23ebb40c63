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

use anyhow::Result;
use serde::Serialize;

// ANSI color codes
pub const RESET: &str = "\x1b[0m";
pub const BOLD: &str = "\x1b[1m";
pub const GREEN: &str = "\x1b[32m";
pub const RED: &str = "\x1b[31m";
pub const BLUE: &str = "\x1b[34m";
pub const YELLOW: &str = "\x1b[33m";
pub const CYAN: &str = "\x1b[36m";
pub const MAGENTA: &str = "\x1b[35m";

// Visual symbols
pub const CHECK: &str = "✓";
pub const CROSS: &str = "✗";
pub const WARN: &str = "⚠";
pub const GEAR: &str = "⚙";
pub const MAGNIFIER: &str = "🔍";
pub const HAMMER: &str = "🔨";
pub const BRUSH: &str = "🎨";
pub const LADDER: &str = "🪜";
pub const PACKAGE: &str = "📦";
pub const SCROLL: &str = "📜";

pub fn print_task_start(task_name: &str, emoji: &str, color: &str) {
    eprintln!(
        "\n{}{}━━━ {} {} {}━━━{}",
        BOLD, color, emoji, task_name, emoji, RESET
    );
}

pub fn print_success(message: &str) {
    eprintln!("{}{} {} {}{}", BOLD, GREEN, CHECK, message, RESET);
}

pub fn print_warning(message: &str) {
    eprintln!("{}{} {} {}{}", BOLD, YELLOW, WARN, message, RESET);
}

pub fn print_error(message: &str) {
    eprintln!("{}{} {} {}{}", BOLD, RED, CROSS, message, RESET);
}

/// Writes `value` to stdout as indented JSON, so reports can be piped.
pub fn print_json(value: &impl Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Percentage with one decimal.
pub fn percent(ratio: f64) -> String {
    format!("{:.1}%", ratio * 100.0)
}
