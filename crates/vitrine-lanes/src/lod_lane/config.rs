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

use crate::error::CodecError;
use serde::{Deserialize, Serialize};

/// Target of one detail level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LodConfig {
    /// Level index, 0 being full detail.
    pub level: u32,
    /// Fraction of the cleaned master's indices to keep, in `(0, 1]`.
    pub ratio: f32,
    /// Switch distance in meters.
    pub distance: f32,
    /// Simplification error tolerance, relative to the mesh extent.
    #[serde(default)]
    pub error: f32,
}

impl LodConfig {
    /// Creates a level configuration.
    pub const fn new(level: u32, ratio: f32, distance: f32, error: f32) -> Self {
        Self {
            level,
            ratio,
            distance,
            error,
        }
    }

    /// The three default levels: full detail, half, and a quarter.
    pub fn defaults() -> Vec<LodConfig> {
        vec![
            LodConfig::new(0, 1.0, 0.0, 0.0),
            LodConfig::new(1, 0.5, 10.0, 0.01),
            LodConfig::new(2, 0.25, 50.0, 0.02),
        ]
    }

    /// Whether this level asks for simplification.
    pub fn simplifies(&self) -> bool {
        self.ratio < 1.0
    }
}

/// Sorts `configs` by level and checks them: at least one level, unique
/// levels, ratios in `(0, 1]`, error tolerances not negative, switch
/// distances strictly increasing.
pub(crate) fn checked_levels(configs: &[LodConfig]) -> Result<Vec<LodConfig>, CodecError> {
    if configs.is_empty() {
        return Err(CodecError::InvalidLevels("no levels configured".into()));
    }
    let mut sorted = configs.to_vec();
    sorted.sort_by_key(|c| c.level);
    for config in &sorted {
        if !(config.ratio > 0.0 && config.ratio <= 1.0) {
            return Err(CodecError::InvalidLevels(format!(
                "level {} ratio {} is outside (0, 1]",
                config.level, config.ratio
            )));
        }
        if config.error < 0.0 {
            return Err(CodecError::InvalidLevels(format!(
                "level {} has a negative error tolerance",
                config.level
            )));
        }
    }
    for pair in sorted.windows(2) {
        if pair[0].level == pair[1].level {
            return Err(CodecError::InvalidLevels(format!(
                "level {} is configured twice",
                pair[0].level
            )));
        }
        if pair[1].distance <= pair[0].distance {
            return Err(CodecError::InvalidLevels(format!(
                "level {} switches at {} m, not beyond level {} at {} m",
                pair[1].level, pair[1].distance, pair[0].level, pair[0].distance
            )));
        }
    }
    Ok(sorted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_are_sorted_before_checking() {
        let configs = [LodConfig::new(2, 0.25, 50.0, 0.02), LodConfig::new(0, 1.0, 0.0, 0.0)];
        let sorted = checked_levels(&configs).unwrap();
        assert_eq!(sorted[0].level, 0);
        assert_eq!(sorted[1].level, 2);
    }

    #[test]
    fn non_increasing_distances_are_rejected() {
        let configs = [LodConfig::new(0, 1.0, 10.0, 0.0), LodConfig::new(1, 0.5, 10.0, 0.01)];
        assert!(matches!(checked_levels(&configs), Err(CodecError::InvalidLevels(_))));
    }

    #[test]
    fn ratios_must_be_fractions() {
        assert!(checked_levels(&[LodConfig::new(0, 0.0, 0.0, 0.0)]).is_err());
        assert!(checked_levels(&[LodConfig::new(0, 1.5, 0.0, 0.0)]).is_err());
        assert!(checked_levels(&[]).is_err());
        assert_eq!(checked_levels(&LodConfig::defaults()).unwrap().len(), 3);
    }
}
