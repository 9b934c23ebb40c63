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

//! Simplification with meshoptimizer.

use super::SimplifierLibrary;
use crate::error::CodecError;

/// Size of one packed xyz position in bytes.
const POSITION_STRIDE: usize = 3 * std::mem::size_of::<f32>();

/// [`SimplifierLibrary`] backed by `meshopt::simplify`.
///
/// The simplifier collapses edges until the index count reaches the target
/// or the next collapse would exceed the relative error bound.
#[derive(Debug, Default, Clone, Copy)]
pub struct MeshoptSimplifier;

impl MeshoptSimplifier {
    pub fn new() -> Self {
        Self
    }

    fn failure(&self, message: impl ToString) -> CodecError {
        CodecError::Library {
            library: self.name().to_owned(),
            message: message.to_string(),
        }
    }
}

impl SimplifierLibrary for MeshoptSimplifier {
    fn name(&self) -> &str {
        "meshopt"
    }

    fn simplify(
        &self,
        indices: &[u32],
        positions: &[f32],
        target_index_count: usize,
        target_error: f32,
    ) -> Result<Vec<u32>, CodecError> {
        if positions.len() % 3 != 0 {
            return Err(self.failure("positions are not packed xyz triples"));
        }
        if indices.len() % 3 != 0 {
            return Err(self.failure("indices are not a triangle list"));
        }
        let vertex_count = positions.len() / 3;
        if let Some(&bad) = indices.iter().find(|&&i| i as usize >= vertex_count) {
            return Err(self.failure(format!(
                "index {bad} is out of range for {vertex_count} vertices"
            )));
        }
        if indices.len() <= target_index_count {
            return Ok(indices.to_vec());
        }

        let vertices = ::meshopt::VertexDataAdapter::new(
            ::meshopt::typed_to_bytes(positions),
            POSITION_STRIDE,
            0,
        )
        .map_err(|e| self.failure(e))?;
        let simplified = ::meshopt::simplify(indices, &vertices, target_index_count, target_error);
        log::debug!(
            "MeshoptSimplifier: {} -> {} indices (target {})",
            indices.len(),
            simplified.len(),
            target_index_count
        );
        Ok(simplified)
    }
}
