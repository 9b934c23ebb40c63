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

use crate::model::{Primitive, SceneModel, Semantic};
use std::collections::HashMap;

fn bbox_diagonal(primitive: &Primitive) -> f32 {
    let Some(position) = primitive.attributes.get(&Semantic::Positions) else {
        return 0.0;
    };
    let mut min = [f32::INFINITY; 3];
    let mut max = [f32::NEG_INFINITY; 3];
    for vertex in 0..position.count() {
        for (axis, &value) in position.vertex(vertex).iter().take(3).enumerate() {
            min[axis] = min[axis].min(value);
            max[axis] = max[axis].max(value);
        }
    }
    if position.count() == 0 {
        return 0.0;
    }
    (0..3)
        .map(|axis| (max[axis] - min[axis]).powi(2))
        .sum::<f32>()
        .sqrt()
}

fn weld_primitive(primitive: &mut Primitive, tolerance: f32) -> usize {
    let count = primitive.vertex_count();
    if count == 0 {
        return 0;
    }
    if let Err(reason) = primitive.check() {
        log::warn!("Weld: skipping inconsistent primitive: {reason}");
        return 0;
    }
    let diagonal = bbox_diagonal(primitive);
    let position_step = if diagonal > 0.0 {
        tolerance * diagonal
    } else {
        tolerance
    };

    let mut first_seen: HashMap<Vec<i64>, u32> = HashMap::with_capacity(count);
    let mut order = Vec::new();
    let mut remap = Vec::with_capacity(count);
    for vertex in 0..count {
        let mut key = Vec::new();
        for (semantic, attribute) in &primitive.attributes {
            let step = if *semantic == Semantic::Positions {
                position_step
            } else {
                tolerance
            };
            key.extend(
                attribute
                    .vertex(vertex)
                    .iter()
                    .map(|&v| (v / step).round() as i64),
            );
        }
        let new = *first_seen.entry(key).or_insert_with(|| {
            order.push(vertex);
            (order.len() - 1) as u32
        });
        remap.push(new);
    }

    let merged = count - order.len();
    if merged == 0 && primitive.indices.is_some() {
        return 0;
    }
    let indices = primitive
        .resolved_indices()
        .into_iter()
        .map(|old| remap.get(old as usize).copied().unwrap_or(old))
        .collect();
    primitive.compact(&order, indices);
    merged
}

/// Merges vertices whose every attribute agrees within `tolerance`, turning
/// non-indexed primitives into indexed ones. Returns the number of vertices
/// removed.
///
/// The tolerance is scaled by the primitive's bounding-box diagonal for
/// `POSITION` and used as-is for the other attributes.
pub fn weld(model: &mut SceneModel, tolerance: f32) -> usize {
    let tolerance = if tolerance > 0.0 { tolerance } else { f32::EPSILON };
    model
        .primitives_mut()
        .map(|primitive| weld_primitive(primitive, tolerance))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MeshData, VertexAttribute};
    use std::collections::BTreeMap;

    fn quad_as_two_triangles() -> SceneModel {
        // Two triangles sharing an edge, stored without indices.
        let positions = vec![
            0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, //
            0.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0,
        ];
        let mut attributes = BTreeMap::new();
        attributes.insert(Semantic::Positions, VertexAttribute::float(3, positions));
        SceneModel {
            meshes: vec![MeshData {
                primitives: vec![Primitive::triangles(attributes, None)],
                ..MeshData::default()
            }],
            ..SceneModel::default()
        }
    }

    #[test]
    fn coincident_vertices_are_merged() {
        let mut model = quad_as_two_triangles();
        assert_eq!(weld(&mut model, 1e-4), 2);
        let primitive = &model.meshes[0].primitives[0];
        assert_eq!(primitive.vertex_count(), 4);
        assert_eq!(primitive.indices, Some(vec![0, 1, 2, 0, 2, 3]));
        assert_eq!(primitive.triangle_count(), 2);
    }

    #[test]
    fn differing_normals_keep_vertices_apart() {
        let mut model = quad_as_two_triangles();
        let mut normals = vec![0.0, 0.0, 1.0].repeat(3);
        normals.extend([0.0, 1.0, 0.0].repeat(3));
        model.meshes[0].primitives[0]
            .attributes
            .insert(Semantic::Normals, VertexAttribute::float(3, normals));
        assert_eq!(weld(&mut model, 1e-4), 0);
        assert_eq!(model.vertex_count(), 6);
    }

    #[test]
    fn inconsistent_primitive_is_skipped_instead_of_indexed_out_of_range() {
        let mut model = quad_as_two_triangles();
        model.meshes[0].primitives[0]
            .attributes
            .insert(Semantic::Normals, VertexAttribute::float(3, vec![0.0, 0.0, 1.0]));
        assert_eq!(weld(&mut model, 1e-4), 0);
        assert_eq!(model.vertex_count(), 6);
    }
}
