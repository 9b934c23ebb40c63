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

use crate::model::{SceneModel, Semantic};
use gltf::json;
use glam::{Mat4, Quat, Vec3};

fn local_matrix(node: &json::Node) -> Mat4 {
    if let Some(matrix) = &node.matrix {
        return Mat4::from_cols_array(matrix);
    }
    let translation = node.translation.map_or(Vec3::ZERO, Vec3::from_array);
    let rotation = node
        .rotation
        .as_ref()
        .map_or(Quat::IDENTITY, |rotation| Quat::from_array(rotation.0));
    let scale = node.scale.map_or(Vec3::ONE, Vec3::from_array);
    Mat4::from_scale_rotation_translation(scale, rotation, translation)
}

/// Root nodes of the default scene, or every parentless node.
fn root_nodes(document: &json::Root) -> Vec<usize> {
    let scene = document.scene.map_or(0, |scene| scene.value());
    if let Some(scene) = document.scenes.get(scene) {
        return scene.nodes.iter().map(|node| node.value()).collect();
    }
    let mut is_child = vec![false; document.nodes.len()];
    for child in document
        .nodes
        .iter()
        .filter_map(|node| node.children.as_ref())
        .flatten()
    {
        if let Some(flag) = is_child.get_mut(child.value()) {
            *flag = true;
        }
    }
    (0..document.nodes.len()).filter(|&i| !is_child[i]).collect()
}

#[derive(Default)]
struct Bounds {
    min: Option<Vec3>,
    max: Option<Vec3>,
}

impl Bounds {
    fn include(&mut self, point: Vec3) {
        self.min = Some(self.min.map_or(point, |m| m.min(point)));
        self.max = Some(self.max.map_or(point, |m| m.max(point)));
    }

    fn center(&self) -> Option<Vec3> {
        Some((self.min? + self.max?) * 0.5)
    }
}

fn mesh_points(model: &SceneModel, mesh: usize) -> impl Iterator<Item = Vec3> + '_ {
    model
        .meshes
        .get(mesh)
        .into_iter()
        .flat_map(|m| m.primitives.iter())
        .filter_map(|p| p.attributes.get(&Semantic::Positions))
        .flat_map(|position| {
            (0..position.count()).map(move |v| Vec3::from_slice(position.vertex(v)))
        })
}

fn visit(model: &SceneModel, node: usize, parent: Mat4, depth: usize, bounds: &mut Bounds) {
    // Guards against malformed containers with cyclic hierarchies.
    if depth > 64 {
        return;
    }
    let Some(json) = model.document.nodes.get(node) else {
        return;
    };
    let world = parent * local_matrix(json);
    if let Some(mesh) = json.mesh {
        for point in mesh_points(model, mesh.value()) {
            bounds.include(world.transform_point3(point));
        }
    }
    for child in json.children.iter().flatten() {
        visit(model, child.value(), world, depth + 1, bounds);
    }
}

/// Moves the model so that its world-space bounding box is centred on the
/// origin. Returns the translation applied, or `None` when there is no
/// geometry.
///
/// Root nodes are translated; a container without nodes has its positions
/// shifted directly.
pub fn center(model: &mut SceneModel) -> Option<[f32; 3]> {
    let mut bounds = Bounds::default();
    let roots = root_nodes(&model.document);
    let nodeless = model.document.nodes.is_empty();
    if nodeless {
        for mesh in 0..model.meshes.len() {
            for point in mesh_points(model, mesh) {
                bounds.include(point);
            }
        }
    } else {
        for &root in &roots {
            visit(model, root, Mat4::IDENTITY, 0, &mut bounds);
        }
    }
    let offset = -bounds.center()?;

    if nodeless {
        for primitive in model.primitives_mut() {
            if let Some(position) = primitive.attributes.get_mut(&Semantic::Positions) {
                for vertex in position.values.chunks_exact_mut(3) {
                    vertex[0] += offset.x;
                    vertex[1] += offset.y;
                    vertex[2] += offset.z;
                }
            }
        }
    } else {
        for root in roots {
            let Some(node) = model.document.nodes.get_mut(root) else {
                continue;
            };
            if let Some(matrix) = &mut node.matrix {
                let moved = Mat4::from_translation(offset) * Mat4::from_cols_array(matrix);
                *matrix = moved.to_cols_array();
            } else {
                let translation = node.translation.map_or(Vec3::ZERO, Vec3::from_array);
                node.translation = Some((translation + offset).to_array());
            }
        }
    }
    Some(offset.to_array())
}
