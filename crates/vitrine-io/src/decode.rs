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

//! Accessor decoding on top of the `gltf` readers.
//!
//! The readers trust the document. An accessor that claims more elements
//! than its buffer view holds, a zero count, or a component type the reader
//! does not expect trips arithmetic or `unreachable!` inside `gltf`, so
//! every accessor goes through [`check_accessor`] before a reader sees it.

use crate::error::ContainerError;
use crate::model::{denormalize, AttributeFormat};
use gltf::accessor::{DataType, Dimensions, Item, Iter};
use gltf::mesh::Semantic;
use gltf::Accessor;

/// Largest element count accepted for one accessor.
pub(crate) const MAX_ELEMENTS: usize = 1 << 26;

/// Byte data of every buffer of a document, indexed like `buffers`.
pub(crate) type Buffers = [Vec<u8>];

/// Checks that `count` elements of `element` bytes starting at `offset`
/// fit inside `view`, and that `view` fits inside its buffer.
fn check_span(
    index: usize,
    view: &gltf::buffer::View<'_>,
    offset: usize,
    count: usize,
    element: usize,
    buffers: &Buffers,
) -> Result<(), ContainerError> {
    let stride = view.stride().unwrap_or(element);
    if stride < element {
        return Err(ContainerError::accessor(
            index,
            format!("stride {stride} is shorter than the {element}-byte element"),
        ));
    }
    let span = stride
        .checked_mul(count - 1)
        .and_then(|bytes| bytes.checked_add(element))
        .and_then(|bytes| bytes.checked_add(offset));
    let view_end = view.offset().checked_add(view.length());
    let buffer_len = buffers.get(view.buffer().index()).map_or(0, Vec::len);
    match (span, view_end) {
        (Some(span), Some(end)) if span <= view.length() && end <= buffer_len => Ok(()),
        _ => Err(ContainerError::accessor(
            index,
            format!("{count} elements overrun buffer view {}", view.index()),
        )),
    }
}

/// Verifies that every byte an accessor reads lies inside its buffer.
pub(crate) fn check_accessor(accessor: &Accessor<'_>, buffers: &Buffers) -> Result<(), ContainerError> {
    let index = accessor.index();
    let count = accessor.count();
    if count == 0 {
        return Err(ContainerError::accessor(index, "count is zero"));
    }
    if count > MAX_ELEMENTS {
        return Err(ContainerError::accessor(
            index,
            format!("count {count} exceeds the limit of {MAX_ELEMENTS}"),
        ));
    }
    let element = accessor.size();
    match (accessor.view(), accessor.sparse()) {
        (None, None) => {
            return Err(ContainerError::accessor(index, "has neither buffer view nor sparse data"))
        }
        (Some(view), _) => check_span(index, &view, accessor.offset(), count, element, buffers)?,
        (None, Some(_)) => {}
    }
    if let Some(sparse) = accessor.sparse() {
        let sparse_count = sparse.count();
        if sparse_count == 0 || sparse_count > count {
            return Err(ContainerError::accessor(
                index,
                format!("sparse count {sparse_count} is outside 1..={count}"),
            ));
        }
        let indices = sparse.indices();
        let index_size = indices.index_type().size();
        check_span(index, &indices.view(), indices.offset(), sparse_count, index_size, buffers)?;
        let values = sparse.values();
        check_span(index, &values.view(), values.offset(), sparse_count, element, buffers)?;
    }
    Ok(())
}

/// Checks the accessor type against what `semantic` allows and returns the
/// storage format to keep when writing.
pub(crate) fn attribute_format(
    semantic: &Semantic,
    accessor: &Accessor<'_>,
) -> Result<AttributeFormat, ContainerError> {
    let dimensions = accessor.dimensions();
    let data_type = accessor.data_type();
    let shape_ok = match semantic {
        Semantic::Positions | Semantic::Normals => dimensions == Dimensions::Vec3,
        Semantic::Tangents | Semantic::Joints(_) | Semantic::Weights(_) => {
            dimensions == Dimensions::Vec4
        }
        Semantic::TexCoords(_) => dimensions == Dimensions::Vec2,
        Semantic::Colors(_) => matches!(dimensions, Dimensions::Vec3 | Dimensions::Vec4),
        #[allow(unreachable_patterns)]
        _ => matches!(
            dimensions,
            Dimensions::Scalar | Dimensions::Vec2 | Dimensions::Vec3 | Dimensions::Vec4
        ),
    };
    if !shape_ok {
        return Err(ContainerError::accessor(
            accessor.index(),
            format!("{dimensions:?} is not a valid shape for {}", semantic.to_string()),
        ));
    }
    if matches!(semantic, Semantic::Joints(_)) && !matches!(data_type, DataType::U8 | DataType::U16) {
        return Err(ContainerError::accessor(
            accessor.index(),
            format!("joint indices cannot be stored as {data_type:?}"),
        ));
    }
    Ok(AttributeFormat {
        component_type: data_type,
        normalized: accessor.normalized() && data_type != DataType::F32,
    })
}

/// Checks that an index accessor holds unsigned scalars.
pub(crate) fn check_index_accessor(accessor: &Accessor<'_>) -> Result<(), ContainerError> {
    let data_type = accessor.data_type();
    if accessor.dimensions() != Dimensions::Scalar
        || !matches!(data_type, DataType::U8 | DataType::U16 | DataType::U32)
    {
        return Err(ContainerError::accessor(
            accessor.index(),
            format!(
                "indices must be unsigned scalars, found {:?} {data_type:?}",
                accessor.dimensions()
            ),
        ));
    }
    Ok(())
}

fn gather<'a, 's, T, F>(accessor: &Accessor<'a>, get: F) -> Option<Vec<f32>>
where
    T: Item + Copy + Into<f64>,
    F: Clone + Fn(gltf::Buffer<'a>) -> Option<&'s [u8]>,
{
    let data_type = accessor.data_type();
    let normalized = accessor.normalized();
    let convert = move |raw: T| {
        let raw = raw.into() as f32;
        if normalized {
            denormalize(data_type, raw)
        } else {
            raw
        }
    };
    let accessor = accessor.clone();
    Some(match accessor.dimensions() {
        Dimensions::Scalar => Iter::<T>::new(accessor, get)?.map(convert).collect(),
        Dimensions::Vec2 => Iter::<[T; 2]>::new(accessor, get)?.flatten().map(convert).collect(),
        Dimensions::Vec3 => Iter::<[T; 3]>::new(accessor, get)?.flatten().map(convert).collect(),
        Dimensions::Vec4 => Iter::<[T; 4]>::new(accessor, get)?.flatten().map(convert).collect(),
        _ => return None,
    })
}

/// Decodes any scalar or vector accessor to flat floats, applying the
/// normalization its `normalized` flag declares.
///
/// Returns `None` if the buffer data is unavailable. Callers check the
/// accessor with [`check_accessor`] first.
pub(crate) fn read_values<'a, 's, F>(accessor: &Accessor<'a>, get: F) -> Option<Vec<f32>>
where
    F: Clone + Fn(gltf::Buffer<'a>) -> Option<&'s [u8]>,
{
    match accessor.data_type() {
        DataType::I8 => gather::<i8, F>(accessor, get),
        DataType::U8 => gather::<u8, F>(accessor, get),
        DataType::I16 => gather::<i16, F>(accessor, get),
        DataType::U16 => gather::<u16, F>(accessor, get),
        DataType::U32 => gather::<u32, F>(accessor, get),
        DataType::F32 => gather::<f32, F>(accessor, get),
    }
}

/// Copies the elements of a dense accessor into a tightly packed buffer.
pub(crate) fn packed_bytes(accessor: &Accessor<'_>, buffers: &Buffers) -> Result<Vec<u8>, ContainerError> {
    check_accessor(accessor, buffers)?;
    let index = accessor.index();
    let view = match (accessor.view(), accessor.sparse()) {
        (Some(view), None) => view,
        _ => {
            return Err(ContainerError::accessor(
                index,
                "sparse storage is only supported on vertex attributes",
            ))
        }
    };
    let element = accessor.size();
    let stride = view.stride().unwrap_or(element);
    let data = buffers
        .get(view.buffer().index())
        .and_then(|buffer| buffer.get(view.offset()..view.offset() + view.length()))
        .ok_or_else(|| ContainerError::accessor(index, "buffer view is out of range"))?;
    let mut bytes = Vec::with_capacity(element * accessor.count());
    for element_index in 0..accessor.count() {
        let start = accessor.offset() + element_index * stride;
        let slice = data
            .get(start..start + element)
            .ok_or_else(|| ContainerError::accessor(index, "element is out of range"))?;
        bytes.extend_from_slice(slice);
    }
    Ok(bytes)
}
