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

//! Naming conventions for derived artifacts.

/// Splits `url` into the part before any `?query` / `#fragment` and the rest.
fn split_suffix(url: &str) -> (&str, &str) {
    match url.find(['?', '#']) {
        Some(at) => url.split_at(at),
        None => (url, ""),
    }
}

/// Inserts `.{segment}` before the extension of the last path component.
///
/// `http://x/a.glb` with `lod1` becomes `http://x/a.lod1.glb`. Query strings
/// and fragments are kept; a name without extension gets the segment
/// appended.
pub fn insert_segment(url: &str, segment: &str) -> String {
    let (path, rest) = split_suffix(url);
    let name_start = path.rfind('/').map_or(0, |slash| slash + 1);
    let name = &path[name_start..];
    match name.rfind('.').filter(|&dot| dot > 0) {
        Some(dot) => {
            let at = name_start + dot;
            format!("{}.{}{}{}", &path[..at], segment, &path[at..], rest)
        }
        None => format!("{path}.{segment}{rest}"),
    }
}

/// URL of the level-of-detail container `level` derived from `url`.
pub fn lod_url(url: &str, level: u32) -> String {
    insert_segment(url, &format!("lod{level}"))
}

/// URL of the container with transcoded textures derived from `url`.
pub fn ktx2_url(url: &str) -> String {
    insert_segment(url, "ktx2")
}

/// URL of the geometry-compressed container derived from `url`.
pub fn draco_url(url: &str) -> String {
    insert_segment(url, "draco")
}

/// Last path component of `url`, without query or fragment.
pub fn file_name(url: &str) -> &str {
    let (path, _) = split_suffix(url);
    path.rsplit('/').next().unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segment_goes_before_the_extension() {
        assert_eq!(lod_url("http://x/a.glb", 1), "http://x/a.lod1.glb");
        assert_eq!(ktx2_url("file:///srv/m/chair.glb"), "file:///srv/m/chair.ktx2.glb");
    }

    #[test]
    fn query_and_dotted_directories_are_respected() {
        assert_eq!(
            lod_url("https://cdn.example.com/v1.2/model.glb?sig=abc", 2),
            "https://cdn.example.com/v1.2/model.lod2.glb?sig=abc"
        );
        assert_eq!(insert_segment("/data/v1.0/model", "lod0"), "/data/v1.0/model.lod0");
    }

    #[test]
    fn file_name_drops_the_query() {
        assert_eq!(file_name("http://x/dir/a.glb?v=2"), "a.glb");
        assert_eq!(file_name("a.glb"), "a.glb");
    }
}
