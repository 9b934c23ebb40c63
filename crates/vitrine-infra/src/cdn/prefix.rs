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

use vitrine_core::{AssetKind, CdnTransformer};

/// Cache policy of model, LOD and texture containers.
const IMMUTABLE: &str = "public, max-age=31536000, immutable";
/// Cache policy of environment maps.
const ENVIRONMENT: &str = "public, max-age=86400";

/// Serves every URL under `origin` from `base_url` instead.
///
/// URLs outside `origin` (other hosts, site-relative paths) pass through
/// unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixCdn {
    origin: String,
    base_url: String,
}

impl PrefixCdn {
    /// Creates a transformer rewriting `origin` to `base_url`.
    pub fn new(origin: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            base_url: base_url.into(),
        }
    }

    /// The prefix being replaced.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// The replacement prefix.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl CdnTransformer for PrefixCdn {
    fn transform_url(&self, url: &str, _kind: AssetKind) -> String {
        match url.strip_prefix(&self.origin) {
            Some(rest) if !self.origin.is_empty() => format!("{}{}", self.base_url, rest),
            _ => url.to_owned(),
        }
    }

    fn cache_headers(&self, kind: AssetKind) -> Vec<(String, String)> {
        let policy = match kind {
            AssetKind::Model | AssetKind::Lod | AssetKind::Texture => IMMUTABLE,
            AssetKind::Environment => ENVIRONMENT,
        };
        vec![
            ("Cache-Control".to_owned(), policy.to_owned()),
            ("Access-Control-Allow-Origin".to_owned(), "*".to_owned()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_urls_under_the_origin_are_rewritten() {
        let cdn = PrefixCdn::new("https://storage.example.com/", "https://cdn.example.com/");

        assert_eq!(
            cdn.transform_url("https://storage.example.com/a/chair.glb", AssetKind::Model),
            "https://cdn.example.com/a/chair.glb"
        );
        assert_eq!(
            cdn.transform_url("/environments/studio.hdr", AssetKind::Environment),
            "/environments/studio.hdr"
        );
        assert_eq!(
            cdn.transform_url("https://other.example.com/x.glb", AssetKind::Lod),
            "https://other.example.com/x.glb"
        );
    }

    #[test]
    fn empty_origin_rewrites_nothing() {
        let cdn = PrefixCdn::new("", "https://cdn.example.com/");
        assert_eq!(cdn.transform_url("a.glb", AssetKind::Model), "a.glb");
    }

    #[test]
    fn derived_artifacts_are_cached_for_a_year() {
        let cdn = PrefixCdn::new("a", "b");
        let model = cdn.cache_headers(AssetKind::Lod);
        let hdr = cdn.cache_headers(AssetKind::Environment);

        assert_eq!(model[0].1, IMMUTABLE);
        assert_eq!(hdr[0].1, ENVIRONMENT);
    }
}
