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

//! Optional CDN collaborator used to rewrite public URLs.

use serde::{Deserialize, Serialize};

/// The kind of object a URL points at, used to pick CDN behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    /// A master or derived model container.
    Model,
    /// A container carrying transcoded textures.
    Texture,
    /// A level-of-detail container.
    Lod,
    /// An HDR environment map.
    Environment,
}

/// Rewrites origin URLs to edge URLs and reports the cache policy per kind.
pub trait CdnTransformer: Send + Sync {
    /// Returns the URL clients should fetch `url` from.
    fn transform_url(&self, url: &str, kind: AssetKind) -> String;

    /// HTTP cache headers to attach to responses serving `kind`.
    fn cache_headers(&self, kind: AssetKind) -> Vec<(String, String)>;
}
