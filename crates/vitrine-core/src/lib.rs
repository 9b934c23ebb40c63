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

//! # Vitrine Core
//!
//! Foundational crate containing the asset records, the contracts of the
//! external collaborators (asset store, preset store, object storage, CDN),
//! and the types shared by every other Vitrine crate.
//!
//! Nothing in here performs I/O. Concrete implementations live in
//! `vitrine-io` (object storage) and `vitrine-infra` (stores, CDN).

#![warn(missing_docs)]

pub mod asset;
pub mod cdn;
pub mod preset;
pub mod storage;
pub mod store;

pub use asset::*;
pub use cdn::{AssetKind, CdnTransformer};
pub use preset::*;
pub use storage::{ObjectStorage, StorageError};
pub use store::{AssetStore, PresetStore, StoreError};
