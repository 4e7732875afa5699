// Copyright 2021 Datafuse Labs
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

//! # Wide Row
//!
//! Range queries and counter columns for sparse wide rows.
//!
//! A wide row is a partition holding an unbounded, sparsely populated,
//! lexicographically ordered set of columns. This library provides keyed
//! access to the *counter* columns of such a row: point reads, atomic
//! relative increments, bounded range reads in either direction, and lazy
//! paged iteration, together with the admission policy that keeps the
//! counter surface narrow (no removal, no TTL, no per-call consistency).
//!
//! ## Core Components
//!
//! - [`CounterMap`]: the per-row counter surface
//! - [`CounterStore`]: the storage-client interface the core is written against
//! - [`KeyCodec`]: order-preserving column-key encoding
//! - [`PagedIter`]: lazy batch-prefetching range iteration
//! - [`FlushContext`]: per-unit-of-work consistency state, cleared on rejection
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::sync::Mutex;
//!
//! use widerow::impls::mem::MemStore;
//! use widerow::BoundingMode;
//! use widerow::ConsistencyConfig;
//! use widerow::CounterMap;
//! use widerow::FlushContext;
//! use widerow::OrderingMode;
//! use widerow::RowId;
//! use widerow::Utf8KeyCodec;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), widerow::WideRowError> {
//!     let ctx = Arc::new(Mutex::new(FlushContext::new()));
//!     let map = CounterMap::new(
//!         RowId::from("user:42"),
//!         Utf8KeyCodec,
//!         MemStore::new(),
//!         ctx,
//!         ConsistencyConfig::default(),
//!     );
//!
//!     // Bump a counter
//!     map.increment(&"visits".to_string(), 1).await?;
//!
//!     // Read it back
//!     let total = map.get(&"visits".to_string()).await?;
//!
//!     // Range scan
//!     let page = map
//!         .find(
//!             &"a".to_string(),
//!             &"z".to_string(),
//!             100,
//!             BoundingMode::InclusiveBoth,
//!             OrderingMode::Ascending,
//!         )
//!         .await?;
//!
//!     Ok(())
//! }
//! ```

use futures_util::stream::BoxStream;

pub mod bounds;
pub mod codec;
pub mod consistency;
pub mod counter_map;
pub mod error;
pub mod executor;
pub mod gate;
pub mod impls;
pub mod paging;
pub mod project;
pub mod store;

pub use crate::bounds::Boundary;
pub use crate::bounds::BoundingMode;
pub use crate::bounds::OrderingMode;
pub use crate::codec::KeyCodec;
pub use crate::codec::U64KeyCodec;
pub use crate::codec::Utf8KeyCodec;
pub use crate::consistency::ConsistencyConfig;
pub use crate::consistency::ConsistencyLevel;
pub use crate::consistency::FlushContext;
pub use crate::counter_map::CounterMap;
pub use crate::error::UnsupportedKind;
pub use crate::error::WideRowError;
pub use crate::paging::PagedIter;
pub use crate::project::CounterValue;
pub use crate::store::CounterStore;
pub use crate::store::RawColumn;
pub use crate::store::RowId;

/// A key-value pair projected from a counter column.
pub type CounterKV<K> = (K, CounterValue);

/// A stream of projected counter columns, as produced by
/// [`PagedIter::into_stream`].
pub type CounterResultStream<'a, K> = BoxStream<'a, Result<CounterKV<K>, WideRowError>>;
