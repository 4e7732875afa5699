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

//! The storage-client interface the wide-row core is written against.
//!
//! The physical backend (column-family I/O, replication, retries) lives
//! behind [`CounterStore`]. This core only needs two primitives: a bounded
//! slice fetch over a row's columns and an atomic relative increment.

use std::io;

use crate::bounds::Boundary;

/// Opaque partition id of a wide row.
///
/// Owned by the caller and immutable for the row's lifetime.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RowId(Vec<u8>);

impl RowId {
    pub fn new(id: impl Into<Vec<u8>>) -> Self {
        Self(id.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<&str> for RowId {
    fn from(s: &str) -> Self {
        Self(s.as_bytes().to_vec())
    }
}

/// One column as returned by the storage client: the encoded column name and
/// the accumulated counter value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawColumn {
    pub name: Vec<u8>,
    pub value: i64,
}

impl RawColumn {
    pub fn new(name: impl Into<Vec<u8>>, value: i64) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// Storage client primitives for counter wide rows.
///
/// Implementations own transport, retries and timeouts; this core treats a
/// call as an opaque unit of latency and surfaces any failure as
/// `StorageUnavailable` without retrying.
#[async_trait::async_trait]
pub trait CounterStore: Send + Sync {
    /// Fetch up to `limit` columns of `row` between `low` and `high`
    /// (absolute column order, inclusivity per boundary).
    ///
    /// With `reversed` the scan starts at `high` and the returned columns
    /// are in descending name order; otherwise ascending. No columns in
    /// range is an empty result, not an error.
    async fn slice_fetch(
        &self,
        row: &RowId,
        low: &Boundary,
        high: &Boundary,
        limit: usize,
        reversed: bool,
    ) -> Result<Vec<RawColumn>, io::Error>;

    /// Atomically add `delta` to the counter column `name` of `row`.
    ///
    /// Either fully applies the delta or fails; there is no partial state.
    async fn atomic_increment(
        &self,
        row: &RowId,
        name: &[u8],
        delta: i64,
    ) -> Result<(), io::Error>;
}

#[async_trait::async_trait]
impl<T> CounterStore for &T
where T: CounterStore
{
    async fn slice_fetch(
        &self,
        row: &RowId,
        low: &Boundary,
        high: &Boundary,
        limit: usize,
        reversed: bool,
    ) -> Result<Vec<RawColumn>, io::Error> {
        (**self).slice_fetch(row, low, high, limit, reversed).await
    }

    async fn atomic_increment(
        &self,
        row: &RowId,
        name: &[u8],
        delta: i64,
    ) -> Result<(), io::Error> {
        (**self).atomic_increment(row, name, delta).await
    }
}

mod impls {
    use std::io;

    use crate::bounds::Boundary;
    use crate::store::CounterStore;
    use crate::store::RawColumn;
    use crate::store::RowId;

    /// Dummy implementation of [`CounterStore`] for `()`.
    /// So that () can be used as a placeholder where a [`CounterStore`] is expected.
    #[async_trait::async_trait]
    impl CounterStore for () {
        async fn slice_fetch(
            &self,
            _row: &RowId,
            _low: &Boundary,
            _high: &Boundary,
            _limit: usize,
            _reversed: bool,
        ) -> Result<Vec<RawColumn>, io::Error> {
            Ok(vec![])
        }

        async fn atomic_increment(
            &self,
            _row: &RowId,
            _name: &[u8],
            _delta: i64,
        ) -> Result<(), io::Error> {
            Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "placeholder store cannot increment",
            ))
        }
    }
}
