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

//! Provides a simple in-memory implementation of the storage interface.
//!
//! [`MemStore`] keeps counter columns in nested [`BTreeMap`]s. It's primarily
//! intended for testing and demonstration purposes, not for production use.

use std::collections::BTreeMap;
use std::io;
use std::ops::Bound;
use std::sync::Mutex;
use std::sync::PoisonError;

use crate::bounds::Boundary;
use crate::store::CounterStore;
use crate::store::RawColumn;
use crate::store::RowId;

/// In-memory counter store backed by a BTreeMap per row.
///
/// Column names are kept in lexicographic order, so slice fetches are plain
/// map range scans.
#[derive(Debug, Default)]
pub struct MemStore {
    rows: Mutex<BTreeMap<Vec<u8>, BTreeMap<Vec<u8>, i64>>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of columns stored for a row.
    pub fn column_count(&self, row: &RowId) -> usize {
        let rows = self.rows.lock().unwrap_or_else(PoisonError::into_inner);
        rows.get(row.as_bytes()).map_or(0, |columns| columns.len())
    }
}

#[async_trait::async_trait]
impl CounterStore for MemStore {
    async fn slice_fetch(
        &self,
        row: &RowId,
        low: &Boundary,
        high: &Boundary,
        limit: usize,
        reversed: bool,
    ) -> Result<Vec<RawColumn>, io::Error> {
        // An empty or inverted slice selects nothing. BTreeMap::range panics
        // on inverted bounds, so handle these before scanning.
        if low.name > high.name {
            return Ok(vec![]);
        }
        if low.name == high.name && !(low.inclusive && high.inclusive) {
            return Ok(vec![]);
        }

        let start = if low.inclusive {
            Bound::Included(low.name.clone())
        } else {
            Bound::Excluded(low.name.clone())
        };
        let end = if high.inclusive {
            Bound::Included(high.name.clone())
        } else {
            Bound::Excluded(high.name.clone())
        };

        let rows = self.rows.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(columns) = rows.get(row.as_bytes()) else {
            return Ok(vec![]);
        };

        let mut slice: Vec<RawColumn> = columns
            .range((start, end))
            .map(|(name, value)| RawColumn::new(name.clone(), *value))
            .collect();

        // The limit applies from the scan start, so reverse before cutting.
        if reversed {
            slice.reverse();
        }
        slice.truncate(limit);

        Ok(slice)
    }

    async fn atomic_increment(
        &self,
        row: &RowId,
        name: &[u8],
        delta: i64,
    ) -> Result<(), io::Error> {
        let mut rows = self.rows.lock().unwrap_or_else(PoisonError::into_inner);
        let columns = rows.entry(row.as_bytes().to_vec()).or_default();
        *columns.entry(name.to_vec()).or_insert(0) += delta;
        Ok(())
    }
}
