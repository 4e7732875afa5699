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

//! Bounded slice fetches against the storage client.

use log::trace;
use log::warn;

use crate::bounds::Boundary;
use crate::error::WideRowError;
use crate::store::CounterStore;
use crate::store::RawColumn;
use crate::store::RowId;

/// Issue one bounded slice fetch and return the raw ordered columns.
///
/// Column content is not interpreted here. An empty result is not a failure.
/// A storage failure surfaces as `StorageUnavailable` and is not retried;
/// retry policy belongs to the storage client.
pub async fn fetch_slice<S>(
    store: &S,
    row: &RowId,
    low: &Boundary,
    high: &Boundary,
    limit: usize,
    reversed: bool,
) -> Result<Vec<RawColumn>, WideRowError>
where
    S: CounterStore + ?Sized,
{
    trace!(
        "fetch_slice row={:?} low={:?} high={:?} limit={} reversed={}",
        row,
        low,
        high,
        limit,
        reversed
    );

    let columns = store
        .slice_fetch(row, low, high, limit, reversed)
        .await
        .map_err(WideRowError::storage)?;

    if columns.len() > 1000 {
        warn!("fetch_slice returns big slice of len={}", columns.len());
    }

    Ok(columns)
}
