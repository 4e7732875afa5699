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

//! Projections from raw columns to caller-facing views.
//!
//! Three pure mappings over a fetched slice: key/value pairs, values only,
//! keys only. Input order is preserved and no I/O happens here.

use crate::codec::KeyCodec;
use crate::error::WideRowError;
use crate::store::RawColumn;

/// Read-only accumulated total of a counter column.
///
/// Deliberately not a mutable handle: changing a counter goes through the
/// atomic increment path, never through a projected value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct CounterValue(i64);

impl CounterValue {
    pub fn new(total: i64) -> Self {
        Self(total)
    }

    /// The accumulated total at the time of the read.
    pub fn get(&self) -> i64 {
        self.0
    }
}

impl From<CounterValue> for i64 {
    fn from(v: CounterValue) -> Self {
        v.0
    }
}

/// Decode columns into `(key, counter)` pairs, preserving order.
pub fn to_pairs<K, C>(codec: &C, columns: Vec<RawColumn>) -> Result<Vec<(K, CounterValue)>, WideRowError>
where C: KeyCodec<K> + ?Sized {
    columns
        .into_iter()
        .map(|col| {
            let key = decode_name(codec, &col.name)?;
            Ok((key, CounterValue::new(col.value)))
        })
        .collect()
}

/// Project columns to their counter values, preserving order.
pub fn to_values(columns: Vec<RawColumn>) -> Vec<CounterValue> {
    columns
        .into_iter()
        .map(|col| CounterValue::new(col.value))
        .collect()
}

/// Decode columns into keys only, preserving order.
pub fn to_keys<K, C>(codec: &C, columns: Vec<RawColumn>) -> Result<Vec<K>, WideRowError>
where C: KeyCodec<K> + ?Sized {
    columns
        .into_iter()
        .map(|col| decode_name(codec, &col.name))
        .collect()
}

fn decode_name<K, C>(codec: &C, name: &[u8]) -> Result<K, WideRowError>
where C: KeyCodec<K> + ?Sized {
    codec.decode(name).map_err(|e| WideRowError::ColumnCorrupted {
        reason: e.to_string(),
    })
}
