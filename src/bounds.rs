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

//! Range boundary construction.
//!
//! Callers describe a range in their own terms: a logical start key, a
//! logical end key, which endpoints are inclusive, and a scan direction.
//! The storage client only understands a `(low, high)` boundary pair in
//! absolute column order plus a `reversed` flag. [`range_boundaries`] is the
//! one place that mapping happens: for descending scans the logical start is
//! the *greater* key, so the boundary pair is swapped and each inclusivity
//! flag travels with its logical key.

use serde::Deserialize;
use serde::Serialize;

use crate::codec::KeyCodec;
use crate::error::WideRowError;

/// Which endpoints of a range are inclusive.
///
/// `Start` and `End` refer to the logical range the caller asked for, not to
/// absolute column order. For a descending scan the start is the greater key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoundingMode {
    InclusiveBoth,
    ExclusiveBoth,
    InclusiveStartOnly,
    InclusiveEndOnly,
}

impl BoundingMode {
    /// Inclusivity of the (logical start, logical end) endpoints.
    pub fn flags(&self) -> (bool, bool) {
        match self {
            BoundingMode::InclusiveBoth => (true, true),
            BoundingMode::ExclusiveBoth => (false, false),
            BoundingMode::InclusiveStartOnly => (true, false),
            BoundingMode::InclusiveEndOnly => (false, true),
        }
    }
}

/// Scan direction requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderingMode {
    Ascending,
    Descending,
}

impl OrderingMode {
    /// Whether the storage client must scan against column order.
    pub fn is_reverse(&self) -> bool {
        matches!(self, OrderingMode::Descending)
    }

    fn name(&self) -> &'static str {
        match self {
            OrderingMode::Ascending => "ascending",
            OrderingMode::Descending => "descending",
        }
    }
}

/// A wire-ready range endpoint: an encoded column name and whether columns
/// at exactly that name are part of the range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Boundary {
    pub name: Vec<u8>,
    pub inclusive: bool,
}

impl Boundary {
    pub fn inclusive(name: Vec<u8>) -> Self {
        Self {
            name,
            inclusive: true,
        }
    }

    pub fn exclusive(name: Vec<u8>) -> Self {
        Self {
            name,
            inclusive: false,
        }
    }
}

/// Boundary for a point lookup: matches exactly one column name.
///
/// Also serves as both ends of a zero-width range when a single column is
/// fetched through the slice primitive.
pub fn point_boundary<K, C>(codec: &C, key: &K) -> Boundary
where C: KeyCodec<K> + ?Sized {
    Boundary::inclusive(codec.encode(key))
}

/// Build the `(low, high)` boundary pair for a range scan, in absolute
/// column order as the storage client sees it.
///
/// Fails with [`WideRowError::RangeBounds`] when the endpoints contradict the
/// ordering: ascending scans require `start <= end`, descending scans require
/// `start >= end`. Equal endpoints are always valid. This validation lives
/// here rather than in the executor: only the builder sees both endpoints
/// and the mode at once.
pub fn range_boundaries<K, C>(
    codec: &C,
    start: &K,
    end: &K,
    bounds: BoundingMode,
    ordering: OrderingMode,
) -> Result<(Boundary, Boundary), WideRowError>
where
    K: Ord,
    C: KeyCodec<K> + ?Sized,
{
    check_bounds(start, end, ordering)?;

    let (start_inclusive, end_inclusive) = bounds.flags();
    let start_boundary = Boundary {
        name: codec.encode(start),
        inclusive: start_inclusive,
    };
    let end_boundary = Boundary {
        name: codec.encode(end),
        inclusive: end_inclusive,
    };

    // In a descending scan the logical start is the high end of the range.
    let pair = match ordering {
        OrderingMode::Ascending => (start_boundary, end_boundary),
        OrderingMode::Descending => (end_boundary, start_boundary),
    };
    Ok(pair)
}

/// Validate that `start` and `end` agree with the scan direction.
pub fn check_bounds<K: Ord>(
    start: &K,
    end: &K,
    ordering: OrderingMode,
) -> Result<(), WideRowError> {
    let out_of_order = match ordering {
        OrderingMode::Ascending => start > end,
        OrderingMode::Descending => start < end,
    };
    if out_of_order {
        let relation = match ordering {
            OrderingMode::Ascending => "greater than",
            OrderingMode::Descending => "less than",
        };
        return Err(WideRowError::RangeBounds {
            relation,
            ordering: ordering.name(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Utf8KeyCodec;

    fn s(x: impl ToString) -> String {
        x.to_string()
    }

    fn range(
        start: &str,
        end: &str,
        bounds: BoundingMode,
        ordering: OrderingMode,
    ) -> Result<(Boundary, Boundary), WideRowError> {
        range_boundaries(&Utf8KeyCodec, &s(start), &s(end), bounds, ordering)
    }

    #[test]
    fn test_point_boundary_is_inclusive() {
        let b = point_boundary(&Utf8KeyCodec, &s("k1"));
        assert_eq!(b, Boundary::inclusive(b"k1".to_vec()));
    }

    #[test]
    fn test_ascending_truth_table() {
        // (mode, low inclusive, high inclusive)
        let cases = [
            (BoundingMode::InclusiveBoth, true, true),
            (BoundingMode::ExclusiveBoth, false, false),
            (BoundingMode::InclusiveStartOnly, true, false),
            (BoundingMode::InclusiveEndOnly, false, true),
        ];

        for (mode, low_inc, high_inc) in cases {
            let (low, high) = range("a", "z", mode, OrderingMode::Ascending).unwrap();
            assert_eq!(low.name, b"a".to_vec(), "{mode:?}");
            assert_eq!(low.inclusive, low_inc, "{mode:?}");
            assert_eq!(high.name, b"z".to_vec(), "{mode:?}");
            assert_eq!(high.inclusive, high_inc, "{mode:?}");
        }
    }

    #[test]
    fn test_descending_swaps_pair_and_flags() {
        // Logical start is "z", logical end is "a". The wire pair must come
        // out in absolute order with each flag still attached to its key.
        let cases = [
            (BoundingMode::InclusiveBoth, true, true),
            (BoundingMode::ExclusiveBoth, false, false),
            // Start-only inclusive: "z" (the start) is included.
            (BoundingMode::InclusiveStartOnly, false, true),
            // End-only inclusive: "a" (the end) is included.
            (BoundingMode::InclusiveEndOnly, true, false),
        ];

        for (mode, low_inc, high_inc) in cases {
            let (low, high) = range("z", "a", mode, OrderingMode::Descending).unwrap();
            assert_eq!(low.name, b"a".to_vec(), "{mode:?}");
            assert_eq!(low.inclusive, low_inc, "{mode:?}");
            assert_eq!(high.name, b"z".to_vec(), "{mode:?}");
            assert_eq!(high.inclusive, high_inc, "{mode:?}");
        }
    }

    #[test]
    fn test_equal_endpoints_always_valid() {
        for ordering in [OrderingMode::Ascending, OrderingMode::Descending] {
            let (low, high) = range("m", "m", BoundingMode::InclusiveBoth, ordering).unwrap();
            assert_eq!(low.name, high.name);
        }
    }

    #[test]
    fn test_ascending_rejects_reversed_endpoints() {
        let err = range("z", "a", BoundingMode::InclusiveBoth, OrderingMode::Ascending)
            .unwrap_err();
        assert!(matches!(err, WideRowError::RangeBounds { .. }));
    }

    #[test]
    fn test_descending_rejects_forward_endpoints() {
        let err = range("a", "z", BoundingMode::InclusiveBoth, OrderingMode::Descending)
            .unwrap_err();
        assert!(matches!(err, WideRowError::RangeBounds { .. }));
    }

    #[test]
    fn test_reverse_flag_derivation() {
        assert!(!OrderingMode::Ascending.is_reverse());
        assert!(OrderingMode::Descending.is_reverse());
    }
}
