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

//! Error types for wide-row counter access.

/// The capability a counter column structurally does not have.
///
/// Counter columns reject whole families of operations, not individual
/// malformed calls. The three causes stay distinguishable so that callers
/// can tell a forbidden mutation apart from a misplaced consistency setting.
#[derive(Clone, Copy, PartialEq, Eq, thiserror::Error, Debug)]
pub enum UnsupportedKind {
    /// Counter columns are only ever changed by relative increment.
    #[error("cannot remove counter value")]
    CounterDelete,

    /// Counter columns do not expire.
    #[error("cannot write counter value with ttl")]
    CounterTtl,

    /// Consistency for counters is configured on the counter value itself,
    /// not per call on the wide-row surface.
    #[error("set the consistency level on the counter value instead of per call")]
    PerCallConsistency,
}

/// Errors reported by wide-row counter operations.
///
/// None of these are retried internally:
/// - [`RangeBounds`](Self::RangeBounds) is a caller bug.
/// - [`StorageUnavailable`](Self::StorageUnavailable) is recoverable by the
///   caller's own retry policy.
/// - [`Unsupported`](Self::Unsupported) is structural and never succeeds.
/// - [`ColumnCorrupted`](Self::ColumnCorrupted) means the backend returned a
///   column name the codec cannot parse.
#[derive(Clone, PartialEq, Eq, thiserror::Error, Debug)]
pub enum WideRowError {
    /// Start and end keys contradict the requested ordering.
    #[error("range bounds out of order: start must not be {relation} end for {ordering} scans")]
    RangeBounds {
        relation: &'static str,
        ordering: &'static str,
    },

    /// The storage client failed to serve the request.
    #[error("storage unavailable: {reason}")]
    StorageUnavailable { reason: String },

    /// The operation is not part of the counter surface.
    #[error("unsupported counter operation: {0}")]
    Unsupported(#[from] UnsupportedKind),

    /// A fetched column name failed to decode.
    #[error("corrupted column name: {reason}")]
    ColumnCorrupted { reason: String },
}

impl WideRowError {
    /// Wrap a storage client failure.
    pub fn storage(err: impl std::fmt::Display) -> Self {
        Self::StorageUnavailable {
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_kinds_stay_distinguishable() {
        let delete = WideRowError::from(UnsupportedKind::CounterDelete);
        let ttl = WideRowError::from(UnsupportedKind::CounterTtl);
        let level = WideRowError::from(UnsupportedKind::PerCallConsistency);

        assert_ne!(delete, ttl);
        assert_ne!(delete, level);
        assert_ne!(ttl, level);

        assert!(delete.to_string().contains("remove"));
        assert!(ttl.to_string().contains("ttl"));
        assert!(level.to_string().contains("consistency level"));
    }

    #[test]
    fn test_storage_error_carries_reason() {
        let err = WideRowError::storage(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "node down",
        ));
        assert_eq!(err, WideRowError::StorageUnavailable {
            reason: "node down".to_string()
        });
    }
}
