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

//! Consistency levels and the per-unit-of-work flush context.
//!
//! A [`FlushContext`] is owned by the surrounding request or session scope
//! and shared by every operation dispatched within that scope. It accumulates
//! pending consistency-level overrides for the current logical unit of work
//! and must be cleared whenever an operation is rejected, so that a retry
//! within the same scope observes no leaked partial state.

use serde::Deserialize;
use serde::Serialize;

/// Consistency level requested from the storage backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConsistencyLevel {
    Any,
    One,
    Two,
    Three,
    Quorum,
    LocalQuorum,
    EachQuorum,
    All,
}

impl Default for ConsistencyLevel {
    fn default() -> Self {
        ConsistencyLevel::One
    }
}

/// Read/write consistency configured on the counter value type itself.
///
/// Counter columns carry their consistency configuration here, at the value
/// level, which is why the wide-row surface rejects per-call overrides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConsistencyConfig {
    pub read: ConsistencyLevel,
    pub write: ConsistencyLevel,
}

/// Pending consistency state for one logical unit of work.
///
/// Created at the start of the unit of work, consulted and mutated by every
/// operation within it, and destroyed at the end regardless of outcome.
/// Accessed by a single logical thread of control at a time; the scope that
/// owns it provides the synchronization discipline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlushContext {
    read_override: Option<ConsistencyLevel>,
    write_override: Option<ConsistencyLevel>,
}

impl FlushContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage a read-level override for subsequent operations in this scope.
    pub fn set_read_level(&mut self, level: ConsistencyLevel) {
        self.read_override = Some(level);
    }

    /// Stage a write-level override for subsequent operations in this scope.
    pub fn set_write_level(&mut self, level: ConsistencyLevel) {
        self.write_override = Some(level);
    }

    /// Effective read level: the pending override, or the configured default.
    pub fn current_read_level(&self, config: &ConsistencyConfig) -> ConsistencyLevel {
        self.read_override.unwrap_or(config.read)
    }

    /// Effective write level: the pending override, or the configured default.
    pub fn current_write_level(&self, config: &ConsistencyConfig) -> ConsistencyLevel {
        self.write_override.unwrap_or(config.write)
    }

    /// Drop all pending state.
    ///
    /// Must run before an `Unsupported` rejection is reported; stale overrides
    /// in a reused context would corrupt the next operation's consistency
    /// decision.
    pub fn clear(&mut self) {
        self.read_override = None;
        self.write_override = None;
    }

    /// True when no override is pending.
    pub fn is_empty(&self) -> bool {
        self.read_override.is_none() && self.write_override.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flush_context_starts_empty() {
        let ctx = FlushContext::new();
        assert!(ctx.is_empty());
    }

    #[test]
    fn test_current_levels_fall_back_to_config() {
        let ctx = FlushContext::new();
        let config = ConsistencyConfig {
            read: ConsistencyLevel::Quorum,
            write: ConsistencyLevel::All,
        };

        assert_eq!(ctx.current_read_level(&config), ConsistencyLevel::Quorum);
        assert_eq!(ctx.current_write_level(&config), ConsistencyLevel::All);
    }

    #[test]
    fn test_overrides_take_precedence() {
        let mut ctx = FlushContext::new();
        let config = ConsistencyConfig::default();

        ctx.set_read_level(ConsistencyLevel::EachQuorum);
        ctx.set_write_level(ConsistencyLevel::Three);

        assert!(!ctx.is_empty());
        assert_eq!(ctx.current_read_level(&config), ConsistencyLevel::EachQuorum);
        assert_eq!(ctx.current_write_level(&config), ConsistencyLevel::Three);
    }

    #[test]
    fn test_clear_drops_all_pending_state() {
        let mut ctx = FlushContext::new();
        ctx.set_read_level(ConsistencyLevel::Two);
        ctx.set_write_level(ConsistencyLevel::Any);

        ctx.clear();

        assert!(ctx.is_empty());
        let config = ConsistencyConfig::default();
        assert_eq!(ctx.current_read_level(&config), ConsistencyLevel::One);
    }
}
