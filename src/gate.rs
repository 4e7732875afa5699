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

//! Per-operation admission policy for the counter surface.
//!
//! Counter wide rows support a deliberately narrow set of operations. Every
//! call is classified as an operation tag crossed with a consistency scope
//! and checked against one policy table. A rejected call clears the shared
//! [`FlushContext`] *before* the error is reported, so the next operation in
//! the same unit of work never sees stale overrides.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;

use crate::consistency::FlushContext;
use crate::error::UnsupportedKind;
use crate::error::WideRowError;

/// What a call is trying to do, as seen by the admission policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterOp {
    Get,
    Increment { with_ttl: bool },
    Find,
    FindKeys,
    FindValues,
    Iterate,
    Remove,
    RemoveRange,
    RemoveFirst,
    RemoveLast,
}

/// Whether the call carries a per-call consistency override.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpScope {
    Default,
    PerCall,
}

/// Gate shared by every operation of one counter wide row.
///
/// Holds the flush context of the surrounding unit of work; the scope that
/// owns the context provides the concurrency discipline, the mutex only
/// keeps the clear itself well-defined.
#[derive(Debug, Clone)]
pub struct ConsistencyGate {
    ctx: Arc<Mutex<FlushContext>>,
}

impl ConsistencyGate {
    pub fn new(ctx: Arc<Mutex<FlushContext>>) -> Self {
        Self { ctx }
    }

    /// Admit or reject an operation.
    ///
    /// On rejection the flush context is cleared first, then the structural
    /// error is returned. Admitted operations never touch the context here.
    /// In particular `Get` with a per-call level is admitted unchanged: the
    /// override is ignored rather than rejected.
    pub fn admit(&self, op: CounterOp, scope: OpScope) -> Result<(), WideRowError> {
        match verdict(op, scope) {
            None => Ok(()),
            Some(kind) => {
                self.clear_flush_context();
                Err(WideRowError::Unsupported(kind))
            }
        }
    }

    /// Clear pending state after a failed mutation.
    ///
    /// The increment path also uses this when the storage client fails
    /// mid-unit-of-work.
    pub fn clear_flush_context(&self) {
        self.ctx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn flush_context(&self) -> &Arc<Mutex<FlushContext>> {
        &self.ctx
    }
}

/// The policy table: `None` admits, `Some(kind)` rejects with that cause.
///
/// - Removal of counter columns is structurally unsupported, with or without
///   an override; the delete cause wins over the per-call cause.
/// - Increments never carry a TTL.
/// - Per-call consistency overrides are rejected everywhere except `Get`,
///   which normalizes the call to its default-level form.
fn verdict(op: CounterOp, scope: OpScope) -> Option<UnsupportedKind> {
    use CounterOp::*;

    match op {
        Remove | RemoveRange | RemoveFirst | RemoveLast => Some(UnsupportedKind::CounterDelete),
        Increment { with_ttl: true } => Some(UnsupportedKind::CounterTtl),
        Get => None,
        Increment { with_ttl: false } | Find | FindKeys | FindValues | Iterate => match scope {
            OpScope::Default => None,
            OpScope::PerCall => Some(UnsupportedKind::PerCallConsistency),
        },
    }
}
