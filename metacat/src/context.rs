// Copyright Andeya Lee 2024
//
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.
//! Request-scoped execution context carried into every catalog call.
//!
//! A context scopes the in-flight calls of one [`Session`](crate::Session):
//! an optional deadline bounds each call, and trace identifiers connect
//! client-side events to whatever the embedding application logs. The
//! connection layer imposes no timeout of its own; a fresh context carries no
//! deadline until the caller sets one.

use std::fmt;
use std::time::{Duration, Instant};

/// A unique identifier for one logical trace tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TraceId(u128);

impl TraceId {
    /// Generates a random trace id.
    pub fn random() -> Self {
        TraceId(rand::random())
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

/// A unique identifier for one span within a trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SpanId(u64);

impl SpanId {
    /// Generates a random span id.
    pub fn random() -> Self {
        SpanId(rand::random())
    }
}

impl fmt::Display for SpanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// The context of a catalog session's calls.
#[derive(Debug, Clone, Copy)]
#[non_exhaustive]
pub struct Context {
    /// When the call must be complete. `None` means the client imposes no
    /// bound of its own; enforcement is entirely the caller's choice.
    pub deadline: Option<Instant>,
    /// Identifies the trace the calls belong to.
    pub trace_id: TraceId,
    /// Identifies the current span within the trace.
    pub span_id: SpanId,
}

impl Context {
    /// Returns a fresh root context with random trace identifiers and no
    /// deadline.
    pub fn new_root() -> Self {
        Self {
            deadline: None,
            trace_id: TraceId::random(),
            span_id: SpanId::random(),
        }
    }

    /// Returns this context with the deadline set to `deadline`.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Returns this context with the deadline set `timeout` from now.
    pub fn with_deadline_after(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Time left until the deadline, if one is set. A deadline in the past
    /// yields a zero budget.
    pub fn time_remaining(&self) -> Option<Duration> {
        self.deadline.map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new_root()
    }
}
