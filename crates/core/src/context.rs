//! Run Context
//!
//! Everything a tool may touch while it computes:
//!
//! 1. `Clock` / `IdGenerator` - injectable time and identity sources
//! 2. `ToolDefaults` - configured fallbacks for optional tool parameters
//! 3. `ToolContext` - per-run bundle of engine, clock, defaults and the
//!    cancellation token
//!
//! Tools receive a `&ToolContext` and cannot reach the output registry or
//! the map; only the orchestrator holds those.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Local, Utc};
use tokio_util::sync::CancellationToken;

use crate::engine::GeometryEngine;
use crate::error::{CoreError, CoreResult};

// ============================================================================
// Clock / IdGenerator
// ============================================================================

/// Source of the current local time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<FixedOffset>;
}

/// Wall clock in the host's local time zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }
}

/// Clock frozen at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    instant: DateTime<FixedOffset>,
}

impl FixedClock {
    pub fn new(instant: DateTime<FixedOffset>) -> Self {
        Self { instant }
    }

    /// 2024-01-01 at `hour:minute` UTC.
    pub fn at(hour: u32, minute: u32) -> Self {
        let secs = 1_704_067_200 + i64::from(hour) * 3600 + i64::from(minute) * 60;
        let instant = DateTime::<Utc>::from_timestamp(secs, 0).unwrap_or_default();
        Self::new(instant.fixed_offset())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        self.instant
    }
}

/// Source of unique output-layer ids.
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> String;
}

/// Random v4 UUIDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidIdGenerator;

impl IdGenerator for UuidIdGenerator {
    fn next_id(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

/// `{prefix}-1`, `{prefix}-2`, ... for deterministic tests.
#[derive(Debug)]
pub struct SequentialIdGenerator {
    prefix: String,
    counter: AtomicU64,
}

impl SequentialIdGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: AtomicU64::new(0),
        }
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn next_id(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        format!("{}-{}", self.prefix, n)
    }
}

// ============================================================================
// ToolDefaults
// ============================================================================

/// Fallbacks used when an optional tool parameter is left unset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToolDefaults {
    /// Union all buffers into one polygon
    pub buffer_dissolve: bool,
    /// Simplify tolerance in map units
    pub simplify_tolerance: f64,
    /// Densify maximum segment length, in the request's unit
    pub densify_segment_length: f64,
}

impl Default for ToolDefaults {
    fn default() -> Self {
        Self {
            buffer_dissolve: true,
            simplify_tolerance: 1.0,
            densify_segment_length: 100.0,
        }
    }
}

// ============================================================================
// ToolContext
// ============================================================================

/// Per-run context handed to a tool.
#[derive(Clone)]
pub struct ToolContext {
    run_id: String,
    engine: Arc<dyn GeometryEngine>,
    clock: Arc<dyn Clock>,
    defaults: ToolDefaults,
    cancel: CancellationToken,
}

impl ToolContext {
    pub fn new(run_id: impl Into<String>, engine: Arc<dyn GeometryEngine>) -> Self {
        Self {
            run_id: run_id.into(),
            engine,
            clock: Arc::new(SystemClock),
            defaults: ToolDefaults::default(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_defaults(mut self, defaults: ToolDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn engine(&self) -> &dyn GeometryEngine {
        self.engine.as_ref()
    }

    pub fn now(&self) -> DateTime<FixedOffset> {
        self.clock.now()
    }

    pub fn defaults(&self) -> &ToolDefaults {
        &self.defaults
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Fail with `Cancelled` once the run's token has fired.
    pub fn check_cancelled(&self, stage: &str) -> CoreResult<()> {
        if self.cancel.is_cancelled() {
            return Err(CoreError::cancelled(format!(
                "run {} cancelled during {}",
                self.run_id, stage
            )));
        }
        Ok(())
    }
}

impl std::fmt::Debug for ToolContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolContext")
            .field("run_id", &self.run_id)
            .field("defaults", &self.defaults)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}
