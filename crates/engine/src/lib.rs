// SPDX-License-Identifier: MIT

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! cue-engine: the workflow engine behind the operation surface.
//!
//! The [`Engine`] owns nothing but a [`Store`] handle, a clock, and policy --
//! every piece of run state lives in the store, which is what makes
//! cross-restart resumption free. Methods are grouped by concern across
//! modules: sequencing (start/advance), lifecycle (timeouts, resume),
//! queries, logging, findings, artifacts, and registry operations.

use cue_core::{Clock, SystemClock, TelemetryEvent};
use cue_store::Store;
use tracing::warn;

pub mod artifacts;
pub mod error;
pub mod escalation;
pub mod findings;
pub mod lifecycle;
pub mod logger;
pub mod machine;
pub mod queries;
pub mod registry;
pub mod sequencer;
pub mod token;

#[cfg(test)]
mod test_util;

pub use artifacts::NewArtifact;
pub use error::EngineError;
pub use escalation::EscalationPolicy;
pub use findings::NewFinding;
pub use logger::{ContractDirection, ContractSchemas};
pub use queries::{CurrentStep, ExecutionStatus};
pub use sequencer::{AdvanceOutcome, StartRequest, StepCue};
pub use token::{TokenPayload, TokenService, CLOCK_SKEW_MS, TOKEN_TTL_MS};

/// The workflow engine. Cheap to clone.
#[derive(Clone)]
pub struct Engine<C: Clock = SystemClock> {
    store: Store,
    tokens: TokenService,
    clock: C,
    escalation: EscalationPolicy,
    contracts: Option<std::sync::Arc<ContractSchemas>>,
}

impl Engine<SystemClock> {
    pub fn new(store: Store) -> Self {
        Self::with_clock(store, SystemClock)
    }
}

impl<C: Clock> Engine<C> {
    pub fn with_clock(store: Store, clock: C) -> Self {
        Self {
            store,
            tokens: TokenService,
            clock,
            escalation: EscalationPolicy::default(),
            contracts: None,
        }
    }

    pub fn with_escalation(mut self, policy: EscalationPolicy) -> Self {
        self.escalation = policy;
        self
    }

    /// Load contract schemas for log validation.
    pub fn with_contracts(mut self, schemas: ContractSchemas) -> Self {
        self.contracts = Some(std::sync::Arc::new(schemas));
        self
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// A handle to the engine's clock. Fake clocks share state across
    /// clones, so tests can steer time from outside.
    pub fn clock_handle(&self) -> C {
        self.clock.clone()
    }

    pub(crate) fn now_ms(&self) -> u64 {
        self.clock.epoch_ms()
    }

    /// Best-effort telemetry append outside any transaction. Failures are
    /// logged, never propagated.
    pub(crate) fn record_telemetry(&self, event: TelemetryEvent) {
        let result = self.store.with_conn(|conn| cue_store::telemetry::insert(conn, &event));
        if let Err(e) = result {
            warn!(event_type = %event.event_type, error = %e, "telemetry append failed");
        }
    }

    /// Best-effort telemetry append on an existing connection, for events
    /// that should commit together with the operation that caused them.
    pub(crate) fn record_telemetry_on(
        &self,
        conn: &cue_store::Connection,
        event: TelemetryEvent,
    ) {
        if let Err(e) = cue_store::telemetry::insert(conn, &event) {
            warn!(event_type = %event.event_type, error = %e, "telemetry append failed");
        }
    }
}
