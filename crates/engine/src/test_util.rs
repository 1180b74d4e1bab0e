// SPDX-License-Identifier: MIT

//! Shared fixtures for the engine's own tests.

use cue_core::{AgentPersona, FakeClock};
use cue_store::{migrations, Store};

use crate::Engine;

/// Engine over an in-memory store with the schema applied and the standard
/// three-phase registry seeded (workflow `w1`; architect/implementer/reviewer
/// personas).
pub(crate) fn engine() -> Engine<FakeClock> {
    let store = Store::open_in_memory().unwrap();
    migrations::apply_pending(&store).unwrap();
    let engine = Engine::with_clock(store, FakeClock::new());
    engine.register_workflow(&cue_core::test_support::three_phase("w1")).unwrap();
    for name in ["architect", "implementer", "reviewer"] {
        engine
            .register_agent(&AgentPersona {
                name: name.to_string(),
                description: format!("{name} persona"),
                content: format!("# {name}\nDo the {name} work."),
            })
            .unwrap();
    }
    engine
}

pub(crate) fn clock_of(engine: &Engine<FakeClock>) -> FakeClock {
    engine.clock_handle()
}
