// SPDX-License-Identifier: MIT

//! Shared fixtures for the store's own tests.

use cue_core::{Execution, ExecutionId};

use crate::{executions, migrations, Store};

/// In-memory store with the full schema applied.
pub(crate) fn store() -> Store {
    let store = Store::open_in_memory().unwrap();
    migrations::apply_pending(&store).unwrap();
    store
}

/// Insert a minimal running execution so FK-bearing rows have a parent.
pub(crate) fn seed_execution(store: &Store, id: &str) -> Execution {
    let mut execution = Execution::new(ExecutionId::from_string(id), "w1", 1_000);
    execution.transition(cue_core::ExecutionState::Running, 1_000).unwrap();
    store.with_conn(|conn| executions::insert(conn, &execution)).unwrap();
    execution
}
