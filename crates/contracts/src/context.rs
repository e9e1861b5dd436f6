//! Execution context threaded through contract methods.

use crate::error::Result;
use carbonchain_core::{Address, EventLog, LedgerEvent};
use carbonchain_storage::StagedState;

/// Mutable view of one call in flight: staged state, caller identity and emitted events.
pub struct ExecutionContext<'s, 'a> {
    state: &'s mut StagedState<'a>,
    /// Immediate caller; an orchestrator when it forwards to a registry.
    caller: Address,
    /// Account that submitted the call.
    origin: Address,
    timestamp: u64,
    events: Vec<EventLog>,
}

impl<'s, 'a> ExecutionContext<'s, 'a> {
    pub fn new(state: &'s mut StagedState<'a>, origin: Address, timestamp: u64) -> Self {
        Self {
            state,
            caller: origin,
            origin,
            timestamp,
            events: Vec::new(),
        }
    }

    pub fn caller(&self) -> Address {
        self.caller
    }

    pub fn origin(&self) -> Address {
        self.origin
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn state(&self) -> &StagedState<'a> {
        &*self.state
    }

    pub fn state_mut(&mut self) -> &mut StagedState<'a> {
        &mut *self.state
    }

    pub fn emit(&mut self, emitter: Address, event: LedgerEvent) {
        self.events.push(EventLog::new(emitter, event));
    }

    pub fn events(&self) -> &[EventLog] {
        &self.events
    }

    pub fn into_events(self) -> Vec<EventLog> {
        self.events
    }

    /// Run `f` with `caller` as the immediate caller, restoring the previous one afterwards.
    pub fn as_caller<T>(
        &mut self,
        caller: Address,
        f: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        let previous = std::mem::replace(&mut self.caller, caller);
        let result = f(self);
        self.caller = previous;
        result
    }

    /// Run `f` as one unit: if it fails, every write and event it staged is rolled back.
    pub fn atomic<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let savepoint = self.state.savepoint();
        let emitted = self.events.len();
        let caller = self.caller;
        match f(self) {
            Ok(value) => Ok(value),
            Err(err) => {
                self.state.rollback_to(savepoint);
                self.events.truncate(emitted);
                self.caller = caller;
                Err(err)
            }
        }
    }
}
