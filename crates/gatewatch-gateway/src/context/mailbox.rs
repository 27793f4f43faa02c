//! Per-request signal mailbox.
//!
//! One slot per [`Mechanism`]. The metrics stage installs a handler in each
//! slot before delegating; a protective stage further down the chain reports
//! its outcome and the handler runs synchronously. Reports are never
//! deduplicated: every call is a distinct outcome event.

use std::fmt;

use gatewatch_core::{Mechanism, Outcome};

/// Side-effect-only outcome handler.
pub type SignalHandler = Box<dyn Fn(Outcome) + Send + Sync>;

#[derive(Default)]
pub struct SignalMailbox {
    slots: [Option<SignalHandler>; Mechanism::COUNT],
}

impl SignalMailbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `handler` for `mechanism`. Returns true if a previous handler
    /// was replaced.
    pub fn install<F>(&mut self, mechanism: Mechanism, handler: F) -> bool
    where
        F: Fn(Outcome) + Send + Sync + 'static,
    {
        self.slots[mechanism.index()]
            .replace(Box::new(handler))
            .is_some()
    }

    /// Deliver `outcome` to the handler for `mechanism`. Returns false when no
    /// handler is installed (a no-op).
    pub fn report(&self, mechanism: Mechanism, outcome: Outcome) -> bool {
        match &self.slots[mechanism.index()] {
            Some(handler) => {
                handler(outcome);
                true
            }
            None => false,
        }
    }

    pub fn is_installed(&self, mechanism: Mechanism) -> bool {
        self.slots[mechanism.index()].is_some()
    }
}

impl fmt::Debug for SignalMailbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let installed: Vec<&str> = Mechanism::ALL
            .iter()
            .filter(|m| self.is_installed(**m))
            .map(|m| m.as_str())
            .collect();
        f.debug_struct("SignalMailbox")
            .field("installed", &installed)
            .finish()
    }
}
