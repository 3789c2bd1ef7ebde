//! Transaction lifecycle state machine

use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Phase of the current trade or deployment
///
/// `Idle → Approving? → Simulating → Submitted → Confirming → {Confirmed |
/// Failed | TimedOut}`. Once `Submitted`, the only exits are through
/// `Confirming`: a broadcast transaction cannot be withdrawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxPhase {
    Idle,
    Approving,
    Simulating,
    Submitted,
    Confirming,
    Confirmed,
    Failed,
    /// No receipt within the confirmation window; the outcome is unknown
    TimedOut,
}

impl TxPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Confirmed | Self::Failed | Self::TimedOut)
    }

    /// Whether anything has been broadcast in this phase
    pub fn is_committed(self) -> bool {
        matches!(self, Self::Submitted | Self::Confirming)
    }

    pub fn can_transition_to(self, next: TxPhase) -> bool {
        use TxPhase::*;
        match (self, next) {
            (Idle, Approving | Simulating | Failed) => true,
            (Approving, Simulating | Failed) => true,
            (Simulating, Submitted | Failed) => true,
            (Submitted, Confirming) => true,
            (Confirming, Confirmed | Failed | TimedOut) => true,
            (Confirmed | Failed | TimedOut, Idle) => true,
            _ => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Approving => "approving",
            Self::Simulating => "simulating",
            Self::Submitted => "submitted",
            Self::Confirming => "confirming",
            Self::Confirmed => "confirmed",
            Self::Failed => "failed",
            Self::TimedOut => "timed_out",
        }
    }
}

impl std::fmt::Display for TxPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shared cell holding the session's current phase
#[derive(Debug)]
pub(crate) struct PhaseCell(Mutex<TxPhase>);

impl PhaseCell {
    pub(crate) fn new() -> Self {
        Self(Mutex::new(TxPhase::Idle))
    }

    pub(crate) fn get(&self) -> TxPhase {
        *self.0.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Move to `next`, returning the previous phase
    ///
    /// Illegal transitions are logged and still applied so the observable
    /// phase always reflects what actually happened.
    pub(crate) fn advance(&self, next: TxPhase) -> TxPhase {
        let mut phase = self.0.lock().unwrap_or_else(|e| e.into_inner());
        let prev = *phase;
        if prev == next {
            return prev;
        }
        if !prev.can_transition_to(next) {
            warn!(from = %prev, to = %next, "Unexpected transaction phase transition");
        }
        *phase = next;
        prev
    }

    /// Return to `Idle` from a terminal phase at the start of a new operation
    pub(crate) fn reset(&self) {
        let mut phase = self.0.lock().unwrap_or_else(|e| e.into_inner());
        *phase = TxPhase::Idle;
    }
}
