use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::sync::RwLock;

use crate::actuator::{ActuatorBank, ActuatorId};
use crate::snapshot::MetricsSnapshot;

/// Maximum number of events retained in the ring buffer.
const MAX_EVENTS: usize = 200;

// ---------------------------------------------------------------------------
// Public type alias
// ---------------------------------------------------------------------------

pub type SharedState = Arc<RwLock<PanelState>>;

// ---------------------------------------------------------------------------
// Core types
// ---------------------------------------------------------------------------

/// Everything the panel knows, held only in process memory. Mutated solely
/// through the `record_*` reducers below so every poll/toggle outcome maps
/// to exactly one state transition.
pub struct PanelState {
    /// Replaced wholesale by each successful poll; `None` until the first.
    pub snapshot: Option<MetricsSnapshot>,
    /// Set if and only if a poll succeeds.
    pub last_update: Option<OffsetDateTime>,
    /// Single shared error slot; a newer error of either kind overwrites an
    /// older one, and any successful poll clears it.
    pub error: Option<SyncError>,
    /// Transient indicator for a manual refresh in flight.
    pub refreshing: bool,
    pub actuators: ActuatorBank,
    pub events: VecDeque<PanelEvent>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncError {
    Fetch,
    Command,
}

impl SyncError {
    /// Fixed operator-facing banner message.
    pub fn message(self) -> &'static str {
        match self {
            SyncError::Fetch => "Error obteniendo métricas desde el almacén remoto",
            SyncError::Command => "Error actualizando comando en el almacén remoto",
        }
    }
}

#[derive(Clone, Serialize)]
pub struct PanelEvent {
    #[serde(with = "time::serde::rfc3339")]
    pub ts: OffsetDateTime,
    pub kind: EventKind,
    pub detail: String,
}

#[derive(Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Poll,
    Command,
    Error,
}

// ---------------------------------------------------------------------------
// Construction & reducers
// ---------------------------------------------------------------------------

impl PanelState {
    pub fn new() -> Self {
        Self {
            snapshot: None,
            last_update: None,
            error: None,
            refreshing: false,
            actuators: ActuatorBank::default(),
            events: VecDeque::with_capacity(MAX_EVENTS),
        }
    }

    /// A poll came back with a parsable document. The snapshot is replaced
    /// wholesale; actuator slots are folded in under the sticky-merge rule,
    /// guarded by the epochs the poller captured before its read.
    pub fn record_poll_success(&mut self, snapshot: MetricsSnapshot, epochs_at_start: &[u64; 4]) {
        let observed = ActuatorId::ALL.map(|id| snapshot.commanded(id));
        self.actuators.apply_observed(&observed, epochs_at_start);
        self.snapshot = Some(snapshot);
        self.last_update = Some(OffsetDateTime::now_utc());
        self.error = None;
        self.push_event(EventKind::Poll, "metrics document refreshed".to_string());
    }

    /// A poll failed (transport, non-2xx, or unparsable body). Previous
    /// snapshot, timestamp, and actuator states are all retained.
    pub fn record_poll_failure(&mut self) {
        self.error = Some(SyncError::Fetch);
        self.push_event(EventKind::Error, "metrics fetch failed".to_string());
    }

    /// Optimistic half of a command dispatch: the slot reflects the
    /// operator's intent before the write is even attempted.
    pub fn record_toggle(&mut self, id: ActuatorId, desired: bool) {
        self.actuators.record_toggle(id, desired);
        let state_str = if desired { "ON" } else { "OFF" };
        self.push_event(EventKind::Command, format!("{id} set {state_str}"));
    }

    /// The remote write failed. The optimistic slot is deliberately left as
    /// the operator set it; only the next successful poll reconciles.
    pub fn record_write_failure(&mut self) {
        self.error = Some(SyncError::Command);
        self.push_event(EventKind::Error, "command write failed".to_string());
    }

    fn push_event(&mut self, kind: EventKind, detail: String) {
        if self.events.len() >= MAX_EVENTS {
            self.events.pop_front();
        }
        self.events.push_back(PanelEvent {
            ts: OffsetDateTime::now_utc(),
            kind,
            detail,
        });
    }
}

impl Default for PanelState {
    fn default() -> Self {
        Self::new()
    }
}

// ===========================================================================
// Tests
// ===========================================================================
