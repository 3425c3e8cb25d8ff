//! Actuator command dispatch: optimistic local update, then a
//! fire-and-forget partial write to the remote store.
//!
//! A failed write is surfaced through the shared error slot and nothing
//! else — the optimistic state stands, and the next successful poll is the
//! only reconciliation mechanism (last write wins, eventual reconciliation).

use tracing::{info, warn};

use crate::actuator::ActuatorId;
use crate::state::SharedState;
use crate::store::StoreClient;

/// Set one actuator's commanded state. Callers gate on the slot being
/// known (non-null); dispatches for different actuators are independent.
pub async fn set_actuator(
    client: &StoreClient,
    shared: &SharedState,
    id: ActuatorId,
    desired: bool,
) {
    // Optimistic: the control reflects intent with zero latency.
    shared.write().await.record_toggle(id, desired);
    info!(actuator = %id, desired, "command dispatched");

    if let Err(e) = client.patch_actuator(id, desired).await {
        warn!(actuator = %id, "command write failed: {e:#}");
        shared.write().await.record_write_failure();
    }
}

// ===========================================================================
// Tests
// ===========================================================================
