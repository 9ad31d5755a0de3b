//! ==============================================================================
//! workflow - the three user-triggered sequences
//! ==============================================================================
//!
//! each workflow is: optional validation, optional credential lookup, one
//! network call, one notification. errors never escape a workflow; they are
//! turned into a Notification at the boundary.
//!
//! ```text
//!     session  ──saves──▶ credential store ◀──loads── reading / history
//!                                                         │
//!                                                    BatteryApi
//! ```
//!
//! ==============================================================================

pub mod history;
pub mod reading;
pub mod session;

pub use history::{HistoryOutcome, HistoryView, HistoryWorkflow, MountedHistory};
pub use reading::{ReadingReport, ReadingWorkflow};
pub use session::{SessionState, SessionWorkflow};

use std::sync::atomic::{AtomicBool, Ordering};

/// shown when a trigger fires while its previous request is still running
pub const BUSY: &str = "Requête déjà en cours";

/// marks a workflow busy for as long as it is alive
pub(crate) struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    /// None if the flag was already set
    pub(crate) fn try_begin(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_flight_flag_is_exclusive_and_released_on_drop() {
        let flag = AtomicBool::new(false);
        let guard = InFlight::try_begin(&flag).expect("first begin");
        assert!(InFlight::try_begin(&flag).is_none());
        drop(guard);
        assert!(InFlight::try_begin(&flag).is_some());
    }
}
