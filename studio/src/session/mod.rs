//! Session lifecycle: status state machine, the held image, events and the
//! generation/upscale controllers that drive them.

mod events;
mod generation;
mod slot;
mod state_manager;
mod status;
mod upscale;

pub use events::{EventBus, SessionStateChanged};
pub use generation::{Generated, GenerationController, GenerationError};
pub use slot::{seed_label, CurrentImage, ImageSlot, ImageSnapshot, SEED_PLACEHOLDER};
pub use state_manager::{
    SessionEvent, SessionStateManager, SessionStatus, TransitionRejection, TransitionResult,
};
pub use status::{StatusIndicator, StatusInputs, Tone};
pub use upscale::{UpscaleController, UpscaleError, UpscaleInput, UpscaleOutcome, UPSCALED_MIME};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::params::ParameterModel;

/// Parameter model shared between the command surface and the controllers
pub type SharedParams = Arc<Mutex<ParameterModel>>;

/// Lock the parameters, recovering from poisoning
pub fn lock_params(params: &SharedParams) -> MutexGuard<'_, ParameterModel> {
    params.lock().unwrap_or_else(|e| e.into_inner())
}

/// Clears an in-flight flag when the request ends, however it ends
pub(crate) struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    /// Set the flag, or `None` if it was already set
    pub(crate) fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_flight_guard_clears_on_drop() {
        let flag = AtomicBool::new(false);

        let guard = InFlightGuard::acquire(&flag).unwrap();
        assert!(flag.load(Ordering::SeqCst));
        assert!(InFlightGuard::acquire(&flag).is_none());

        drop(guard);
        assert!(!flag.load(Ordering::SeqCst));
        assert!(InFlightGuard::acquire(&flag).is_some());
    }
}
