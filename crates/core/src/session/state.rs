//! Session state types and event definitions.

use crate::catalog::GarmentSource;

/// Current phase of the try-on flow.
///
/// The session follows a small state machine:
/// `Live` -> `Countdown` -> `Loading` -> `Result` -> `Live` (on "try another")
///
/// A capture failure leaves `Countdown` straight back to `Live`, a
/// composition failure leaves `Loading` back to `Live`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AppState {
    /// Mirror preview, waiting for a garment.
    #[default]
    Live,
    /// Counting down to the capture.
    Countdown,
    /// Waiting for the composition service.
    Loading,
    /// Showing the composed look.
    Result,
}

impl AppState {
    /// Whether a new try-on may start (garment selection and upload enabled).
    pub fn accepts_selection(self) -> bool {
        self == Self::Live
    }

    /// Guidance shown next to the wardrobe for this state.
    pub fn helper_text(self) -> Option<&'static str> {
        match self {
            Self::Live => None,
            Self::Countdown => Some("Strike the pose in the mirror!"),
            Self::Loading => Some("Generating your new look..."),
            Self::Result => Some("Looking good! Pick another item."),
        }
    }
}

/// One beat of the countdown timer.
///
/// Carries the epoch of the session start that armed the timer so a beat
/// queued before a cancel is recognised as stale.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CountdownTick {
    pub epoch: u64,
}

/// Work handed to the orchestrator once the pose has been captured.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TryOnJob {
    pub epoch: u64,
    /// Captured pose as a JPEG data URL.
    pub person: String,
    pub garment: GarmentSource,
}
