//! The try-on session state machine.

use super::state::{AppState, CountdownTick, TryOnJob};
use super::timer::CountdownTimer;
use crate::capture::{self, FrameSource};
use crate::catalog::GarmentSource;
use crate::error::{AppError, Result};
use std::time::Duration;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

/// First value shown by the countdown.
pub const COUNTDOWN_FROM: u8 = 3;

/// Spacing between countdown beats.
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Transient state of the single try-on session.
///
/// The machine itself performs no I/O besides the frame capture at the end
/// of the countdown; the orchestrator runs the composition job it hands out
/// and reports the outcome through [`finish`](Self::finish).
pub struct TryOnSession {
    state: AppState,
    countdown: Option<u8>,
    captured_pose: Option<String>,
    generated_image: Option<String>,
    error: Option<String>,
    camera_error: Option<String>,

    camera: Option<Box<dyn FrameSource>>,
    pending: Option<GarmentSource>,

    timer: Option<CountdownTimer>,
    epoch: u64,
    tick_tx: UnboundedSender<CountdownTick>,
    tick_rx: UnboundedReceiver<CountdownTick>,

    countdown_from: u8,
    tick_period: Duration,
}

impl TryOnSession {
    pub fn new() -> Self {
        Self::with_timing(COUNTDOWN_FROM, TICK_PERIOD)
    }

    /// A session with a custom countdown start and beat spacing.
    pub fn with_timing(countdown_from: u8, tick_period: Duration) -> Self {
        let (tick_tx, tick_rx) = unbounded_channel();
        Self {
            state: AppState::Live,
            countdown: None,
            captured_pose: None,
            generated_image: None,
            error: None,
            camera_error: None,
            camera: None,
            pending: None,
            timer: None,
            epoch: 0,
            tick_tx,
            tick_rx,
            countdown_from: countdown_from.max(1),
            tick_period,
        }
    }

    /// Records the outcome of opening the camera.
    ///
    /// A failure is permanent for the session: the camera error stays set
    /// and every capture reports the surface as unavailable.
    pub fn attach_camera(&mut self, camera: Result<Box<dyn FrameSource>>) {
        match camera {
            Ok(source) => {
                self.camera = Some(source);
                self.camera_error = None;
            }
            Err(e) => {
                tracing::error!("Camera unavailable: {}", e);
                self.camera = None;
                self.camera_error = Some(e.user_message().to_string());
            }
        }
    }

    /// Starts a try-on for `garment`.
    ///
    /// Only possible while `Live`; otherwise nothing changes and `false`
    /// is returned. Must be called within a tokio runtime.
    pub fn start(&mut self, garment: GarmentSource) -> bool {
        if !self.state.accepts_selection() {
            tracing::debug!(state = ?self.state, "try-on already in progress, ignoring start");
            return false;
        }

        self.epoch += 1;
        self.pending = Some(garment);
        self.state = AppState::Countdown;
        self.countdown = Some(self.countdown_from);
        self.timer = Some(CountdownTimer::start(
            self.tick_period,
            self.epoch,
            self.tick_tx.clone(),
        ));

        tracing::debug!(epoch = self.epoch, "countdown started");
        true
    }

    /// Waits for the next countdown beat.
    ///
    /// Only resolves while a timer is armed; callers check
    /// [`state`](Self::state) first.
    pub async fn next_tick(&mut self) -> Option<CountdownTick> {
        self.tick_rx.recv().await
    }

    /// Advances the countdown by one beat.
    ///
    /// On the last beat the timer is cancelled and the frame is captured.
    /// A successful capture moves to `Loading` and returns the job to run;
    /// a failed one records the error and returns to `Live`. Beats from an
    /// earlier start, or arriving outside `Countdown`, are ignored.
    pub fn on_tick(&mut self, tick: CountdownTick) -> Option<TryOnJob> {
        if tick.epoch != self.epoch || self.state != AppState::Countdown {
            tracing::debug!(tick = tick.epoch, current = self.epoch, "ignoring stale tick");
            return None;
        }

        let remaining = self.countdown.unwrap_or(0);
        if remaining > 1 {
            self.countdown = Some(remaining - 1);
            return None;
        }

        self.timer = None;
        self.countdown = None;

        let Some(garment) = self.pending.take() else {
            self.abort(&AppError::CaptureUnavailable);
            return None;
        };

        match capture::capture(self.camera.as_deref()) {
            Ok(pose) => {
                self.captured_pose = Some(pose.clone());
                self.generated_image = None;
                self.error = None;
                self.state = AppState::Loading;
                tracing::debug!(epoch = self.epoch, "pose captured, composing");
                Some(TryOnJob {
                    epoch: self.epoch,
                    person: pose,
                    garment,
                })
            }
            Err(e) => {
                self.abort(&e);
                None
            }
        }
    }

    /// Reports the outcome of the job for `epoch`.
    ///
    /// `outcome` carries the base64 payload of the result image. Outcomes
    /// for another epoch, or arriving outside `Loading`, are ignored.
    pub fn finish(&mut self, epoch: u64, outcome: Result<String>) {
        if epoch != self.epoch || self.state != AppState::Loading {
            tracing::debug!(epoch, current = self.epoch, "ignoring stale composition outcome");
            return;
        }

        match outcome {
            Ok(payload) => {
                self.generated_image = Some(format!("data:image/png;base64,{payload}"));
                self.state = AppState::Result;
                tracing::debug!(epoch, "look ready");
            }
            Err(e) => {
                self.captured_pose = None;
                self.abort(&e);
            }
        }
    }

    /// Resets to the canonical `Live` state, cancelling any countdown.
    pub fn try_another(&mut self) {
        self.timer = None;
        self.pending = None;
        self.state = AppState::Live;
        self.countdown = None;
        self.captured_pose = None;
        self.generated_image = None;
        self.error = None;
    }

    /// Shows a user-facing error without changing state.
    pub fn report(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    fn abort(&mut self, e: &AppError) {
        tracing::error!("Try-on aborted: {}", e);
        self.timer = None;
        self.pending = None;
        self.countdown = None;
        self.error = Some(e.user_message().to_string());
        self.state = AppState::Live;
    }

    pub fn state(&self) -> AppState {
        self.state
    }

    pub fn countdown(&self) -> Option<u8> {
        self.countdown
    }

    pub fn captured_pose(&self) -> Option<&str> {
        self.captured_pose.as_deref()
    }

    pub fn generated_image(&self) -> Option<&str> {
        self.generated_image.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn camera_error(&self) -> Option<&str> {
        self.camera_error.as_deref()
    }

    /// Whether a countdown timer is armed.
    pub fn has_pending_timer(&self) -> bool {
        self.timer.is_some()
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }
}

impl Default for TryOnSession {
    fn default() -> Self {
        Self::new()
    }
}
