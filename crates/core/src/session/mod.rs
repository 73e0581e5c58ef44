//! Try-on session orchestration.
//!
//! # Architecture
//!
//! - [`state`]: state and event types
//! - [`timer`]: the cancellable countdown timer task
//! - [`machine`]: [`TryOnSession`], the `live → countdown → loading → result`
//!   state machine
//!
//! Only one try-on is in flight at a time: [`TryOnSession::start`] refuses
//! to run unless the session is `Live`. The countdown timer is owned by the
//! session and dropped on every path out of `Countdown`, which aborts it.

mod machine;
mod state;
mod timer;

pub use machine::{COUNTDOWN_FROM, TICK_PERIOD, TryOnSession};
pub use state::{AppState, CountdownTick, TryOnJob};
pub use timer::CountdownTimer;
