//! Decides what the teleop link transmits each tick.
//!
//! [`ModeMachine`] turns pinch gestures into a streaming mode.
//! [`TeleopController`] owns the channel registry, gates connection
//! attempts, and on every healthy tick sends the auxiliary states followed
//! by the hand frames the current mode calls for. UI feedback leaves through
//! the [`Presentation`] trait as [`UiHints`].

pub mod attempt;
pub mod controller;
pub mod mode;
pub mod presentation;

pub use attempt::{AttemptGate, ConnectionAttempt};
pub use controller::{ControllerConfig, TeleopController, TickInput, TickOutcome, address_set};
pub use mode::{Gestures, Mode, ModeMachine, Transition};
pub use presentation::{Indicator, Presentation, UiHints};
