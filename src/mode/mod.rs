//! Hints mode: key handling, per-mode activation policy and the state
//! machine that drives a tab's frames and renderer.

pub mod controller;
pub mod keyboard;
pub mod policy;
pub mod state;

pub use controller::{Effect, HintsController};
pub use keyboard::{HintsAction, KeyBinding, KeyPress, Shortcut, action_for, default_key_bindings};
pub use policy::{ActivationPlan, AfterActivation, HintsMode};
pub use state::{Collecting, Hinting, HintsState, UpdatePoll};
