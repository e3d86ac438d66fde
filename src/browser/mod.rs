//! Tabs and the collaborators hints mode talks to.
//!
//! A [`TabSession`] wires one [`HintsController`](crate::mode::HintsController)
//! to a frame agent per browsing context and to a [`HintRenderer`];
//! [`BrowserSession`] keeps one of those per open tab.

pub mod renderer;
pub mod session;

pub use renderer::{HintRenderer, RecordingRenderer};
pub use session::{BrowserSession, OpenedTab, TabId, TabSession};
