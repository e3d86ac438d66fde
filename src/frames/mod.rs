//! Cross-frame aggregation
//!
//! Every frame of a tab runs a [`FrameAgent`]. The top frame is asked to find
//! elements and fans the request out to its visible child frames, extending
//! the viewport chain on the way down; every frame reports to the controller
//! directly, which tracks the outstanding frames with [`PendingElements`].

pub mod agent;
pub mod index;
pub mod messages;
pub mod pending;

pub use agent::{FrameAgent, FrameOutput, resolve_url};
pub use index::{ElementIndex, IndexedElement};
pub use messages::{ElementUpdate, FrameAction, FromFrame, HintView, RendererMessage, SessionToken, ToFrame};
pub use pending::{PendingElements, PendingFrames};
