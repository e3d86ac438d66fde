//! # browser-hints
//!
//! Keyboard-driven link hints for web pages: every clickable thing on screen
//! gets a short label, and typing the label activates it.
//!
//! ## Features
//!
//! - **Element catalog**: incremental classification of a document's
//!   elements, fed by mutation records and drained in deadline-bounded slices
//! - **Visibility tracking**: only elements intersecting the viewport are
//!   candidates
//! - **Placement**: where each hint goes, clipped through the chain of frame
//!   viewports, and how much it weighs
//! - **Label assignment**: alphabet-radix Huffman codes, so bigger targets get
//!   shorter hints
//! - **Cross-frame collection** with per-frame timeouts and stale-session
//!   filtering
//! - **Hints mode**: keystroke handling, text filtering, periodic
//!   re-measurement and per-mode activation
//!
//! ## Usage
//!
//! ```rust,no_run
//! use browser_hints::{BrowserSession, HintsMode, HintsOptions, PageFixture};
//! use std::time::Instant;
//!
//! # fn main() -> browser_hints::Result<()> {
//! let fixture = PageFixture::from_json(&std::fs::read_to_string("page.json")?)?;
//! let mut browser = BrowserSession::new(HintsOptions::new().chars("fjdk"))?;
//! let id = browser.open_tab(&fixture, Instant::now())?;
//!
//! let tab = browser.tab_mut(id)?;
//! tab.enter_hints(HintsMode::Click, Instant::now())?;
//! for hint in tab.renderer().visible_hints() {
//!     println!("{} at ({}, {})", hint.hint, hint.x, hint.y);
//! }
//! tab.type_keys("f", Instant::now())?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Overview
//!
//! - [`dom`]: document model the engine runs against
//! - [`catalog`]: element catalog and visibility tracker
//! - [`measure`]: hint placement and weights
//! - [`hints`]: label assignment and input matching
//! - [`frames`]: per-frame agent and cross-frame messages
//! - [`mode`]: hints-mode state machine
//! - [`browser`]: tabs, message routing and the renderer
//! - [`options`]: user options
//! - [`error`]: error types and result aliases

pub mod browser;
pub mod catalog;
pub mod dom;
pub mod error;
pub mod frames;
pub mod hints;
pub mod measure;
pub mod mode;
pub mod options;

pub use browser::{BrowserSession, HintRenderer, RecordingRenderer, TabId, TabSession};
pub use catalog::{ElementCatalog, ElementType, ElementTypes};
pub use dom::{BoundingBox, DomTree, ElementNode, FrameId, Page, PageFixture};
pub use error::{HintsError, Result};
pub use frames::{FrameAgent, FromFrame, HintView, RendererMessage, ToFrame};
pub use hints::{ElementWithHint, VisibleElement, assign_hints, huffman_codes};
pub use mode::{Effect, HintsController, HintsMode, HintsState, KeyPress};
pub use options::{HintsOptions, Timing};
