//! Document model the hints engine runs against
//!
//! This module stands in for the browser's DOM. It includes:
//! - ElementNode: serialized element description used to build pages
//! - DomTree: arena of nodes with mutation records and hit testing
//! - Page: one browsing context (document, viewport, page-context hooks)
//! - geometry: boxes, points and viewport-chain clipping

pub mod element;
pub mod geometry;
pub mod injected;
pub mod page;
pub mod tree;

pub use element::{ElementNode, Overflow, Position, ShadowMode, Style};
pub use geometry::{BoundingBox, Insets, Point, Viewport};
pub use injected::{InjectedEnvelope, InjectedMessage};
pub use page::{Activation, ActivationKind, FrameId, Page, PageFixture, ViewportSize};
pub use tree::{DomTree, MutationKind, MutationRecord, NodeId};
