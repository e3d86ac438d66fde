//! Wire types exchanged between the controller, frames and the renderer.
//!
//! All of them are plain serde enums so they can cross a `postMessage`-style
//! boundary as JSON.

use crate::catalog::ElementTypes;
use crate::dom::geometry::{BoundingBox, Viewport};
use crate::dom::page::FrameId;
use crate::hints::assign::VisibleElement;
use crate::measure::{Align, HintMeasurements};
use rand::Rng;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Random token identifying one collection session. Replies carrying any
/// other token are stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct SessionToken(pub u64);

impl SessionToken {
    pub fn random() -> Self {
        Self(rand::thread_rng().r#gen())
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// What to do to an element a frame has reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum FrameAction {
    Click,
    Focus,
    Select,
}

/// Commands a frame accepts, from the controller or from its parent frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type")]
pub enum ToFrame {
    /// Controller to top frame: start discovery for a new session
    StartFindElements { token: SessionToken, types: ElementTypes },

    /// Parent frame to child frame: discover within this viewport chain
    FindElements {
        token: SessionToken,
        types: ElementTypes,
        viewports: Vec<Viewport>,
    },

    /// Re-measure the elements reported in this session
    UpdateElements { token: SessionToken },

    /// Report the boxes of text matching `words` inside the given elements
    GetTextRects {
        token: SessionToken,
        indexes: Vec<usize>,
        words: Vec<String>,
    },

    /// Activate a reported element by its frame-local index
    ActivateElement {
        token: SessionToken,
        index: usize,
        action: FrameAction,
    },

    /// The session is over
    ClearSession,
}

/// New measurements of one element; `None` once it is gone or off screen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementUpdate {
    pub index: usize,
    pub measurements: Option<HintMeasurements>,
    pub text: String,
}

/// Messages from a frame to the controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum FromFrame {
    /// A child frame received `FindElements` and is alive
    ReportVisibleFrame { token: SessionToken, frame: FrameId },

    /// A frame's discovery result; `num_frames` child frames were asked in
    /// turn
    ReportVisibleElements {
        token: SessionToken,
        frame: FrameId,
        elements: Vec<VisibleElement>,
        num_frames: usize,
        duration: Duration,
    },

    ReportUpdatedElements {
        token: SessionToken,
        frame: FrameId,
        updates: Vec<ElementUpdate>,
    },

    ReportTextRects {
        token: SessionToken,
        frame: FrameId,
        rects: Vec<BoundingBox>,
    },

    /// The frame's document is being unloaded
    PageLeave { frame: FrameId },
}

impl FromFrame {
    pub fn token(&self) -> Option<SessionToken> {
        match self {
            FromFrame::ReportVisibleFrame { token, .. }
            | FromFrame::ReportVisibleElements { token, .. }
            | FromFrame::ReportUpdatedElements { token, .. }
            | FromFrame::ReportTextRects { token, .. } => Some(*token),
            FromFrame::PageLeave { .. } => None,
        }
    }
}

/// One hint as the renderer should paint it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HintView {
    pub index: usize,
    pub hint: String,
    /// How many leading characters of `hint` have been typed
    pub matched_chars: usize,
    pub x: f64,
    pub y: f64,
    pub align: Align,
    pub max_x: f64,
    /// Stacking order: heavier hints are painted on top
    pub z: f64,
    pub hidden: bool,
    pub highlighted: bool,
}

/// Messages to the collaborator that paints hints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RendererMessage {
    /// Paint a fresh set of hints
    Render { hints: Vec<HintView> },
    /// Repaint only these hints
    UpdateHints { updates: Vec<HintView> },
    RenderTextRects { frame: FrameId, rects: Vec<BoundingBox> },
    Peek { peeking: bool },
    Unrender,
}
