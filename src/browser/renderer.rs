use crate::dom::geometry::BoundingBox;
use crate::dom::page::FrameId;
use crate::frames::messages::{HintView, RendererMessage};
use indexmap::IndexMap;

/// Paints hint labels from the controller's update stream
pub trait HintRenderer {
    fn render(&mut self, message: &RendererMessage);
}

/// Renderer that keeps what it was told and the picture that results
#[derive(Debug, Clone, Default)]
pub struct RecordingRenderer {
    messages: Vec<RendererMessage>,
    hints: IndexMap<usize, HintView>,
    text_rects: IndexMap<FrameId, Vec<BoundingBox>>,
    peeking: bool,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every message received, oldest first
    pub fn messages(&self) -> &[RendererMessage] {
        &self.messages
    }

    pub fn clear_messages(&mut self) {
        self.messages.clear();
    }

    /// All painted hints, including hidden ones, by element index
    pub fn hints(&self) -> &IndexMap<usize, HintView> {
        &self.hints
    }

    /// Hints a user would currently see
    pub fn visible_hints(&self) -> Vec<&HintView> {
        if self.peeking {
            return Vec::new();
        }
        self.hints.values().filter(|view| !view.hidden).collect()
    }

    pub fn hint_of(&self, index: usize) -> Option<&str> {
        self.hints.get(&index).map(|view| view.hint.as_str())
    }

    pub fn text_rects(&self, frame: FrameId) -> &[BoundingBox] {
        self.text_rects.get(&frame).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn is_peeking(&self) -> bool {
        self.peeking
    }

    pub fn is_rendered(&self) -> bool {
        !self.hints.is_empty()
    }
}

impl HintRenderer for RecordingRenderer {
    fn render(&mut self, message: &RendererMessage) {
        match message {
            RendererMessage::Render { hints } => {
                self.hints = hints.iter().map(|view| (view.index, view.clone())).collect();
                self.text_rects.clear();
                self.peeking = false;
            }
            RendererMessage::UpdateHints { updates } => {
                for view in updates {
                    self.hints.insert(view.index, view.clone());
                }
            }
            RendererMessage::RenderTextRects { frame, rects } => {
                if rects.is_empty() {
                    self.text_rects.shift_remove(frame);
                } else {
                    self.text_rects.insert(*frame, rects.clone());
                }
            }
            RendererMessage::Peek { peeking } => self.peeking = *peeking,
            RendererMessage::Unrender => {
                self.hints.clear();
                self.text_rects.clear();
                self.peeking = false;
            }
        }
        self.messages.push(message.clone());
    }
}
