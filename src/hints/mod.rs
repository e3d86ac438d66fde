//! Hint label assignment
//!
//! This module turns measured elements into hints. It includes:
//! - huffman: alphabet-radix prefix codes, heavier items first
//! - assign: ranking, combining by destination and applying codes
//! - matching: text filter and typed hint characters

pub mod assign;
pub mod huffman;
pub mod matching;

pub use assign::{AssignOptions, CombinePolicy, ElementWithHint, FrameRef, VisibleElement, assign_hints, combine};
pub use huffman::huffman_codes;
pub use matching::{HintMatch, filter_words, match_hint_chars, single_hint, text_matches};
