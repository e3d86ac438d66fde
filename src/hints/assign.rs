use crate::catalog::ElementType;
use crate::dom::page::FrameId;
use crate::hints::huffman::huffman_codes;
use crate::hints::matching::{filter_weight, text_matches};
use crate::measure::HintMeasurements;
use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Where an element lives: its frame and its index within that frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct FrameRef {
    pub id: FrameId,
    pub index: usize,
}

/// One measured on-screen element, as a frame reports it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct VisibleElement {
    pub element_type: ElementType,
    pub measurements: HintMeasurements,
    pub has_click_listener: bool,
    /// Link destination, for combining
    pub url: Option<String>,
    /// Label text, matched against the text filter
    pub text: String,
    pub frame: FrameRef,
}

/// A visible element with the hint it currently shows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementWithHint {
    /// Tab-wide index, stable for one hints session
    pub index: usize,
    pub element: VisibleElement,
    pub hint: String,
    /// Filtered out by the current text filter
    pub hidden: bool,
}

impl ElementWithHint {
    pub fn new(index: usize, element: VisibleElement) -> Self {
        Self {
            index,
            element,
            hint: String::new(),
            hidden: false,
        }
    }

    pub fn weight(&self) -> f64 {
        self.element.measurements.weight
    }
}

/// When elements with the same destination may share a hint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CombinePolicy {
    /// Every element gets its own hint
    Never,
    /// Links to the same URL share a hint unless they are in-page anchors or
    /// have click listeners of their own
    SameUrl,
}

impl CombinePolicy {
    /// Grouping key of an element, or `None` if it must stand alone
    fn key(self, element: &VisibleElement) -> Option<&str> {
        match self {
            CombinePolicy::Never => None,
            CombinePolicy::SameUrl => {
                let url = element.url.as_deref()?;
                let combinable = element.element_type == ElementType::Link
                    && !element.has_click_listener
                    && !url.starts_with('#');
                combinable.then_some(url)
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AssignOptions<'a> {
    pub alphabet: &'a [char],
    pub combine: CombinePolicy,
    /// Lower-cased filter words; `None` when no text filter is active
    pub filter: Option<&'a [String]>,
}

/// Ranking order: heavier first, then left to right, then top to bottom, then
/// the order the elements were reported in
fn rank(a: (usize, f64, &ElementWithHint), b: (usize, f64, &ElementWithHint)) -> Ordering {
    let (a_pos, a_weight, a) = a;
    let (b_pos, b_weight, b) = b;
    let (am, bm) = (&a.element.measurements, &b.element.measurements);
    b_weight
        .total_cmp(&a_weight)
        .then(am.x.total_cmp(&bm.x))
        .then(am.y.total_cmp(&bm.y))
        .then(a_pos.cmp(&b_pos))
}

/// Group ranked positions into hint groups. Each group is keyed by its first
/// (best ranked) member and keeps the members in rank order.
pub fn combine(elements: &[ElementWithHint], ranked: &[usize], policy: CombinePolicy) -> Vec<Vec<usize>> {
    let mut groups: Vec<Vec<usize>> = Vec::new();
    let mut by_key: IndexMap<&str, usize> = IndexMap::new();
    for &pos in ranked {
        match policy.key(&elements[pos].element) {
            Some(key) => match by_key.get(key) {
                Some(&group) => groups[group].push(pos),
                None => {
                    by_key.insert(key, groups.len());
                    groups.push(vec![pos]);
                }
            },
            None => groups.push(vec![pos]),
        }
    }
    groups
}

/// Assign hints to `elements` in place.
///
/// With a text filter active, elements whose text does not match are hidden
/// and get no hint, and the others are weighted by text length instead of by
/// size.
pub fn assign_hints(elements: &mut [ElementWithHint], options: &AssignOptions<'_>) {
    let mut weights = Vec::with_capacity(elements.len());
    for element in elements.iter_mut() {
        let weight = match options.filter {
            Some(words) if !words.is_empty() => {
                if text_matches(&element.element.text, words) {
                    element.hidden = false;
                    filter_weight(&element.element.text)
                } else {
                    element.hidden = true;
                    element.hint.clear();
                    0.0
                }
            }
            _ => {
                element.hidden = false;
                element.weight()
            }
        };
        weights.push(weight);
    }

    let mut ranked: Vec<usize> = (0..elements.len()).filter(|&pos| !elements[pos].hidden).collect();
    ranked.sort_by(|&a, &b| rank((a, weights[a], &elements[a]), (b, weights[b], &elements[b])));

    let groups = combine(elements, &ranked, options.combine);
    let group_weights: Vec<f64> = groups
        .iter()
        .map(|members| {
            members
                .iter()
                .map(|&pos| weights[pos])
                .fold(f64::NEG_INFINITY, f64::max)
        })
        .collect();
    let codes = huffman_codes(&group_weights, options.alphabet);

    for (members, code) in groups.iter().zip(codes) {
        for &pos in members {
            elements[pos].hint = code.clone();
        }
    }
}
