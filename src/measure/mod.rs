//! Hint placement
//!
//! Computes where an element's hint goes and how much it weighs. Rejections
//! are ordinary outcomes: an element that is not really on screen simply gets
//! no hint.

pub mod text;

use crate::catalog::ElementType;
use crate::dom::element::Position;
use crate::dom::geometry::{BoundingBox, Point, Viewport, frame_offset, visible_box};
use crate::dom::page::Page;
use crate::dom::tree::{DomTree, NodeId};
use crate::options::HintsOptions;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use text::{matching_text_rects, salient_text_rect};

/// Which side of the hint sits at the anchor point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    Left,
    Right,
}

/// Anchor point and weight of one hint, in top-frame coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct HintMeasurements {
    pub x: f64,
    pub y: f64,
    pub align: Align,
    /// Right edge of the element's visible box; hints must not extend past it
    pub max_x: f64,
    pub weight: f64,
}

/// Why an element got no hint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("element {0} is not in the document")]
    Detached(NodeId),

    #[error("element {0} has no layout boxes")]
    NoRects(NodeId),

    #[error("element {0} is outside the viewport")]
    OutOfView(NodeId),

    #[error("element {node} is covered by {by}")]
    Occluded { node: NodeId, by: NodeId },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeasureOptions {
    /// Elements at least this tall are anchored at their left-centre edge
    pub tall_element_threshold: f64,
}

impl Default for MeasureOptions {
    fn default() -> Self {
        Self {
            tall_element_threshold: 100.0,
        }
    }
}

impl From<&HintsOptions> for MeasureOptions {
    fn from(options: &HintsOptions) -> Self {
        Self {
            tall_element_threshold: options.tall_element_threshold,
        }
    }
}

/// Form controls whose text starts after their border and padding
const FORM_CONTROL_TAGS: &[&str] = &["INPUT", "SELECT", "BUTTON", "TEXTAREA"];

const IMAGE_TAGS: &[&str] = &["IMG", "SVG", "PICTURE", "CANVAS", "VIDEO"];

/// Textareas this small and absolutely positioned are code-editor input sinks
const TINY_TEXTAREA: f64 = 5.0;

/// Hint weight from the size of the element's largest visible box. Low
/// priority types use a coarser scale so they tend to get longer hints.
pub fn weight(element_type: ElementType, max_width: f64, max_height: f64) -> f64 {
    let size = max_width.min(max_height);
    if size <= 1.0 {
        return 1.0;
    }
    let log = if element_type.is_low_priority() {
        size.log10()
    } else {
        size.log2()
    };
    log.max(1.0)
}

/// Measure one catalogued element of `page`.
///
/// `viewports` is the chain from the top frame down to `page`'s frame.
pub fn measure(
    page: &Page,
    node: NodeId,
    element_type: ElementType,
    viewports: &[Viewport],
    options: &MeasureOptions,
) -> Result<HintMeasurements, Rejection> {
    let dom = page.dom();
    if !dom.is_connected(node) {
        return Err(Rejection::Detached(node));
    }

    let rects: Vec<BoundingBox> = dom
        .client_rects(node)
        .iter()
        .copied()
        .filter(BoundingBox::has_area)
        .collect();
    if rects.is_empty() {
        // Containers of floated children collapse to zero height.
        return match dom.first_element_child(node) {
            Some(child) => measure(page, child, element_type, viewports, options),
            None => Err(Rejection::NoRects(node)),
        };
    }

    let boxes: Vec<BoundingBox> = rects.iter().filter_map(|rect| visible_box(rect, viewports)).collect();
    let Some(&first) = boxes.first() else {
        return Err(Rejection::OutOfView(node));
    };
    let max_width = boxes.iter().map(|b| b.width).fold(0.0, f64::max);
    let max_height = boxes.iter().map(|b| b.height).fold(0.0, f64::max);
    let weight = weight(element_type, max_width, max_height);

    let (anchor, align) = anchor(dom, node, element_type, &first, viewports, options);
    let measurements = HintMeasurements {
        x: anchor.x,
        y: anchor.y,
        align,
        max_x: first.right(),
        weight,
    };

    check_occlusion(page, node, element_type, measurements, &first, viewports)
}

fn anchor(
    dom: &DomTree,
    node: NodeId,
    element_type: ElementType,
    visible: &BoundingBox,
    viewports: &[Viewport],
    options: &MeasureOptions,
) -> (Point, Align) {
    if element_type == ElementType::Scrollable {
        return (Point::new(visible.right(), visible.y), Align::Right);
    }

    let left_center = Point::new(visible.x, visible.center_y());
    let full_height = dom
        .element(node)
        .and_then(|element| element.bounds())
        .map_or(visible.height, |bounds| bounds.height);
    if element_type == ElementType::Textarea || full_height >= options.tall_element_threshold {
        return (left_center, Align::Left);
    }

    if let Some(text) = salient_text_rect(dom, node, viewports, visible) {
        return (Point::new(text.x, text.center_y()), Align::Left);
    }

    if let Some(image) = first_visible_image(dom, node, viewports, visible) {
        return (Point::new(image.x, image.center_y()), Align::Left);
    }

    if let Some(element) = dom.element(node) {
        if FORM_CONTROL_TAGS.iter().any(|tag| element.is_tag(tag)) {
            let content = visible.inset(&element.style.insets);
            return (Point::new(content.x, visible.center_y()), Align::Left);
        }
    }

    (left_center, Align::Left)
}

fn first_visible_image(dom: &DomTree, node: NodeId, viewports: &[Viewport], within: &BoundingBox) -> Option<BoundingBox> {
    dom.descendants(node)
        .into_iter()
        .filter(|&id| {
            dom.element(id).is_some_and(|element| {
                IMAGE_TAGS.iter().any(|tag| element.is_tag(tag)) || element.attribute("role") == Some("img")
            })
        })
        .flat_map(|id| dom.client_rects(id).to_vec())
        .filter(BoundingBox::has_area)
        .filter_map(|rect| visible_box(&rect, viewports))
        .find_map(|rect| rect.intersection(within))
}

/// Whether the element under `point` (top-frame coordinates) is `node`, one
/// of its descendants or one of its ancestors
fn hit(page: &Page, node: NodeId, point: Point, viewports: &[Viewport]) -> Result<(), Option<NodeId>> {
    let offset = frame_offset(viewports);
    // Sample just inside the anchor so edge pixels do not hit neighbours.
    let local = Point::new(point.x - offset.x + 1.0, point.y - offset.y);
    let dom = page.dom();
    match page.element_at_point(local) {
        Some(found) if dom.contains(node, found) || dom.contains(found, node) => Ok(()),
        other => Err(other),
    }
}

fn check_occlusion(
    page: &Page,
    node: NodeId,
    element_type: ElementType,
    measurements: HintMeasurements,
    visible: &BoundingBox,
    viewports: &[Viewport],
) -> Result<HintMeasurements, Rejection> {
    // Right-aligned hints sit on the scrollbar edge; sample inside instead.
    let probe_x = match measurements.align {
        Align::Left => measurements.x,
        Align::Right => measurements.x - 2.0,
    };
    let occluder = match hit(page, node, Point::new(probe_x, measurements.y), viewports) {
        Ok(()) => return Ok(measurements),
        Err(occluder) => occluder,
    };

    if let Some(by) = occluder {
        let offset = frame_offset(viewports);
        let dom = page.dom();
        // Retry once just right of the occluding box.
        let retry_x = dom
            .element(by)
            .and_then(|element| element.bounds())
            .map(|bounds| bounds.right() + offset.x);
        if let Some(x) = retry_x.filter(|&x| x < visible.right()) {
            if hit(page, node, Point::new(x, measurements.y), viewports).is_ok() {
                return Ok(HintMeasurements { x, ..measurements });
            }
        }
    }

    if is_occlusion_exception(page.dom(), node, element_type) {
        return Ok(measurements);
    }

    let by = occluder.unwrap_or(node);
    log::trace!("Rejecting {}: covered by {}", node, by);
    Err(Rejection::Occluded { node, by })
}

/// File inputs are often blown up and made transparent over a custom button,
/// and code editors hide a tiny positioned textarea under their own view.
fn is_occlusion_exception(dom: &DomTree, node: NodeId, element_type: ElementType) -> bool {
    let Some(element) = dom.element(node) else {
        return false;
    };
    if element.is_tag("INPUT") && element.attribute("type").is_some_and(|t| t.eq_ignore_ascii_case("file")) {
        return true;
    }
    element_type == ElementType::Textarea
        && element.is_tag("TEXTAREA")
        && element.style.position == Position::Absolute
        && element
            .bounds()
            .is_some_and(|bounds| bounds.width <= TINY_TEXTAREA || bounds.height <= TINY_TEXTAREA)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::element::{ElementNode, Style};
    use crate::dom::geometry::Insets;
    use crate::dom::page::{FrameId, PageFixture};

    fn page(children: Vec<ElementNode>) -> Page {
        let fixture = PageFixture::new(ElementNode::new("body").with_children(children)).with_viewport(800.0, 600.0);
        let (page, _) = Page::from_fixture(FrameId::TOP, &fixture).unwrap();
        page
    }

    fn top() -> Vec<Viewport> {
        vec![BoundingBox::new(0.0, 0.0, 800.0, 600.0)]
    }

    fn by_id(page: &Page, id: &str) -> NodeId {
        page.get_element_by_id(id).unwrap()
    }

    fn measure_id(page: &Page, id: &str, element_type: ElementType) -> Result<HintMeasurements, Rejection> {
        measure(page, by_id(page, id), element_type, &top(), &MeasureOptions::default())
    }

    #[test]
    fn test_weight() {
        assert_eq!(weight(ElementType::Link, 64.0, 16.0), 4.0);
        assert_eq!(weight(ElementType::Link, 1.5, 1.5), 1.0);
        assert_eq!(weight(ElementType::Selectable, 1000.0, 100.0), 2.0);
        assert!(weight(ElementType::Link, 100.0, 100.0) > weight(ElementType::ClickableEvent, 100.0, 100.0));
    }

    #[test]
    fn test_text_anchor() {
        let page = page(vec![
            ElementNode::new("a")
                .with_attribute("id", "a")
                .with_attribute("href", "/")
                .with_text("Home")
                .with_bounding_box(10.0, 10.0, 100.0, 20.0),
        ]);
        let m = measure_id(&page, "a", ElementType::Link).unwrap();
        // Text is laid out at the left of the box, vertically centred.
        assert_eq!((m.x, m.y), (10.0, 20.0));
        assert_eq!(m.align, Align::Left);
        assert_eq!(m.max_x, 110.0);
        assert_eq!(m.weight, 20f64.log2());
    }

    #[test]
    fn test_scrollable_and_tall_anchors() {
        let page = page(vec![
            ElementNode::new("div")
                .with_attribute("id", "scroll")
                .with_bounding_box(0.0, 100.0, 300.0, 200.0),
            ElementNode::new("div")
                .with_attribute("id", "tall")
                .with_text("x")
                .with_bounding_box(400.0, 0.0, 100.0, 400.0),
        ]);
        let m = measure_id(&page, "scroll", ElementType::Scrollable).unwrap();
        assert_eq!((m.x, m.y, m.align), (300.0, 100.0, Align::Right));

        let m = measure_id(&page, "tall", ElementType::Clickable).unwrap();
        assert_eq!((m.x, m.y, m.align), (400.0, 200.0, Align::Left));
    }

    #[test]
    fn test_form_control_padding() {
        let style = Style {
            insets: Insets {
                top: 2.0,
                right: 2.0,
                bottom: 2.0,
                left: 6.0,
            },
            ..Style::default()
        };
        let page = page(vec![
            ElementNode::new("input")
                .with_attribute("id", "i")
                .with_style(style)
                .with_bounding_box(20.0, 20.0, 100.0, 24.0),
        ]);
        let m = measure_id(&page, "i", ElementType::Clickable).unwrap();
        assert_eq!((m.x, m.y), (26.0, 32.0));
    }

    #[test]
    fn test_image_fallback() {
        let page = page(vec![
            ElementNode::new("a")
                .with_attribute("id", "a")
                .with_bounding_box(0.0, 0.0, 200.0, 50.0)
                .with_children(vec![ElementNode::new("img").with_bounding_box(40.0, 10.0, 30.0, 30.0)]),
        ]);
        let m = measure_id(&page, "a", ElementType::Link).unwrap();
        assert_eq!((m.x, m.y), (40.0, 25.0));
    }

    #[test]
    fn test_zero_size_container_uses_first_child() {
        let floated = page(vec![
            ElementNode::new("a")
                .with_attribute("id", "a")
                .with_bounding_box(0.0, 0.0, 0.0, 0.0)
                .with_children(vec![ElementNode::new("div").with_bounding_box(30.0, 30.0, 40.0, 40.0)]),
        ]);
        let m = measure_id(&floated, "a", ElementType::Link).unwrap();
        assert_eq!((m.x, m.y), (30.0, 50.0));

        let empty = page(vec![ElementNode::new("a").with_attribute("id", "e")]);
        assert!(matches!(measure_id(&empty, "e", ElementType::Link), Err(Rejection::NoRects(_))));
    }

    #[test]
    fn test_out_of_view() {
        let page = page(vec![
            ElementNode::new("button")
                .with_attribute("id", "b")
                .with_bounding_box(10.0, 900.0, 50.0, 20.0),
        ]);
        assert!(matches!(
            measure_id(&page, "b", ElementType::Clickable),
            Err(Rejection::OutOfView(_))
        ));
    }

    #[test]
    fn test_occlusion_retry_and_reject() {
        let page = page(vec![
            ElementNode::new("button")
                .with_attribute("id", "partly")
                .with_bounding_box(0.0, 0.0, 200.0, 20.0),
            ElementNode::new("div")
                .with_attribute("id", "badge")
                .with_bounding_box(0.0, 0.0, 30.0, 20.0),
            ElementNode::new("button")
                .with_attribute("id", "covered")
                .with_bounding_box(0.0, 100.0, 100.0, 20.0),
            ElementNode::new("div")
                .with_attribute("id", "modal")
                .with_bounding_box(0.0, 50.0, 800.0, 200.0),
        ]);
        let m = measure_id(&page, "partly", ElementType::Clickable).unwrap();
        assert_eq!(m.x, 30.0);

        let err = measure_id(&page, "covered", ElementType::Clickable).unwrap_err();
        assert_eq!(
            err,
            Rejection::Occluded {
                node: by_id(&page, "covered"),
                by: by_id(&page, "modal"),
            }
        );
    }

    #[test]
    fn test_occlusion_exceptions() {
        let tiny = Style {
            position: Position::Absolute,
            ..Style::default()
        };
        let page = page(vec![
            ElementNode::new("input")
                .with_attribute("id", "file")
                .with_attribute("type", "file")
                .with_bounding_box(0.0, 0.0, 100.0, 20.0),
            ElementNode::new("textarea")
                .with_attribute("id", "sink")
                .with_style(tiny)
                .with_bounding_box(0.0, 30.0, 3.0, 3.0),
            ElementNode::new("div").with_bounding_box(0.0, 0.0, 800.0, 600.0),
        ]);
        assert!(measure_id(&page, "file", ElementType::Clickable).is_ok());
        assert!(measure_id(&page, "sink", ElementType::Textarea).is_ok());
    }

    #[test]
    fn test_nested_frame_coordinates() {
        let page = page(vec![
            ElementNode::new("button")
                .with_attribute("id", "b")
                .with_bounding_box(10.0, 10.0, 40.0, 20.0),
        ]);
        let chain = vec![
            BoundingBox::new(0.0, 0.0, 800.0, 600.0),
            BoundingBox::new(100.0, 200.0, 300.0, 300.0),
        ];
        let m = measure(&page, by_id(&page, "b"), ElementType::Clickable, &chain, &MeasureOptions::default()).unwrap();
        assert_eq!((m.x, m.y), (110.0, 220.0));
        assert_eq!(m.max_x, 150.0);
    }
}
