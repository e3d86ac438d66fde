use crate::dom::geometry::{BoundingBox, Viewport, visible_box};
use crate::dom::tree::{DomTree, NodeId};

/// On-screen boxes of every laid-out line of text inside `node`, in
/// top-frame coordinates, clipped to `within`.
fn visible_text_boxes(
    dom: &DomTree,
    node: NodeId,
    viewports: &[Viewport],
    within: &BoundingBox,
) -> Vec<(NodeId, BoundingBox)> {
    dom.text_nodes(node)
        .into_iter()
        .filter(|&text| dom.text(text).is_some_and(|data| !data.text.trim().is_empty()))
        .flat_map(|text| {
            dom.client_rects(text)
                .iter()
                .filter(|rect| rect.has_area())
                .filter_map(|rect| visible_box(rect, viewports))
                .filter_map(|rect| rect.intersection(within))
                .map(move |rect| (text, rect))
                .collect::<Vec<_>>()
        })
        .collect()
}

/// The most salient visible line of text: the tallest, then the widest, then
/// the leftmost.
pub fn salient_text_rect(dom: &DomTree, node: NodeId, viewports: &[Viewport], within: &BoundingBox) -> Option<BoundingBox> {
    visible_text_boxes(dom, node, viewports, within)
        .into_iter()
        .map(|(_, rect)| rect)
        .reduce(|best, rect| {
            let taller = rect.height > best.height;
            let same_height = rect.height == best.height;
            let wider = rect.width > best.width;
            let same_width = rect.width == best.width;
            if taller || (same_height && wider) || (same_height && same_width && rect.x < best.x) {
                rect
            } else {
                best
            }
        })
}

/// Boxes of the text inside `node` that contains any of `words`
/// (case-insensitive), for highlighting what a text filter matched
pub fn matching_text_rects(
    dom: &DomTree,
    node: NodeId,
    words: &[String],
    viewports: &[Viewport],
    within: &BoundingBox,
) -> Vec<BoundingBox> {
    if words.is_empty() {
        return Vec::new();
    }
    visible_text_boxes(dom, node, viewports, within)
        .into_iter()
        .filter(|(text, _)| {
            dom.text(*text).is_some_and(|data| {
                let lower = data.text.to_lowercase();
                words.iter().any(|word| lower.contains(word.as_str()))
            })
        })
        .map(|(_, rect)| rect)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCREEN: BoundingBox = BoundingBox::new(0.0, 0.0, 1000.0, 1000.0);

    fn paragraph(lines: &[(&str, BoundingBox)]) -> (DomTree, NodeId) {
        let mut dom = DomTree::new();
        let p = dom.create_element("p");
        dom.append_child(dom.document(), p).unwrap();
        for (text, rect) in lines {
            let node = dom.create_text(*text, vec![*rect]);
            dom.append_child(p, node).unwrap();
        }
        (dom, p)
    }

    #[test]
    fn test_salient_prefers_tallest_then_widest_then_leftmost() {
        let (dom, p) = paragraph(&[
            ("small", BoundingBox::new(0.0, 0.0, 200.0, 10.0)),
            ("big", BoundingBox::new(50.0, 20.0, 30.0, 24.0)),
            ("big too", BoundingBox::new(10.0, 50.0, 30.0, 24.0)),
        ]);
        let rect = salient_text_rect(&dom, p, &[SCREEN], &SCREEN).unwrap();
        assert_eq!(rect, BoundingBox::new(10.0, 50.0, 30.0, 24.0));
    }

    #[test]
    fn test_salient_ignores_blank_and_hidden_text() {
        let (dom, p) = paragraph(&[
            ("   ", BoundingBox::new(0.0, 0.0, 100.0, 40.0)),
            ("offscreen", BoundingBox::new(0.0, 2000.0, 100.0, 40.0)),
            ("ok", BoundingBox::new(5.0, 5.0, 14.0, 16.0)),
        ]);
        let rect = salient_text_rect(&dom, p, &[SCREEN], &SCREEN).unwrap();
        assert_eq!(rect, BoundingBox::new(5.0, 5.0, 14.0, 16.0));
    }

    #[test]
    fn test_matching_text_rects() {
        let (dom, p) = paragraph(&[
            ("Sign in", BoundingBox::new(0.0, 0.0, 49.0, 16.0)),
            ("Register", BoundingBox::new(0.0, 20.0, 56.0, 16.0)),
        ]);
        let rects = matching_text_rects(&dom, p, &["sign".to_string()], &[SCREEN], &SCREEN);
        assert_eq!(rects, vec![BoundingBox::new(0.0, 0.0, 49.0, 16.0)]);
        assert!(matching_text_rects(&dom, p, &[], &[SCREEN], &SCREEN).is_empty());
    }
}
