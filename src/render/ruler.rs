/// Scroll-bar markers in the right lane.
use super::{Decoration, DisplayItem, ItemStore, RendererKind, reveal_action, store_renderer};
use crate::inspection::Finding;
use crate::symbols::Document;

pub struct RulerHighlightRenderer {
    store: ItemStore,
}

store_renderer!(RulerHighlightRenderer, RendererKind::RulerHighlights, to_items);

fn to_items(document: &Document, finding: &Finding) -> Vec<DisplayItem> {
    vec![DisplayItem {
        key: finding.key().to_string(),
        range: finding.indicator_range(),
        decoration: Decoration::RulerHighlight,
        actions: vec![reveal_action(document, finding)],
    }]
}
