/// "Rewrite with new syntax" lenses, one per top-level type.
use std::sync::Arc;

use tracing::debug;

use super::{Action, Decoration, DisplayItem, ItemStore, RendererKind, Surface};
use crate::symbols::{CodeUnit, Document};

pub const INSPECT_ACTION_TITLE: &str = "Rewrite with new syntax";

pub struct InspectActionLenses {
    store: ItemStore,
}

impl InspectActionLenses {
    pub fn new(surface: Arc<dyn Surface>) -> Self {
        let store = ItemStore::new(RendererKind::InspectActions, surface);
        store.install();
        Self { store }
    }

    /// Replace the lenses of `document` with one per type in `top_level`.
    pub fn rerender(&self, document: &Document, top_level: &[CodeUnit]) {
        debug!("rerender inspect lenses of {}", document.key());
        let items = top_level
            .iter()
            .map(|unit| DisplayItem {
                key: unit.identity(),
                range: unit.range,
                decoration: Decoration::CodeLens {
                    title: INSPECT_ACTION_TITLE.to_string(),
                    tooltip: format!("Inspect {unit}"),
                },
                actions: vec![Action::InspectUnit {
                    document: document.key().to_string(),
                    unit: unit.name.clone(),
                }],
            })
            .collect();
        self.store.replace(document.key(), items);
    }

    pub fn items(&self, document: &str) -> Vec<DisplayItem> {
        self.store.items(document)
    }
}
