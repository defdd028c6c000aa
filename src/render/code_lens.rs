/// Lenses above flagged lines: one to apply the fix, one to ignore it.
use super::{Action, Decoration, DisplayItem, ItemStore, RendererKind, fix_action, reveal_action, store_renderer};
use crate::inspection::Finding;
use crate::symbols::Document;

pub struct CodeLensRenderer {
    store: ItemStore,
}

store_renderer!(CodeLensRenderer, RendererKind::CodeLenses, to_items);

fn to_items(document: &Document, finding: &Finding) -> Vec<DisplayItem> {
    let range = finding.indicator_range();
    let fix = DisplayItem {
        key: finding.key().to_string(),
        range,
        decoration: Decoration::CodeLens {
            title: capitalize(&finding.solution),
            tooltip: finding.problem.description.clone(),
        },
        actions: vec![
            fix_action(finding, RendererKind::CodeLenses),
            reveal_action(document, finding),
        ],
    };
    let ignore = DisplayItem {
        key: finding.key().to_string(),
        range,
        decoration: Decoration::CodeLens {
            title: "Ignore".to_string(),
            tooltip: format!("Ignore \"{}\"", uncapitalize(&finding.problem.description)),
        },
        actions: vec![Action::Ignore {
            document: document.key().to_string(),
            symbol: finding.problem.symbol.clone(),
        }],
    };
    vec![fix, ignore]
}

/// First character upper case, the rest lower case.
fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.as_str().to_lowercase().chars()).collect(),
        None => String::new(),
    }
}

fn uncapitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}
