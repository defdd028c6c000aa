/// Margin icons with a hover offering the fix.
use super::{Decoration, DisplayItem, FIX_COMMAND, ItemStore, RendererKind, fix_action, reveal_action, store_renderer};
use crate::inspection::Finding;
use crate::symbols::Document;

pub struct GutterIconRenderer {
    store: ItemStore,
}

store_renderer!(GutterIconRenderer, RendererKind::GutterIcons, to_items);

fn to_items(document: &Document, finding: &Finding) -> Vec<DisplayItem> {
    let hover = format!(
        "{}\n\n$(copilot) [{}](command:{FIX_COMMAND})",
        finding.problem.description, finding.solution
    );
    vec![DisplayItem {
        key: finding.key().to_string(),
        range: finding.indicator_range(),
        decoration: Decoration::GutterIcon { hover },
        actions: vec![
            fix_action(finding, RendererKind::GutterIcons),
            reveal_action(document, finding),
        ],
    }]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inspection::finding;

    #[test]
    fn test_hover_markdown() {
        let doc = Document::new("A.java", "");
        let items = to_items(&doc, &finding(4, "Use switch"));
        assert_eq!(
            items[0].decoration,
            Decoration::GutterIcon {
                hover: "problem at 4\n\n$(copilot) [Use switch](command:lminspect.fix)".to_string()
            }
        );
    }
}
