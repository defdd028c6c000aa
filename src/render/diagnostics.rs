/// Inline problem markers.
use super::{Decoration, DiagnosticSeverity, DisplayItem, ItemStore, RendererKind, fix_action, reveal_action, store_renderer};
use crate::inspection::{Finding, Severity};
use crate::symbols::Document;

/// Source tag attached to every marker.
pub const DIAGNOSTICS_SOURCE: &str = "lminspect.inspection";

pub struct DiagnosticRenderer {
    store: ItemStore,
}

store_renderer!(DiagnosticRenderer, RendererKind::Diagnostics, to_items);

fn to_items(document: &Document, finding: &Finding) -> Vec<DisplayItem> {
    let severity = match finding.severity {
        Severity::High => DiagnosticSeverity::Information,
        Severity::Middle | Severity::Low => DiagnosticSeverity::Hint,
    };
    vec![DisplayItem {
        key: finding.key().to_string(),
        range: finding.indicator_range(),
        decoration: Decoration::Diagnostic {
            message: finding.problem.description.clone(),
            severity,
            source: DIAGNOSTICS_SOURCE.to_string(),
        },
        actions: vec![
            fix_action(finding, RendererKind::Diagnostics),
            reveal_action(document, finding),
        ],
    }]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inspection::finding;
    use crate::render::{InspectionRenderer, MemorySurface};
    use std::sync::Arc;

    #[test]
    fn test_severity_mapping() {
        let doc = Document::new("A.java", "");
        let mut high = finding(1, "Close the stream");
        high.severity = Severity::High;
        let low = finding(2, "Use switch");

        let severities: Vec<DiagnosticSeverity> = [high, low]
            .iter()
            .flat_map(|f| to_items(&doc, f))
            .map(|i| match i.decoration {
                Decoration::Diagnostic { severity, .. } => severity,
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(severities, vec![DiagnosticSeverity::Information, DiagnosticSeverity::Hint]);
    }

    #[test]
    fn test_partial_update_keeps_other_markers() {
        let surface = Arc::new(MemorySurface::new());
        let renderer = DiagnosticRenderer::new(surface.clone());
        renderer.install();
        let doc = Document::new("A.java", "");

        renderer.render_inspections(&doc, &[finding(1, "Use switch"), finding(5, "Use record")]);
        renderer.render_inspections(&doc, &[finding(2, "Use switch ")]);

        let items = surface.items(RendererKind::Diagnostics, "A.java");
        let lines: Vec<usize> = items.iter().map(|i| i.range.start.line).collect();
        assert_eq!(lines, vec![2, 5]);
    }

    #[test]
    fn test_rerender_replaces_everything() {
        let surface = Arc::new(MemorySurface::new());
        let renderer = DiagnosticRenderer::new(surface.clone());
        renderer.install();
        let doc = Document::new("A.java", "");
        renderer.render_inspections(&doc, &[finding(1, "Use switch"), finding(5, "Use record")]);
        renderer.rerender(&doc, &[finding(7, "Use var")]);
        assert_eq!(renderer.items("A.java").len(), 1);
        assert_eq!(surface.items(RendererKind::Diagnostics, "A.java")[0].key, "Use var");
    }
}
