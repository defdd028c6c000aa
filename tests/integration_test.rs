/// End-to-end integration tests for the inspection pipeline.
///
/// Tests the complete flow:
///   Outline → Inspector (mock model) → Cache → DocumentRenderer → Surface
use std::fs;
use std::sync::Arc;

use lminspect::cache::InspectionCache;
use lminspect::config::Config;
use lminspect::copilot::mock::MockChannel;
use lminspect::copilot::{ChatChannel, Copilot};
use lminspect::inspection::Severity;
use lminspect::inspector::Inspector;
use lminspect::render::{Decoration, DocumentRenderer, MemorySurface, RendererKind, Surface};
use lminspect::symbols::{Document, JavaOutline, OutlineProvider};
use tempfile::tempdir;

const SHOP: &str = "\
public class Shop {
    public int total(int[] prices) {
        int sum = 0;
        for (int p : prices) {
            sum += p;
        }
        return sum;
    }

    public String label(int n) {
        if (n > 10) {
            return \"big\";
        }
        return \"small\";
    }
}
";

/// Echo `lines` with an annotation block above `lines[at]`.
fn annotated(lines: &[&str], at: usize, solution: &str, symbol: &str, severity: &str) -> String {
    let mut out = String::new();
    for (i, line) in lines.iter().enumerate() {
        if i == at {
            out.push_str(&format!(
                "// @PROBLEM: Using legacy construct\n// @SOLUTION: {solution}\n\
                 // @SYMBOL: {symbol}\n// @SEVERITY: {severity}\n"
            ));
        }
        out.push_str(line);
        out.push('\n');
    }
    out.push_str("//<|endofresponse|>");
    out
}

struct Pipeline {
    channel: Arc<MockChannel>,
    inspector: Inspector,
    renderer: DocumentRenderer,
    surface: Arc<MemorySurface>,
    outline: Arc<JavaOutline>,
}

fn pipeline(replies: Vec<String>) -> Pipeline {
    let channel = Arc::new(MockChannel::new(replies));
    let copilot = Copilot::new(Arc::clone(&channel) as Arc<dyn ChatChannel>);
    let cache = Arc::new(InspectionCache::new());
    let outline = Arc::new(JavaOutline::new());
    let surface = Arc::new(MemorySurface::new());
    let inspector = Inspector::new(Arc::new(copilot), Arc::clone(&cache), outline.clone());
    let renderer = DocumentRenderer::new(surface.clone() as Arc<dyn Surface>, cache, outline.clone());
    renderer.reload(&Config::default().renderer);
    Pipeline {
        channel,
        inspector,
        renderer,
        surface,
        outline,
    }
}

impl Pipeline {
    async fn inspect_stale(&self, document: &Document) -> usize {
        let units = self.outline.code_units(document).unwrap();
        let mut count = 0;
        for unit in units.iter().filter(|u| u.kind.is_callable()) {
            if self.inspector.cache().has_valid_entry(document, Some(unit)) {
                continue;
            }
            self.inspector.inspect_unit(document, unit).await.unwrap();
            count += 1;
        }
        count
    }

    fn diagnostics(&self, key: &str) -> Vec<(usize, String)> {
        self.surface
            .items(RendererKind::Diagnostics, key)
            .into_iter()
            .map(|i| (i.range.start.line, i.key))
            .collect()
    }
}

/// Full flow: inspect → render → edit one method → only it is re-inspected.
#[tokio::test]
async fn test_incremental_pipeline() {
    let total: Vec<&str> = SHOP.lines().skip(1).take(7).collect();
    let label: Vec<&str> = SHOP.lines().skip(9).take(6).collect();
    let edited_source = SHOP.replace("\"big\"", "\"large\"");
    let edited_label: Vec<&str> = edited_source.lines().skip(9).take(6).collect();

    let p = pipeline(vec![
        annotated(&total, 2, "Use IntStream sum", "for", "MIDDLE"),
        annotated(&label, 1, "Use switch expression", "if", "LOW"),
        annotated(&edited_label, 1, "Use ternary operator", "if", "HIGH"),
    ]);

    // 1. First pass inspects both methods
    let doc = Document::new("Shop.java", SHOP);
    assert_eq!(p.inspect_stale(&doc).await, 2);
    p.renderer.rerender(&doc).await.unwrap();
    assert_eq!(
        p.diagnostics("Shop.java"),
        vec![
            (3, "Use IntStream sum".to_string()),
            (10, "Use switch expression".to_string()),
        ]
    );

    // Indicator lands on the symbol
    let items = p.surface.items(RendererKind::Diagnostics, "Shop.java");
    assert_eq!(items[0].range.start.column, 8);
    assert_eq!(items[0].range.end.column, 11);

    // Default subset: diagnostics, ruler highlights, code lenses (+ inspect actions)
    let kinds: Vec<RendererKind> = p.surface.snapshot("Shop.java").into_iter().map(|(k, _)| k).collect();
    assert_eq!(
        kinds,
        vec![
            RendererKind::Diagnostics,
            RendererKind::CodeLenses,
            RendererKind::RulerHighlights,
            RendererKind::InspectActions,
        ]
    );

    // 2. Nothing changed: no model traffic
    assert_eq!(p.inspect_stale(&doc).await, 0);
    assert_eq!(p.channel.request_count(), 2);

    // 3. Edit label only
    let edited = Document::new("Shop.java", edited_source.clone());
    p.renderer.rerender(&edited).await.unwrap();
    assert_eq!(
        p.diagnostics("Shop.java"),
        vec![(3, "Use IntStream sum".to_string())],
        "stale findings must not be shown"
    );

    assert_eq!(p.inspect_stale(&edited).await, 1);
    assert_eq!(p.channel.request_count(), 3);
    p.renderer.rerender(&edited).await.unwrap();
    let shown = p.surface.items(RendererKind::Diagnostics, "Shop.java");
    assert_eq!(shown.len(), 2);
    assert!(shown.iter().any(|i| i.key == "Use ternary operator"
        && matches!(&i.decoration, Decoration::Diagnostic { message, .. } if message == "Using legacy construct")));

    let label_unit = p
        .outline
        .code_units(&edited)
        .unwrap()
        .into_iter()
        .find(|u| u.name == "Shop.label")
        .unwrap();
    let cached = p.inspector.cache().get_valid(&edited, &label_unit).await.unwrap();
    assert_eq!(cached[0].severity, Severity::High);
    assert_eq!(cached[0].problem.position.code, "        if (n > 10) {");
}

/// Whole-document analysis feeds the per-unit cache.
#[tokio::test]
async fn test_document_analysis_then_unit_lookup() {
    let lines: Vec<&str> = SHOP.lines().collect();
    let p = pipeline(vec![annotated(&lines, 3, "Use IntStream sum", "for", "MIDDLE")]);

    let doc = Document::new("Shop.java", SHOP);
    let findings = p.inspector.inspect_document(&doc).await.unwrap();
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].problem.position.line, 3);
    assert_eq!(findings[0].document.as_deref(), Some("Shop.java"));

    let units = p.outline.code_units(&doc).unwrap();
    let total = units.iter().find(|u| u.name == "Shop.total").unwrap();
    let again = p.inspector.inspect_unit(&doc, total).await.unwrap();
    assert_eq!(again.len(), 1);
    assert_eq!(again[0].problem.position.line, 3);
    assert_eq!(again[0].problem.position.relative_line, 2);
    assert_eq!(again[0].solution, findings[0].solution);
    assert_eq!(p.channel.request_count(), 1);
}

/// Inspecting a class and then one of its methods shows each finding once.
#[tokio::test]
async fn test_class_then_method_shows_finding_once() {
    let lines: Vec<&str> = SHOP.lines().collect();
    let p = pipeline(vec![annotated(&lines, 3, "Use IntStream sum", "for", "MIDDLE")]);

    let doc = Document::new("Shop.java", SHOP);
    let units = p.outline.code_units(&doc).unwrap();
    let class = units.iter().find(|u| u.name == "Shop").unwrap();
    let total = units.iter().find(|u| u.name == "Shop.total").unwrap();

    p.inspector.inspect_unit(&doc, class).await.unwrap();
    p.inspector.inspect_unit(&doc, total).await.unwrap();
    assert_eq!(p.channel.request_count(), 1);

    p.renderer.rerender(&doc).await.unwrap();
    assert_eq!(p.diagnostics("Shop.java"), vec![(3, "Use IntStream sum".to_string())]);

    // Editing label leaves total's finding on screen
    let edited = Document::new("Shop.java", SHOP.replace("\"big\"", "\"large\""));
    p.renderer.rerender(&edited).await.unwrap();
    assert_eq!(p.diagnostics("Shop.java"), vec![(3, "Use IntStream sum".to_string())]);
}

/// Files on disk and configuration drive the same flow.
#[tokio::test]
async fn test_from_files() {
    let temp_dir = tempdir().unwrap();
    let source_path = temp_dir.path().join("Shop.java");
    fs::write(&source_path, SHOP).unwrap();

    let config_path = temp_dir.path().join("config.json");
    fs::write(&config_path, r#"{"renderer": {"gutter_icons": true}}"#).unwrap();
    let config = Config::load(config_path.to_str().unwrap()).unwrap();
    config.validate().unwrap();

    let channel = Arc::new(MockChannel::new(["//<|endofresponse|>"]));
    let copilot = Copilot::new(Arc::clone(&channel) as Arc<dyn ChatChannel>);
    let cache = Arc::new(InspectionCache::new());
    let outline = Arc::new(JavaOutline::new());
    let surface = Arc::new(MemorySurface::new());
    let renderer = DocumentRenderer::new(surface.clone() as Arc<dyn Surface>, Arc::clone(&cache), outline.clone());
    assert_eq!(renderer.reload(&config.renderer), vec![RendererKind::GutterIcons]);

    let inspector = Inspector::new(Arc::new(copilot), cache, outline);
    let text = fs::read_to_string(&source_path).unwrap();
    let doc = Document::new(source_path.display().to_string(), text);
    let findings = inspector.inspect_document(&doc).await.unwrap();
    assert!(findings.is_empty());

    renderer.rerender(&doc).await.unwrap();
    let lenses = surface.items(RendererKind::InspectActions, doc.key());
    assert_eq!(lenses.len(), 1);
    assert!(matches!(&lenses[0].decoration, Decoration::CodeLens { title, .. } if title == "Rewrite with new syntax"));
}
