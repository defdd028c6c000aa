/// Symbol outline of a document, computed with Tree-sitter.
///
/// Produces the flattened class/interface/enum/method/constructor outline in
/// depth-first pre-order. Types declared inside method bodies and anonymous
/// classes are not reported.
use thiserror::Error;
use tree_sitter::{Language, Node, Parser};

use super::{CodeUnit, Document, Position, TextRange, UnitKind};

#[derive(Error, Debug)]
pub enum OutlineError {
    #[error("language setup failed: {0}")]
    Language(#[from] tree_sitter::LanguageError),

    #[error("failed to parse {0}")]
    ParseFailed(String),
}

/// Source of code units for a document.
pub trait OutlineProvider: Send + Sync {
    /// All types and callables, depth-first.
    fn code_units(&self, document: &Document) -> Result<Vec<CodeUnit>, OutlineError>;

    /// First-level types only.
    fn top_level_types(&self, document: &Document) -> Result<Vec<CodeUnit>, OutlineError> {
        let units = self.code_units(document)?;
        Ok(units
            .into_iter()
            .filter(|u| u.kind.is_type() && !u.name.contains('.'))
            .collect())
    }
}

/// Outline provider for Java sources.
pub struct JavaOutline {
    language: Language,
}

impl Default for JavaOutline {
    fn default() -> Self {
        Self {
            language: tree_sitter_java::LANGUAGE.into(),
        }
    }
}

impl JavaOutline {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OutlineProvider for JavaOutline {
    fn code_units(&self, document: &Document) -> Result<Vec<CodeUnit>, OutlineError> {
        let mut parser = Parser::new();
        parser.set_language(&self.language)?;

        let source = document.text().as_bytes();
        let tree = parser
            .parse(source, None)
            .ok_or_else(|| OutlineError::ParseFailed(document.key().to_string()))?;

        let mut units = Vec::new();
        collect_members(tree.root_node(), source, None, &mut units);
        Ok(units)
    }
}

fn unit_kind(node_kind: &str) -> Option<UnitKind> {
    match node_kind {
        "class_declaration" | "record_declaration" => Some(UnitKind::Class),
        "interface_declaration" | "annotation_type_declaration" => Some(UnitKind::Interface),
        "enum_declaration" => Some(UnitKind::Enum),
        "method_declaration" => Some(UnitKind::Method),
        "constructor_declaration" | "compact_constructor_declaration" => {
            Some(UnitKind::Constructor)
        }
        _ => None,
    }
}

fn collect_members(container: Node, source: &[u8], parent: Option<&str>, out: &mut Vec<CodeUnit>) {
    let mut cursor = container.walk();
    for child in container.children(&mut cursor) {
        match unit_kind(child.kind()) {
            Some(kind) => {
                let Some(name) = child
                    .child_by_field_name("name")
                    .and_then(|n| n.utf8_text(source).ok())
                else {
                    continue;
                };
                let qualified = match parent {
                    Some(p) => format!("{p}.{name}"),
                    None => name.to_string(),
                };
                out.push(CodeUnit::new(qualified.clone(), kind, node_range(child)));

                if kind.is_type() {
                    if let Some(body) = child.child_by_field_name("body") {
                        collect_members(body, source, Some(&qualified), out);
                    }
                }
            }
            // enum constants are followed by an optional declarations block
            None if child.kind() == "enum_body_declarations" => {
                collect_members(child, source, parent, out);
            }
            None => {}
        }
    }
}

fn node_range(node: Node) -> TextRange {
    let start = node.start_position();
    let end = node.end_position();
    TextRange::new(
        Position::new(start.row, start.column),
        Position::new(end.row, end.column),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = r#"package demo;

/** Employees. */
public class Employee {
    private final String name;

    public Employee(String name) {
        this.name = name;
    }

    public String getRole() {
        Runnable r = new Runnable() {
            public void run() {}
        };
        return "FTE";
    }

    interface Named {
        String name();
    }

    enum Level {
        LOW, HIGH;

        int weight() { return 1; }
    }
}

record Point(int x, int y) {
    Point {
        assert x >= 0;
    }
}
"#;

    fn outline() -> Vec<CodeUnit> {
        JavaOutline::new()
            .code_units(&Document::new("Employee.java", SOURCE))
            .expect("Failed to parse Java code")
    }

    #[test]
    fn test_outline_order_and_kinds() {
        let names: Vec<(String, UnitKind)> = outline()
            .into_iter()
            .map(|u| (u.name, u.kind))
            .collect();
        assert_eq!(
            names,
            vec![
                ("Employee".to_string(), UnitKind::Class),
                ("Employee.Employee".to_string(), UnitKind::Constructor),
                ("Employee.getRole".to_string(), UnitKind::Method),
                ("Employee.Named".to_string(), UnitKind::Interface),
                ("Employee.Named.name".to_string(), UnitKind::Method),
                ("Employee.Level".to_string(), UnitKind::Enum),
                ("Employee.Level.weight".to_string(), UnitKind::Method),
                ("Point".to_string(), UnitKind::Class),
                ("Point.Point".to_string(), UnitKind::Constructor),
            ]
        );
    }

    #[test]
    fn test_outline_ranges() {
        let units = outline();
        let class = &units[0];
        assert_eq!(class.start_line(), 3);
        assert_eq!(class.end_line(), 26);

        let get_role = units.iter().find(|u| u.name == "Employee.getRole").unwrap();
        assert_eq!(get_role.start_line(), 10);
        assert_eq!(get_role.end_line(), 15);
    }

    #[test]
    fn test_top_level_types() {
        let doc = Document::new("Employee.java", SOURCE);
        let types = JavaOutline::new().top_level_types(&doc).unwrap();
        let names: Vec<&str> = types.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, vec!["Employee", "Point"]);
    }

    #[test]
    fn test_empty_document() {
        let units = JavaOutline::new()
            .code_units(&Document::new("Empty.java", ""))
            .unwrap();
        assert!(units.is_empty());
    }
}
