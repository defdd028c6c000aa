/// Presentation of findings.
///
/// Four back ends turn findings into display items for one kind of UI
/// element each and publish them to a [`Surface`]. Every back end keeps its
/// own per-document item list and merges new findings into it instead of
/// replacing it, so an incremental update never makes unrelated items
/// disappear.
pub mod actions;
pub mod code_lens;
pub mod diagnostics;
pub mod document;
pub mod gutter;
pub mod ruler;
pub mod surface;

pub use actions::InspectActionLenses;
pub use code_lens::CodeLensRenderer;
pub use diagnostics::DiagnosticRenderer;
pub use document::{DocumentRenderer, RendererSettings};
pub use gutter::GutterIconRenderer;
pub use ruler::RulerHighlightRenderer;
pub use surface::{MemorySurface, Surface};

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::inspection::{Finding, Problem};
use crate::symbols::{Document, TextRange};

/// Command run by fix actions.
pub const FIX_COMMAND: &str = "lminspect.fix";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RendererKind {
    Diagnostics,
    GutterIcons,
    CodeLenses,
    RulerHighlights,
    /// Per-type "inspect" lenses; not a finding renderer.
    InspectActions,
}

impl RendererKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Diagnostics => "diagnostics",
            Self::GutterIcons => "guttericons",
            Self::CodeLenses => "codelenses",
            Self::RulerHighlights => "rulerhighlights",
            Self::InspectActions => "inspectactions",
        }
    }
}

impl fmt::Display for RendererKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticSeverity {
    Information,
    Hint,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Decoration {
    Diagnostic {
        message: String,
        severity: DiagnosticSeverity,
        source: String,
    },
    /// Markdown hover shown next to the margin icon.
    GutterIcon { hover: String },
    CodeLens { title: String, tooltip: String },
    /// Marker in the right lane of the scroll bar.
    RulerHighlight,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Action {
    Fix {
        problem: Problem,
        solution: String,
        origin: RendererKind,
    },
    Ignore {
        document: String,
        symbol: String,
    },
    InspectUnit {
        document: String,
        unit: String,
    },
    /// Jump to a location.
    Reveal {
        document: String,
        line: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayItem {
    /// Merge identity; the trimmed solution for finding items.
    pub key: String,
    pub range: TextRange,
    pub decoration: Decoration,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<Action>,
}

/// One kind of presentation for findings.
///
/// Lifecycle: [`install`](Self::install) is idempotent; a back end that is
/// not installed ignores every other call. [`uninstall`](Self::uninstall)
/// drops all state.
pub trait InspectionRenderer: Send + Sync {
    fn kind(&self) -> RendererKind;

    fn install(&self);

    fn uninstall(&self);

    fn is_installed(&self) -> bool;

    /// Drop the items of one document, or of every document.
    fn clear(&self, document: Option<&str>);

    /// Merge `findings` into what the document already shows.
    fn render_inspections(&self, document: &Document, findings: &[Finding]);

    /// Replace everything the document shows with `valid_findings`.
    fn rerender(&self, document: &Document, valid_findings: &[Finding]) {
        self.clear(Some(document.key()));
        self.render_inspections(document, valid_findings);
    }
}

/// New items first, then existing items whose key is not among the new ones.
pub fn merge_items(new: Vec<DisplayItem>, existing: &[DisplayItem]) -> Vec<DisplayItem> {
    let keys: HashSet<&str> = new.iter().map(|i| i.key.as_str()).collect();
    let retained: Vec<DisplayItem> = existing
        .iter()
        .filter(|i| !keys.contains(i.key.as_str()))
        .cloned()
        .collect();
    let mut merged = new;
    merged.extend(retained);
    merged
}

type ItemLists = HashMap<String, Vec<DisplayItem>>;

/// Per-document item lists of one back end, plus its install state.
///
/// `None` while the back end is not installed. Publishing happens under the
/// list lock, so the surface always shows the stored list.
pub(crate) struct ItemStore {
    kind: RendererKind,
    surface: Arc<dyn Surface>,
    lists: Mutex<Option<ItemLists>>,
}

impl ItemStore {
    pub(crate) fn new(kind: RendererKind, surface: Arc<dyn Surface>) -> Self {
        Self {
            kind,
            surface,
            lists: Mutex::new(None),
        }
    }

    pub(crate) fn install(&self) {
        let mut lists = self.lists.lock().unwrap_or_else(PoisonError::into_inner);
        if lists.is_none() {
            debug!("[{}] install", self.kind);
            *lists = Some(HashMap::new());
        }
    }

    pub(crate) fn uninstall(&self) {
        let mut lists = self.lists.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = lists.take() {
            debug!("[{}] uninstall", self.kind);
            for document in previous.keys() {
                self.surface.publish(self.kind, document, &[]);
            }
        }
    }

    pub(crate) fn is_installed(&self) -> bool {
        self.lists
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    pub(crate) fn clear(&self, document: Option<&str>) {
        let mut lists = self.lists.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(lists) = lists.as_mut() else {
            return;
        };
        match document {
            Some(key) => {
                lists.insert(key.to_string(), Vec::new());
                self.surface.publish(self.kind, key, &[]);
            }
            None => {
                for (key, _) in lists.drain() {
                    self.surface.publish(self.kind, &key, &[]);
                }
            }
        }
    }

    pub(crate) fn merge(&self, document: &str, new: Vec<DisplayItem>) {
        if new.is_empty() {
            return;
        }
        let mut lists = self.lists.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(lists) = lists.as_mut() else {
            return;
        };
        let existing = lists.get(document).map(Vec::as_slice).unwrap_or_default();
        let merged = merge_items(new, existing);
        self.surface.publish(self.kind, document, &merged);
        lists.insert(document.to_string(), merged);
    }

    /// Unconditionally replace the list of `document`.
    pub(crate) fn replace(&self, document: &str, items: Vec<DisplayItem>) {
        let mut lists = self.lists.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(lists) = lists.as_mut() else {
            return;
        };
        self.surface.publish(self.kind, document, &items);
        lists.insert(document.to_string(), items);
    }

    pub(crate) fn items(&self, document: &str) -> Vec<DisplayItem> {
        self.lists
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .and_then(|l| l.get(document).cloned())
            .unwrap_or_default()
    }
}

/// Wire an [`ItemStore`]-backed back end into [`InspectionRenderer`].
macro_rules! store_renderer {
    ($ty:ty, $kind:expr, $to_items:path) => {
        impl $crate::render::InspectionRenderer for $ty {
            fn kind(&self) -> $crate::render::RendererKind {
                $kind
            }

            fn install(&self) {
                self.store.install();
            }

            fn uninstall(&self) {
                self.store.uninstall();
            }

            fn is_installed(&self) -> bool {
                self.store.is_installed()
            }

            fn clear(&self, document: Option<&str>) {
                self.store.clear(document);
            }

            fn render_inspections(
                &self,
                document: &$crate::symbols::Document,
                findings: &[$crate::inspection::Finding],
            ) {
                let items = findings
                    .iter()
                    .flat_map(|f| $to_items(document, f))
                    .collect();
                self.store.merge(document.key(), items);
            }
        }

        impl $ty {
            pub fn new(surface: std::sync::Arc<dyn $crate::render::Surface>) -> Self {
                Self {
                    store: $crate::render::ItemStore::new($kind, surface),
                }
            }

            /// Items currently shown for `document`.
            pub fn items(&self, document: &str) -> Vec<$crate::render::DisplayItem> {
                self.store.items(document)
            }
        }
    };
}
pub(crate) use store_renderer;

fn fix_action(finding: &Finding, origin: RendererKind) -> Action {
    Action::Fix {
        problem: finding.problem.clone(),
        solution: finding.solution.clone(),
        origin,
    }
}

fn reveal_action(document: &Document, finding: &Finding) -> Action {
    Action::Reveal {
        document: document.key().to_string(),
        line: finding.problem.position.line,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inspection::finding;

    fn item(key: &str, line: usize) -> DisplayItem {
        DisplayItem {
            key: key.to_string(),
            range: TextRange::lines(line, line),
            decoration: Decoration::RulerHighlight,
            actions: Vec::new(),
        }
    }

    #[test]
    fn test_merge_prefers_new_and_keeps_others() {
        let existing = vec![item("a", 1), item("b", 2)];
        let merged = merge_items(vec![item("b", 5), item("c", 6)], &existing);
        let keys: Vec<(&str, usize)> = merged
            .iter()
            .map(|i| (i.key.as_str(), i.range.start.line))
            .collect();
        assert_eq!(keys, vec![("b", 5), ("c", 6), ("a", 1)]);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let new = vec![item("a", 1), item("b", 2)];
        let once = merge_items(new.clone(), &[]);
        let twice = merge_items(new, &once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_store_ignores_calls_until_installed() {
        let surface = Arc::new(MemorySurface::new());
        let store = ItemStore::new(RendererKind::RulerHighlights, surface.clone());
        store.merge("A.java", vec![item("a", 1)]);
        assert!(store.items("A.java").is_empty());
        assert_eq!(surface.publish_count(), 0);

        store.install();
        store.merge("A.java", vec![item("a", 1)]);
        assert_eq!(store.items("A.java").len(), 1);

        store.uninstall();
        assert!(!store.is_installed());
        assert!(surface.items(RendererKind::RulerHighlights, "A.java").is_empty());
    }

    #[test]
    fn test_empty_merge_is_noop() {
        let surface = Arc::new(MemorySurface::new());
        let store = ItemStore::new(RendererKind::Diagnostics, surface.clone());
        store.install();
        store.merge("A.java", Vec::new());
        assert_eq!(surface.publish_count(), 0);
    }

    #[test]
    fn test_concurrent_updates_keep_surface_in_sync() {
        let surface = Arc::new(MemorySurface::new());
        let store = Arc::new(ItemStore::new(RendererKind::Diagnostics, surface.clone()));
        store.install();

        let handles: Vec<_> = (0..8)
            .map(|n| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for i in 0..50 {
                        if (n + i) % 3 == 0 {
                            store.clear(Some("A.java"));
                        } else {
                            store.merge("A.java", vec![item(&format!("k{n}-{i}"), i)]);
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(
            surface.items(RendererKind::Diagnostics, "A.java"),
            store.items("A.java")
        );
    }

    #[test]
    fn test_reveal_points_at_flagged_line() {
        let doc = Document::new("A.java", "");
        let action = reveal_action(&doc, &finding(9, "Use var"));
        assert_eq!(
            action,
            Action::Reveal {
                document: "A.java".to_string(),
                line: 9
            }
        );
    }

    #[test]
    fn test_fix_action_carries_origin() {
        let f = finding(3, "Use switch");
        let action = fix_action(&f, RendererKind::CodeLenses);
        assert!(matches!(
            action,
            Action::Fix { origin: RendererKind::CodeLenses, ref solution, .. } if solution == "Use switch"
        ));
    }
}
