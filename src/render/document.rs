/// Orchestration of the active back ends for whole documents.
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{
    CodeLensRenderer, DiagnosticRenderer, GutterIconRenderer, InspectActionLenses,
    InspectionRenderer, RendererKind, RulerHighlightRenderer, Surface,
};
use crate::cache::InspectionCache;
use crate::debounce::Debouncer;
use crate::inspection::Finding;
use crate::symbols::{Document, OutlineError, OutlineProvider};

pub const DEFAULT_RERENDER_DELAY: Duration = Duration::from_millis(800);

/// Which back ends are enabled. All false selects the default subset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RendererSettings {
    #[serde(default)]
    pub diagnostics: bool,
    #[serde(default)]
    pub gutter_icons: bool,
    #[serde(default)]
    pub code_lenses: bool,
    #[serde(default)]
    pub ruler_highlights: bool,
    /// The host cannot show code lenses; the default subset then uses
    /// gutter icons instead.
    #[serde(default)]
    pub code_lens_disabled: bool,
}

impl RendererSettings {
    pub fn enabled_kinds(&self) -> Vec<RendererKind> {
        let explicit: Vec<RendererKind> = [
            (self.diagnostics, RendererKind::Diagnostics),
            (self.gutter_icons, RendererKind::GutterIcons),
            (self.code_lenses, RendererKind::CodeLenses),
            (self.ruler_highlights, RendererKind::RulerHighlights),
        ]
        .into_iter()
        .filter_map(|(on, kind)| on.then_some(kind))
        .collect();
        if !explicit.is_empty() {
            return explicit;
        }
        vec![
            RendererKind::Diagnostics,
            RendererKind::RulerHighlights,
            if self.code_lens_disabled {
                RendererKind::GutterIcons
            } else {
                RendererKind::CodeLenses
            },
        ]
    }
}

pub struct DocumentRenderer {
    available: Vec<Arc<dyn InspectionRenderer>>,
    active: Mutex<Vec<Arc<dyn InspectionRenderer>>>,
    actions: InspectActionLenses,
    cache: Arc<InspectionCache>,
    outline: Arc<dyn OutlineProvider>,
    debouncer: Debouncer,
    rerender_delay: Duration,
}

impl DocumentRenderer {
    /// Orchestrator with one back end per kind, none of them active until
    /// [`reload`](Self::reload).
    pub fn new(
        surface: Arc<dyn Surface>,
        cache: Arc<InspectionCache>,
        outline: Arc<dyn OutlineProvider>,
    ) -> Self {
        let available: Vec<Arc<dyn InspectionRenderer>> = vec![
            Arc::new(DiagnosticRenderer::new(Arc::clone(&surface))),
            Arc::new(GutterIconRenderer::new(Arc::clone(&surface))),
            Arc::new(CodeLensRenderer::new(Arc::clone(&surface))),
            Arc::new(RulerHighlightRenderer::new(Arc::clone(&surface))),
        ];
        Self {
            available,
            active: Mutex::new(Vec::new()),
            actions: InspectActionLenses::new(surface),
            cache,
            outline,
            debouncer: Debouncer::new(),
            rerender_delay: DEFAULT_RERENDER_DELAY,
        }
    }

    pub fn with_rerender_delay(mut self, delay: Duration) -> Self {
        self.rerender_delay = delay;
        self
    }

    /// Activate exactly the back ends `settings` enables. Back ends that
    /// drop out are uninstalled; the rest are (re)installed.
    pub fn reload(&self, settings: &RendererSettings) -> Vec<RendererKind> {
        let kinds = settings.enabled_kinds();
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        active.clear();
        for renderer in &self.available {
            if kinds.contains(&renderer.kind()) {
                renderer.install();
                active.push(Arc::clone(renderer));
            } else {
                renderer.uninstall();
            }
        }
        info!(
            "renderers: {}",
            kinds.iter().map(|k| k.name()).collect::<Vec<_>>().join(",")
        );
        kinds
    }

    pub fn active_kinds(&self) -> Vec<RendererKind> {
        self.active_renderers().iter().map(|r| r.kind()).collect()
    }

    fn active_renderers(&self) -> Vec<Arc<dyn InspectionRenderer>> {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn install(&self) {
        self.active_renderers().iter().for_each(|r| r.install());
    }

    pub fn uninstall(&self) {
        self.active_renderers().iter().for_each(|r| r.uninstall());
    }

    pub fn clear(&self, document: Option<&str>) {
        self.active_renderers().iter().for_each(|r| r.clear(document));
    }

    pub fn render_inspections(&self, document: &Document, findings: &[Finding]) {
        self.active_renderers()
            .iter()
            .for_each(|r| r.render_inspections(document, findings));
    }

    /// Redraw the document from the cache: valid findings only, stale
    /// units show nothing.
    pub async fn rerender(&self, document: &Document) -> Result<(), OutlineError> {
        let units = self.outline.code_units(document)?;
        let top_level = self.outline.top_level_types(document)?;
        self.actions.rerender(document, &top_level);

        let findings = self.cache.get_all_valid(document, &units).await;
        debug!("rerender {} with {} finding(s)", document.key(), findings.len());
        self.active_renderers()
            .iter()
            .for_each(|r| r.rerender(document, &findings));
        Ok(())
    }

    /// Clear the document now and [`rerender`](Self::rerender) once edits
    /// settle. `Ok(false)` when a later call took over.
    pub async fn rerender_debounced(&self, document: &Document) -> Result<bool, OutlineError> {
        self.clear(Some(document.key()));
        let done = self
            .debouncer
            .schedule(document.key(), self.rerender_delay, || self.rerender(document))
            .await
            .transpose()?;
        Ok(done.is_some())
    }

    pub fn inspect_actions(&self) -> &InspectActionLenses {
        &self.actions
    }
}
