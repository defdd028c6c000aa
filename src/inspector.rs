/// Inspection entry points: per-unit (cached), raw code (optionally
/// debounced) and whole-document analyses.
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info};

use crate::cache::InspectionCache;
use crate::copilot::{Copilot, CopilotError};
use crate::debounce::Debouncer;
use crate::inspection::Finding;
use crate::symbols::{CodeUnit, Document, OutlineError, OutlineProvider};

pub const DEFAULT_MAX_CONCURRENCIES: usize = 3;

#[derive(Error, Debug)]
pub enum InspectError {
    #[error(transparent)]
    Copilot(#[from] CopilotError),

    #[error(transparent)]
    Outline(#[from] OutlineError),

    #[error("too many documents are being inspected, try again later")]
    Busy,

    #[error("{0} is already being inspected")]
    AlreadyInspecting(String),
}

pub struct Inspector {
    copilot: Arc<Copilot>,
    cache: Arc<InspectionCache>,
    outline: Arc<dyn OutlineProvider>,
    debouncer: Debouncer,
    in_flight: Mutex<HashSet<String>>,
    max_concurrencies: usize,
}

/// Removes a document from the in-flight set when its analysis ends.
struct InFlight<'a> {
    set: &'a Mutex<HashSet<String>>,
    key: String,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.set
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}

impl Inspector {
    pub fn new(
        copilot: Arc<Copilot>,
        cache: Arc<InspectionCache>,
        outline: Arc<dyn OutlineProvider>,
    ) -> Self {
        Self {
            copilot,
            cache,
            outline,
            debouncer: Debouncer::new(),
            in_flight: Mutex::new(HashSet::new()),
            max_concurrencies: DEFAULT_MAX_CONCURRENCIES,
        }
    }

    pub fn with_max_concurrencies(mut self, max: usize) -> Self {
        self.max_concurrencies = max.max(1);
        self
    }

    pub fn cache(&self) -> &Arc<InspectionCache> {
        &self.cache
    }

    pub fn outline(&self) -> &Arc<dyn OutlineProvider> {
        &self.outline
    }

    /// Inspect raw code. Lines are relative to `code`.
    pub async fn inspect_code(&self, code: &str) -> Result<Vec<Finding>, InspectError> {
        Ok(self.copilot.inspect(code).await?)
    }

    /// [`Self::inspect_code`] after `wait` of quiet for `key`.
    ///
    /// `Ok(None)` when a later call for the same key superseded this one.
    pub async fn inspect_code_debounced(
        &self,
        code: &str,
        key: &str,
        wait: Duration,
    ) -> Result<Option<Vec<Finding>>, InspectError> {
        self.debouncer
            .schedule(key, wait, || self.inspect_code(code))
            .await
            .transpose()
    }

    /// Findings of one unit with absolute lines, from the cache when its
    /// content is unchanged.
    ///
    /// A type is analyzed as a whole and its findings are handed to the
    /// members that own them; the type itself keeps only findings on its
    /// declaration line. A failed analysis leaves the cache as it was.
    pub async fn inspect_unit(
        &self,
        document: &Document,
        unit: &CodeUnit,
    ) -> Result<Vec<Finding>, InspectError> {
        if unit.kind.is_type() {
            return self.inspect_type(document, unit).await;
        }
        if let Some(findings) = self.cache.get_valid(document, unit).await {
            return Ok(findings);
        }

        let pending = self.cache.begin(document, unit);
        debug!("inspecting {unit} of {}", document.key());
        let relative = match self.copilot.inspect(&unit_lines(document, unit)).await {
            Ok(findings) => findings,
            Err(e) => {
                pending.abandon();
                return Err(e.into());
            }
        };
        pending.resolve(relative.clone());

        Ok(absolute(relative, document, unit))
    }

    async fn inspect_type(
        &self,
        document: &Document,
        unit: &CodeUnit,
    ) -> Result<Vec<Finding>, InspectError> {
        let members: Vec<CodeUnit> = self
            .outline
            .code_units(document)?
            .into_iter()
            .filter(|u| {
                unit.range.contains_line(u.start_line()) && unit.range.contains_line(u.end_line())
            })
            .collect();

        debug!("inspecting {unit} of {} ({} members)", document.key(), members.len());
        let relative = self.copilot.inspect(&unit_lines(document, unit)).await?;
        let findings = absolute(relative, document, unit);
        self.cache.store_all_from_document(&findings, &members, document);
        Ok(findings)
    }

    /// Analyze the whole document at once and cache the results per unit.
    pub async fn inspect_document(&self, document: &Document) -> Result<Vec<Finding>, InspectError> {
        let _guard = self.enter(document.key())?;
        let units = self.outline.code_units(document)?;
        if units.is_empty() {
            info!("no code units in {}, skipping", document.key());
            return Ok(Vec::new());
        }

        info!("inspecting {} ({} units)", document.key(), units.len());
        let findings: Vec<Finding> = self
            .copilot
            .inspect(document.text())
            .await?
            .into_iter()
            .map(|mut f| {
                f.document = Some(document.key().to_string());
                f
            })
            .collect();

        self.cache.store_all_from_document(&findings, &units, document);
        info!("{} inspection(s) for {}", findings.len(), document.key());
        Ok(findings)
    }

    fn enter(&self, key: &str) -> Result<InFlight<'_>, InspectError> {
        let mut set = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if set.contains(key) {
            return Err(InspectError::AlreadyInspecting(key.to_string()));
        }
        if set.len() >= self.max_concurrencies {
            return Err(InspectError::Busy);
        }
        set.insert(key.to_string());
        Ok(InFlight {
            set: &self.in_flight,
            key: key.to_string(),
        })
    }
}

/// Shift unit-relative findings to document lines.
fn absolute(findings: Vec<Finding>, document: &Document, unit: &CodeUnit) -> Vec<Finding> {
    findings
        .into_iter()
        .map(|mut f| {
            f.problem.position.line = unit.start_line() + f.problem.position.relative_line;
            f.document = Some(document.key().to_string());
            f
        })
        .collect()
}

/// Full source lines covered by `unit`, so line 0 keeps its indentation.
fn unit_lines(document: &Document, unit: &CodeUnit) -> String {
    let lines = document.lines();
    let last = unit.end_line().min(lines.len().saturating_sub(1));
    lines
        .get(unit.start_line()..=last)
        .map(|ls| ls.join("\n"))
        .unwrap_or_default()
}
