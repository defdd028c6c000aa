/// Content-addressed inspection cache.
///
/// Layout: `document key → unit identity → (content hash, findings)`.
/// An entry is valid only while the stored hash equals the hash of the
/// unit's current text, so editing one method never invalidates its
/// siblings. Entries are superseded, never removed; the table lives as long
/// as the owning `InspectionCache`.
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

use tokio::sync::watch;
use tracing::debug;

use crate::inspection::Finding;
use crate::symbols::{CodeUnit, ContentHash, Document, content_hash};

#[derive(Clone)]
enum Slot {
    Resolved(Vec<Finding>),
    /// An analysis is in flight; `None` until it completes.
    Pending(watch::Receiver<Option<Vec<Finding>>>),
}

#[derive(Clone)]
struct Entry {
    hash: ContentHash,
    slot: Slot,
    generation: u64,
}

type UnitTable = HashMap<String, Entry>;

#[derive(Default)]
pub struct InspectionCache {
    documents: RwLock<HashMap<String, UnitTable>>,
    generation: AtomicU64,
}

impl InspectionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Without `unit`, whether anything is cached for the document; with a
    /// unit, whether its entry matches the unit's current content.
    pub fn has_valid_entry(&self, document: &Document, unit: Option<&CodeUnit>) -> bool {
        let documents = self.documents.read().unwrap_or_else(PoisonError::into_inner);
        let Some(table) = documents.get(document.key()) else {
            return false;
        };
        match unit {
            None => true,
            Some(unit) => table
                .get(&unit.identity())
                .is_some_and(|e| e.hash == content_hash(document, unit)),
        }
    }

    /// Findings of `unit` if its entry is still valid, with absolute line
    /// numbers and the owning document attached.
    ///
    /// Waits for an in-flight analysis of the same content; an abandoned
    /// analysis reads as a miss.
    pub async fn get_valid(&self, document: &Document, unit: &CodeUnit) -> Option<Vec<Finding>> {
        let slot = {
            let documents = self.documents.read().unwrap_or_else(PoisonError::into_inner);
            let entry = documents
                .get(document.key())
                .and_then(|t| t.get(&unit.identity()))
                .filter(|e| e.hash == content_hash(document, unit));
            match entry {
                Some(e) => e.slot.clone(),
                None => {
                    debug!("cache miss for {unit} of {}", document.key());
                    return None;
                }
            }
        };

        let mut findings = match slot {
            Slot::Resolved(findings) => findings,
            Slot::Pending(mut rx) => match rx.wait_for(Option::is_some).await {
                Ok(value) => value.clone().unwrap_or_default(),
                Err(_) => {
                    debug!("pending analysis of {unit} was abandoned");
                    return None;
                }
            },
        };

        debug!("cache hit for {unit} of {}", document.key());
        for finding in &mut findings {
            finding.document = Some(document.key().to_string());
            finding.problem.position.line = unit.start_line() + finding.problem.position.relative_line;
        }
        Some(findings)
    }

    /// Union of the valid findings of every unit, skipping misses.
    pub async fn get_all_valid(&self, document: &Document, units: &[CodeUnit]) -> Vec<Finding> {
        let mut all = Vec::new();
        for unit in units {
            if let Some(findings) = self.get_valid(document, unit).await {
                all.extend(findings);
            }
        }
        all
    }

    /// Overwrite the entry of `unit` with its current hash. `findings` must
    /// carry unit-relative line numbers.
    pub fn store(&self, document: &Document, unit: &CodeUnit, findings: Vec<Finding>) {
        debug!(
            "cache {} inspections for {unit} of {}",
            findings.len(),
            document.key()
        );
        self.insert(document.key(), unit.identity(), content_hash(document, unit), Slot::Resolved(findings));
    }

    /// Distribute findings of a whole-document analysis (absolute lines) to
    /// the units that own them.
    ///
    /// Callables own findings anywhere in their range; types own only
    /// findings on their first line. Units receiving nothing are left
    /// untouched.
    pub fn store_all_from_document(
        &self,
        findings: &[Finding],
        units: &[CodeUnit],
        document: &Document,
    ) {
        for unit in units {
            let owned: Vec<Finding> = findings
                .iter()
                .filter(|f| {
                    let line = f.problem.position.line;
                    if unit.kind.is_callable() {
                        unit.range.contains_line(line)
                    } else {
                        line == unit.start_line()
                    }
                })
                .cloned()
                .map(|mut f| {
                    f.problem.position.relative_line = f.problem.position.line - unit.start_line();
                    f
                })
                .collect();
            if owned.is_empty() {
                continue;
            }
            self.store(document, unit, owned);
        }
    }

    /// Mark `unit` as being analyzed at its current content.
    ///
    /// Readers of the same content wait for [`PendingEntry::resolve`]. If the
    /// returned guard is dropped unresolved, the previous entry is restored.
    pub fn begin(&self, document: &Document, unit: &CodeUnit) -> PendingEntry<'_> {
        let (tx, rx) = watch::channel(None);
        let identity = unit.identity();
        let hash = content_hash(document, unit);
        let (generation, previous) =
            self.insert(document.key(), identity.clone(), hash.clone(), Slot::Pending(rx));
        PendingEntry {
            cache: self,
            document_key: document.key().to_string(),
            identity,
            hash,
            generation,
            previous,
            tx,
            done: false,
        }
    }

    fn insert(
        &self,
        document_key: &str,
        identity: String,
        hash: ContentHash,
        slot: Slot,
    ) -> (u64, Option<Entry>) {
        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        let mut documents = self.documents.write().unwrap_or_else(PoisonError::into_inner);
        let previous = documents.entry(document_key.to_string()).or_default().insert(
            identity,
            Entry {
                hash,
                slot,
                generation,
            },
        );
        (generation, previous)
    }
}

/// Guard for an in-flight analysis installed by [`InspectionCache::begin`].
pub struct PendingEntry<'a> {
    cache: &'a InspectionCache,
    document_key: String,
    identity: String,
    hash: ContentHash,
    generation: u64,
    previous: Option<Entry>,
    tx: watch::Sender<Option<Vec<Finding>>>,
    done: bool,
}

impl PendingEntry<'_> {
    /// Store `findings` (unit-relative lines) and wake waiting readers.
    pub fn resolve(mut self, findings: Vec<Finding>) {
        self.done = true;
        self.cache.insert(
            &self.document_key,
            self.identity.clone(),
            self.hash.clone(),
            Slot::Resolved(findings.clone()),
        );
        self.tx.send_replace(Some(findings));
    }

    /// Restore the entry that preceded this analysis.
    pub fn abandon(mut self) {
        self.rollback();
    }

    fn rollback(&mut self) {
        if self.done {
            return;
        }
        self.done = true;
        let mut documents = self
            .cache
            .documents
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let Some(table) = documents.get_mut(&self.document_key) else {
            return;
        };
        // a newer write owns the slot now
        if table.get(&self.identity).map(|e| e.generation) != Some(self.generation) {
            return;
        }
        match self.previous.take() {
            Some(previous) => {
                table.insert(self.identity.clone(), previous);
            }
            None => {
                table.remove(&self.identity);
                if table.is_empty() {
                    documents.remove(&self.document_key);
                }
            }
        }
    }
}

impl Drop for PendingEntry<'_> {
    fn drop(&mut self) {
        self.rollback();
    }
}
