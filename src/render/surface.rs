/// Destination of display items: an editor, a terminal, or a test double.
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use super::{DisplayItem, RendererKind};

pub trait Surface: Send + Sync {
    /// Show exactly `items` for `document` in the slot of `kind`, replacing
    /// whatever that slot showed before.
    fn publish(&self, kind: RendererKind, document: &str, items: &[DisplayItem]);
}

/// Surface that keeps the latest items of every slot in memory.
#[derive(Default)]
pub struct MemorySurface {
    slots: Mutex<HashMap<(RendererKind, String), Vec<DisplayItem>>>,
    publishes: AtomicUsize,
}

impl MemorySurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self, kind: RendererKind, document: &str) -> Vec<DisplayItem> {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(kind, document.to_string()))
            .cloned()
            .unwrap_or_default()
    }

    /// Non-empty slots of `document`, ordered by kind.
    pub fn snapshot(&self, document: &str) -> Vec<(RendererKind, Vec<DisplayItem>)> {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        let mut out: Vec<(RendererKind, Vec<DisplayItem>)> = slots
            .iter()
            .filter(|((_, doc), items)| doc == document && !items.is_empty())
            .map(|((kind, _), items)| (*kind, items.clone()))
            .collect();
        out.sort_by_key(|(kind, _)| *kind);
        out
    }

    pub fn publish_count(&self) -> usize {
        self.publishes.load(Ordering::Relaxed)
    }
}

impl Surface for MemorySurface {
    fn publish(&self, kind: RendererKind, document: &str, items: &[DisplayItem]) {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((kind, document.to_string()), items.to_vec());
        self.publishes.fetch_add(1, Ordering::Relaxed);
    }
}
