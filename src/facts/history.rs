use std::collections::VecDeque;

use super::FactSet;

/// Default number of remembered fact texts
pub const HISTORY_CAPACITY: usize = 50;
/// How many of the oldest entries are dropped once the capacity is exceeded
pub const HISTORY_TRIM: usize = 3;

/// Rolling list of recently shown fact texts, used as a de-duplication hint
/// for the content provider. Owned by the game session.
#[derive(Debug, Clone)]
pub struct FactHistory {
    entries: VecDeque<String>,
    capacity: usize,
    trim: usize,
}

impl FactHistory {
    pub fn new(capacity: usize, trim: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity + FactSet::LEN),
            capacity,
            trim: trim.max(1),
        }
    }

    /// Remember every text of a freshly generated set
    pub fn record(&mut self, set: &FactSet) {
        self.entries
            .extend(set.facts().iter().map(|fact| fact.text.clone()));

        while self.entries.len() > self.capacity {
            let drop = self.trim.min(self.entries.len());
            self.entries.drain(..drop);
        }
    }

    /// The newest `limit` entries, oldest first
    pub fn recent(&self, limit: usize) -> Vec<String> {
        let skip = self.entries.len().saturating_sub(limit);
        self.entries.iter().skip(skip).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Forget everything; called when a session ends
    pub fn reset(&mut self) {
        self.entries.clear();
    }
}

impl Default for FactHistory {
    fn default() -> Self {
        Self::new(HISTORY_CAPACITY, HISTORY_TRIM)
    }
}
