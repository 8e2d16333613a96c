use std::time::{Duration, Instant};

use facecv_vecstore::squared_l2;

/// Suppresses repeated "unknown face" prompts for the same face within a
/// time window.
///
/// Live embeddings of one face never repeat bit for bit, so entries are
/// matched by proximity: a vector within `radius` (squared L2) of a
/// remembered vector counts as the same face. A radius of 0 only matches
/// exact repeats.
#[derive(Debug)]
pub struct DebounceCache {
    ttl: Duration,
    radius: f32,
    entries: Vec<DebounceEntry>,
}

#[derive(Debug)]
struct DebounceEntry {
    vector: Vec<f32>,
    last_seen: Instant,
}

impl DebounceCache {
    pub fn new(ttl: Duration, radius: f32) -> Self {
        Self {
            ttl,
            radius,
            entries: Vec::new(),
        }
    }

    /// [`DebounceCache::should_prompt_at`] using the current time.
    pub fn should_prompt(&mut self, vector: &[f32]) -> bool {
        self.should_prompt_at(vector, Instant::now())
    }

    /// Returns true when no remembered face is near `vector` or the nearest
    /// one was last prompted more than `ttl` ago; the face is then
    /// remembered as seen at `now`. Returns false otherwise and leaves the
    /// remembered time untouched.
    pub fn should_prompt_at(&mut self, vector: &[f32], now: Instant) -> bool {
        let ttl = self.ttl;
        self.entries
            .retain(|e| now.saturating_duration_since(e.last_seen) <= ttl);

        let near = self
            .entries
            .iter()
            .filter(|e| e.vector.len() == vector.len())
            .any(|e| squared_l2(&e.vector, vector) <= self.radius);
        if near {
            return false;
        }

        self.entries.push(DebounceEntry {
            vector: vector.to_vec(),
            last_seen: now,
        });
        true
    }

    /// Number of faces currently remembered.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
