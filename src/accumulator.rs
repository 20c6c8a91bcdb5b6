//! First-seen-wins accumulation of collected entities
//!
//! Entities arrive in batches (one per page, sub-query or window) and are
//! merged by the identifier field of their [`EntityKind`]. The first record
//! seen for an identifier is kept; later duplicates are counted and dropped.

use std::collections::HashSet;

use serde_json::Value;
use tracing::debug;

use crate::{Entity, EntityKind};

/// Origin used to build the display URL of a video
const VIDEO_URL_ORIGIN: &str = "https://www.tiktok.com/@";

/// Path segment between username and video id
const VIDEO_URL_SEGMENT: &str = "/video/";

/// Deduplicating accumulator for one entity kind
#[derive(Debug)]
pub struct ResultAccumulator {
    kind: EntityKind,
    seen_ids: HashSet<String>,
    entities: Vec<Entity>,
    duplicates_skipped: u64,
}

impl ResultAccumulator {
    /// Create an empty accumulator
    pub fn new(kind: EntityKind) -> Self {
        Self {
            kind,
            seen_ids: HashSet::new(),
            entities: Vec::new(),
            duplicates_skipped: 0,
        }
    }

    /// Merge a batch; returns how many entities were new.
    ///
    /// Entities without an identifier (e.g. error markers) are always kept.
    pub fn add<I>(&mut self, batch: I) -> usize
    where
        I: IntoIterator<Item = Entity>,
    {
        let mut added = 0;
        for entity in batch {
            if let Some(id) = entity.identifier(self.kind) {
                if !self.seen_ids.insert(id) {
                    self.duplicates_skipped += 1;
                    continue;
                }
            }
            self.entities.push(entity);
            added += 1;
        }

        debug!(
            kind = %self.kind,
            added,
            total = self.entities.len(),
            duplicates = self.duplicates_skipped,
            "Merged batch"
        );
        added
    }

    /// Number of distinct entities so far
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether nothing has been accumulated
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Number of duplicates dropped so far
    pub fn duplicates_skipped(&self) -> u64 {
        self.duplicates_skipped
    }

    /// Deduplicated entities in first-seen order.
    ///
    /// Videos gain a `url` field built from their username and id.
    pub fn finalize(self) -> Vec<Entity> {
        let mut entities = self.entities;
        if self.kind == EntityKind::Video {
            for entity in entities.iter_mut().filter(|e| !e.is_error_marker()) {
                let url = video_url(entity);
                entity.insert("url", url);
            }
        }
        entities
    }
}

/// Display URL of a video entity
pub fn video_url(entity: &Entity) -> String {
    let username = entity
        .get("username")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let id = entity.identifier(EntityKind::Video).unwrap_or_default();
    format!("{VIDEO_URL_ORIGIN}{username}{VIDEO_URL_SEGMENT}{id}")
}
