//! In-memory content backend.
//!
//! Keeps metadata and bytes in a single map behind a `RwLock`. Deleted
//! entries stay in the map with a tombstone so ids are never reused.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::error::ContentError;
use crate::model::{Content, ContentData, ContentFilter, ContentStatus, ContentUpdate, NewContent};
use crate::ContentService;

/// Storage backend label recorded when the request names none.
pub const DEFAULT_BACKEND: &str = "memory";

struct Entry {
    /// Insertion order; entries are never removed so this is stable.
    seq: usize,
    content: Content,
    data: Vec<u8>,
    deleted: bool,
}

/// Reference [`ContentService`] keeping everything in process memory.
#[derive(Clone, Default)]
pub struct MemoryContentService {
    entries: Arc<RwLock<HashMap<Uuid, Entry>>>,
}

impl MemoryContentService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (not deleted) items.
    pub fn len(&self) -> usize {
        self.entries.read().values().filter(|e| !e.deleted).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn live(&self, id: Uuid) -> Result<Content, ContentError> {
        match self.entries.read().get(&id) {
            Some(entry) if !entry.deleted => Ok(entry.content.clone()),
            _ => Err(ContentError::not_found(id)),
        }
    }
}

impl ContentService for MemoryContentService {
    async fn create(&self, req: NewContent) -> Result<Content, ContentError> {
        if req.name.trim().is_empty() {
            return Err(ContentError::validation("name", "must not be empty"));
        }
        if req.owner_id.is_nil() {
            return Err(ContentError::validation("owner_id", "must not be nil"));
        }

        let now = Utc::now();
        let content = Content {
            id: Uuid::new_v4(),
            owner_id: req.owner_id,
            tenant_id: req.tenant_id,
            name: req.name,
            description: req.description,
            document_type: req.document_type,
            file_name: req.file_name,
            tags: req.tags,
            metadata: req.metadata,
            // Bytes land together with the metadata, so there is no
            // observable `created` window.
            status: ContentStatus::Uploaded,
            storage_backend: if req.storage_backend.is_empty() {
                DEFAULT_BACKEND.to_string()
            } else {
                req.storage_backend
            },
            size: req.data.len() as u64,
            created_at: now,
            updated_at: now,
        };
        debug!(id = %content.id, size = content.size, "Stored content");
        let mut entries = self.entries.write();
        let seq = entries.len();
        entries.insert(
            content.id,
            Entry {
                seq,
                content: content.clone(),
                data: req.data,
                deleted: false,
            },
        );
        Ok(content)
    }

    async fn get(&self, id: Uuid) -> Result<Content, ContentError> {
        self.live(id)
    }

    async fn update(&self, id: Uuid, update: ContentUpdate) -> Result<Content, ContentError> {
        if let Some(name) = &update.name
            && name.trim().is_empty()
        {
            return Err(ContentError::validation("name", "must not be empty"));
        }

        let mut entries = self.entries.write();
        let entry = match entries.get_mut(&id) {
            Some(entry) if !entry.deleted => entry,
            _ => return Err(ContentError::not_found(id)),
        };

        let content = &mut entry.content;
        if let Some(name) = update.name {
            content.name = name;
        }
        if let Some(description) = update.description {
            content.description = description;
        }
        if let Some(tags) = update.tags {
            content.tags = tags;
        }
        if let Some(metadata) = update.metadata {
            content.metadata = metadata;
        }
        content.updated_at = Utc::now();
        Ok(content.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<(), ContentError> {
        let mut entries = self.entries.write();
        match entries.get_mut(&id) {
            Some(entry) if !entry.deleted => {
                entry.deleted = true;
                entry.content.status = ContentStatus::Archived;
                entry.content.updated_at = Utc::now();
                debug!(%id, "Deleted content");
                Ok(())
            }
            _ => Err(ContentError::not_found(id)),
        }
    }

    async fn list(&self, filter: ContentFilter) -> Result<Vec<Content>, ContentError> {
        let entries = self.entries.read();
        let mut live: Vec<&Entry> = entries
            .values()
            .filter(|e| !e.deleted)
            .filter(|e| filter.owner_id.is_none_or(|o| e.content.owner_id == o))
            .filter(|e| filter.tenant_id.is_none_or(|t| e.content.tenant_id == Some(t)))
            .collect();
        live.sort_by_key(|e| e.seq);
        Ok(live.into_iter().map(|e| e.content.clone()).collect())
    }

    async fn download(&self, id: Uuid) -> Result<ContentData, ContentError> {
        match self.entries.read().get(&id) {
            Some(entry) if !entry.deleted => Ok(ContentData {
                content: entry.content.clone(),
                data: entry.data.clone(),
                url: None,
            }),
            _ => Err(ContentError::not_found(id)),
        }
    }
}
