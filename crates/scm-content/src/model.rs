//! Content entity and request types exchanged with the boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Lifecycle status of a content entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentStatus {
    Created,
    Uploading,
    Uploaded,
    Processing,
    Processed,
    Failed,
    Archived,
}

impl ContentStatus {
    pub const ALL: [&'static str; 7] = [
        "created",
        "uploading",
        "uploaded",
        "processing",
        "processed",
        "failed",
        "archived",
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Uploading => "uploading",
            Self::Uploaded => "uploaded",
            Self::Processing => "processing",
            Self::Processed => "processed",
            Self::Failed => "failed",
            Self::Archived => "archived",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "created" => Some(Self::Created),
            "uploading" => Some(Self::Uploading),
            "uploaded" => Some(Self::Uploaded),
            "processing" => Some(Self::Processing),
            "processed" => Some(Self::Processed),
            "failed" => Some(Self::Failed),
            "archived" => Some(Self::Archived),
            _ => None,
        }
    }

    /// Data is stored and can be served.
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Uploaded | Self::Processed)
    }
}

/// Metadata of one stored content item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    pub id: Uuid,
    pub owner_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<Uuid>,
    pub name: String,
    pub description: String,
    pub document_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    pub tags: Vec<String>,
    pub metadata: Map<String, Value>,
    pub status: ContentStatus,
    pub storage_backend: String,
    pub size: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request to create a content item together with its data.
#[derive(Debug, Clone, Default)]
pub struct NewContent {
    pub owner_id: Uuid,
    pub tenant_id: Option<Uuid>,
    pub name: String,
    pub description: String,
    pub document_type: String,
    pub file_name: Option<String>,
    pub tags: Vec<String>,
    pub metadata: Map<String, Value>,
    pub storage_backend: String,
    pub data: Vec<u8>,
}

/// Partial update; `None` leaves the field untouched.
#[derive(Debug, Clone, Default)]
pub struct ContentUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
    pub metadata: Option<Map<String, Value>>,
}

impl ContentUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.tags.is_none()
            && self.metadata.is_none()
    }
}

/// Filters for listing. Pagination is applied by the caller.
#[derive(Debug, Clone, Default)]
pub struct ContentFilter {
    pub owner_id: Option<Uuid>,
    pub tenant_id: Option<Uuid>,
}

/// Raw bytes of a content item plus the metadata needed to serve them.
#[derive(Debug, Clone)]
pub struct ContentData {
    pub content: Content,
    pub data: Vec<u8>,
    /// Direct download location, for backends that can hand one out.
    pub url: Option<String>,
}
