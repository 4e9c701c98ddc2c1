//! Content Service Boundary
//!
//! The business layer behind the dispatcher. Operation handlers only ever
//! see the [`ContentService`] trait; every call may block on I/O and may
//! fail with a typed [`ContentError`].

pub mod error;
pub mod memory;
pub mod model;

pub use error::ContentError;
pub use memory::MemoryContentService;
pub use model::{Content, ContentData, ContentFilter, ContentStatus, ContentUpdate, NewContent};

use std::future::Future;

use uuid::Uuid;

/// Trait implemented by content backends.
///
/// Implementations must be cheap to share across tasks (`Send + Sync`);
/// handlers hold them behind an `Arc`.
pub trait ContentService: Send + Sync + 'static {
    /// Store a new content item with its data.
    fn create(&self, req: NewContent) -> impl Future<Output = Result<Content, ContentError>> + Send;

    /// Fetch metadata of a live (not deleted) content item.
    fn get(&self, id: Uuid) -> impl Future<Output = Result<Content, ContentError>> + Send;

    /// Apply a partial update and return the new metadata.
    fn update(
        &self,
        id: Uuid,
        update: ContentUpdate,
    ) -> impl Future<Output = Result<Content, ContentError>> + Send;

    /// Soft-delete a content item.
    fn delete(&self, id: Uuid) -> impl Future<Output = Result<(), ContentError>> + Send;

    /// List live content matching the filter, oldest first.
    fn list(
        &self,
        filter: ContentFilter,
    ) -> impl Future<Output = Result<Vec<Content>, ContentError>> + Send;

    /// Read back the stored bytes.
    fn download(&self, id: Uuid) -> impl Future<Output = Result<ContentData, ContentError>> + Send;
}
