//! Operation name constants: the exact strings sent as the `operation`
//! field of an exchange.

/// All operation names exposed by the content catalog.
pub struct Operations;

impl Operations {
    // ── Introspection ───────────────────────────────────────────────────
    pub const LIST_OPERATIONS: &str = "operations/list";
    pub const ECHO: &str = "echo";

    // ── Content ─────────────────────────────────────────────────────────
    pub const UPLOAD_CONTENT: &str = "upload_content";
    pub const GET_CONTENT: &str = "get_content";
    pub const GET_CONTENT_DETAILS: &str = "get_content_details";
    pub const GET_CONTENT_STATUS: &str = "get_content_status";
    pub const LIST_CONTENT: &str = "list_content";
    pub const SEARCH_CONTENT: &str = "search_content";
    pub const LIST_BY_STATUS: &str = "list_by_status";
    pub const DOWNLOAD_CONTENT: &str = "download_content";
    pub const UPDATE_CONTENT: &str = "update_content";
    pub const DELETE_CONTENT: &str = "delete_content";

    // ── Batch ───────────────────────────────────────────────────────────
    pub const BATCH_UPLOAD: &str = "batch_upload";
    pub const BATCH_GET_CONTENT: &str = "batch_get_content";

    // ── Resources ───────────────────────────────────────────────────────
    pub const LIST_RESOURCES: &str = "list_resources";
    pub const READ_RESOURCE: &str = "read_resource";
}

/// Returns true for names handled by the dispatcher itself rather than by a
/// registered descriptor.
pub fn is_builtin_operation(operation: &str) -> bool {
    operation == Operations::LIST_OPERATIONS
}
