//! Content operation catalog.
//!
//! Registers the content operations against a [`ContentService`]. Handlers
//! receive arguments that already passed their contract; they resolve the
//! caller's identity, enforce ownership and translate to service calls.

use std::collections::BTreeMap;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use scm_content::{
    Content, ContentData, ContentFilter, ContentService, ContentStatus, ContentUpdate, NewContent,
};
use scm_protocol::{ExchangeError, HandlerResult, Operations, RequestContext};
use serde::Serialize;
use serde_json::{Map, Value, json};
use thiserror::Error;
use uuid::Uuid;

use crate::batch::BatchEngine;
use crate::contract::{ArgumentContract, ArgumentViolation};
use crate::registry::{OperationRegistry, RegistryBuilder, RegistryError};

type Args = Map<String, Value>;

const CONTENT_SCHEMA_URI: &str = "schema://content";
const SYSTEM_STATS_URI: &str = "stats://system";
const CONTENT_URI_PREFIX: &str = "content://";

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Limits applied by the catalog.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    pub max_batch_size: usize,
    pub default_page_size: usize,
    pub max_page_size: usize,
    /// When set, `owner_id` may be omitted and defaults to the caller.
    pub auth_enabled: bool,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            max_batch_size: 100,
            default_page_size: 50,
            max_page_size: 1000,
            auth_enabled: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("max batch size must be greater than 0")]
    MaxBatchSize,
    #[error("default page size must be greater than 0")]
    DefaultPageSize,
    #[error("max page size must be greater than 0")]
    MaxPageSize,
    #[error("default page size ({default}) must not exceed max page size ({max})")]
    PageSizeOrder { default: usize, max: usize },
}

impl CatalogConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_batch_size == 0 {
            return Err(ConfigError::MaxBatchSize);
        }
        if self.default_page_size == 0 {
            return Err(ConfigError::DefaultPageSize);
        }
        if self.max_page_size == 0 {
            return Err(ConfigError::MaxPageSize);
        }
        if self.default_page_size > self.max_page_size {
            return Err(ConfigError::PageSizeOrder {
                default: self.default_page_size,
                max: self.max_page_size,
            });
        }
        Ok(())
    }

    /// `(limit, offset)` with the limit clamped to the maximum page size.
    fn page(&self, args: &Args) -> (usize, usize) {
        let limit = count_field(args, "limit")
            .unwrap_or(self.default_page_size)
            .clamp(1, self.max_page_size);
        let offset = count_field(args, "offset").unwrap_or(0);
        (limit, offset)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Registration
// ─────────────────────────────────────────────────────────────────────────────

/// Build a registry holding the full content catalog.
pub fn build_registry<S: ContentService>(
    service: Arc<S>,
    config: &CatalogConfig,
) -> Result<OperationRegistry, RegistryError> {
    let mut builder = RegistryBuilder::new();
    register_catalog(&mut builder, service, config)?;
    Ok(builder.build())
}

macro_rules! route {
    ($catalog:expr, $method:ident) => {{
        let catalog = $catalog.clone();
        move |ctx: RequestContext, args: Args| {
            let catalog = catalog.clone();
            async move { catalog.$method(&ctx, &args).await }
        }
    }};
}

/// Register every content operation on `builder`.
pub fn register_catalog<S: ContentService>(
    builder: &mut RegistryBuilder,
    service: Arc<S>,
    config: &CatalogConfig,
) -> Result<(), RegistryError> {
    let upload_item = ArgumentContract::from_schema(schemas::upload_item()).map_err(|source| {
        RegistryError::InvalidSchema {
            operation: Operations::BATCH_UPLOAD.to_string(),
            source,
        }
    })?;
    let catalog = Arc::new(Catalog {
        service,
        config: config.clone(),
        engine: BatchEngine::new(config.max_batch_size),
        upload_item: Arc::new(upload_item),
    });

    builder
        .operation(
            Operations::ECHO,
            "Echo a message back with the negotiated protocol version",
            schemas::echo(),
            route!(catalog, echo),
        )?
        .operation(
            Operations::UPLOAD_CONTENT,
            "Upload content with data in a single operation",
            schemas::upload(config),
            route!(catalog, upload),
        )?
        .operation(
            Operations::GET_CONTENT,
            "Retrieve content metadata by ID",
            schemas::content_id(),
            route!(catalog, get),
        )?
        .operation(
            Operations::GET_CONTENT_DETAILS,
            "Get complete content information including download location",
            schemas::content_id(),
            route!(catalog, details),
        )?
        .operation(
            Operations::GET_CONTENT_STATUS,
            "Get content lifecycle status and readiness",
            schemas::content_id(),
            route!(catalog, status),
        )?
        .operation(
            Operations::LIST_CONTENT,
            "List content with filtering and pagination",
            schemas::list(config),
            route!(catalog, list),
        )?
        .operation(
            Operations::SEARCH_CONTENT,
            "Search content by name, description, tags or status",
            schemas::search(config),
            route!(catalog, search),
        )?
        .operation(
            Operations::LIST_BY_STATUS,
            "List content by lifecycle status",
            schemas::list_by_status(config),
            route!(catalog, list_by_status),
        )?
        .operation(
            Operations::DOWNLOAD_CONTENT,
            "Download content data (returns download URL or base64)",
            schemas::download(),
            route!(catalog, download),
        )?
        .operation(
            Operations::UPDATE_CONTENT,
            "Update content metadata",
            schemas::update(),
            route!(catalog, update),
        )?
        .operation(
            Operations::DELETE_CONTENT,
            "Soft delete content",
            schemas::content_id(),
            route!(catalog, delete),
        )?
        .operation(
            Operations::BATCH_UPLOAD,
            "Upload multiple content items in one operation",
            schemas::batch_upload(config),
            route!(catalog, batch_upload),
        )?
        .operation(
            Operations::BATCH_GET_CONTENT,
            "Get metadata for multiple content IDs in parallel",
            schemas::batch_get(),
            route!(catalog, batch_get),
        )?
        .operation(
            Operations::LIST_RESOURCES,
            "List readable resources and resource templates",
            schemas::no_arguments(),
            route!(catalog, list_resources),
        )?
        .operation(
            Operations::READ_RESOURCE,
            "Read a resource by URI (content://{id}, schema://content, stats://system)",
            schemas::read_resource(),
            route!(catalog, read_resource),
        )?;
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

struct Catalog<S> {
    service: Arc<S>,
    config: CatalogConfig,
    engine: BatchEngine,
    upload_item: Arc<ArgumentContract>,
}

impl<S: ContentService> Catalog<S> {
    async fn echo(&self, ctx: &RequestContext, args: &Args) -> HandlerResult {
        Ok(json!({
            "message": args.get("message").cloned().unwrap_or(Value::Null),
            "protocolVersion": ctx.protocol_version,
        }))
    }

    async fn upload(&self, ctx: &RequestContext, args: &Args) -> HandlerResult {
        let owner_id = resolve_owner(ctx, args)?;
        let tenant_id = resolve_tenant(ctx, args)?;
        let data = decode_data(args)?;
        let content = self
            .service
            .create(new_content(owner_id, tenant_id, args, data))
            .await?;
        to_json(&content)
    }

    async fn get(&self, ctx: &RequestContext, args: &Args) -> HandlerResult {
        let content = self.fetch_owned(ctx, uuid_field(args, "content_id")?).await?;
        to_json(&content)
    }

    async fn details(&self, ctx: &RequestContext, args: &Args) -> HandlerResult {
        let download = self.fetch_data(ctx, uuid_field(args, "content_id")?).await?;
        Ok(details_json(&download))
    }

    async fn status(&self, ctx: &RequestContext, args: &Args) -> HandlerResult {
        let content = self.fetch_owned(ctx, uuid_field(args, "content_id")?).await?;
        Ok(json!({
            "id": content.id,
            "status": content.status,
            "ready": content.status.is_ready(),
            "updated_at": content.updated_at,
        }))
    }

    async fn list(&self, ctx: &RequestContext, args: &Args) -> HandlerResult {
        let statuses = args
            .get("status")
            .and_then(Value::as_str)
            .and_then(ContentStatus::parse)
            .map(|s| vec![s]);
        let query = Query {
            statuses,
            tags: string_list(args, "tags"),
            ..Default::default()
        };
        self.query(ctx, args, &query).await
    }

    async fn search(&self, ctx: &RequestContext, args: &Args) -> HandlerResult {
        let statuses = string_list(args, "status")
            .map(|list| list.iter().filter_map(|s| ContentStatus::parse(s)).collect());
        let query = Query {
            text: str_field(args, "query")
                .filter(|q| !q.trim().is_empty())
                .map(str::to_lowercase),
            document_type: str_field(args, "document_type").map(str::to_string),
            statuses,
            tags: string_list(args, "tags"),
        };
        self.query(ctx, args, &query).await
    }

    async fn list_by_status(&self, ctx: &RequestContext, args: &Args) -> HandlerResult {
        let status = str_field(args, "status")
            .and_then(ContentStatus::parse)
            .ok_or_else(|| ExchangeError::validation("status", "required"))?;
        let query = Query {
            statuses: Some(vec![status]),
            ..Default::default()
        };
        self.query(ctx, args, &query).await
    }

    async fn download(&self, ctx: &RequestContext, args: &Args) -> HandlerResult {
        let download = self.fetch_data(ctx, uuid_field(args, "content_id")?).await?;

        let content = &download.content;
        match (str_field(args, "format"), &download.url) {
            (Some("url"), Some(url)) => Ok(json!({
                "content_id": content.id,
                "format": "url",
                "url": url,
                "name": content.name,
                "document_type": content.document_type,
                "size": content.size,
            })),
            // Backends without URLs always answer inline.
            _ => Ok(json!({
                "content_id": content.id,
                "format": "base64",
                "data": STANDARD.encode(&download.data),
                "name": content.name,
                "file_name": content.file_name,
                "document_type": content.document_type,
                "size": content.size,
            })),
        }
    }

    async fn update(&self, ctx: &RequestContext, args: &Args) -> HandlerResult {
        let current = self.fetch_owned(ctx, uuid_field(args, "content_id")?).await?;

        let update = ContentUpdate {
            name: str_field(args, "name").map(str::to_string),
            description: str_field(args, "description").map(str::to_string),
            tags: string_list(args, "tags"),
            metadata: args.get("metadata").and_then(Value::as_object).cloned(),
        };
        if update.is_empty() {
            return to_json(&current);
        }
        let updated = self.service.update(current.id, update).await?;
        to_json(&updated)
    }

    async fn delete(&self, ctx: &RequestContext, args: &Args) -> HandlerResult {
        let content = self.fetch_owned(ctx, uuid_field(args, "content_id")?).await?;
        self.service.delete(content.id).await?;
        Ok(json!({ "content_id": content.id, "deleted": true }))
    }

    async fn batch_upload(&self, ctx: &RequestContext, args: &Args) -> HandlerResult {
        let owner_id = resolve_owner(ctx, args)?;
        let tenant_id = resolve_tenant(ctx, args)?;
        let items = array_field(args, "items");

        let report = self
            .engine
            .run(items, |index, item| {
                let service = self.service.clone();
                let contract = self.upload_item.clone();
                async move {
                    let path = format!("items[{index}]");
                    let fields = contract.validate(Some(item)).map_err(|v| v.within(&path))?;
                    let data = decode_data(&fields).map_err(|v| v.within(&path))?;
                    let content = service
                        .create(new_content(owner_id, tenant_id, &fields, data))
                        .await?;
                    to_json(&content)
                }
            })
            .await?;
        to_json(&report)
    }

    async fn batch_get(&self, ctx: &RequestContext, args: &Args) -> HandlerResult {
        let items = array_field(args, "items");

        let report = self
            .engine
            .run(items, |index, item| {
                let service = self.service.clone();
                let ctx = ctx.clone();
                async move {
                    let id = item
                        .as_str()
                        .and_then(|s| Uuid::parse_str(s).ok())
                        .ok_or_else(|| {
                            ExchangeError::validation(format!("items[{index}]"), "must be a valid UUID")
                        })?;
                    let content = service.get(id).await?;
                    authorize(&ctx, &content)?;
                    to_json(&content)
                }
            })
            .await?;
        to_json(&report)
    }

    async fn list_resources(&self, _ctx: &RequestContext, _args: &Args) -> HandlerResult {
        Ok(json!({
            "resources": [
                {
                    "uri": CONTENT_SCHEMA_URI,
                    "name": "content-schema",
                    "description": "JSON schema for the content entity",
                    "mime_type": "application/schema+json",
                },
                {
                    "uri": SYSTEM_STATS_URI,
                    "name": "system-stats",
                    "description": "Content counts by lifecycle status",
                    "mime_type": "application/json",
                },
            ],
            "templates": [
                {
                    "uri_template": "content://{id}",
                    "name": "content",
                    "description": "Content metadata by ID",
                    "mime_type": "application/json",
                },
                {
                    "uri_template": "content://{id}/details",
                    "name": "content-details",
                    "description": "Content details by ID",
                    "mime_type": "application/json",
                },
            ],
        }))
    }

    async fn read_resource(&self, ctx: &RequestContext, args: &Args) -> HandlerResult {
        let uri = str_field(args, "uri").unwrap_or_default();
        let (mime_type, contents) = match Resource::parse(uri)? {
            Resource::Schema => ("application/schema+json", schemas::content_entity()),
            Resource::Stats => ("application/json", self.stats(ctx).await?),
            Resource::Content(id) => ("application/json", to_json(&self.fetch_owned(ctx, id).await?)?),
            Resource::Details(id) => ("application/json", details_json(&self.fetch_data(ctx, id).await?)),
        };
        Ok(json!({"uri": uri, "mime_type": mime_type, "contents": contents}))
    }

    /// Counts by status over everything the caller can see.
    async fn stats(&self, ctx: &RequestContext) -> HandlerResult {
        let scope = Args::new();
        let filter = ContentFilter {
            owner_id: owner_filter(ctx, &scope)?,
            tenant_id: tenant_filter(ctx, &scope)?,
        };
        let items = self.service.list(filter).await?;

        let mut by_status: BTreeMap<&str, usize> = ContentStatus::ALL.iter().map(|s| (*s, 0)).collect();
        for content in &items {
            *by_status.entry(content.status.as_str()).or_default() += 1;
        }
        Ok(json!({
            "content_count": {
                "total": items.len(),
                "by_status": by_status,
            }
        }))
    }

    async fn fetch_data(&self, ctx: &RequestContext, id: Uuid) -> Result<ContentData, ExchangeError> {
        let download = self.service.download(id).await?;
        authorize(ctx, &download.content)?;
        Ok(download)
    }

    /// Fetch content and check the caller may see it.
    async fn fetch_owned(&self, ctx: &RequestContext, id: Uuid) -> Result<Content, ExchangeError> {
        let content = self.service.get(id).await?;
        authorize(ctx, &content)?;
        Ok(content)
    }

    async fn query(&self, ctx: &RequestContext, args: &Args, query: &Query) -> HandlerResult {
        let filter = ContentFilter {
            owner_id: owner_filter(ctx, args)?,
            tenant_id: tenant_filter(ctx, args)?,
        };
        let (limit, offset) = self.config.page(args);

        let matching: Vec<Content> = self
            .service
            .list(filter)
            .await?
            .into_iter()
            .filter(|c| query.matches(c))
            .collect();
        let total = matching.len();
        let items: Vec<Content> = matching.into_iter().skip(offset).take(limit).collect();

        Ok(json!({
            "items": items,
            "count": items.len(),
            "total": total,
            "limit": limit,
            "offset": offset,
        }))
    }
}

/// In-process filters applied on top of the service listing.
#[derive(Debug, Default)]
struct Query {
    /// Lower-cased search text.
    text: Option<String>,
    document_type: Option<String>,
    statuses: Option<Vec<ContentStatus>>,
    tags: Option<Vec<String>>,
}

impl Query {
    fn matches(&self, content: &Content) -> bool {
        if let Some(text) = &self.text {
            let hit = content.name.to_lowercase().contains(text)
                || content.description.to_lowercase().contains(text)
                || content
                    .file_name
                    .as_deref()
                    .is_some_and(|f| f.to_lowercase().contains(text));
            if !hit {
                return false;
            }
        }
        if let Some(document_type) = &self.document_type
            && &content.document_type != document_type
        {
            return false;
        }
        if let Some(statuses) = &self.statuses
            && !statuses.contains(&content.status)
        {
            return false;
        }
        if let Some(tags) = &self.tags
            && !tags.iter().all(|t| content.tags.contains(t))
        {
            return false;
        }
        true
    }
}

/// A readable resource URI.
#[derive(Debug, PartialEq, Eq)]
enum Resource {
    Schema,
    Stats,
    Content(Uuid),
    Details(Uuid),
}

impl Resource {
    fn parse(uri: &str) -> Result<Self, ExchangeError> {
        match uri {
            CONTENT_SCHEMA_URI => return Ok(Self::Schema),
            SYSTEM_STATS_URI => return Ok(Self::Stats),
            _ => {}
        }
        let not_found = || ExchangeError::not_found("resource", uri);
        let path = uri.strip_prefix(CONTENT_URI_PREFIX).ok_or_else(not_found)?;
        let (id, details) = match path.split_once('/') {
            None => (path, false),
            Some((id, "details")) => (id, true),
            Some(_) => return Err(not_found()),
        };
        if id.is_empty() {
            return Err(not_found());
        }
        let id = Uuid::parse_str(id)
            .map_err(|_| ExchangeError::validation("uri", "content id must be a valid UUID"))?;
        Ok(if details { Self::Details(id) } else { Self::Content(id) })
    }
}

fn details_json(download: &ContentData) -> Value {
    let content = &download.content;
    json!({
        "id": content.id,
        "download_url": download.url,
        "file_name": content.file_name,
        "file_size": content.size,
        "mime_type": content.document_type,
        "tags": content.tags,
        "ready": content.status.is_ready(),
        "created_at": content.created_at,
        "updated_at": content.updated_at,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Identity and ownership
// ─────────────────────────────────────────────────────────────────────────────

/// Owner for writes: the caller's own id when authenticated (an explicit
/// `owner_id` must match it), else the `owner_id` argument.
fn resolve_owner(ctx: &RequestContext, args: &Args) -> Result<Uuid, ExchangeError> {
    let requested = uuid_field_opt(args, "owner_id")?;
    match (ctx.auth, requested) {
        (Some(auth), Some(owner)) => {
            auth.enforce_owner(owner)?;
            Ok(owner)
        }
        (Some(auth), None) => Ok(auth.owner_id),
        (None, Some(owner)) => Ok(owner),
        (None, None) => Err(ExchangeError::validation("owner_id", "required")),
    }
}

fn resolve_tenant(ctx: &RequestContext, args: &Args) -> Result<Option<Uuid>, ExchangeError> {
    let requested = uuid_field_opt(args, "tenant_id")?;
    match ctx.auth {
        Some(auth) => {
            let tenant = requested.or(auth.tenant_id);
            auth.enforce_tenant(tenant)?;
            Ok(tenant)
        }
        None => Ok(requested),
    }
}

fn owner_filter(ctx: &RequestContext, args: &Args) -> Result<Option<Uuid>, ExchangeError> {
    if ctx.auth.is_some() {
        resolve_owner(ctx, args).map(Some)
    } else {
        uuid_field_opt(args, "owner_id")
    }
}

fn tenant_filter(ctx: &RequestContext, args: &Args) -> Result<Option<Uuid>, ExchangeError> {
    resolve_tenant(ctx, args)
}

fn authorize(ctx: &RequestContext, content: &Content) -> Result<(), ExchangeError> {
    if let Some(auth) = ctx.auth {
        auth.enforce_owner(content.owner_id)?;
        auth.enforce_tenant(content.tenant_id)?;
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Argument helpers
// ─────────────────────────────────────────────────────────────────────────────

fn str_field<'a>(args: &'a Args, key: &str) -> Option<&'a str> {
    args.get(key).and_then(Value::as_str)
}

fn uuid_field_opt(args: &Args, key: &str) -> Result<Option<Uuid>, ExchangeError> {
    match str_field(args, key).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => Uuid::parse_str(s)
            .map(Some)
            .map_err(|_| ExchangeError::validation(key, "must be a valid UUID")),
    }
}

fn uuid_field(args: &Args, key: &str) -> Result<Uuid, ExchangeError> {
    uuid_field_opt(args, key)?.ok_or_else(|| ExchangeError::validation(key, "required"))
}

fn string_list(args: &Args, key: &str) -> Option<Vec<String>> {
    args.get(key).and_then(Value::as_array).map(|values| {
        values
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect()
    })
}

/// Non-negative count; integral floats such as `5.0` or `1e20` saturate.
fn count_field(args: &Args, key: &str) -> Option<usize> {
    let value = args.get(key)?;
    value
        .as_u64()
        .or_else(|| value.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
        .map(|n| usize::try_from(n).unwrap_or(usize::MAX))
}

fn array_field(args: &Args, key: &str) -> Vec<Value> {
    args.get(key)
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

fn decode_data(args: &Args) -> Result<Vec<u8>, ArgumentViolation> {
    let raw = str_field(args, "data").unwrap_or_default();
    STANDARD.decode(raw.trim()).map_err(|e| ArgumentViolation {
        field: "data".into(),
        reason: format!("must be base64 encoded ({e})"),
    })
}

fn new_content(owner_id: Uuid, tenant_id: Option<Uuid>, fields: &Args, data: Vec<u8>) -> NewContent {
    NewContent {
        owner_id,
        tenant_id,
        name: str_field(fields, "name").unwrap_or_default().to_string(),
        description: str_field(fields, "description").unwrap_or_default().to_string(),
        document_type: str_field(fields, "document_type")
            .unwrap_or_default()
            .to_string(),
        file_name: str_field(fields, "file_name").map(str::to_string),
        tags: string_list(fields, "tags").unwrap_or_default(),
        metadata: fields
            .get("metadata")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default(),
        storage_backend: str_field(fields, "storage_backend")
            .unwrap_or_default()
            .to_string(),
        data,
    }
}

fn to_json<T: Serialize>(value: &T) -> HandlerResult {
    serde_json::to_value(value)
        .map_err(|e| ExchangeError::internal(format!("failed to serialize result: {e}")))
}

// ─────────────────────────────────────────────────────────────────────────────
// Input schemas
// ─────────────────────────────────────────────────────────────────────────────

mod schemas {
    use scm_content::ContentStatus;
    use serde_json::{Value, json};

    use super::CatalogConfig;

    fn uuid(description: &str) -> Value {
        json!({"type": "string", "format": "uuid", "description": description})
    }

    fn tags(description: &str) -> Value {
        json!({"type": "array", "items": {"type": "string"}, "description": description})
    }

    fn owner_required(config: &CatalogConfig) -> Vec<&'static str> {
        if config.auth_enabled {
            vec![]
        } else {
            vec!["owner_id"]
        }
    }

    fn limit(config: &CatalogConfig) -> Value {
        json!({
            "type": "integer",
            "minimum": 1,
            "default": config.default_page_size,
            "description": format!("Maximum number of results (capped at {})", config.max_page_size),
        })
    }

    fn offset() -> Value {
        json!({"type": "integer", "minimum": 0, "default": 0, "description": "Offset for pagination"})
    }

    pub fn echo() -> Value {
        json!({
            "type": "object",
            "properties": {"message": {"type": "string", "description": "Text to echo"}},
            "required": ["message"]
        })
    }

    fn item_properties() -> Value {
        json!({
            "name": {"type": "string", "minLength": 1, "description": "Content name"},
            "description": {"type": "string", "description": "Content description"},
            "document_type": {"type": "string", "description": "MIME type of the content"},
            "file_name": {"type": "string", "description": "Original file name"},
            "storage_backend": {"type": "string", "description": "Storage backend name"},
            "data": {"type": "string", "description": "Base64 encoded data"},
            "tags": tags("Tags for categorization"),
            "metadata": {"type": "object", "description": "Custom metadata"}
        })
    }

    pub fn upload_item() -> Value {
        json!({
            "type": "object",
            "properties": item_properties(),
            "required": ["name", "data"]
        })
    }

    pub fn upload(config: &CatalogConfig) -> Value {
        let mut properties = item_properties();
        if let Some(map) = properties.as_object_mut() {
            map.insert("owner_id".into(), uuid("Owner UUID"));
            map.insert("tenant_id".into(), uuid("Tenant UUID (optional)"));
        }
        let mut required = owner_required(config);
        required.extend(["name", "data"]);
        json!({"type": "object", "properties": properties, "required": required})
    }

    pub fn content_id() -> Value {
        json!({
            "type": "object",
            "properties": {"content_id": uuid("Content ID")},
            "required": ["content_id"]
        })
    }

    pub fn list(config: &CatalogConfig) -> Value {
        json!({
            "type": "object",
            "properties": {
                "owner_id": uuid("Filter by owner ID"),
                "tenant_id": uuid("Filter by tenant ID"),
                "status": {"type": "string", "enum": ContentStatus::ALL, "description": "Filter by status"},
                "tags": tags("Filter by tags (all must match)"),
                "limit": limit(config),
                "offset": offset()
            },
            "required": owner_required(config)
        })
    }

    pub fn search(config: &CatalogConfig) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {"type": "string", "description": "Text matched against name, description and file name"},
                "owner_id": uuid("Filter by owner ID"),
                "tenant_id": uuid("Filter by tenant ID"),
                "document_type": {"type": "string", "description": "Filter by MIME type"},
                "tags": tags("Filter by tags (all must match)"),
                "status": {
                    "type": "array",
                    "items": {"type": "string", "enum": ContentStatus::ALL},
                    "description": "Filter by status values"
                },
                "limit": limit(config),
                "offset": offset()
            }
        })
    }

    pub fn list_by_status(config: &CatalogConfig) -> Value {
        json!({
            "type": "object",
            "properties": {
                "status": {"type": "string", "enum": ContentStatus::ALL, "description": "Content status to filter by"},
                "owner_id": uuid("Optional: filter by owner ID"),
                "limit": limit(config),
                "offset": offset()
            },
            "required": ["status"]
        })
    }

    pub fn download() -> Value {
        json!({
            "type": "object",
            "properties": {
                "content_id": uuid("Content ID"),
                "format": {
                    "type": "string",
                    "enum": ["url", "base64"],
                    "default": "url",
                    "description": "Return format; backends without URLs answer with base64"
                }
            },
            "required": ["content_id"]
        })
    }

    pub fn update() -> Value {
        json!({
            "type": "object",
            "properties": {
                "content_id": uuid("Content ID"),
                "name": {"type": "string", "minLength": 1, "description": "New content name"},
                "description": {"type": "string", "description": "New content description"},
                "tags": tags("New tags"),
                "metadata": {"type": "object", "description": "New custom metadata"}
            },
            "required": ["content_id"]
        })
    }

    pub fn batch_upload(config: &CatalogConfig) -> Value {
        let mut required = owner_required(config);
        required.push("items");
        json!({
            "type": "object",
            "properties": {
                "owner_id": uuid("Owner UUID for all items"),
                "tenant_id": uuid("Tenant UUID for all items (optional)"),
                "items": {
                    "type": "array",
                    "items": {"type": "object"},
                    "description": format!("Content items to upload (at most {})", config.max_batch_size)
                }
            },
            "required": required
        })
    }

    pub fn no_arguments() -> Value {
        json!({"type": "object", "properties": {}})
    }

    pub fn read_resource() -> Value {
        json!({
            "type": "object",
            "properties": {
                "uri": {"type": "string", "minLength": 1, "description": "Resource URI, e.g. content://{id}"}
            },
            "required": ["uri"]
        })
    }

    /// JSON schema of the content entity, served as `schema://content`.
    pub fn content_entity() -> Value {
        let uuid = json!({"type": "string", "format": "uuid"});
        let timestamp = json!({"type": "string", "format": "date-time"});
        json!({
            "$schema": "http://json-schema.org/draft-07/schema#",
            "type": "object",
            "properties": {
                "id": uuid,
                "owner_id": uuid,
                "tenant_id": uuid,
                "name": {"type": "string"},
                "description": {"type": "string"},
                "document_type": {"type": "string"},
                "file_name": {"type": "string"},
                "tags": {"type": "array", "items": {"type": "string"}},
                "metadata": {"type": "object"},
                "status": {"type": "string", "enum": ContentStatus::ALL},
                "storage_backend": {"type": "string"},
                "size": {"type": "integer", "minimum": 0},
                "created_at": timestamp,
                "updated_at": timestamp
            },
            "required": ["id", "owner_id", "name", "status"]
        })
    }

    pub fn batch_get() -> Value {
        json!({
            "type": "object",
            "properties": {
                "items": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "Content IDs to fetch"
                }
            },
            "required": ["items"]
        })
    }
}
